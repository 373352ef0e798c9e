//! Blocking wrappers for callers without an async runtime.
//!
//! Each call builds a current-thread runtime, drives the async operation
//! to completion on the calling thread and drops the runtime. These
//! wrappers must not be called from inside an async runtime, they return
//! [`Error::Runtime`] when they detect one instead of blocking it.

use oneapi_model::{
    ChatMessage, ChatOptions, Embedding, ModelResponse, StructuredParser,
};
use tokio::runtime::{Builder as RuntimeBuilder, Handle};

use crate::{ChatClient, EmbeddingClient, Error};

fn block_on<F: Future>(fut: F) -> Result<F::Output, Error> {
    if Handle::try_current().is_ok() {
        return Err(Error::Runtime(
            "blocking calls can't be made from inside an async runtime"
                .to_owned(),
        ));
    }
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::Runtime(format!("failed to start a runtime: {err}"))
        })?;
    Ok(runtime.block_on(fut))
}

impl ChatClient {
    /// Blocking version of [`send`](ChatClient::send).
    pub fn send_blocking(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<ModelResponse, Error> {
        block_on(self.send(prompt, history))?
    }

    /// Blocking version of [`send_with`](ChatClient::send_with).
    pub fn send_with_blocking<P: StructuredParser>(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
        options: ChatOptions<P>,
    ) -> Result<ModelResponse<P::Output>, Error> {
        block_on(self.send_with(prompt, history, options))?
    }
}

impl EmbeddingClient {
    /// Blocking version of [`embed_batch`](EmbeddingClient::embed_batch).
    pub fn embed_batch_blocking<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
    ) -> Result<Vec<Embedding>, Error> {
        block_on(self.embed_batch(texts))?
    }

    /// Blocking version of [`embed`](EmbeddingClient::embed).
    pub fn embed_blocking(&self, text: &str) -> Result<Embedding, Error> {
        block_on(self.embed(text))?
    }
}

#[cfg(test)]
mod tests {
    use oneapi_model::{ErrorKind, ProviderError};

    use super::*;

    #[test]
    fn test_block_on() {
        assert_eq!(block_on(async { 1 + 1 }).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reject_nested_runtime() {
        let err = block_on(async {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }
}
