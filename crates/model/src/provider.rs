use std::error::Error;

use futures_util::Stream;

use crate::error::ErrorKind;
use crate::parser::StructuredParser;
use crate::request::{ChatMessage, ChatOptions};
use crate::response::{Embedding, ModelResponse};

/// The error type for a model provider.
pub trait ProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}

/// A chat-completion model.
///
/// Implementations should behave like stateless objects: every call is an
/// independent request, and concurrent calls must not interfere.
pub trait ChatModel: Send + Sync {
    /// The error type that may be returned by the model.
    type Error: ProviderError;

    /// The stream of text fragments returned by [`chat_stream`].
    ///
    /// [`chat_stream`]: ChatModel::chat_stream
    type Stream: Stream<Item = Result<String, Self::Error>> + Send + 'static;

    /// Sends `prompt` after `history` and waits for the whole response.
    fn chat<P: StructuredParser>(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
        options: ChatOptions<P>,
    ) -> impl Future<Output = Result<ModelResponse<P::Output>, Self::Error>> + Send;

    /// Sends `prompt` after `history` and returns the response as a
    /// stream of text fragments.
    ///
    /// Errors that can be detected before the first fragment, such as a
    /// rejected request, are returned here rather than from the stream.
    fn chat_stream(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send;
}

/// An embedding model.
pub trait EmbeddingModel: Send + Sync {
    /// The error type that may be returned by the model.
    type Error: ProviderError;

    /// Embeds each text, returning the vectors in input order.
    fn embed_batch<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send;

    /// Embeds a single text.
    fn embed(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Embedding, Self::Error>> + Send;
}
