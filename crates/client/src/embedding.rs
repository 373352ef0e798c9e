use std::sync::Arc;
use std::time::Duration;

use oneapi_model::{Embedding, EmbeddingModel};
use reqwest::{Client, header};

use crate::chat::read_json;
use crate::proto::{self, EmbeddingRequest};
use crate::{ClientConfig, EMBEDDINGS_PATH, Error, build_http_client};

/// The timeout of embedding requests if none is configured.
pub const DEFAULT_EMBEDDING_TIMEOUT: Duration = Duration::from_secs(300);

/// An embedding client for one-api.
#[derive(Clone, Debug)]
pub struct EmbeddingClient {
    client: Client,
    config: Arc<ClientConfig>,
    timeout: Duration,
}

impl EmbeddingClient {
    /// Creates a new `EmbeddingClient` with the given configuration.
    ///
    /// Fails with [`Error::Config`] if the base URL, the API key or the
    /// model is empty. No request is made here.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let timeout = config.timeout.unwrap_or(DEFAULT_EMBEDDING_TIMEOUT);
        Ok(Self {
            client: build_http_client(timeout)?,
            config: Arc::new(config),
            timeout,
        })
    }

    /// Returns the configuration of this client.
    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Embeds each text with one request.
    ///
    /// The vectors are returned in the order of the response items, which
    /// the service is expected to keep aligned with the input.
    pub async fn embed_batch<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
    ) -> Result<Vec<Embedding>, Error> {
        let payload = EmbeddingRequest::new(&self.config.model, texts);
        debug!(
            model = %self.config.model,
            inputs = texts.len(),
            "sending embedding request"
        );
        let resp = self
            .client
            .post(self.config.endpoint(EMBEDDINGS_PATH))
            .header(header::AUTHORIZATION, self.config.bearer())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let full_response = read_json(resp).await?;
        let Some(vectors) = proto::embeddings(&full_response) else {
            return Err(Error::protocol(
                "invalid embedding response",
                full_response.to_string(),
            ));
        };
        if vectors.len() != texts.len() {
            warn!(
                "got {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        Ok(vectors)
    }

    /// Embeds a single text.
    pub async fn embed(&self, text: &str) -> Result<Embedding, Error> {
        let mut vectors = self.embed_batch(&[text]).await?;
        if vectors.is_empty() {
            return Err(Error::protocol(
                "invalid embedding response",
                "no embedding in the response data",
            ));
        }
        Ok(vectors.swap_remove(0))
    }
}

impl EmbeddingModel for EmbeddingClient {
    type Error = Error;

    #[inline]
    fn embed_batch<S: AsRef<str> + Sync>(
        &self,
        texts: &[S],
    ) -> impl Future<Output = Result<Vec<Embedding>, Self::Error>> + Send {
        EmbeddingClient::embed_batch(self, texts)
    }

    #[inline]
    fn embed(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Embedding, Self::Error>> + Send {
        EmbeddingClient::embed(self, text)
    }
}

#[cfg(test)]
mod tests {
    use oneapi_model::{ErrorKind, ProviderError};

    use super::*;
    use crate::ClientConfigBuilder;

    #[test]
    fn test_new() {
        let config = ClientConfigBuilder::with_api_key("sk")
            .with_base_url("http://127.0.0.1:9")
            .with_model("text-embedding-v3")
            .build();
        let client = EmbeddingClient::new(config).unwrap();
        assert_eq!(client.timeout, DEFAULT_EMBEDDING_TIMEOUT);
        assert_eq!(client.config().model(), "text-embedding-v3");
    }

    #[test]
    fn test_new_without_model() {
        let config = ClientConfigBuilder::with_api_key("sk")
            .with_base_url("http://127.0.0.1:9")
            .build();
        let err = EmbeddingClient::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("model"));
    }
}
