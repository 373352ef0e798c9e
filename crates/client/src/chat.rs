use std::sync::Arc;
use std::time::Duration;

use mime::Mime;
use oneapi_model::{
    ChatMessage, ChatModel, ChatOptions, ModelOutput, ModelResponse,
    StructuredParser, extend_history,
};
use reqwest::{Client, RequestBuilder, Response, header};
use serde_json::Value;

use crate::io::{Chunks, Sse};
use crate::proto::{self, ChatCompletionRequest};
use crate::{
    CHAT_COMPLETIONS_PATH, ChatStream, ClientConfig, Error, build_http_client,
};

/// The timeout of chat requests if none is configured.
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(180);

/// A chat-completion client for one-api.
#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    config: Arc<ClientConfig>,
    timeout: Duration,
}

impl ChatClient {
    /// Creates a new `ChatClient` with the given configuration.
    ///
    /// Fails with [`Error::Config`] if the base URL, the API key or the
    /// model is empty. No request is made here.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let timeout = config.timeout.unwrap_or(DEFAULT_CHAT_TIMEOUT);
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

    /// Sends `prompt` after `history` and returns the whole completion.
    #[inline]
    pub async fn send(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<ModelResponse, Error> {
        self.send_with(prompt, history, ChatOptions::new()).await
    }

    /// Like [`send`](Self::send), with per-call options.
    ///
    /// If the options request structured output, the output text is
    /// parsed with their parser and a failure is returned as
    /// [`Error::StructuredOutput`].
    pub async fn send_with<P: StructuredParser>(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
        options: ChatOptions<P>,
    ) -> Result<ModelResponse<P::Output>, Error> {
        let messages = extend_history(history, prompt);
        let payload =
            ChatCompletionRequest::new(&self.config.model, &messages, false);
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "sending chat request"
        );
        let resp = self
            .post(CHAT_COMPLETIONS_PATH)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        // The body is checked for choices whatever the status is, error
        // bodies fail the same check.
        let full_response = read_json(resp).await?;
        let Some(content) = proto::completion_content(&full_response) else {
            return Err(Error::protocol(
                "invalid chat response",
                full_response.to_string(),
            ));
        };

        let parsed_response = match options.structured_parser() {
            Some(parser) => match parser.parse(&content) {
                Ok(parsed) => Some(parsed),
                Err(source) => {
                    return Err(Error::StructuredOutput {
                        raw: content,
                        source,
                    });
                }
            },
            None => None,
        };

        Ok(ModelResponse::new(
            ModelOutput {
                content,
                full_response,
            },
            parsed_response,
            messages,
        ))
    }

    /// Sends `prompt` after `history` and streams the completion.
    ///
    /// A non-success status is returned as [`Error::Streaming`] before
    /// any fragment is produced.
    pub async fn send_stream(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
    ) -> Result<ChatStream, Error> {
        let messages = extend_history(history, prompt);
        let payload =
            ChatCompletionRequest::new(&self.config.model, &messages, true);
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "sending streaming chat request"
        );
        let resp = self
            .post(CHAT_COMPLETIONS_PATH)
            .header(header::ACCEPT, mime::TEXT_EVENT_STREAM.as_ref())
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!("failed to read the error body: {err}");
                    String::new()
                }
            };
            error!("streaming request failed with status {status}");
            return Err(Error::Streaming { status, body });
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let is_event_stream = content_type
            .and_then(|v| v.parse().ok())
            .is_some_and(|m: Mime| {
                m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
            });
        if !is_event_stream {
            // Some deployments mislabel the stream, parse it anyway.
            warn!("unexpected content type for a stream: {content_type:?}");
        }

        // Here we got a successful response.
        let chunks = Chunks::from_response(resp);
        Ok(ChatStream::from_sse(Sse::new(chunks)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.config.endpoint(path))
            .header(header::AUTHORIZATION, self.config.bearer())
    }
}

/// Reads the whole body and decodes it as JSON.
pub(crate) async fn read_json(resp: Response) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str(&body) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug!("response with status {status} is not JSON: {err}");
            Err(Error::protocol("response body is not JSON", body))
        }
    }
}

impl ChatModel for ChatClient {
    type Error = Error;
    type Stream = ChatStream;

    #[inline]
    fn chat<P: StructuredParser>(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
        options: ChatOptions<P>,
    ) -> impl Future<Output = Result<ModelResponse<P::Output>, Self::Error>> + Send
    {
        self.send_with(prompt, history, options)
    }

    #[inline]
    fn chat_stream(
        &self,
        prompt: &str,
        history: Option<&[ChatMessage]>,
    ) -> impl Future<Output = Result<Self::Stream, Self::Error>> + Send {
        self.send_stream(prompt, history)
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
            .with_base_url("http://127.0.0.1:9/")
            .with_model("qwen-plus")
            .build();
        let client = ChatClient::new(config).unwrap();
        assert_eq!(client.timeout, DEFAULT_CHAT_TIMEOUT);
        assert_eq!(client.config().base_url(), "http://127.0.0.1:9");

        let config = ClientConfigBuilder::with_api_key("sk")
            .with_base_url("http://127.0.0.1:9")
            .with_model("qwen-plus")
            .with_timeout(Duration::from_secs(5))
            .build();
        let client = ChatClient::new(config).unwrap();
        assert_eq!(client.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_new_without_api_key() {
        let config = ClientConfigBuilder::with_api_key("")
            .with_base_url("http://127.0.0.1:9")
            .with_model("qwen-plus")
            .build();
        let err = ChatClient::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
