//! Clients for one-api, an OpenAI-compatible chat and embedding service.
//!
//! [`ChatClient`] sends conversation turns to `/v1/chat/completions`,
//! either waiting for the whole completion or streaming text fragments.
//! [`EmbeddingClient`] sends texts to `/v1/embeddings`.
//!
//! Both clients are configured once with a [`ClientConfig`] and keep no
//! state between calls: every call opens its own connection and closes it
//! when the call (or the returned stream) is done. There is no retry,
//! caching or rate limiting at this layer.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod blocking;
mod chat;
mod config;
mod embedding;
mod error;
mod io;
mod proto;
mod stream;

use std::time::Duration;

use reqwest::Client;

pub use chat::{ChatClient, DEFAULT_CHAT_TIMEOUT};
pub use config::{ClientConfig, ClientConfigBuilder, LanguageModelConfig};
pub use embedding::{DEFAULT_EMBEDDING_TIMEOUT, EmbeddingClient};
pub use error::Error;
pub use stream::ChatStream;

/// Re-exports of [`oneapi_model`] crate.
pub mod model {
    pub use oneapi_model::*;
}

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const EMBEDDINGS_PATH: &str = "/v1/embeddings";

/// Builds the HTTP client shared by the calls of one adapter.
///
/// Idle connections are not kept, so each call gets a fresh connection
/// that is closed once the response is consumed or dropped.
fn build_http_client(timeout: Duration) -> Result<Client, Error> {
    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(Error::Transport)
}
