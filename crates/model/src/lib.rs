//! An abstraction layer for OpenAI-compatible chat and embedding services.
//!
//! This crate holds the calling convention shared by the pipeline and the
//! concrete clients: messages and history, the aggregated response shape,
//! the structured-output parser seam and the provider traits.
//!
//! Types in this crate don't perform any I/O. Concrete clients, like the
//! one in `oneapi-client`, implement [`ChatModel`] and [`EmbeddingModel`].

#![deny(missing_docs)]

mod error;
mod parser;
mod provider;
mod request;
mod response;

pub use error::*;
pub use parser::*;
pub use provider::*;
pub use request::*;
pub use response::*;
