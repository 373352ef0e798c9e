use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::ConversationHistory;

/// A vector returned by an embedding model, one per input text.
pub type Embedding = Vec<f32>;

/// The generated output of a chat request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// The generated text.
    pub content: String,
    /// The decoded response body, as received from the server.
    pub full_response: Value,
}

/// An aggregated response of a chat request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse<T = ()> {
    /// The generated output.
    pub output: ModelOutput,
    /// The structured parse of the output, if it was requested.
    pub parsed_response: Option<T>,
    /// The messages sent to produce this response, including the prompt.
    ///
    /// Push the assistant output and the next prompt onto this to
    /// continue the conversation.
    pub history: ConversationHistory,
    /// Whether the response was served from a cache.
    pub cache_hit: bool,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<Value>,
    /// Metrics collected for the request.
    pub metrics: Map<String, Value>,
}

impl<T> ModelResponse<T> {
    /// Creates an uncached response without tool calls or metrics.
    #[inline]
    pub fn new(
        output: ModelOutput,
        parsed_response: Option<T>,
        history: ConversationHistory,
    ) -> Self {
        Self {
            output,
            parsed_response,
            history,
            cache_hit: false,
            tool_calls: Vec::new(),
            metrics: Map::new(),
        }
    }

    /// Returns the generated text.
    #[inline]
    pub fn content(&self) -> &str {
        &self.output.content
    }
}
