use oneapi_model::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    #[inline]
    pub fn new(model: &'a str, messages: &'a [ChatMessage], stream: bool) -> Self {
        Self {
            model,
            messages,
            stream,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

impl<'a> EmbeddingRequest<'a> {
    #[inline]
    pub fn new<S: AsRef<str>>(model: &'a str, texts: &'a [S]) -> Self {
        Self {
            model,
            input: texts.iter().map(AsRef::as_ref).collect(),
        }
    }
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Content {
    pub content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: Option<Content>,
    pub delta: Option<Content>,
}

impl Choice {
    /// Returns the incremental content of a streamed choice, or the
    /// content of a full message if the choice carries no delta.
    #[inline]
    pub fn into_fragment(self) -> Option<String> {
        match self.delta {
            Some(delta) => delta.content,
            None => self.message.and_then(|m| m.content),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EmbeddingItem {
    pub embedding: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingItem>,
}

// -----------
// Conversions
// -----------

/// Extracts the text of the first choice of a chat completion.
///
/// Returns `None` if the body has no choices or the first choice has no
/// message. A message with `null` content yields an empty string.
pub fn completion_content(body: &Value) -> Option<String> {
    let first = body.get("choices")?.as_array()?.first()?;
    let choice = Choice::deserialize(first).ok()?;
    Some(choice.message?.content.unwrap_or_default())
}

/// Extracts the vectors of an embedding response, in response order.
pub fn embeddings(body: &Value) -> Option<Vec<Vec<f32>>> {
    body.get("data")?.as_array()?;
    let resp = EmbeddingResponse::deserialize(body).ok()?;
    Some(resp.data.into_iter().map(|item| item.embedding).collect())
}
