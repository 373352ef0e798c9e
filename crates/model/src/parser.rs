use std::error::Error as StdError;
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

/// A type-erased error, used as the cause of a rejected parse.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Turns the raw text of a model output into a structured value.
///
/// This is the hook for structured-output mode. Clients never inspect
/// the parser, they only call it with the output text, so any validation
/// mechanism can be plugged in. Closures of the shape
/// `Fn(&str) -> Result<T, E>` implement this trait directly.
pub trait StructuredParser: Send + Sync {
    /// The parsed value.
    type Output: Send;

    /// Parses the output text.
    fn parse(&self, text: &str) -> Result<Self::Output, BoxError>;
}

impl<F, T, E> StructuredParser for F
where
    F: Fn(&str) -> Result<T, E> + Send + Sync,
    T: Send,
    E: Into<BoxError>,
{
    type Output = T;

    #[inline]
    fn parse(&self, text: &str) -> Result<T, BoxError> {
        self(text).map_err(Into::into)
    }
}

/// A parser that deserializes the output text as JSON into `T`.
pub struct JsonParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonParser<T> {
    /// Creates a `JsonParser`.
    #[inline]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonParser<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonParser<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Debug for JsonParser<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonParser")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned + Send> StructuredParser for JsonParser<T> {
    type Output = T;

    fn parse(&self, text: &str) -> Result<T, BoxError> {
        // Models like to wrap JSON in a markdown fence.
        let text = strip_code_fence(text);
        Ok(serde_json::from_str(text)?)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Skip the info string, e.g. "json".
    match rest.find('\n') {
        Some(idx) => rest[idx + 1..].trim(),
        None => rest.trim(),
    }
}

/// The parser type of requests that never ask for structured output.
///
/// This type has no values, it only fills the type parameter of
/// [`ChatOptions`](crate::ChatOptions).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoParser {}

impl StructuredParser for NoParser {
    type Output = ();

    fn parse(&self, _text: &str) -> Result<(), BoxError> {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Eq, Deserialize)]
    struct Entity {
        name: String,
        kind: String,
    }

    #[test]
    fn test_json_parser() {
        let parser = JsonParser::<Entity>::new();
        let entity = parser
            .parse(r#"{"name": "Rust", "kind": "language"}"#)
            .unwrap();
        assert_eq!(entity.name, "Rust");
        assert_eq!(entity.kind, "language");

        let fenced = "```json\n{\"name\": \"Tokio\", \"kind\": \"runtime\"}\n```";
        assert_eq!(parser.parse(fenced).unwrap().name, "Tokio");

        assert!(parser.parse("not json").is_err());
    }

    #[test]
    fn test_closure_parser() {
        let parser = |text: &str| text.trim().parse::<u32>();
        assert_eq!(parser.parse(" 42 ").unwrap(), 42);

        let err = parser.parse("forty-two").unwrap_err();
        assert!(err.to_string().contains("invalid digit"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {}  "), "{}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```[1]"), "```[1]");
    }
}
