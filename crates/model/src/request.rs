use serde::{Deserialize, Serialize};

use crate::parser::{NoParser, StructuredParser};

/// The author of a chat message.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The system instructions.
    System,
    /// The user input.
    User,
    /// A previous model output.
    Assistant,
    /// A tool call result.
    Tool,
}

/// A single role/content pair of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote this message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with the given role.
    #[inline]
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[inline]
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// The ordered messages of a conversation, oldest first.
pub type ConversationHistory = Vec<ChatMessage>;

/// Builds the messages for a new turn: a copy of `history` followed by
/// the user `prompt`. The caller's history is left untouched.
pub fn extend_history(
    history: Option<&[ChatMessage]>,
    prompt: &str,
) -> ConversationHistory {
    let history = history.unwrap_or_default();
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(prompt));
    messages
}

/// Per-call options for a chat request.
///
/// Structured output is only produced when `json` is set **and** a parser
/// is present, so a caller may keep a parser around and toggle the flag.
#[derive(Clone, Debug)]
pub struct ChatOptions<P = NoParser> {
    /// Whether the output text should be parsed as structured output.
    pub json: bool,
    /// The parser to apply to the output text.
    pub parser: Option<P>,
}

impl ChatOptions<NoParser> {
    /// Creates options for a plain text request.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> Default for ChatOptions<P> {
    #[inline]
    fn default() -> Self {
        Self {
            json: false,
            parser: None,
        }
    }
}

impl<P: StructuredParser> ChatOptions<P> {
    /// Creates options that parse the output with `parser`.
    #[inline]
    pub fn structured(parser: P) -> Self {
        Self {
            json: true,
            parser: Some(parser),
        }
    }

    /// Returns the parser if structured output was requested.
    #[inline]
    pub fn structured_parser(&self) -> Option<&P> {
        self.parser.as_ref().filter(|_| self.json)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::JsonParser;

    #[test]
    fn test_extend_history() {
        let history = vec![
            ChatMessage::system("Be brief."),
            ChatMessage::user("Hi"),
            ChatMessage::assistant("Hello!"),
        ];
        let messages = extend_history(Some(&history[..]), "What is RAG?");
        assert_eq!(messages.len(), 4);
        assert_eq!(&messages[..3], &history[..]);
        assert_eq!(messages[3], ChatMessage::user("What is RAG?"));
        assert_eq!(history.len(), 3);

        let messages = extend_history(None, "Hi");
        assert_eq!(messages, vec![ChatMessage::user("Hi")]);
    }

    #[test]
    fn test_message_wire_format() {
        let msg = ChatMessage::assistant("ok");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "role": "assistant", "content": "ok" })
        );
        let msg: ChatMessage =
            serde_json::from_value(json!({ "role": "tool", "content": "42" }))
                .unwrap();
        assert_eq!(msg.role, Role::Tool);
    }

    #[test]
    fn test_structured_parser_selection() {
        let options = ChatOptions::new();
        assert!(options.structured_parser().is_none());

        let mut options =
            ChatOptions::structured(JsonParser::<serde_json::Value>::new());
        assert!(options.structured_parser().is_some());

        options.json = false;
        assert!(options.structured_parser().is_none());
    }
}
