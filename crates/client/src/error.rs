use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use oneapi_model::{BoxError, ErrorKind, ProviderError};
use reqwest::StatusCode;

const BODY_PREVIEW_CHARS: usize = 512;

/// Error type for the one-api clients.
#[derive(Debug)]
pub enum Error {
    /// The client configuration is incomplete.
    Config(String),
    /// The response body doesn't have the expected shape.
    Protocol {
        /// What was expected.
        message: String,
        /// The response body as received.
        body: String,
    },
    /// A streaming request was answered with a non-success status.
    Streaming {
        /// The response status.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// The output text was rejected by the structured-output parser.
    StructuredOutput {
        /// The output text that failed to parse.
        raw: String,
        /// The parser error.
        source: BoxError,
    },
    /// The request failed on the transport level, including timeouts.
    Transport(reqwest::Error),
    /// A blocking call couldn't be run.
    Runtime(String),
}

impl Error {
    #[inline]
    pub(crate) fn protocol(
        message: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Protocol {
            message: message.into(),
            body: body.into(),
        }
    }

    /// Returns the HTTP status of a rejected streaming request.
    #[inline]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Streaming { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Returns the response body attached to this error, if any.
    #[inline]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Protocol { body, .. } | Self::Streaming { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// Returns the model output that failed structured parsing.
    #[inline]
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::StructuredOutput { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Returns `true` if the request timed out.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(message) => {
                write!(f, "invalid client configuration: {message}")
            }
            Self::Protocol { message, body } => {
                write!(f, "{message}: {}", preview(body))
            }
            Self::Streaming { status, body } => write!(
                f,
                "streaming request failed with status {status}: {}",
                preview(body)
            ),
            Self::StructuredOutput { raw, source } => write!(
                f,
                "failed to parse model output: {source}\noutput: {}",
                preview(raw)
            ),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Runtime(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::StructuredOutput { source, .. } => Some(source.as_ref()),
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl ProviderError for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Streaming { .. } => ErrorKind::Streaming,
            Self::StructuredOutput { .. } => ErrorKind::StructuredOutput,
            Self::Transport(err) if err.is_timeout() => ErrorKind::Timeout,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }
}

impl From<reqwest::Error> for Error {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_kinds_and_accessors() {
        let err = Error::Streaming {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: r#"{"error":"quota"}"#.to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::Streaming);
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(err.body(), Some(r#"{"error":"quota"}"#));
        assert!(err.to_string().contains("429"));

        let cause = "abc".parse::<u8>().unwrap_err();
        let err = Error::StructuredOutput {
            raw: "abc".to_owned(),
            source: Box::new(cause),
        };
        assert_eq!(err.kind(), ErrorKind::StructuredOutput);
        assert_eq!(err.raw_output(), Some("abc"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("output: abc"));

        let err = Error::protocol("invalid chat response", "{}");
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(err.to_string(), "invalid chat response: {}");
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_preview() {
        let body = "é".repeat(BODY_PREVIEW_CHARS + 10);
        assert_eq!(preview(&body).chars().count(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
