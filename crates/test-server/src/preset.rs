use std::time::Duration;

use serde_json::Value;

/// The body of a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum PresetBody {
    /// Sent at once with a `Content-Length`.
    Full(Vec<u8>),
    /// Sent with chunked transfer encoding, one HTTP chunk per item.
    Chunked(Vec<Vec<u8>>),
    /// Nothing is sent, the connection is held open for the duration.
    Hang(Duration),
}

/// A scripted response of the [`TestServer`](crate::TestServer).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PresetResponse {
    pub(crate) status: u16,
    pub(crate) content_type: &'static str,
    pub(crate) body: PresetBody,
    /// Holds the connection open after a chunked body instead of
    /// terminating it.
    pub(crate) stall: Option<Duration>,
}

impl PresetResponse {
    /// A `200 OK` response with a JSON body.
    #[inline]
    pub fn json(body: Value) -> Self {
        Self::json_with_status(200, body)
    }

    /// A response with the given status and JSON body.
    #[inline]
    pub fn json_with_status(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: PresetBody::Full(body.to_string().into_bytes()),
            stall: None,
        }
    }

    /// A response with the given status and a plain text body.
    #[inline]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: PresetBody::Full(body.into().into_bytes()),
            stall: None,
        }
    }

    /// A `200 OK` event stream whose body is sent in the given pieces.
    ///
    /// The pieces are written verbatim, so they may split lines.
    pub fn event_stream<I, S>(pieces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: PresetBody::Chunked(
                pieces.into_iter().map(Into::into).collect(),
            ),
            stall: None,
        }
    }

    /// A `200 OK` event stream with one `data:` event per value, followed
    /// by the `[DONE]` marker.
    pub fn event_stream_data<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let pieces = values
            .into_iter()
            .map(|value| format!("data: {value}\n\n"))
            .chain([String::from("data: [DONE]\n\n")]);
        Self::event_stream(pieces)
    }

    /// Accepts the request but doesn't answer for `duration`.
    #[inline]
    pub fn hang(duration: Duration) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: PresetBody::Hang(duration),
            stall: None,
        }
    }

    /// Stops sending after the last piece of an event stream and keeps
    /// the connection silent for `duration`.
    #[inline]
    pub fn stalled(mut self, duration: Duration) -> Self {
        self.stall = Some(duration);
        self
    }

    /// Overrides the content type.
    #[inline]
    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_stream_data() {
        let preset = PresetResponse::event_stream_data([
            json!({ "choices": [] }),
            json!(1),
        ]);
        assert_eq!(preset.content_type, "text/event-stream");
        assert_eq!(
            preset.body,
            PresetBody::Chunked(vec![
                b"data: {\"choices\":[]}\n\n".to_vec(),
                b"data: 1\n\n".to_vec(),
                b"data: [DONE]\n\n".to_vec(),
            ])
        );
        assert_eq!(preset.stall, None);

        let preset = PresetResponse::event_stream(["data: 1\n\n"])
            .stalled(Duration::from_secs(1));
        assert_eq!(preset.stall, Some(Duration::from_secs(1)));
    }
}
