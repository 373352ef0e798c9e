use std::fmt::{self, Debug, Formatter};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Line, Sse};
use crate::proto::ChatCompletionChunk;

/// The data value that terminates a chat completion stream.
const DONE: &str = "[DONE]";

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextFragment = (Option<Result<String, Error>>, Sse);

pin_project! {
    /// The text fragments of a streaming chat completion.
    ///
    /// The stream ends at the `[DONE]` marker or at the end of the body.
    /// Malformed chunks are skipped. A transport failure is yielded once
    /// and ends the stream.
    ///
    /// The response body is read lazily, one fragment at a time. Dropping
    /// the stream closes the connection.
    pub struct ChatStream {
        next_fragment_fut: Option<PinnedFuture<NextFragment>>,
    }
}

impl ChatStream {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        Self {
            next_fragment_fut: Some(Box::pin(next_fragment(sse))),
        }
    }
}

impl Stream for ChatStream {
    type Item = Result<String, Error>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let Some(next_fragment_fut) = this.next_fragment_fut else {
            return Poll::Ready(None);
        };
        let (fragment, sse) = ready!(next_fragment_fut.as_mut().poll(cx));
        match fragment {
            Some(Ok(fragment)) => {
                // There may be more fragments, create a new future for the
                // next one.
                *this.next_fragment_fut = Some(Box::pin(next_fragment(sse)));
                Poll::Ready(Some(Ok(fragment)))
            }
            Some(Err(err)) => {
                *this.next_fragment_fut = None;
                Poll::Ready(Some(Err(err)))
            }
            None => {
                *this.next_fragment_fut = None;
                Poll::Ready(None)
            }
        }
    }
}

impl Debug for ChatStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatStream")
            .field("finished", &self.next_fragment_fut.is_none())
            .finish()
    }
}

async fn next_fragment(mut sse: Sse) -> NextFragment {
    loop {
        let line = match sse.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("event stream ended without {DONE}");
                return (None, sse);
            }
            Err(err) => return (Some(Err(Error::Transport(err))), sse),
        };
        trace!("got sse line: {line:?}");

        let data = match line {
            Line::Data(data) => data,
            Line::Invalid => {
                warn!("skipping a line that is not valid UTF-8");
                continue;
            }
            Line::Blank | Line::Other => continue,
        };
        if data.trim() == DONE {
            return (None, sse);
        }

        let chunk = match serde_json::from_str::<ChatCompletionChunk>(&data) {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("skipping malformed chunk: {err}");
                continue;
            }
        };
        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };
        if let Some(fragment) = choice.into_fragment() {
            return (Some(Ok(fragment)), sse);
        }
    }
}
