use bytes::BytesMut;

use super::Chunks;

/// The field prefix of a data line.
const DATA_FIELD: &str = "data:";

/// A line of a server-sent event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    /// An empty line.
    Blank,
    /// The value of a `data` field, with one leading space removed.
    Data(String),
    /// A comment or a field other than `data`.
    Other,
    /// A line that is not valid UTF-8.
    Invalid,
}

impl Line {
    fn parse(raw: &[u8]) -> Self {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let Ok(line) = std::str::from_utf8(raw) else {
            return Line::Invalid;
        };
        if line.trim().is_empty() {
            return Line::Blank;
        }
        match line.strip_prefix(DATA_FIELD) {
            Some(data) => {
                Line::Data(data.strip_prefix(' ').unwrap_or(data).to_owned())
            }
            None => Line::Other,
        }
    }
}

/// A type for reading server-sent event lines from a chunk stream.
///
/// Bytes are buffered until a full line is available, so lines and UTF-8
/// sequences may be split across chunks arbitrarily.
pub struct Sse {
    buf: BytesMut,
    /// Bytes at the front of `buf` known to contain no line feed.
    scanned: usize,
    chunks: Chunks,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            chunks,
            eof: false,
        }
    }

    /// Reads the next line, `None` once the body is exhausted.
    ///
    /// A trailing line without a line feed is returned at the end of the
    /// body.
    pub async fn next_line(&mut self) -> Result<Option<Line>, reqwest::Error> {
        loop {
            let pending = &self.buf[self.scanned..];
            if let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let idx = self.scanned + pos;
                let line = self.buf.split_to(idx + 1);
                self.scanned = 0;
                return Ok(Some(Line::parse(&line[..idx])));
            }
            self.scanned = self.buf.len();

            if self.eof {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let rest = self.buf.split();
                self.scanned = 0;
                return Ok(Some(Line::parse(&rest)));
            }

            // There is no full line in the buffer, read more.
            match self.chunks.next_chunk().await? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().copied().map(Bytes::from_static).collect();
        Sse::new(Chunks::from_vec_deque(chunks))
    }

    fn data(s: &str) -> Line {
        Line::Data(s.to_owned())
    }

    #[tokio::test]
    async fn test_normal_lines() {
        let mut sse = sse_from(&[b"data: hello\n\ndata: bye\n\n"]);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("hello")));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Blank));
        assert_eq!(sse.next_line().await.unwrap(), Some(data("bye")));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Blank));
        assert_eq!(sse.next_line().await.unwrap(), None);
        assert_eq!(sse.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut sse = sse_from(&[b"da", b"ta:", b"hello\r", b"\n\r\n", b"da"]);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("hello")));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Blank));
        // The trailing partial line is still reported.
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Other));
        assert_eq!(sse.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_long_line() {
        let mut sse = sse_from(&[b"data: ab", b"cd", b"ef\ndata: g", b"h\n"]);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("abcdef")));
        assert_eq!(sse.scanned, 0);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("gh")));
        assert_eq!(sse.next_line().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: ", b"abc", b"def"]);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("abcdef")));
        assert_eq!(sse.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8() {
        // "你好" split in the middle of the first character.
        let mut sse = sse_from(&[b"data: \xe4\xbd", b"\xa0\xe5\xa5\xbd\n"]);
        assert_eq!(sse.next_line().await.unwrap(), Some(data("你好")));
        assert_eq!(sse.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_other_lines() {
        let mut sse = sse_from(&[
            b": keep-alive\n",
            b"event: message\n",
            b"data:  two spaces\n",
            b"data: \xff\xfe\n",
            b"   \n",
        ]);
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Other));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Other));
        assert_eq!(sse.next_line().await.unwrap(), Some(data(" two spaces")));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Invalid));
        assert_eq!(sse.next_line().await.unwrap(), Some(Line::Blank));
        assert_eq!(sse.next_line().await.unwrap(), None);
    }
}
