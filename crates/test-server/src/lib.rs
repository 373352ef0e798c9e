//! A local fake one-api server for testing purpose.
//!
//! The server answers each accepted connection with the next response of
//! its script, then closes the connection. Once the script is exhausted
//! it stops listening, so further requests fail to connect.
//!
//! # Note
//!
//! The HTTP handling only covers what the clients under test send. It is
//! not meant for anything else.

#[macro_use]
extern crate tracing;

mod preset;

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub use preset::PresetResponse;
use preset::PresetBody;

/// A request received by the [`TestServer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    /// The request method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// Header pairs, names in lowercase.
    pub headers: Vec<(String, String)>,
    /// The JSON body, `Value::Null` if the body isn't JSON.
    pub body: Value,
}

impl RecordedRequest {
    /// Returns the first value of the header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A scripted fake one-api server.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server on a random local port that answers with
    /// `responses` in order.
    pub async fn start<I>(responses: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = PresetResponse>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script: VecDeque<_> = responses.into_iter().collect();
        let accept_task =
            tokio::spawn(accept_loop(listener, script, Arc::clone(&requests)));
        Ok(Self {
            addr,
            requests,
            accept_task,
        })
    }

    /// Returns the base URL to configure the clients with.
    #[inline]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    mut script: VecDeque<PresetResponse>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    while let Some(preset) = script.pop_front() {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(err) => {
                error!("failed to accept: {err}");
                return;
            }
        };
        let requests = Arc::clone(&requests);
        tokio::spawn(async move {
            if let Err(err) = serve(stream, preset, requests).await {
                debug!("connection closed with error: {err}");
            }
        });
    }
    trace!("script exhausted, stop listening");
}

async fn serve(
    mut stream: TcpStream,
    preset: PresetResponse,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) -> io::Result<()> {
    let request = read_request(&mut stream).await?;
    trace!("got request: {} {}", request.method, request.path);
    if let Ok(mut requests) = requests.lock() {
        requests.push(request);
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n",
        preset.status,
        reason_phrase(preset.status),
        preset.content_type
    );
    match preset.body {
        PresetBody::Full(body) => {
            head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(&body).await?;
        }
        PresetBody::Chunked(pieces) => {
            head.push_str("Transfer-Encoding: chunked\r\n\r\n");
            stream.write_all(head.as_bytes()).await?;
            for piece in pieces {
                if piece.is_empty() {
                    continue;
                }
                stream
                    .write_all(format!("{:x}\r\n", piece.len()).as_bytes())
                    .await?;
                stream.write_all(&piece).await?;
                stream.write_all(b"\r\n").await?;
                stream.flush().await?;
                // Give the client a chance to read pieces one by one.
                sleep(Duration::from_millis(2)).await;
            }
            if let Some(stall) = preset.stall {
                trace!("stalling the stream for {stall:?}");
                sleep(stall).await;
                return Ok(());
            }
            stream.write_all(b"0\r\n\r\n").await?;
        }
        PresetBody::Hang(duration) => {
            sleep(duration).await;
            return Ok(());
        }
    }
    stream.flush().await?;
    stream.shutdown().await
}

async fn read_request(stream: &mut TcpStream) -> io::Result<RecordedRequest> {
    let mut buf = Vec::new();
    let mut read_buf = [0u8; 4096];

    let head_end = loop {
        if let Some(idx) = find(&buf, b"\r\n\r\n") {
            break idx;
        }
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&read_buf[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| {
            (name.trim().to_ascii_lowercase(), value.trim().to_owned())
        })
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);
    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&read_buf[..n]);
    }
    let body = serde_json::from_slice(
        &buf[body_start..body_start + content_length],
    )
    .unwrap_or(Value::Null);

    Ok(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;

    async fn roundtrip(addr: &str, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut resp = String::new();
        stream.read_to_string(&mut resp).await.unwrap();
        resp
    }

    #[tokio::test]
    async fn test_serve_script() {
        let server = TestServer::start([
            PresetResponse::json(json!({ "ok": true })),
            PresetResponse::event_stream(["data: a\n", "\n"]),
        ])
        .await
        .unwrap();
        let addr = server.base_url().trim_start_matches("http://").to_owned();

        let body = r#"{"model":"m"}"#;
        let resp = roundtrip(
            &addr,
            &format!(
                "POST /v1/embeddings HTTP/1.1\r\nAuthorization: Bearer k\r\n\
                 Content-Length: {}\r\n\r\n{body}",
                body.len()
            ),
        )
        .await;
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(resp.ends_with(r#"{"ok":true}"#));

        let resp = roundtrip(
            &addr,
            "POST /v1/chat/completions HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
        )
        .await;
        assert!(resp.contains("Transfer-Encoding: chunked"));
        assert!(resp.ends_with("8\r\ndata: a\n\r\n1\r\n\n\r\n0\r\n\r\n"));

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/v1/embeddings");
        assert_eq!(requests[0].header("Authorization"), Some("Bearer k"));
        assert_eq!(requests[0].body, json!({ "model": "m" }));
        assert_eq!(requests[1].body, Value::Null);

        // The script is exhausted.
        assert!(TcpStream::connect(&addr).await.is_err());
    }
}
