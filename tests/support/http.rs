//! Scripted local HTTP server for exercising outbound clients.
//!
//! Accepts one connection per scripted response, in order, and records each
//! raw request (headers and body) for later assertions.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status_line: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_line: status_line.to_owned(),
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            body: body.into(),
        }
    }

    pub fn json(status_line: &str, body: &serde_json::Value) -> Self {
        Self::new(status_line, "application/json", body.to_string())
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status_line: "302 Found".to_owned(),
            headers: vec![("Location".to_owned(), location.to_owned())],
            body: Vec::new(),
        }
    }
}

/// A running scripted server.
pub struct MockServer {
    pub base_url: String,
    handle: JoinHandle<Vec<String>>,
}

impl MockServer {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let listener = match TcpListener::bind("127.0.0.1:0").await {
            Ok(listener) => listener,
            Err(err) => panic!("listener should bind: {err}"),
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(err) => panic!("listener should expose local addr: {err}"),
        };

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                requests.push(read_request(&mut socket).await);

                let mut raw = format!("HTTP/1.1 {}\r\n", response.status_line);
                for (name, value) in &response.headers {
                    raw.push_str(&format!("{name}: {value}\r\n"));
                }
                raw.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    response.body.len()
                ));
                let _ = socket.write_all(raw.as_bytes()).await;
                let _ = socket.write_all(&response.body).await;
                let _ = socket.shutdown().await;
            }
            requests
        });

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Full URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Wait for all scripted exchanges and return the recorded requests.
    pub async fn requests(self) -> Vec<String> {
        match self.handle.await {
            Ok(requests) => requests,
            Err(err) => panic!("mock server task failed: {err}"),
        }
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data: Vec<u8> = Vec::new();
    let mut buf = [0_u8; 4096];

    loop {
        if let Some(header_end) = find_header_end(&data) {
            let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}
