// Helpers shared by the integration tests: a scripted transport that
// replays canned replies and records requests, and a one-shot local HTTP
// peer for tests that go over a real socket.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lnkshrt_cli::api::{HttpRequest, HttpResponse, Transport, TransportError};

#[derive(Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn replying(status: u16, body: serde_json::Value) -> Self {
        let transport = Self::default();
        transport.push(status, body);
        transport
    }

    pub fn failing(err: TransportError) -> Self {
        let transport = Self::default();
        transport.replies.borrow_mut().push_back(Err(err));
        transport
    }

    pub fn push(&self, status: u16, body: serde_json::Value) {
        self.replies
            .borrow_mut()
            .push_back(Ok(HttpResponse { status, body: body.to_string() }));
    }

    pub fn call_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn last(&self) -> HttpRequest {
        self.requests.borrow().last().cloned().expect("no request was sent")
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
    }
}

/// Build a raw HTTP/1.1 response with a JSON content type.
pub fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Accept one connection on a fresh local port, answer it with `response`
/// and hand back the raw request that was received.
pub fn serve_once(response: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let request = read_request(&mut stream);
        stream.write_all(response.as_bytes()).expect("write response");
        stream.flush().ok();
        request
    });
    (format!("http://{addr}"), handle)
}

/// Accept one connection, read the request and then stay silent for `hold`.
pub fn serve_silence(hold: Duration) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        read_request(&mut stream);
        thread::sleep(hold);
    });
    (format!("http://{addr}"), handle)
}

/// A local URL nothing is listening on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).into_owned();
            if buf.len() >= end + 4 + content_length(&head) {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}
