//! Minimal HTTP/1.1 image server for integration tests.
//!
//! Serves scripted responses per path. A route can fail with a status for its
//! first N hits before serving its body, or fail forever. Unknown paths are 404.
//! Hits and the last Referer seen are recorded per path.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Route {
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// Status returned for the first `fail_first` hits.
    pub fail_status: u16,
    pub fail_first: usize,
}

impl Route {
    pub fn ok(body: &[u8], content_type: &'static str) -> Self {
        Self {
            body: body.to_vec(),
            content_type,
            fail_status: 503,
            fail_first: 0,
        }
    }

    /// Fails with `status` for the first `n` hits, then serves `body`.
    pub fn flaky(body: &[u8], content_type: &'static str, status: u16, n: usize) -> Self {
        Self {
            fail_status: status,
            fail_first: n,
            ..Self::ok(body, content_type)
        }
    }

    /// Always answers `status`.
    pub fn failing(status: u16) -> Self {
        Self::flaky(b"", "text/plain", status, usize::MAX)
    }
}

#[derive(Debug, Default)]
struct State {
    hits: HashMap<String, usize>,
    referers: HashMap<String, String>,
}

#[derive(Clone)]
pub struct ImageServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl ImageServer {
    /// URL for `path` (which starts with `/`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().unwrap().hits.get(path).copied().unwrap_or(0)
    }

    pub fn referer(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().referers.get(path).cloned()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> ImageServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> =
        Arc::new(routes.into_iter().map(|(p, r)| (p.to_string(), r)).collect());
    let state = Arc::new(Mutex::new(State::default()));
    let server = ImageServer {
        base: format!("http://127.0.0.1:{}", port),
        state: Arc::clone(&state),
    };
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let state = Arc::clone(&state);
            thread::spawn(move || handle(stream, &routes, &state));
        }
    });
    server
}

fn handle(mut stream: std::net::TcpStream, routes: &HashMap<String, Route>, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (path, referer) = parse_request(request);

    let hit = {
        let mut st = state.lock().unwrap();
        let h = st.hits.entry(path.to_string()).or_insert(0);
        *h += 1;
        let hit = *h;
        if let Some(r) = referer {
            st.referers.insert(path.to_string(), r.to_string());
        }
        hit
    };

    let (status, content_type, body): (String, &str, &[u8]) = match routes.get(path) {
        None => ("404 Not Found".into(), "text/plain", &b""[..]),
        Some(r) if hit <= r.fail_first => (format!("{} Error", r.fail_status), "text/plain", &b""[..]),
        Some(r) => ("200 OK".into(), r.content_type, &r.body),
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

/// Returns (path, optional Referer header).
fn parse_request(request: &str) -> (&str, Option<&str>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let referer = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("referer"))
        .map(|(_, v)| v.trim());
    (path, referer)
}
