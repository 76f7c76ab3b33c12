//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths, each with its own behavior (plain body,
//! error status, truncated body, slow body, redirect, header check). One
//! request per connection; the server runs until the process exits.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with the full body.
    Body(Vec<u8>),
    /// Bare status with an empty body.
    Status(u16),
    /// Announces `announced` bytes but sends only `body`, then closes.
    Truncated { body: Vec<u8>, announced: u64 },
    /// Sends `body` in `chunk`-sized writes with `delay` between them.
    Slow {
        body: Vec<u8>,
        chunk: usize,
        delay: Duration,
    },
    /// 302 to another path on this server.
    Redirect(String),
    /// 200 with `body` only when the request carries `name: value`, else 403.
    RequireHeader {
        name: String,
        value: String,
        body: Vec<u8>,
    },
}

/// Starts the server in a background thread. Returns the base URL without a
/// trailing slash (e.g. "http://127.0.0.1:12345").
pub fn start(routes: Vec<(&str, Route)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(p, r)| (p.to_string(), r))
            .collect(),
    );
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}", port)
}

fn reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        302 => "Found",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn head(stream: &mut TcpStream, code: u16, len: u64, extra: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        code,
        reason(code),
        len,
        extra
    );
    let _ = stream.write_all(response.as_bytes());
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (path, headers) = parse_request(request);

    match routes.get(path) {
        None => head(&mut stream, 404, 0, ""),
        Some(Route::Body(body)) => {
            head(&mut stream, 200, body.len() as u64, "");
            let _ = stream.write_all(body);
        }
        Some(Route::Status(code)) => head(&mut stream, *code, 0, ""),
        Some(Route::Truncated { body, announced }) => {
            head(&mut stream, 200, *announced, "");
            let _ = stream.write_all(body);
        }
        Some(Route::Slow { body, chunk, delay }) => {
            head(&mut stream, 200, body.len() as u64, "");
            for part in body.chunks((*chunk).max(1)) {
                if stream.write_all(part).and_then(|_| stream.flush()).is_err() {
                    return;
                }
                thread::sleep(*delay);
            }
        }
        Some(Route::Redirect(to)) => {
            head(&mut stream, 302, 0, &format!("Location: {}\r\n", to));
        }
        Some(Route::RequireHeader { name, value, body }) => {
            if headers.get(&name.to_ascii_lowercase()) == Some(value) {
                head(&mut stream, 200, body.len() as u64, "");
                let _ = stream.write_all(body);
            } else {
                head(&mut stream, 403, 0, "");
            }
        }
    }
}

/// Returns the request path and lowercase-named headers.
fn parse_request(request: &str) -> (&str, HashMap<String, String>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let headers = lines
        .map(str::trim)
        .take_while(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    (path, headers)
}
