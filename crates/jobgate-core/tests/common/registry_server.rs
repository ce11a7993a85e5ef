//! Minimal HTTP/1.1 registry facade for integration tests.
//!
//! Serves the registry endpoints over an [`InMemoryRegistry`]:
//! `GET|PUT /services/job/{id}.json`, `GET /services/count`,
//! `GET /services/ownload` and `GET /services/maxload`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use jobgate_core::job::{self, JobStatus};
use jobgate_core::registry::{InMemoryRegistry, JobRegistry, RegistryError};

#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryServerOptions {
    /// Answer the first `n` requests with 503 (exercises client retries).
    pub fail_first: usize,
    /// Answer PUT with 204 and no body instead of the updated job.
    pub put_no_content: bool,
    /// Apply the first PUT but answer it with 503, as if the reply was lost.
    pub lose_first_put_reply: bool,
}

/// Starts the facade in a background thread. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/services"). The server runs until the process exits.
pub fn start(registry: Arc<InMemoryRegistry>) -> String {
    start_with_options(registry, RegistryServerOptions::default())
}

pub fn start_with_options(registry: Arc<InMemoryRegistry>, opts: RegistryServerOptions) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let seen = Arc::new(AtomicUsize::new(0));
    let puts = Arc::new(AtomicUsize::new(0));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let registry = Arc::clone(&registry);
            let seen = Arc::clone(&seen);
            let puts = Arc::clone(&puts);
            thread::spawn(move || {
                let n = seen.fetch_add(1, Ordering::SeqCst);
                handle(stream, &registry, opts, n < opts.fail_first, &puts)
            });
        }
    });
    format!("http://127.0.0.1:{}/services", port)
}

struct Request {
    method: String,
    target: String,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut expect_continue = false;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).ok()? == 0 {
            break;
        }
        let header = header.trim();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            let name = name.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("expect") {
                expect_continue = value.trim().eq_ignore_ascii_case("100-continue");
            }
        }
    }
    if expect_continue {
        stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").ok()?;
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;
    Some(Request {
        method,
        target,
        body: String::from_utf8(body).ok()?,
    })
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn handle(
    mut stream: TcpStream,
    registry: &InMemoryRegistry,
    opts: RegistryServerOptions,
    fail: bool,
    puts: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    if fail {
        respond(&mut stream, "503 Service Unavailable", "");
        return;
    }

    let url = match url::Url::parse(&format!("http://registry{}", req.target)) {
        Ok(u) => u,
        Err(_) => return respond(&mut stream, "400 Bad Request", ""),
    };
    let query = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    };
    let path = url.path().trim_start_matches("/services/");

    let (status, body) = match (req.method.as_str(), path) {
        ("GET", "count") => match query("status").parse::<JobStatus>() {
            Ok(status) => match registry.count(&query("serviceType"), status) {
                Ok(n) => ("200 OK", n.to_string()),
                Err(e) => error_response(e),
            },
            Err(e) => ("400 Bad Request", e.to_string()),
        },
        ("GET", "ownload") => match registry.max_load_on_node(&query("host")) {
            Ok(load) => ("200 OK", load.current_load.to_string()),
            Err(e) => error_response(e),
        },
        ("GET", "maxload") => match registry.max_load_on_node(&query("host")) {
            Ok(load) => ("200 OK", serde_json::to_string(&load).unwrap()),
            Err(e) => error_response(e),
        },
        (method, p) if p.starts_with("job/") && p.ends_with(".json") => {
            let id = match p["job/".len()..p.len() - ".json".len()].parse::<i64>() {
                Ok(id) => id,
                Err(_) => return respond(&mut stream, "400 Bad Request", ""),
            };
            match method {
                "GET" => match registry.get_job(id) {
                    Ok(j) => ("200 OK", job::to_json(&j).unwrap()),
                    Err(e) => error_response(e),
                },
                "PUT" => match job::parse_job(&req.body).map_err(RegistryError::from) {
                    Ok(j) => match registry.update_job(&j) {
                        Ok(_) if opts.lose_first_put_reply && puts.fetch_add(1, Ordering::SeqCst) == 0 => {
                            ("503 Service Unavailable", String::new())
                        }
                        Ok(_) if opts.put_no_content => ("204 No Content", String::new()),
                        Ok(updated) => ("200 OK", job::to_json(&updated).unwrap()),
                        Err(e) => error_response(e),
                    },
                    Err(e) => ("400 Bad Request", e.to_string()),
                },
                _ => ("405 Method Not Allowed", String::new()),
            }
        }
        _ => ("404 Not Found", String::new()),
    };
    respond(&mut stream, status, &body);
}

fn error_response(e: RegistryError) -> (&'static str, String) {
    match e {
        RegistryError::NotFound(_) | RegistryError::HostNotFound(_) => ("404 Not Found", e.to_string()),
        RegistryError::Conflict { reason, .. } => ("409 Conflict", reason),
        other => ("500 Internal Server Error", other.to_string()),
    }
}
