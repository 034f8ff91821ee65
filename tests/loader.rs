use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use laqp_site::catalog::parse_pages_json;
use laqp_site::fetch::{fetch_first_ok, http_client};
use laqp_site::render::{placeholder_entries, render_featured, split_featured};

const CANDIDATES: &[&str] = &[
    "data/pages.json",
    "../data/pages.json",
    "../../data/pages.json",
];

/// One-thread HTTP server answering each connection through `route`
/// (request path without query -> (status line, body)). Records the raw
/// request targets, query string included, in order.
fn spawn_server(
    route: impl Fn(&str) -> (&'static str, String) + Send + 'static,
) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("server addr");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_writer = Arc::clone(&seen);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let Some(target) = read_request_target(&stream) else {
                continue;
            };
            seen_writer.lock().expect("seen lock").push(target.clone());
            let bare = target.split('?').next().unwrap_or(&target);
            let (status, body) = route(bare);
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    (format!("http://{addr}"), seen)
}

fn read_request_target(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let target = request_line.split_whitespace().nth(1)?.to_string();
    // Drain the headers so the client sees a clean response.
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 || line == "\r\n" {
            break;
        }
    }
    Some(target)
}

#[test]
fn loader_reports_last_candidate_when_everything_fails() {
    let (base, seen) = spawn_server(|_| ("404 Not Found", "no".to_string()));
    let client = http_client().expect("client");

    let err = fetch_first_ok(client, &base, CANDIDATES).expect_err("all candidates 404");
    let message = format!("{err:#}");
    assert!(
        message.contains("../../data/pages.json"),
        "error should name the last attempted path: {message}"
    );

    // Every candidate was actually tried.
    assert_eq!(seen.lock().expect("seen lock").len(), 3);

    // The renderer never shows an empty page: the fixed demo set takes
    // over when the index cannot be loaded.
    let entries = placeholder_entries();
    let sections = split_featured(&entries);
    let html = render_featured(&sections.featured);
    assert_eq!(html.matches("<article class=\"card\">").count(), 3);
}

#[test]
fn loader_falls_through_to_the_first_working_candidate() {
    // Serving from a nested page: "data/..." misses, "../data/..." hits.
    // (The client normalizes dot segments, so the server sees the resolved
    // paths.)
    let body = r#"{"pages": [{"title": "Ligas", "href": "ligas.html"}]}"#;
    let (base, seen) = spawn_server(move |path| {
        if path == "/pages/data/pages.json" {
            ("200 OK", body.to_string())
        } else {
            ("404 Not Found", "no".to_string())
        }
    });
    let client = http_client().expect("client");

    let nested_base = format!("{base}/pages/equipo");
    let raw = fetch_first_ok(client, &nested_base, CANDIDATES).expect("second candidate works");
    let entries = parse_pages_json(&raw).expect("served body parses");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Ligas");

    let seen = seen.lock().expect("seen lock");
    let bare: Vec<&str> = seen
        .iter()
        .map(|t| t.split('?').next().unwrap_or(t))
        .collect();
    assert_eq!(
        bare,
        ["/pages/equipo/data/pages.json", "/pages/data/pages.json"]
    );
}

#[test]
fn cache_busting_stamp_is_appended() {
    let (base, seen) = spawn_server(|_| ("200 OK", "[]".to_string()));
    let client = http_client().expect("client");

    fetch_first_ok(client, &base, &["data/ligas.json"]).expect("fetch");

    let seen = seen.lock().expect("seen lock");
    assert_eq!(seen.len(), 1);
    assert!(
        seen[0].starts_with("/data/ligas.json?v="),
        "expected a cache-busting stamp, got {}",
        seen[0]
    );
}
