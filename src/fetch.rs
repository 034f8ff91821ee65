//! HTTP plumbing for the catalog loader: one shared blocking client and the
//! candidate-path fallback the static hosting layout requires (the same
//! documents are reachable from the site root, a nested page, or a
//! parent-relative path, and the right depth is unknowable statically).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Fetch the first candidate path that answers with a success status and a
/// readable body. Every candidate gets a cache-busting `v` query parameter
/// so intermediate caches never serve a stale catalog. Fails only when all
/// candidates fail; the error names the last attempted URL and its cause.
pub fn fetch_first_ok(client: &Client, base: &str, candidates: &[&str]) -> Result<String> {
    if candidates.is_empty() {
        return Err(anyhow!("no candidate paths given"));
    }
    let stamp = cache_bust_stamp();
    let mut last_url = String::new();
    let mut last_err: Option<anyhow::Error> = None;
    for rel in candidates {
        let url = join_url(base, rel, stamp);
        match fetch_text(client, &url) {
            Ok(body) => return Ok(body),
            Err(err) => {
                last_url = url;
                last_err = Some(err);
            }
        }
    }
    let cause = last_err.expect("at least one candidate was attempted");
    Err(cause.context(format!("all candidate paths failed, last was {last_url}")))
}

fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .with_context(|| format!("request to {url} failed"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("http {status} from {url}"));
    }
    resp.text().context("failed reading body")
}

fn join_url(base: &str, rel: &str, stamp: u64) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    format!("{base}/{rel}?v={stamp}")
}

fn cache_bust_stamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
