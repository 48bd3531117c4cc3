use crate::config::Config;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Outcome of one upstream GET, classified once at the adapter boundary.
/// Status bands are decided here; body interpretation is left to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamOutcome {
    Success { status: StatusCode, body: String },
    ClientError { status: StatusCode, body: String },
    ServerError { status: StatusCode, body: String },
    Timeout,
    Transport(String),
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(&cfg.user_agent) {
        default_headers.insert(USER_AGENT, ua);
    }
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
}

fn auth_header(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token)).ok()
}

fn outcome_for_status(status: StatusCode, body: String) -> UpstreamOutcome {
    if status.is_success() {
        UpstreamOutcome::Success { status, body }
    } else if status.is_server_error() {
        UpstreamOutcome::ServerError { status, body }
    } else if status.is_client_error() {
        UpstreamOutcome::ClientError { status, body }
    } else {
        // 1xx/3xx after redirect handling; callers still get status and body.
        UpstreamOutcome::ClientError { status, body }
    }
}

/// Issue a single GET against `{api_url}{path}`. Exactly one network call;
/// no retries. The Authorization header is attached only when a token is
/// configured.
pub async fn get(client: &Client, cfg: &Config, path: &str) -> UpstreamOutcome {
    let url = format!("{}{}", cfg.api_url, path);
    let mut req = client
        .get(&url)
        .header("X-GitHub-Api-Version", &cfg.api_version)
        .header(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
    if let Some(header) = cfg.token.as_deref().and_then(auth_header) {
        req = req.header(AUTHORIZATION, header);
    }

    let res = match req.send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => {
            warn!("GET {} timed out after {}s", url, cfg.timeout_secs);
            return UpstreamOutcome::Timeout;
        }
        Err(e) => {
            warn!("GET {} transport error: {}", url, e);
            return UpstreamOutcome::Transport(e.to_string());
        }
    };

    let status = res.status();
    let body = match res.text().await {
        Ok(t) => t,
        Err(e) if e.is_timeout() => {
            warn!("GET {} timed out reading body", url);
            return UpstreamOutcome::Timeout;
        }
        Err(e) => {
            warn!("GET {} failed reading body: {}", url, e);
            return UpstreamOutcome::Transport(e.to_string());
        }
    };
    outcome_for_status(status, body)
}

/// Percent-encode a single URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
