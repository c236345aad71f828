//! `/api/*path` proxy to the upstream reservation service.
//!
//! Requests keep their path and query string. GETs additionally ask the
//! upstream for JSON. The upstream status and JSON body are passed through;
//! transport failures and non-JSON bodies become `500 {"error": ...}`.

use axum::extract::{Path, RawQuery};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

pub const UPSTREAM_ENV: &str = "FRI_REZERVACIJE_URL";

#[derive(Debug, Error, PartialEq)]
pub enum ProxyConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyConfig {
    upstream: String,
}

impl ProxyConfig {
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ProxyConfigError> {
        std::env::var(UPSTREAM_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(Self::new)
            .ok_or(ProxyConfigError::Missing(UPSTREAM_ENV))
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    /// `<upstream>/<path>/?<query>`, adding `format=json` when asked and not
    /// already present.
    pub fn target(&self, path: &str, query: Option<&str>, want_json: bool) -> String {
        let path = path.trim_matches('/');
        let mut url = if path.is_empty() {
            format!("{}/", self.upstream)
        } else {
            format!("{}/{}/", self.upstream, path)
        };

        let query = query.filter(|q| !q.is_empty());
        let mut params: Vec<&str> = query.into_iter().collect();
        let has_format = query.is_some_and(|q| q.split('&').any(|p| p.starts_with("format=")));
        if want_json && !has_format {
            params.push("format=json");
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

#[derive(Debug, Clone)]
pub struct ProxyState {
    http: reqwest::Client,
    config: ProxyConfig,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

pub async fn proxy_get(
    Extension(state): Extension<ProxyState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let target = state.config.target(&path, query.as_deref(), true);
    tracing::debug!(target = %target, "proxying GET");
    match state.http.get(&target).send().await {
        Ok(upstream) => relay(upstream).await,
        Err(e) => transport_error(e),
    }
}

pub async fn proxy_delete(
    Extension(state): Extension<ProxyState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let target = state.config.target(&path, query.as_deref(), false);
    tracing::info!(target = %target, "proxying DELETE");
    match state.http.delete(&target).send().await {
        Ok(upstream) => relay(upstream).await,
        Err(e) => transport_error(e),
    }
}

async fn relay(upstream: reqwest::Response) -> Response {
    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    match upstream.bytes().await {
        Ok(body) => json_response(status, &body),
        Err(e) => transport_error(e),
    }
}

/// Re-encodes an upstream body. An empty body (a 204 after a delete) is
/// passed through empty.
pub fn json_response(status: StatusCode, body: &[u8]) -> Response {
    if body.iter().all(u8::is_ascii_whitespace) {
        return status.into_response();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => {
            tracing::warn!(status = %status, error = %e, "upstream sent a non-JSON body");
            error_response("Invalid JSON response")
        }
    }
}

fn transport_error(e: reqwest::Error) -> Response {
    tracing::error!(error = %e, "upstream request failed");
    error_response(&e.to_string())
}

fn error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}
