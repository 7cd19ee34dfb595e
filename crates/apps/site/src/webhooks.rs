//! Revalidation webhook.
//!
//! The CMS calls this after a document is published. The caller proves itself
//! with a shared secret, sent either in the `x-revalidate-secret` header or as
//! the `secret` query parameter. Cached renders of the home listing and of the
//! changed post are evicted.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-revalidate-secret";

/// Home listing, always revalidated.
pub const HOME_PAGE: &str = "/";

#[derive(Debug, Default, Deserialize)]
pub struct SecretQuery {
    pub secret: Option<String>,
}

/// Slug as sent by the CMS: either `{"current": "..."}` or a bare string.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Slug {
    Current { current: String },
    Plain(String),
}

impl Slug {
    pub fn as_str(&self) -> &str {
        match self {
            Slug::Current { current } => current,
            Slug::Plain(s) => s,
        }
    }
}

/// The changed document, as far as revalidation cares.
#[derive(Debug, Default, Deserialize)]
pub struct ChangedDocument {
    #[serde(rename = "_type")]
    pub doc_type: Option<String>,
    pub slug: Option<Slug>,
}

impl ChangedDocument {
    /// Site pages showing this document.
    pub fn paths(&self) -> Vec<String> {
        let mut paths = vec![HOME_PAGE.to_string()];
        let slug = self.slug.as_ref().map(Slug::as_str).map(str::trim);
        if let Some(slug) = slug.filter(|s| !s.is_empty()) {
            paths.push(format!("/posts/{slug}"));
        }
        paths
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub paths: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub now: u64,
}

#[derive(Debug)]
pub enum RevalidateError {
    Unauthorized,
}

impl std::fmt::Display for RevalidateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Invalid secret"),
        }
    }
}

impl std::error::Error for RevalidateError {}

impl IntoResponse for RevalidateError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Rejects everything when no secret is configured.
fn check_secret(expected: Option<&str>, headers: &HeaderMap, query: &SecretQuery) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query.secret.as_deref());
    provided == Some(expected)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub async fn revalidate(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RevalidateResponse>, RevalidateError> {
    if !check_secret(state.revalidate_secret.as_deref(), &headers, &query) {
        warn!("revalidation rejected: bad secret");
        return Err(RevalidateError::Unauthorized);
    }

    // An unreadable payload still revalidates the home listing.
    let document = if body.iter().all(u8::is_ascii_whitespace) {
        ChangedDocument::default()
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!("revalidation payload ignored: {e}");
            ChangedDocument::default()
        })
    };

    let paths = document.paths();
    let mut evicted = 0;
    for path in &paths {
        evicted += state.cache.invalidate_page(path);
    }
    debug!(evicted, remaining = state.cache.len(), "page cache entries evicted");
    info!(
        doc_type = document.doc_type.as_deref().unwrap_or("unknown"),
        ?paths,
        "revalidated"
    );

    Ok(Json(RevalidateResponse {
        revalidated: true,
        paths,
        now: now_ms(),
    }))
}
