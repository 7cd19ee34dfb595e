use std::path::PathBuf;

use formats::{CountryShape, decode_world};
use tracing::{info, warn};

/// Where the static world-geometry document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldSource {
    Path(PathBuf),
    Url(String),
}

impl WorldSource {
    /// `http(s)://` locations are fetched, anything else is read from disk.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            WorldSource::Url(location.to_string())
        } else {
            WorldSource::Path(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for WorldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorldSource::Path(p) => write!(f, "{}", p.display()),
            WorldSource::Url(u) => write!(f, "{u}"),
        }
    }
}

/// Loads and decodes the world dataset.
///
/// Any failure is logged and yields an empty shape list: the globe still
/// renders, just without countries. There is no retry.
pub async fn load_world(source: &WorldSource, http: &reqwest::Client) -> Vec<CountryShape> {
    let payload = match fetch(source, http).await {
        Ok(p) => p,
        Err(err) => {
            warn!("world dataset {source} unavailable: {err}");
            return Vec::new();
        }
    };
    match decode_world(&payload) {
        Ok(shapes) => {
            info!(count = shapes.len(), "loaded world dataset from {source}");
            shapes
        }
        Err(err) => {
            warn!("world dataset {source} could not be decoded: {err}");
            Vec::new()
        }
    }
}

async fn fetch(source: &WorldSource, http: &reqwest::Client) -> Result<String, String> {
    match source {
        WorldSource::Path(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("read {}: {e}", path.display())),
        WorldSource::Url(url) => {
            let resp = http
                .get(url)
                .send()
                .await
                .map_err(|e| format!("request failed: {e}"))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(format!("HTTP {status}"));
            }
            resp.text().await.map_err(|e| format!("read body: {e}"))
        }
    }
}
