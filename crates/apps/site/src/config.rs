use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use studio::ContentLakeConfig;

use crate::cache::DEFAULT_CACHE_ENTRIES;
use crate::gallery::DEFAULT_GALLERY_MAX_BYTES;

#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub addr: SocketAddr,
    /// Path or URL of the world-geometry document.
    pub world_data: String,
    /// Shared secret of the revalidation webhook; every call is rejected when unset.
    pub revalidate_secret: Option<String>,
    /// Content lake for gallery uploads; uploads are disabled when unset.
    pub content_lake: Option<ContentLakeConfig>,
    pub heif_convert_bin: PathBuf,
    /// Countries highlighted by the live globe.
    pub visited: Vec<String>,
    pub frame_interval_ms: u64,
    /// Largest accepted gallery upload request, in bytes.
    pub gallery_max_bytes: usize,
    /// Rendered pages kept in memory before the least recent is dropped.
    pub page_cache_entries: usize,
}

impl SiteConfig {
    pub fn from_env() -> Result<Self, String> {
        let addr = env::var("SITE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| format!("invalid SITE_ADDR: {e}"))?;

        Ok(Self {
            addr,
            world_data: env::var("WORLD_DATA")
                .unwrap_or_else(|_| "assets/countries-110m.json".to_string()),
            revalidate_secret: env::var("REVALIDATE_SECRET").ok().filter(|s| !s.is_empty()),
            content_lake: ContentLakeConfig::from_env().ok(),
            heif_convert_bin: env::var("HEIF_CONVERT_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("heif-convert")),
            visited: parse_list(&env::var("VISITED_COUNTRIES").unwrap_or_default()),
            frame_interval_ms: env_var_u64("GLOBE_FRAME_MS", 16),
            gallery_max_bytes: env_var_usize("GALLERY_MAX_BYTES", DEFAULT_GALLERY_MAX_BYTES),
            page_cache_entries: env_var_usize("PAGE_CACHE_ENTRIES", DEFAULT_CACHE_ENTRIES).max(1),
        })
    }
}

/// Splits a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::parse_list;

    #[test]
    fn parses_comma_lists() {
        assert_eq!(parse_list(" USA, france ,,Czechia "), vec!["USA", "france", "Czechia"]);
        assert!(parse_list("").is_empty());
    }
}
