//! HTTP client for the CMS content lake (assets + document mutations).

use std::env;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::collab::{AssetId, AssetStore, BoxFuture, DocumentPatcher, StoreError};
use crate::file::SelectedFile;
use crate::gallery::GalleryItem;

pub const DEFAULT_API_VERSION: &str = "2024-01-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLakeConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Write token; requests go out unauthenticated when absent.
    pub token: Option<String>,
    /// Overrides `https://{project_id}.api.sanity.io`.
    pub api_host: Option<String>,
}

impl ContentLakeConfig {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            api_host: None,
        }
    }

    /// Reads `SANITY_PROJECT_ID`, `SANITY_DATASET`, `SANITY_API_VERSION`,
    /// `SANITY_TOKEN` and `SANITY_API_HOST`.
    pub fn from_env() -> Result<Self, String> {
        let project_id = env::var("SANITY_PROJECT_ID")
            .map_err(|_| "SANITY_PROJECT_ID is not set".to_string())?;
        let dataset = env::var("SANITY_DATASET").unwrap_or_else(|_| "production".to_string());
        let mut cfg = Self::new(project_id, dataset);
        if let Ok(v) = env::var("SANITY_API_VERSION") {
            cfg.api_version = v;
        }
        cfg.token = env::var("SANITY_TOKEN").ok().filter(|t| !t.is_empty());
        cfg.api_host = env::var("SANITY_API_HOST").ok().filter(|h| !h.is_empty());
        Ok(cfg)
    }

    pub fn base_url(&self) -> String {
        let host = self
            .api_host
            .clone()
            .unwrap_or_else(|| format!("https://{}.api.sanity.io", self.project_id));
        format!(
            "{}/v{}",
            host.trim_end_matches('/'),
            self.api_version.trim_start_matches('v')
        )
    }

    pub fn image_upload_url(&self) -> String {
        format!("{}/assets/images/{}", self.base_url(), self.dataset)
    }

    pub fn mutate_url(&self) -> String {
        format!("{}/data/mutate/{}", self.base_url(), self.dataset)
    }
}

/// Mutation appending `items` to the end of array `field`, creating it first
/// when missing.
pub fn append_mutation(document_id: &str, field: &str, items: &[GalleryItem]) -> Value {
    json!({
        "mutations": [{
            "patch": {
                "id": document_id,
                "setIfMissing": { field: [] },
                "insert": {
                    "after": format!("{field}[-1]"),
                    "items": items,
                }
            }
        }]
    })
}

#[derive(Debug, Deserialize)]
struct AssetUploadResponse {
    document: AssetDocument,
}

#[derive(Debug, Deserialize)]
struct AssetDocument {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Clone)]
pub struct ContentLakeClient {
    config: ContentLakeConfig,
    http: reqwest::Client,
}

impl ContentLakeClient {
    pub fn new(config: ContentLakeConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ContentLakeConfig {
        &self.config
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn upload(&self, file: SelectedFile) -> Result<AssetId, StoreError> {
        let mime = if file.mime.is_empty() {
            "application/octet-stream".to_string()
        } else {
            file.mime.clone()
        };
        let req = self
            .http
            .post(self.config.image_upload_url())
            .query(&[("filename", file.name.as_str())])
            .header(CONTENT_TYPE, mime)
            .body(file.bytes.clone());

        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::with_source(format!("upload {} failed", file.name), e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::new(format!(
                "upload {} rejected: HTTP {status} {body}",
                file.name
            )));
        }
        let parsed: AssetUploadResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::with_source("invalid asset upload response", e))?;
        debug!(file = %file.name, asset = %parsed.document.id, "uploaded asset");
        Ok(AssetId(parsed.document.id))
    }

    async fn mutate(&self, body: Value) -> Result<(), StoreError> {
        let req = self.http.post(self.config.mutate_url()).json(&body);
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::with_source("mutation request failed", e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::new(format!(
                "mutation rejected: HTTP {status} {body}"
            )));
        }
        Ok(())
    }
}

impl AssetStore for ContentLakeClient {
    fn upload_image(&self, file: SelectedFile) -> BoxFuture<'_, Result<AssetId, StoreError>> {
        Box::pin(self.upload(file))
    }
}

impl DocumentPatcher for ContentLakeClient {
    fn append_items<'a>(
        &'a self,
        document_id: &'a str,
        field: &'a str,
        items: &'a [GalleryItem],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.mutate(append_mutation(document_id, field, items)))
    }
}
