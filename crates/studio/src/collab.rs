//! Collaborators of the upload widget.
//!
//! Methods return boxed futures so the traits stay dyn-compatible and can be
//! shared as `Arc<dyn ...>` across tasks.

use std::future::Future;
use std::pin::Pin;

use crate::file::SelectedFile;
use crate::gallery::GalleryItem;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque identifier of an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(pub String);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error from an asset store or document patcher.
#[derive(Debug)]
pub struct StoreError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Stores binary image assets.
pub trait AssetStore: Send + Sync {
    /// Uploads `file` under its display name and returns the new asset's id.
    fn upload_image(&self, file: SelectedFile) -> BoxFuture<'_, Result<AssetId, StoreError>>;
}

/// Applies mutations to content documents.
pub trait DocumentPatcher: Send + Sync {
    /// Appends `items` after the last element of array `field` of document
    /// `document_id`, creating the array when it is missing. One atomic
    /// mutation.
    fn append_items<'a>(
        &'a self,
        document_id: &'a str,
        field: &'a str,
        items: &'a [GalleryItem],
    ) -> BoxFuture<'a, Result<(), StoreError>>;
}
