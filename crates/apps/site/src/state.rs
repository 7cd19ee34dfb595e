use std::sync::Arc;

use dashmap::DashMap;
use formats::CountryShape;
use globe::GlobeView;
use studio::{AssetStore, DocumentPatcher, HeicConverter, UploadWidget, DEFAULT_GALLERY_FIELD};

use crate::cache::PageCache;

/// Backends used by gallery uploads.
#[derive(Clone)]
pub struct UploadBackends {
    pub assets: Arc<dyn AssetStore>,
    pub patcher: Arc<dyn DocumentPatcher>,
    pub converter: Arc<dyn HeicConverter>,
}

#[derive(Clone)]
pub struct AppState {
    /// World dataset, loaded once at startup; empty when it failed to load.
    pub world: Arc<Vec<CountryShape>>,
    pub live_globe: GlobeView,
    pub cache: Arc<PageCache>,
    pub revalidate_secret: Option<String>,
    pub uploads: Option<UploadBackends>,
    widgets: Arc<DashMap<String, Arc<UploadWidget>>>,
}

impl AppState {
    pub fn new(
        world: Vec<CountryShape>,
        live_globe: GlobeView,
        revalidate_secret: Option<String>,
        uploads: Option<UploadBackends>,
    ) -> Self {
        Self {
            world: Arc::new(world),
            live_globe,
            cache: Arc::new(PageCache::default()),
            revalidate_secret,
            uploads,
            widgets: Arc::new(DashMap::new()),
        }
    }

    pub fn with_cache_capacity(mut self, max_entries: usize) -> Self {
        self.cache = Arc::new(PageCache::with_capacity(max_entries));
        self
    }

    /// Upload widget of a document's gallery, one per document so that
    /// batches on the same gallery never overlap.
    pub fn gallery_widget(&self, document_id: &str) -> Option<Arc<UploadWidget>> {
        let backends = self.uploads.as_ref()?;
        let widget = self
            .widgets
            .entry(document_id.to_string())
            .or_insert_with(|| {
                Arc::new(UploadWidget::new(
                    document_id,
                    DEFAULT_GALLERY_FIELD,
                    backends.assets.clone(),
                    backends.patcher.clone(),
                    backends.converter.clone(),
                ))
            })
            .clone();
        Some(widget)
    }

    /// Forgets a document's widget once no batch holds it. The caller must
    /// drop its own handle first.
    pub fn release_widget(&self, document_id: &str) {
        self.widgets.remove_if(document_id, |_, widget| {
            Arc::strong_count(widget) == 1 && widget.trigger_enabled()
        });
    }

    #[cfg(test)]
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }
}
