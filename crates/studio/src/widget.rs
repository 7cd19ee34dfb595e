//! The batch upload widget.
//!
//! Per file, in selection order: convert if HEIC, upload, build a gallery
//! entry. Only when every file has been uploaded are the entries appended to
//! the document, in one mutation. A failure stops the batch; assets uploaded
//! before it stay in the store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::collab::{AssetStore, DocumentPatcher, StoreError};
use crate::file::{FileSelection, SelectedFile};
use crate::gallery::{new_key, GalleryItem};
use crate::heic::{maybe_convert_heic, ConvertError, HeicConverter};

/// How long a final status message stays visible.
pub const STATUS_CLEAR_DELAY: Duration = Duration::from_millis(2500);

/// Default gallery field on post documents.
pub const DEFAULT_GALLERY_FIELD: &str = "gallery";

#[derive(Debug)]
pub enum UploadError {
    /// A batch is already in flight on this widget.
    Busy,
    Convert { file: String, source: ConvertError },
    Upload { file: String, source: StoreError },
    Patch(StoreError),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Busy => write!(f, "an upload is already in progress"),
            UploadError::Convert { file, source } => {
                write!(f, "could not convert {file}: {source}")
            }
            UploadError::Upload { file, source } => write!(f, "could not upload {file}: {source}"),
            UploadError::Patch(source) => write!(f, "could not update the gallery: {source}"),
        }
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UploadError::Busy => None,
            UploadError::Convert { source, .. } => Some(source),
            UploadError::Upload { source, .. } => Some(source),
            UploadError::Patch(source) => Some(source),
        }
    }
}

/// "1 photo", "3 photos".
///
/// Status lines use the singular for one file, so a single upload reads
/// "Preparing 1 photo…" and "Uploaded 1 photo." rather than "1 photos".
pub fn photo_count(n: usize) -> String {
    if n == 1 {
        "1 photo".to_string()
    } else {
        format!("{n} photos")
    }
}

/// Status line shown next to the upload trigger.
///
/// Every change is also broadcast; `None` means the line was cleared.
struct StatusLine {
    text: Mutex<(Option<String>, u64)>,
    events: broadcast::Sender<Option<String>>,
}

impl StatusLine {
    fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            text: Mutex::new((None, 0)),
            events,
        }
    }

    /// Sets the text and returns its generation.
    fn set(&self, text: String) -> u64 {
        let generation = {
            let mut guard = self.text.lock();
            guard.0 = Some(text.clone());
            guard.1 += 1;
            guard.1
        };
        let _ = self.events.send(Some(text));
        generation
    }

    /// Clears the text unless it changed since `generation`.
    fn clear_if_current(&self, generation: u64) {
        {
            let mut guard = self.text.lock();
            if guard.1 != generation {
                return;
            }
            guard.0 = None;
        }
        let _ = self.events.send(None);
    }

    fn get(&self) -> Option<String> {
        self.text.lock().0.clone()
    }
}

/// Resets the in-flight flag however the batch ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Photo upload control bound to one array field of one document.
pub struct UploadWidget {
    document_id: String,
    field: String,
    assets: Arc<dyn AssetStore>,
    patcher: Arc<dyn DocumentPatcher>,
    converter: Arc<dyn HeicConverter>,
    status: Arc<StatusLine>,
    in_flight: AtomicBool,
    clear_delay: Duration,
}

impl UploadWidget {
    pub fn new(
        document_id: impl Into<String>,
        field: impl Into<String>,
        assets: Arc<dyn AssetStore>,
        patcher: Arc<dyn DocumentPatcher>,
        converter: Arc<dyn HeicConverter>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            field: field.into(),
            assets,
            patcher,
            converter,
            status: Arc::new(StatusLine::new()),
            in_flight: AtomicBool::new(false),
            clear_delay: STATUS_CLEAR_DELAY,
        }
    }

    pub fn with_clear_delay(mut self, delay: Duration) -> Self {
        self.clear_delay = delay;
        self
    }

    /// Current status text, if any.
    pub fn status(&self) -> Option<String> {
        self.status.get()
    }

    /// Stream of status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Option<String>> {
        self.status.events.subscribe()
    }

    /// `false` while a batch is in flight.
    pub fn trigger_enabled(&self) -> bool {
        !self.in_flight.load(Ordering::SeqCst)
    }

    /// Uploads the selected files and appends them to the gallery.
    ///
    /// The selection is always consumed. An empty selection does nothing and
    /// returns no entries. On success the appended entries are returned in
    /// selection order.
    pub async fn upload_batch(
        &self,
        selection: &mut FileSelection,
    ) -> Result<Vec<GalleryItem>, UploadError> {
        let files = selection.take();
        if files.is_empty() {
            return Ok(Vec::new());
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(UploadError::Busy);
        }
        let _in_flight = InFlight(&self.in_flight);

        let total = files.len();
        self.status.set(format!("Preparing {}…", photo_count(total)));

        let result = self.run(files).await;
        let generation = match &result {
            Ok(items) => {
                info!(
                    document = %self.document_id,
                    field = %self.field,
                    count = items.len(),
                    "gallery upload finished"
                );
                self.status.set(format!("Uploaded {}.", photo_count(items.len())))
            }
            Err(err) => {
                error!(document = %self.document_id, "gallery upload failed: {err}");
                self.status.set(format!("Upload failed: {err}"))
            }
        };
        self.schedule_clear(generation);
        result
    }

    async fn run(&self, files: Vec<SelectedFile>) -> Result<Vec<GalleryItem>, UploadError> {
        let total = files.len();
        let mut keys = HashSet::with_capacity(total);
        let mut items = Vec::with_capacity(total);

        for (i, file) in files.into_iter().enumerate() {
            self.status.set(format!("Uploading {}/{total}…", i + 1));

            let original = file.name.clone();
            let file = maybe_convert_heic(file, self.converter.as_ref())
                .await
                .map_err(|source| UploadError::Convert {
                    file: original.clone(),
                    source,
                })?;
            let asset = self
                .assets
                .upload_image(file)
                .await
                .map_err(|source| UploadError::Upload {
                    file: original,
                    source,
                })?;

            let mut key = new_key();
            while !keys.insert(key.clone()) {
                key = new_key();
            }
            items.push(GalleryItem::image(key, &asset));
        }

        self.patcher
            .append_items(&self.document_id, &self.field, &items)
            .await
            .map_err(UploadError::Patch)?;
        Ok(items)
    }

    fn schedule_clear(&self, generation: u64) {
        let status = self.status.clone();
        let delay = self.clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            status.clear_if_current(generation);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::{photo_count, UploadError, UploadWidget};
    use crate::collab::{AssetId, AssetStore, BoxFuture, DocumentPatcher, StoreError};
    use crate::file::{FileSelection, SelectedFile};
    use crate::gallery::GalleryItem;
    use crate::heic::{ConvertError, HeicConverter};

    #[derive(Default)]
    struct StubLake {
        uploads: Mutex<Vec<(String, String)>>,
        patches: Mutex<Vec<(String, String, Vec<GalleryItem>)>>,
        fail_upload_named: Option<String>,
        fail_patch: bool,
        gate: Option<tokio::sync::Notify>,
    }

    impl AssetStore for StubLake {
        fn upload_image(&self, file: SelectedFile) -> BoxFuture<'_, Result<AssetId, StoreError>> {
            Box::pin(async move {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                if self.fail_upload_named.as_deref() == Some(file.name.as_str()) {
                    return Err(StoreError::new("connection reset"));
                }
                let mut uploads = self.uploads.lock();
                uploads.push((file.name.clone(), file.mime.clone()));
                Ok(AssetId(format!("image-{}", uploads.len())))
            })
        }
    }

    impl DocumentPatcher for StubLake {
        fn append_items<'a>(
            &'a self,
            document_id: &'a str,
            field: &'a str,
            items: &'a [GalleryItem],
        ) -> BoxFuture<'a, Result<(), StoreError>> {
            Box::pin(async move {
                if self.fail_patch {
                    return Err(StoreError::new("revision mismatch"));
                }
                self.patches
                    .lock()
                    .push((document_id.to_string(), field.to_string(), items.to_vec()));
                Ok(())
            })
        }
    }

    struct Converter {
        fail: bool,
    }

    impl HeicConverter for Converter {
        fn to_jpeg<'a>(
            &'a self,
            _heic: &'a [u8],
            _quality: f32,
        ) -> BoxFuture<'a, Result<Bytes, ConvertError>> {
            Box::pin(async move {
                if self.fail {
                    Err(ConvertError::Converter("corrupt image".to_string()))
                } else {
                    Ok(Bytes::from_static(b"jpeg"))
                }
            })
        }
    }

    fn widget(lake: Arc<StubLake>, converter_fails: bool) -> UploadWidget {
        UploadWidget::new(
            "post-1",
            "gallery",
            lake.clone(),
            lake,
            Arc::new(Converter {
                fail: converter_fails,
            }),
        )
    }

    fn selection(names: &[&str]) -> FileSelection {
        names
            .iter()
            .map(|n| SelectedFile::new(*n, "", b"data".to_vec()))
            .collect::<Vec<_>>()
            .into()
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<Option<String>>) -> Vec<Option<String>> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(v) => out.push(v),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => continue,
            }
        }
    }

    #[tokio::test]
    async fn appends_one_entry_per_file_in_order() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake.clone(), false);
        let mut rx = w.subscribe();
        let mut files = selection(&["a.jpg", "b.HEIC", "c.png"]);

        let items = w.upload_batch(&mut files).await.expect("upload");
        assert!(files.is_empty());
        assert_eq!(items.len(), 3);

        let uploads = lake.uploads.lock().clone();
        assert_eq!(
            uploads,
            vec![
                ("a.jpg".to_string(), "".to_string()),
                ("b.jpg".to_string(), "image/jpeg".to_string()),
                ("c.png".to_string(), "".to_string()),
            ]
        );

        let patches = lake.patches.lock().clone();
        assert_eq!(patches.len(), 1);
        let (doc, field, appended) = &patches[0];
        assert_eq!(doc, "post-1");
        assert_eq!(field, "gallery");
        assert_eq!(appended, &items);

        let keys: HashSet<_> = items.iter().map(|i| i.key.clone()).collect();
        assert_eq!(keys.len(), 3);
        let refs: Vec<_> = items.iter().map(|i| i.asset.target.as_str()).collect();
        assert_eq!(refs, vec!["image-1", "image-2", "image-3"]);
        assert!(items.iter().all(|i| i.kind == "image" && i.asset.kind == "reference"));

        assert_eq!(
            drain(&mut rx),
            vec![
                Some("Preparing 3 photos…".to_string()),
                Some("Uploading 1/3…".to_string()),
                Some("Uploading 2/3…".to_string()),
                Some("Uploading 3/3…".to_string()),
                Some("Uploaded 3 photos.".to_string()),
            ]
        );
        assert!(w.trigger_enabled());
    }

    #[tokio::test]
    async fn empty_selection_is_a_no_op() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake.clone(), false);
        let mut rx = w.subscribe();

        let items = w.upload_batch(&mut FileSelection::default()).await.expect("no-op");
        assert!(items.is_empty());
        assert!(w.status().is_none());
        assert!(drain(&mut rx).is_empty());
        assert!(lake.uploads.lock().is_empty());
        assert!(lake.patches.lock().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_aborts_without_patch() {
        let lake = Arc::new(StubLake {
            fail_upload_named: Some("b.jpg".to_string()),
            ..Default::default()
        });
        let w = widget(lake.clone(), false);
        let mut files = selection(&["a.jpg", "b.jpg", "c.jpg"]);

        let err = w.upload_batch(&mut files).await.unwrap_err();
        assert!(matches!(err, UploadError::Upload { ref file, .. } if file == "b.jpg"));
        assert!(files.is_empty());
        // The first asset stays uploaded; nothing reaches the document.
        assert_eq!(lake.uploads.lock().len(), 1);
        assert!(lake.patches.lock().is_empty());
        let status = w.status().expect("status");
        assert!(status.starts_with("Upload failed:"), "{status}");
        assert!(w.trigger_enabled());
    }

    #[tokio::test]
    async fn conversion_failure_fails_the_batch() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake.clone(), true);
        let mut files = selection(&["a.jpg", "b.heif"]);

        let err = w.upload_batch(&mut files).await.unwrap_err();
        assert!(matches!(err, UploadError::Convert { ref file, .. } if file == "b.heif"));
        assert_eq!(lake.uploads.lock().len(), 1);
        assert!(lake.patches.lock().is_empty());
    }

    #[tokio::test]
    async fn patch_failure_is_reported() {
        let lake = Arc::new(StubLake {
            fail_patch: true,
            ..Default::default()
        });
        let w = widget(lake.clone(), false);
        let err = w.upload_batch(&mut selection(&["a.jpg"])).await.unwrap_err();
        assert!(matches!(err, UploadError::Patch(_)));
        assert_eq!(lake.uploads.lock().len(), 1);
    }

    #[tokio::test]
    async fn single_file_status_uses_singular() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake, false);
        let mut rx = w.subscribe();
        w.upload_batch(&mut selection(&["a.jpg"])).await.expect("upload");
        assert_eq!(
            drain(&mut rx),
            vec![
                Some("Preparing 1 photo…".to_string()),
                Some("Uploading 1/1…".to_string()),
                Some("Uploaded 1 photo.".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn status_clears_after_delay() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake, false);
        w.upload_batch(&mut selection(&["a.jpg"])).await.expect("upload");
        assert_eq!(w.status().as_deref(), Some("Uploaded 1 photo."));

        tokio::time::sleep(Duration::from_millis(2400)).await;
        assert!(w.status().is_some());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(w.status().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_status_survives_stale_clear() {
        let lake = Arc::new(StubLake::default());
        let w = widget(lake, false);
        w.upload_batch(&mut selection(&["a.jpg"])).await.expect("first");
        tokio::time::sleep(Duration::from_millis(2000)).await;
        w.upload_batch(&mut selection(&["b.jpg", "c.jpg"]))
            .await
            .expect("second");

        // First batch's timer fires here but must not wipe the second message.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(w.status().as_deref(), Some("Uploaded 2 photos."));
    }

    #[tokio::test]
    async fn second_batch_is_rejected_while_in_flight() {
        let lake = Arc::new(StubLake {
            gate: Some(tokio::sync::Notify::new()),
            ..Default::default()
        });
        let w = Arc::new(widget(lake.clone(), false));

        let first = {
            let w = w.clone();
            tokio::spawn(async move { w.upload_batch(&mut selection(&["a.jpg"])).await })
        };
        while w.trigger_enabled() {
            tokio::task::yield_now().await;
        }

        let mut second = selection(&["b.jpg"]);
        let err = w.upload_batch(&mut second).await.unwrap_err();
        assert!(matches!(err, UploadError::Busy));
        assert!(second.is_empty());

        if let Some(gate) = &lake.gate {
            gate.notify_one();
        }
        let items = first.await.expect("join").expect("first batch");
        assert_eq!(items.len(), 1);
        assert!(w.trigger_enabled());
    }

    #[test]
    fn pluralizes() {
        assert_eq!(photo_count(1), "1 photo");
        assert_eq!(photo_count(0), "0 photos");
        assert_eq!(photo_count(12), "12 photos");
    }
}
