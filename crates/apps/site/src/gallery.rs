use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use studio::{FileSelection, GalleryItem, SelectedFile, UploadError, UploadWidget};
use tracing::{debug, warn};

use crate::state::AppState;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Default cap on a gallery request body.
pub const DEFAULT_GALLERY_MAX_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    /// Final status line of the batch.
    pub status: Option<String>,
    pub items: Vec<GalleryItem>,
}

#[derive(Debug)]
pub enum GalleryError {
    /// No content lake configured.
    Unavailable,
    /// Unreadable body; 413 when it exceeds the configured size limit.
    InvalidMultipart {
        status: StatusCode,
        message: String,
    },
    Upload {
        status: Option<String>,
        error: UploadError,
    },
}

impl std::fmt::Display for GalleryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "Uploads are not configured"),
            Self::InvalidMultipart { message, .. } => {
                write!(f, "Invalid multipart body: {message}")
            }
            Self::Upload { error, .. } => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for GalleryError {}

impl From<MultipartError> for GalleryError {
    fn from(err: MultipartError) -> Self {
        Self::InvalidMultipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidMultipart { status, .. } => *status,
            Self::Upload { error, .. } => match error {
                UploadError::Busy => StatusCode::CONFLICT,
                UploadError::Convert { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                UploadError::Upload { .. } | UploadError::Patch(_) => StatusCode::BAD_GATEWAY,
            },
        };
        let line = match &self {
            Self::Upload { status, .. } => status.clone(),
            _ => None,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string(), "status": line })),
        )
            .into_response()
    }
}

/// Reads every file part, in order. Parts without a file name are ignored.
pub async fn read_selection(multipart: &mut Multipart) -> Result<FileSelection, GalleryError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mime = field.content_type().unwrap_or(FALLBACK_MIME).to_string();
        let bytes = field.bytes().await?;
        debug!(file = %name, mime = %mime, size = bytes.len(), "received file part");
        files.push(SelectedFile::new(name, mime, bytes));
    }
    Ok(FileSelection::new(files))
}

pub async fn run_batch(
    widget: &UploadWidget,
    mut selection: FileSelection,
) -> Result<GalleryResponse, GalleryError> {
    match widget.upload_batch(&mut selection).await {
        Ok(items) => Ok(GalleryResponse {
            status: widget.status(),
            items,
        }),
        Err(error) => {
            warn!("gallery upload rejected: {error}");
            Err(GalleryError::Upload {
                status: widget.status(),
                error,
            })
        }
    }
}

pub async fn upload_gallery(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<GalleryResponse>, GalleryError> {
    let widget = state
        .gallery_widget(&document_id)
        .ok_or(GalleryError::Unavailable)?;
    let result = match read_selection(&mut multipart).await {
        Ok(selection) => run_batch(&widget, selection).await,
        Err(err) => Err(err),
    };
    drop(widget);
    state.release_widget(&document_id);
    result.map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart, Path, State};
    use axum::http::{header, Request};
    use axum::response::IntoResponse;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use studio::{FileSelection, SelectedFile};

    use super::{read_selection, run_batch, upload_gallery, GalleryError};
    use crate::state::testing::{upload_state, bare_state, MemoryLake};

    fn multipart_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn reads_file_parts_in_order() {
        let body = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n\r\n",
            "ignored\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"files\"; filename=\"a.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "AAA\r\n",
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"files\"; filename=\"b.png\"\r\n\r\n",
            "BB\r\n",
            "--XYZ--\r\n",
        );
        let mut multipart = Multipart::from_request(multipart_request(body), &())
            .await
            .expect("multipart");

        let mut selection = read_selection(&mut multipart).await.expect("selection");
        let files = selection.take();
        let names: Vec<_> = files.iter().map(|f| (f.name.as_str(), f.mime.as_str())).collect();
        assert_eq!(
            names,
            vec![("a.jpg", "image/jpeg"), ("b.png", "application/octet-stream")]
        );
        assert_eq!(files[0].bytes.as_ref(), b"AAA");
    }

    #[tokio::test]
    async fn batch_appends_once_and_reports_status() {
        let lake = Arc::new(MemoryLake::default());
        let state = upload_state(lake.clone());
        let widget = state.gallery_widget("post-1").expect("configured");
        let selection = FileSelection::new(vec![
            SelectedFile::new("a.jpg", "image/jpeg", Bytes::from_static(b"a")),
            SelectedFile::new("b.jpg", "image/jpeg", Bytes::from_static(b"b")),
        ]);

        let resp = run_batch(&widget, selection).await.expect("uploaded");
        assert_eq!(resp.status.as_deref(), Some("Uploaded 2 photos."));
        assert_eq!(resp.items.len(), 2);
        assert_eq!(*lake.uploads.lock(), vec!["a.jpg".to_string(), "b.jpg".to_string()]);
        assert_eq!(*lake.appended.lock(), resp.items);
    }

    #[tokio::test]
    async fn conversion_failure_is_unprocessable() {
        let lake = Arc::new(MemoryLake::default());
        let state = upload_state(lake.clone());
        let widget = state.gallery_widget("post-1").expect("configured");
        let selection = FileSelection::new(vec![SelectedFile::new(
            "IMG_1.HEIC",
            "image/heic",
            Bytes::from_static(b"h"),
        )]);

        let err = run_batch(&widget, selection).await.expect_err("must fail");
        assert!(matches!(err, GalleryError::Upload { .. }));
        assert_eq!(err.into_response().status(), 422);
        assert!(lake.uploads.lock().is_empty());
        assert!(lake.appended.lock().is_empty());
    }

    #[test]
    fn widgets_are_shared_per_document() {
        let state = upload_state(Arc::new(MemoryLake::default()));
        let a = state.gallery_widget("post-1").expect("configured");
        let b = state.gallery_widget("post-1").expect("configured");
        let c = state.gallery_widget("post-2").expect("configured");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn unconfigured_uploads_are_unavailable() {
        let state = bare_state(None);
        assert!(state.gallery_widget("post-1").is_none());
        assert_eq!(GalleryError::Unavailable.into_response().status(), 503);
    }

    #[tokio::test]
    async fn widget_is_released_after_its_batch() {
        let lake = Arc::new(MemoryLake::default());
        let state = upload_state(lake.clone());
        let body = concat!(
            "--XYZ\r\n",
            "Content-Disposition: form-data; name=\"files\"; filename=\"a.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "AAA\r\n",
            "--XYZ--\r\n",
        );
        for id in ["post-1", "post-2", "post-3"] {
            let multipart = Multipart::from_request(multipart_request(body), &())
                .await
                .expect("multipart");
            let resp = upload_gallery(State(state.clone()), Path(id.to_string()), multipart)
                .await
                .expect("uploaded");
            assert_eq!(resp.0.items.len(), 1);
        }
        assert_eq!(lake.uploads.lock().len(), 3);
        assert_eq!(state.widget_count(), 0);
    }

    #[test]
    fn held_widget_is_not_released() {
        let state = upload_state(Arc::new(MemoryLake::default()));
        let held = state.gallery_widget("post-1").expect("configured");
        state.release_widget("post-1");
        assert_eq!(state.widget_count(), 1);
        drop(held);
        state.release_widget("post-1");
        assert_eq!(state.widget_count(), 0);
    }
}
