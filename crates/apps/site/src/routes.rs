use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{gallery, pages, webhooks};

/// Site routes. Gallery uploads accept bodies up to `gallery_max_bytes`;
/// every other route keeps axum's default limit.
pub fn router(state: AppState, gallery_max_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(pages::healthz))
        .route("/globe.svg", get(pages::globe_svg))
        .route("/globe/live.svg", get(pages::live_globe_svg))
        .route(
            "/api/posts/:id/gallery",
            post(gallery::upload_gallery).layer(DefaultBodyLimit::max(gallery_max_bytes)),
        )
        .route("/api/revalidate", post(webhooks::revalidate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
