use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use globe::{render_svg, resolve_country, GlobeScene, GlobeStyle, Viewport};
use runtime::{Frame, Rotation, DEFAULT_FRAME_DT_S};
use serde::Deserialize;
use tracing::debug;

use crate::cache::CachedPage;
use crate::config::parse_list;
use crate::state::AppState;

/// Page whose revalidation evicts cached globe renders.
pub const GLOBE_PAGE: &str = "/";

const SVG: &str = "image/svg+xml";
const MIN_SIZE_PX: f64 = 64.0;
const MAX_SIZE_PX: f64 = 2048.0;

#[derive(Debug, Default, Deserialize)]
pub struct GlobeQuery {
    /// Comma-separated country names.
    pub visited: Option<String>,
    pub frame: Option<u64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl GlobeQuery {
    fn viewport(&self) -> Viewport {
        let d = Viewport::default();
        Viewport::new(
            clamp_size(self.width.unwrap_or(d.width)),
            clamp_size(self.height.unwrap_or(d.height)),
        )
    }

    /// Resolved, sorted and deduplicated visited names.
    fn visited_canonical(&self) -> Vec<String> {
        let mut names: Vec<String> = parse_list(self.visited.as_deref().unwrap_or_default())
            .iter()
            .map(|n| resolve_country(n))
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Requested frame folded into one full turn of the globe.
    fn canonical_frame(&self, rotation: &Rotation) -> u64 {
        let frame = self.frame.unwrap_or(0);
        match rotation.period_frames() {
            Some(period) => frame % period,
            None => frame,
        }
    }
}

/// Requests that render the same picture share one key.
fn cache_key(visited: &[String], frame: u64, viewport: &Viewport) -> String {
    format!(
        "/globe.svg?visited={}&frame={frame}&size={}x{}",
        visited.join(","),
        viewport.width,
        viewport.height
    )
}

fn clamp_size(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(MIN_SIZE_PX, MAX_SIZE_PX).round()
    } else {
        MIN_SIZE_PX
    }
}

fn page_response(content_type: &'static str, body: Bytes) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

pub async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// One frame of the globe for a given visited list.
pub async fn globe_svg(State(state): State<AppState>, Query(q): Query<GlobeQuery>) -> Response {
    let viewport = q.viewport();
    let visited = q.visited_canonical();
    let base = Rotation::default();
    let frame_index = q.canonical_frame(&base);
    let key = cache_key(&visited, frame_index, &viewport);
    if let Some(hit) = state.cache.get(&key) {
        return page_response(hit.content_type, hit.body);
    }

    let scene = GlobeScene::with_visited(state.world.as_ref().clone(), &visited);
    let rotation = base.at_frame(Frame::new(frame_index, DEFAULT_FRAME_DT_S));
    let frame = scene.project(&rotation, viewport);
    let body = Bytes::from(render_svg(&frame, &GlobeStyle::default()).to_string());

    debug!(key = %key, shapes = frame.shapes.len(), "rendered globe");
    state.cache.insert(
        key,
        CachedPage {
            page: GLOBE_PAGE.to_string(),
            content_type: SVG,
            body: body.clone(),
        },
    );
    page_response(SVG, body)
}

/// Current state of the continuously rotating globe.
pub async fn live_globe_svg(State(state): State<AppState>) -> Response {
    let svg = state
        .live_globe
        .render_svg(Viewport::default(), &GlobeStyle::default());
    page_response(SVG, Bytes::from(svg))
}
