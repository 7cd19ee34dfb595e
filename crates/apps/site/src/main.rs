//! Travel-journal site service.
//!
//! Serves the visited-countries globe as SVG, accepts gallery uploads for
//! posts and receives the CMS revalidation webhook.

mod cache;
mod config;
mod gallery;
mod pages;
mod routes;
mod state;
mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use globe::{load_world, GlobeScene, GlobeView, WorldSource};
use runtime::Rotation;
use studio::{CommandConverter, ContentLakeClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::SiteConfig;
use crate::state::{AppState, UploadBackends};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("site: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = SiteConfig::from_env()?;
    let http = reqwest::Client::builder()
        .user_agent("travel-journal-site/0.1")
        .build()
        .map_err(|e| format!("http client: {e}"))?;

    let world = load_world(&WorldSource::parse(&config.world_data), &http).await;
    info!(shapes = world.len(), source = %config.world_data, "world dataset ready");

    let live_globe = GlobeView::new(
        GlobeScene::with_visited(world.clone(), &config.visited),
        Rotation::default(),
    );
    let _spin = live_globe.start(Duration::from_millis(config.frame_interval_ms.max(1)));

    if config.revalidate_secret.is_none() {
        warn!("REVALIDATE_SECRET is not set; revalidation requests will be rejected");
    }
    let uploads = match &config.content_lake {
        Some(lake) => {
            info!(project = %lake.project_id, dataset = %lake.dataset, "gallery uploads enabled");
            let client = Arc::new(ContentLakeClient::new(lake.clone(), http.clone()));
            Some(UploadBackends {
                assets: client.clone(),
                patcher: client,
                converter: Arc::new(CommandConverter::new(config.heif_convert_bin.clone())),
            })
        }
        None => {
            warn!("SANITY_PROJECT_ID is not set; gallery uploads are disabled");
            None
        }
    };

    let state = AppState::new(world, live_globe, config.revalidate_secret.clone(), uploads)
        .with_cache_capacity(config.page_cache_entries);
    let app = routes::router(state, config.gallery_max_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| format!("bind {}: {e}", config.addr))?;
    info!("site listening on http://{}", config.addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("server: {e}"))
}
