use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use globe::{GlobeScene, Viewport, WorldSource, load_world};
use runtime::spawn_animation;
use studio::{
    CommandConverter, ContentLakeClient, ContentLakeConfig, DEFAULT_GALLERY_FIELD, UploadWidget,
};
use tokio::sync::mpsc;
use tools::{numbered_path, parse_visited, read_selection, render_frame};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Travel journal tooling: globe renders and gallery uploads")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the visited-countries globe to SVG
    Globe {
        /// World geometry (TopoJSON or GeoJSON), file path or http(s) URL
        world: String,

        /// Output SVG file
        out: PathBuf,

        /// Comma-separated visited countries, e.g. "USA,France"
        #[arg(long, default_value = "")]
        visited: String,

        /// Animation frame to render
        #[arg(long, default_value_t = 0)]
        frame: u64,

        #[arg(long, default_value_t = 480.0)]
        width: f64,

        #[arg(long, default_value_t = 480.0)]
        height: f64,

        /// Render this many consecutive frames from the live rotation loop
        /// into numbered files next to OUT
        #[arg(long)]
        animate: Option<u64>,

        /// Tick interval of the rotation loop, in milliseconds
        #[arg(long, default_value_t = 16)]
        interval_ms: u64,
    },

    /// Upload photos into a document's gallery (content lake from SANITY_* env vars)
    Upload {
        /// Target document id
        document: String,

        /// Image files, uploaded in this order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Array field receiving the entries
        #[arg(long, default_value = DEFAULT_GALLERY_FIELD)]
        field: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Globe {
            world,
            out,
            visited,
            frame,
            width,
            height,
            animate,
            interval_ms,
        } => {
            let viewport = Viewport::new(width, height);
            cmd_globe(&world, out, &visited, frame, viewport, animate, interval_ms).await
        }
        Command::Upload {
            document,
            files,
            field,
        } => cmd_upload(&document, &files, &field).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn cmd_globe(
    world: &str,
    out: PathBuf,
    visited: &str,
    frame: u64,
    viewport: Viewport,
    animate: Option<u64>,
    interval_ms: u64,
) -> Result<(), String> {
    let http = reqwest::Client::new();
    let shapes = load_world(&WorldSource::parse(world), &http).await;
    if shapes.is_empty() {
        warn!("no country shapes loaded from {world}; rendering an empty globe");
    }
    let scene = GlobeScene::with_visited(shapes, parse_visited(visited));
    info!(
        shapes = scene.shapes().len(),
        visited = scene.visited_shapes().count(),
        "scene ready"
    );

    let Some(count) = animate.filter(|n| *n > 0) else {
        let svg = render_frame(&scene, frame, viewport);
        tokio::fs::write(&out, svg)
            .await
            .map_err(|e| format!("write {out:?}: {e}"))?;
        info!("wrote {out:?}");
        return Ok(());
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let scene = Arc::new(scene);
    let handle = spawn_animation(Duration::from_millis(interval_ms.max(1)), {
        let scene = scene.clone();
        move |tick| {
            let index = frame + tick.index;
            let svg = render_frame(&scene, index, viewport);
            tx.send((index, svg)).is_ok() && tick.index + 1 < count
        }
    });

    while let Some((index, svg)) = rx.recv().await {
        let path = numbered_path(&out, index);
        tokio::fs::write(&path, svg)
            .await
            .map_err(|e| format!("write {path:?}: {e}"))?;
    }
    let frames = handle.stop().await;
    info!(frames, "wrote animation frames");
    Ok(())
}

async fn cmd_upload(document: &str, files: &[PathBuf], field: &str) -> Result<(), String> {
    let config = ContentLakeConfig::from_env()?;
    let converter = std::env::var("HEIF_CONVERT_BIN")
        .map(CommandConverter::new)
        .unwrap_or_default();
    let client = Arc::new(ContentLakeClient::new(config, reqwest::Client::new()));
    let widget = UploadWidget::new(
        document,
        field,
        client.clone(),
        client,
        Arc::new(converter),
    );

    let mut selection = read_selection(files).await?;

    // Progress lines end with an ellipsis; the first one that doesn't is final.
    let mut status = widget.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(Some(line)) = status.recv().await {
            eprintln!("{line}");
            if !line.ends_with('…') {
                break;
            }
        }
    });

    let result = widget.upload_batch(&mut selection).await;
    let _ = printer.await;

    let items = result.map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&items).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
