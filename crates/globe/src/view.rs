use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use runtime::{AnimationHandle, Frame, Rotation, spawn_animation};

use crate::render::{GlobeStyle, render_svg};
use crate::scene::{GlobeScene, ProjectedFrame, Viewport};

/// A continuously rotating globe.
///
/// The scene and the orientation are shared with the animation task; the
/// view can be rendered from any thread at any time.
#[derive(Clone)]
pub struct GlobeView {
    scene: Arc<RwLock<GlobeScene>>,
    rotation: Arc<Mutex<Rotation>>,
    last_frame: Arc<Mutex<Option<Frame>>>,
}

impl GlobeView {
    pub fn new(scene: GlobeScene, rotation: Rotation) -> Self {
        Self {
            scene: Arc::new(RwLock::new(scene)),
            rotation: Arc::new(Mutex::new(rotation)),
            last_frame: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts spinning: one rotation step per tick until the handle is
    /// stopped or dropped.
    pub fn start(&self, interval: Duration) -> AnimationHandle {
        let rotation = self.rotation.clone();
        let last_frame = self.last_frame.clone();
        spawn_animation(interval, move |frame| {
            rotation.lock().step();
            *last_frame.lock() = Some(frame);
            true
        })
    }

    pub fn rotation(&self) -> Rotation {
        *self.rotation.lock()
    }

    /// Most recent frame delivered by the animation loop.
    pub fn last_frame(&self) -> Option<Frame> {
        *self.last_frame.lock()
    }

    pub fn set_visited<I, S>(&self, visited: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scene.write().set_visited(visited);
    }

    pub fn project(&self, viewport: Viewport) -> ProjectedFrame {
        let rotation = self.rotation();
        self.scene.read().project(&rotation, viewport)
    }

    pub fn render_svg(&self, viewport: Viewport, style: &GlobeStyle) -> String {
        render_svg(&self.project(viewport), style).to_string()
    }
}
