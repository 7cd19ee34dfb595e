//! Frame-driven animation loop.
//!
//! One callback invocation per tick, cooperative and single-task. The loop
//! runs until its [`AnimationHandle`] is stopped or dropped; either way the
//! task is torn down and the callback released.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::frame::Frame;

/// Owner of a running animation loop.
pub struct AnimationHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<u64>>,
}

impl AnimationHandle {
    /// Stops the loop and waits for it to exit.
    ///
    /// Returns the number of frames delivered.
    pub async fn stop(mut self) -> u64 {
        let _ = self.stop.send(true);
        match self.task.take() {
            Some(task) => task.await.unwrap_or(0),
            None => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns a loop calling `on_frame` once per `interval`, starting at frame 0.
///
/// Returning `false` from the callback ends the loop early.
pub fn spawn_animation<F>(interval: Duration, mut on_frame: F) -> AnimationHandle
where
    F: FnMut(Frame) -> bool + Send + 'static,
{
    let (stop, mut stopped) = watch::channel(false);
    let dt_s = interval.as_secs_f64();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A stalled frame is skipped, not replayed in a burst.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frame = Frame::new(0, dt_s);
        let mut delivered = 0u64;
        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                _ = ticker.tick() => {
                    delivered += 1;
                    if !on_frame(frame) {
                        break;
                    }
                    frame = frame.next();
                }
            }
        }
        debug!(frames = delivered, "animation loop finished");
        delivered
    });

    AnimationHandle {
        stop,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::spawn_animation;

    #[tokio::test(start_paused = true)]
    async fn delivers_sequential_frames_until_callback_stops() {
        let seen = Arc::new(recorder::Frames::default());
        let sink = seen.clone();
        let handle = spawn_animation(Duration::from_millis(16), move |frame| {
            sink.push(frame.index);
            frame.index < 4
        });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!handle.is_running());
        assert_eq!(handle.stop().await, 5);
        assert_eq!(seen.take(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_perpetual_loop() {
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let handle = spawn_animation(Duration::from_millis(10), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(95)).await;
        let delivered = handle.stop().await;
        assert!(delivered >= 9);

        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_releases_callback() {
        let marker = Arc::new(());
        let held = marker.clone();
        let handle = spawn_animation(Duration::from_millis(10), move |_| {
            let _keep = &held;
            true
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(handle);
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(Arc::strong_count(&marker), 1);
    }

    mod recorder {
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct Frames(Mutex<Vec<u64>>);

        impl Frames {
            pub fn push(&self, i: u64) {
                self.0.lock().unwrap().push(i);
            }

            pub fn take(&self) -> Vec<u64> {
                std::mem::take(&mut *self.0.lock().unwrap())
            }
        }
    }
}
