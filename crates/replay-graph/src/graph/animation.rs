use crossbeam_channel::Receiver;
use std::time::{Duration, Instant};

use crate::graph::layout::LayoutParams;
use crate::graph::worker::{LayoutWorker, SharedModel};

pub const DEFAULT_MAX_FPS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub available: bool,
    /// A rubber-band selection is in progress.
    pub selecting: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            available: true,
            selecting: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Idle,
    Animating,
}

#[derive(Debug)]
pub struct Animator {
    params: LayoutParams,
    max_fps: u32,
    fps: f64,
    last_frame: Option<Instant>,
    worker: Option<LayoutWorker>,
    render_ticker: Option<Receiver<Instant>>,
}

impl Animator {
    pub fn new(params: LayoutParams, max_fps: u32) -> Self {
        Self {
            params,
            max_fps: if max_fps == 0 { DEFAULT_MAX_FPS } else { max_fps },
            fps: 0.0,
            last_frame: None,
            worker: None,
            render_ticker: None,
        }
    }

    pub fn state(&self) -> AnimationState {
        if self.worker.is_some() {
            AnimationState::Animating
        } else {
            AnimationState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == AnimationState::Animating
    }

    pub fn params(&self) -> &LayoutParams {
        &self.params
    }

    /// Takes effect the next time animation starts.
    pub fn set_params(&mut self, params: LayoutParams) {
        self.params = params;
    }

    pub fn max_fps(&self) -> u32 {
        self.max_fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.max_fps.max(1)))
    }

    /// Starts animating. Returns false when the preconditions don't hold or it already runs.
    pub fn run(&mut self, shared: &SharedModel, visible: usize, ctx: RenderContext) -> bool {
        if self.is_running() || !ctx.available || ctx.selecting || visible == 0 {
            return false;
        }
        match LayoutWorker::spawn(shared.clone(), self.params) {
            Ok(worker) => {
                self.worker = Some(worker);
                self.render_ticker = Some(crossbeam_channel::tick(self.frame_period()));
                self.last_frame = None;
                tracing::debug!(max_fps = self.max_fps, "animation started");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not start layout worker");
                false
            }
        }
    }

    /// Tears down the worker and the render ticker. Returns true if it was running,
    /// in which case the caller owes one final render.
    pub fn stop(&mut self) -> bool {
        let Some(mut worker) = self.worker.take() else {
            return false;
        };
        worker.stop();
        self.render_ticker = None;
        self.fps = self.fps.min(f64::from(self.max_fps));
        tracing::debug!("animation stopped");
        true
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        self.max_fps = if max_fps == 0 { DEFAULT_MAX_FPS } else { max_fps };
        if self.is_running() {
            self.render_ticker = Some(crossbeam_channel::tick(self.frame_period()));
        }
        self.fps = self.fps.min(f64::from(self.max_fps));
    }

    /// True when a render tick has elapsed since the last call.
    pub fn render_due(&self) -> bool {
        let Some(ticker) = &self.render_ticker else {
            return false;
        };
        let mut due = false;
        while ticker.try_recv().is_ok() {
            due = true;
        }
        due
    }

    pub fn take_volume_reset(&self) -> bool {
        self.worker.as_ref().is_some_and(LayoutWorker::take_volume_reset)
    }

    /// Updates the measured frame rate from the time since the previous frame.
    pub fn record_frame(&mut self, now: Instant) {
        if let Some(last) = self.last_frame.replace(now) {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            if dt > f64::EPSILON {
                self.fps = (1.0 / dt).min(f64::from(self.max_fps));
            }
        }
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        self.stop();
    }
}
