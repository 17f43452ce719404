use crossbeam_channel::{select, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::graph::layout::{self, LayoutParams};
use crate::graph::model::GraphModel;

pub const LAYOUT_INTERVAL: Duration = Duration::from_millis(20);

pub type SharedModel = Arc<Mutex<GraphModel>>;

/// Locks the shared model. A panic on another thread leaves the model as it
/// was at the panic point, which is still the best state to keep going with.
pub fn lock_model(shared: &SharedModel) -> MutexGuard<'_, GraphModel> {
    shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Background thread that runs one layout tick per interval under the model lock.
#[derive(Debug)]
pub struct LayoutWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    volume_reset: Arc<AtomicBool>,
}

impl LayoutWorker {
    pub fn spawn(shared: SharedModel, params: LayoutParams) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let volume_reset = Arc::new(AtomicBool::new(false));
        let flag = volume_reset.clone();

        let handle = std::thread::Builder::new()
            .name("replay-layout".into())
            .spawn(move || {
                tracing::info!(interval_ms = LAYOUT_INTERVAL.as_millis() as u64, "layout worker started");
                let ticker = crossbeam_channel::tick(LAYOUT_INTERVAL);
                let mut ticks = 0u64;
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            let outcome = layout::step(&mut lock_model(&shared), &params);
                            if outcome.volume_grew {
                                flag.store(true, Ordering::Relaxed);
                            }
                            ticks += 1;
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                tracing::info!(ticks, "layout worker stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            volume_reset,
        })
    }

    /// True once after any tick pushed a node past the viewing volume.
    pub fn take_volume_reset(&self) -> bool {
        self.volume_reset.swap(false, Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signals the thread and waits for the tick in flight to finish.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("layout worker panicked");
            }
        }
    }
}

impl Drop for LayoutWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
