//! Moves the graph to match the event store's current position, one event at
//! a time, forward or backward, yielding after a fixed time budget.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::events::{EventPos, EventStore};
use crate::graph::listener::GraphNotice;
use crate::graph::view::GraphView;

pub const DEFAULT_BUDGET: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Budget ran out before catching up; call `advance` again.
    Pending,
    /// The graph reflects the store's current event.
    Idle,
}

#[derive(Debug, Clone)]
pub struct EventPlayer {
    position: Option<EventPos>,
    forward: bool,
    processing: bool,
    budget: Duration,
}

impl Default for EventPlayer {
    fn default() -> Self {
        Self::with_budget(DEFAULT_BUDGET)
    }
}

impl EventPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            position: None,
            forward: true,
            processing: false,
            budget,
        }
    }

    pub fn position(&self) -> Option<EventPos> {
        self.position
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn reset(&mut self) {
        self.position = None;
        self.forward = true;
        self.processing = false;
    }

    fn forward_to(&mut self, store: &EventStore, view: &mut GraphView, pos: EventPos) {
        self.forward = true;
        view.set_forward(true);
        self.position = Some(pos);
        if let Err(err) = view.apply_forward(store, pos) {
            if let Some(stored) = store.get(pos) {
                view.report_error(&err, &stored.event);
            }
        }
    }

    fn back_from(&mut self, store: &EventStore, view: &mut GraphView, pos: EventPos) {
        self.forward = false;
        view.set_forward(false);
        if let Err(err) = view.apply_backward(store, pos) {
            if let Some(stored) = store.get(pos) {
                view.report_error(&err, &stored.event);
            }
        }
        self.position = store.prev(pos);
        // the event now pointed at decides which message labels show
        if let Some(prev) = self.position {
            view.relabel_from(store, prev);
        }
    }

    fn set_processing(&mut self, view: &mut GraphView, processing: bool) {
        if self.processing != processing {
            self.processing = processing;
            view.emit(GraphNotice::Processing(processing));
        }
    }

    /// Applies events toward the store's current position until caught up or
    /// out of budget.
    pub fn advance(&mut self, store: &EventStore, view: &mut GraphView) -> Progress {
        let Some(target) = store.current() else {
            self.set_processing(view, false);
            return Progress::Idle;
        };
        let started = Instant::now();
        self.set_processing(view, true);

        if self.position.is_none() {
            if let Some(first) = store.first() {
                tracing::debug!(?first, "starting playback");
                self.forward_to(store, view, first);
            }
        }

        while started.elapsed() < self.budget {
            let Some(current) = self.position else {
                // rewound past the first event
                match store.first() {
                    Some(first) => self.forward_to(store, view, first),
                    None => break,
                }
                continue;
            };
            if current.step != target.step {
                view.clear_labels();
            }
            match target.cmp(&current) {
                Ordering::Less => self.back_from(store, view, current),
                Ordering::Equal => {
                    self.set_processing(view, false);
                    break;
                }
                Ordering::Greater => match store.next(current) {
                    Some(next) => self.forward_to(store, view, next),
                    None => {
                        self.set_processing(view, false);
                        break;
                    }
                },
            }
        }

        if self.processing {
            // layout waits until the graph has caught up
            view.stop_animation();
            return Progress::Pending;
        }
        if view.visible_count() > 0 {
            view.run_animation();
        } else {
            view.stop_animation();
        }
        Progress::Idle
    }

    pub fn catch_up(&mut self, store: &EventStore, view: &mut GraphView) {
        while self.advance(store, view) == Progress::Pending {}
    }
}
