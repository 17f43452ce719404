//! Ordered, stepped event sequence with a settable current position.

use replay_core::{Event, EventKind, Timestamp};
use std::collections::HashMap;

use crate::error::StoreError;

/// Position of an event: `step` is the timestamp bucket, `index` the event within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventPos {
    pub step: usize,
    pub index: usize,
}

impl EventPos {
    pub const fn new(step: usize, index: usize) -> Self {
        Self { step, index }
    }
}

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub event: Event,
    /// Earlier event this one closes (edge create, activity start, message send).
    pub pair: Option<EventPos>,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub timestamp: Timestamp,
    pub events: Vec<StoredEvent>,
}

#[derive(Debug, Default)]
pub struct EventStore {
    steps: Vec<Step>,
    current: Option<EventPos>,
    edge_creates: HashMap<String, EventPos>,
    activity_starts: HashMap<(String, String), EventPos>,
    message_sends: HashMap<String, EventPos>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<I>(events: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut store = Self::new();
        for event in events {
            store.append(event)?;
        }
        Ok(store)
    }

    pub fn append(&mut self, event: Event) -> Result<EventPos, StoreError> {
        let tail = self.steps.last().map(|s| (s.timestamp, s.events.len()));
        let pos = match tail {
            Some((last, len)) if last == event.timestamp => EventPos::new(self.steps.len() - 1, len),
            Some((last, _)) if last > event.timestamp => {
                return Err(StoreError::OutOfOrder {
                    timestamp: event.timestamp,
                    last,
                });
            }
            _ => {
                self.steps.push(Step {
                    timestamp: event.timestamp,
                    events: Vec::new(),
                });
                EventPos::new(self.steps.len() - 1, 0)
            }
        };

        let pair = self.resolve_pair(&event.kind, pos);
        if let Some(step) = self.steps.last_mut() {
            step.events.push(StoredEvent { event, pair });
        }
        Ok(pos)
    }

    fn resolve_pair(&mut self, kind: &EventKind, pos: EventPos) -> Option<EventPos> {
        match kind {
            EventKind::EdgeCreate { id, .. } => {
                self.edge_creates.insert(id.clone(), pos);
                None
            }
            EventKind::EdgeDelete { id } => self.edge_creates.get(id).copied(),
            EventKind::ActivityStart { id, node, .. } => {
                self.activity_starts.insert((node.clone(), id.clone()), pos);
                None
            }
            EventKind::ActivityEnd { id, node } => self
                .activity_starts
                .get(&(node.clone(), id.clone()))
                .copied(),
            EventKind::MsgSend { id, .. } => {
                self.message_sends.insert(id.clone(), pos);
                None
            }
            EventKind::MsgRecv { id, .. } => self.message_sends.get(id).copied(),
            _ => None,
        }
    }

    pub fn get(&self, pos: EventPos) -> Option<&StoredEvent> {
        self.steps.get(pos.step)?.events.get(pos.index)
    }

    pub fn paired(&self, pos: EventPos) -> Option<&StoredEvent> {
        self.get(self.get(pos)?.pair?)
    }

    pub fn first(&self) -> Option<EventPos> {
        self.steps
            .iter()
            .position(|s| !s.events.is_empty())
            .map(|step| EventPos::new(step, 0))
    }

    pub fn last(&self) -> Option<EventPos> {
        let step = self.steps.iter().rposition(|s| !s.events.is_empty())?;
        Some(EventPos::new(step, self.steps[step].events.len() - 1))
    }

    /// Following event, crossing into the next step when `pos` ends its step.
    pub fn next(&self, pos: EventPos) -> Option<EventPos> {
        let step = self.steps.get(pos.step)?;
        if pos.index + 1 < step.events.len() {
            return Some(EventPos::new(pos.step, pos.index + 1));
        }
        (pos.step + 1..self.steps.len())
            .find(|&s| !self.steps[s].events.is_empty())
            .map(|s| EventPos::new(s, 0))
    }

    /// Preceding event, crossing into the last event of the previous step.
    pub fn prev(&self, pos: EventPos) -> Option<EventPos> {
        if pos.index > 0 {
            return Some(EventPos::new(pos.step, pos.index - 1));
        }
        (0..pos.step)
            .rev()
            .find(|&s| !self.steps[s].events.is_empty())
            .map(|s| EventPos::new(s, self.steps[s].events.len() - 1))
    }

    pub fn current(&self) -> Option<EventPos> {
        self.current
    }

    /// Sets the current position, clamped to the last stored event.
    pub fn set_current(&mut self, pos: EventPos) {
        self.current = match self.last() {
            Some(last) if pos > last => Some(last),
            Some(_) if self.get(pos).is_some() => Some(pos),
            Some(_) => self.prev_existing(pos),
            None => None,
        };
    }

    fn prev_existing(&self, pos: EventPos) -> Option<EventPos> {
        let step = self.steps.get(pos.step)?;
        let clamped = EventPos::new(pos.step, pos.index.min(step.events.len().saturating_sub(1)));
        if self.get(clamped).is_some() {
            Some(clamped)
        } else {
            self.first()
        }
    }

    pub fn set_current_to_last(&mut self) {
        self.current = self.last();
    }

    pub fn len(&self) -> usize {
        self.steps.iter().map(|s| s.events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Every position in order.
    pub fn positions(&self) -> impl Iterator<Item = EventPos> + '_ {
        self.steps.iter().enumerate().flat_map(|(step, s)| {
            (0..s.events.len()).map(move |index| EventPos::new(step, index))
        })
    }
}
