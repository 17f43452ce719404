use anyhow::{Context, Result};
use replay_core::Event;
use replay_graph::EventStore;
use std::fs;
use std::path::Path;

/// Reads a trace with one serialized event per line. Blank lines are skipped.
pub fn load_trace(path: &Path) -> Result<EventStore> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&contents).with_context(|| format!("failed to load trace {}", path.display()))
}

pub fn parse_trace(contents: &str) -> Result<EventStore> {
    let mut store = EventStore::new();
    for (n, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event: Event =
            serde_json::from_str(line).with_context(|| format!("line {}: invalid event", n + 1))?;
        store
            .append(event)
            .with_context(|| format!("line {}: event out of order", n + 1))?;
    }
    Ok(store)
}
