use replay_core::Timestamp;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("invalid edge: {0}")]
    InvalidEdge(String),
    #[error("node with name '{0}' already exists")]
    DuplicateName(String),
    #[error("no matching earlier event for '{0}'")]
    UnpairedEvent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("event at {timestamp}us is earlier than the last stored event at {last}us")]
    OutOfOrder { timestamp: Timestamp, last: Timestamp },
}

pub type GraphResult<T> = Result<T, GraphError>;
