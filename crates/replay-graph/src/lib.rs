//! Graph core of the replay viewer: node/edge model with grouping, a force
//! layout on a background thread, a forward/backward event player and
//! picking/selection.

pub mod error;
pub mod events;
pub mod graph;
pub mod props;
pub mod registry;
pub mod util;

pub use error::{GraphError, GraphResult, StoreError};
pub use events::{EventPos, EventStore};
pub use registry::NodeRegistry;
