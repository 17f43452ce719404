pub mod activity;
pub mod animation;
pub mod edges;
pub mod labels;
pub mod layout;
pub mod listener;
pub mod model;
pub mod picking;
pub mod player;
pub mod view;
pub mod worker;

pub use animation::{AnimationState, Animator, RenderContext, DEFAULT_MAX_FPS};
pub use layout::{LayoutParams, TickOutcome};
pub use listener::{GraphListener, GraphNotice};
pub use model::{Edge, EdgeKey, GraphModel, GraphSnapshot, Node, NodeArray, NodeKey};
pub use picking::{Hit, Picked, Selection};
pub use player::{EventPlayer, Progress};
pub use view::GraphView;
pub use worker::{LayoutWorker, SharedModel};
