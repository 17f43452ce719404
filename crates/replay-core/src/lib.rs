use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Microseconds since the start of the trace.
pub type Timestamp = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl PropValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

pub type Props = BTreeMap<String, PropValue>;

/// Builds a [`Props`] map from `(key, value)` pairs.
pub fn props<K, V, I>(pairs: I) -> Props
where
    K: Into<String>,
    V: Into<PropValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum EventKind {
    NodeCreate {
        id: String,
        #[serde(default)]
        props: Props,
    },
    NodeDelete {
        id: String,
    },
    NodeProps {
        id: String,
        props: Props,
    },
    EdgeCreate {
        id: String,
        directed: bool,
        tail: String,
        head: String,
        #[serde(default)]
        props: Props,
    },
    EdgeDelete {
        id: String,
    },
    EdgeProps {
        id: String,
        props: Props,
    },
    ActivityStart {
        id: String,
        node: String,
        #[serde(default)]
        props: Props,
    },
    ActivityEnd {
        id: String,
        node: String,
    },
    MsgSend {
        id: String,
        node: String,
        #[serde(default)]
        edge: Option<String>,
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        props: Props,
    },
    MsgRecv {
        id: String,
        node: String,
    },
}

impl EventKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NodeCreate { .. } => "NodeCreate",
            Self::NodeDelete { .. } => "NodeDelete",
            Self::NodeProps { .. } => "NodeProps",
            Self::EdgeCreate { .. } => "EdgeCreate",
            Self::EdgeDelete { .. } => "EdgeDelete",
            Self::EdgeProps { .. } => "EdgeProps",
            Self::ActivityStart { .. } => "ActivityStart",
            Self::ActivityEnd { .. } => "ActivityEnd",
            Self::MsgSend { .. } => "MsgSend",
            Self::MsgRecv { .. } => "MsgRecv",
        }
    }

    /// Identifier of the entity (node, edge, activity or message) the event is about.
    pub fn id(&self) -> &str {
        match self {
            Self::NodeCreate { id, .. }
            | Self::NodeDelete { id }
            | Self::NodeProps { id, .. }
            | Self::EdgeCreate { id, .. }
            | Self::EdgeDelete { id }
            | Self::EdgeProps { id, .. }
            | Self::ActivityStart { id, .. }
            | Self::ActivityEnd { id, .. }
            | Self::MsgSend { id, .. }
            | Self::MsgRecv { id, .. } => id,
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::MsgSend { .. } | Self::MsgRecv { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub source: String,
    pub kind: EventKind,
}

impl Event {
    pub fn new(timestamp: Timestamp, source: impl Into<String>, kind: EventKind) -> Self {
        Self {
            timestamp,
            source: source.into(),
            kind,
        }
    }
}

fn fmt_timestamp(f: &mut fmt::Formatter<'_>, ts: Timestamp) -> fmt::Result {
    let sign = if ts < 0 { "-" } else { "" };
    let abs = ts.unsigned_abs();
    write!(f, "{sign}{}.{:06}s", abs / 1_000_000, abs % 1_000_000)
}

fn fmt_props(f: &mut fmt::Formatter<'_>, props: &Props) -> fmt::Result {
    let rendered = serde_json::to_string(props).map_err(|_| fmt::Error)?;
    writeln!(f, "  properties:")?;
    writeln!(f, "{rendered}")
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "      type: {}", self.kind.type_name())?;
        write!(f, "      timestamp: ")?;
        fmt_timestamp(f, self.timestamp)?;
        writeln!(f)?;
        writeln!(f, "    source: {}", self.source)?;
        match &self.kind {
            EventKind::NodeCreate { id, props } | EventKind::NodeProps { id, props } => {
                writeln!(f, "      name: {id}")?;
                fmt_props(f, props)
            }
            EventKind::NodeDelete { id } | EventKind::EdgeDelete { id } => {
                writeln!(f, "      name: {id}")
            }
            EventKind::EdgeCreate {
                id,
                directed,
                tail,
                head,
                ..
            } => {
                writeln!(f, "      name: {id}")?;
                let kind = if *directed { "DIRECTED" } else { "UNDIRECTED" };
                writeln!(f, "      type: {kind}")?;
                writeln!(f, "      tail: {tail}")?;
                writeln!(f, "      head: {head}")
            }
            EventKind::EdgeProps { id, props } => {
                writeln!(f, "      name: {id}")?;
                fmt_props(f, props)
            }
            EventKind::ActivityStart { id, node, props } => {
                writeln!(f, "      name: {id}")?;
                writeln!(f, "      node: {node}")?;
                fmt_props(f, props)
            }
            EventKind::ActivityEnd { id, node } | EventKind::MsgRecv { id, node } => {
                writeln!(f, "      name: {id}")?;
                writeln!(f, "      node: {node}")
            }
            EventKind::MsgSend {
                id,
                node,
                edge,
                parent,
                props,
            } => {
                writeln!(f, "      name: {id}")?;
                writeln!(f, "      node: {node}")?;
                writeln!(f, "      edge: {}", edge.as_deref().unwrap_or(""))?;
                writeln!(f, "    parent: {}", parent.as_deref().unwrap_or(""))?;
                fmt_props(f, props)
            }
        }
    }
}
