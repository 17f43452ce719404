use replay_core::{EventKind, PropValue};

use crate::graph::listener::GraphNotice;
use crate::graph::model::{EdgeKey, GraphModel, NodeKey};

/// Sender edge labels sit a quarter of the way along from the sending end.
const NEAR_SENDER: f64 = 0.25;
const NEAR_RECEIVER: f64 = 0.75;

/// Node, edge and description of a message event, taking edge and
/// description from the paired send for a receive.
pub fn message_label_parts<'a>(
    event: &'a EventKind,
    send: Option<&'a EventKind>,
) -> Option<(&'a str, Option<&'a str>, Option<&'a str>)> {
    let description = |kind: &'a EventKind| match kind {
        EventKind::MsgSend { edge, props, .. } => Some((
            edge.as_deref(),
            props.get("description").and_then(PropValue::as_str),
        )),
        _ => None,
    };
    match event {
        EventKind::MsgSend { node, .. } => {
            let (edge, desc) = description(event)?;
            Some((node.as_str(), edge, desc))
        }
        EventKind::MsgRecv { node, .. } => {
            let (edge, desc) = description(send?)?;
            Some((node.as_str(), edge, desc))
        }
        _ => None,
    }
}

impl GraphModel {
    fn set_node_event_label(&mut self, key: NodeKey, label: String) {
        if self.nodes[key].event_label.replace(label).is_none() {
            self.labelled_nodes.insert(0, key);
        }
    }

    fn set_edge_event_label(&mut self, key: EdgeKey, label: String, position: f64) {
        let edge = &mut self.edges[key];
        edge.label_position = position;
        if edge.event_label.replace(label).is_none() {
            self.labelled_edges.insert(0, key);
        }
    }

    pub fn label_message(&mut self, node: &str, edge: Option<&str>, description: Option<&str>) {
        let (Some(key), Some(message)) = (self.node_key(node), description) else {
            return;
        };
        let parent = self.canonical(key);

        match edge {
            Some(edge_name) => {
                if let Some(ek) = self.edge_key(edge_name) {
                    let position = if self.edges[ek].tail == parent {
                        NEAR_SENDER
                    } else {
                        NEAR_RECEIVER
                    };
                    self.set_edge_event_label(ek, message.to_string(), position);
                }
                if let Some(label) = self.nodes[key].label.clone() {
                    self.set_node_event_label(parent, label);
                }
            }
            None => self.set_node_event_label(parent, message.to_string()),
        }
        self.notify(GraphNotice::LabelsChanged);
    }

    pub fn clear_labels(&mut self) {
        if self.labelled_nodes.is_empty() && self.labelled_edges.is_empty() {
            return;
        }
        for key in std::mem::take(&mut self.labelled_edges) {
            if let Some(edge) = self.edges.get_mut(key) {
                edge.event_label = None;
            }
        }
        for key in std::mem::take(&mut self.labelled_nodes) {
            if let Some(node) = self.nodes.get_mut(key) {
                node.event_label = None;
            }
        }
        self.notify(GraphNotice::LabelsChanged);
    }

    pub fn labelled_nodes(&self) -> &[NodeKey] {
        &self.labelled_nodes
    }

    pub fn labelled_edges(&self) -> &[EdgeKey] {
        &self.labelled_edges
    }
}
