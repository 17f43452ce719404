use replay_core::Props;

use crate::error::{GraphError, GraphResult};
use crate::graph::model::{Activity, GraphModel, NodeKey};
use crate::props::PropertyStore;

impl GraphModel {
    pub(crate) fn add_activity_to_chain(&mut self, from: NodeKey, activity: Activity) {
        let mut cur = Some(from);
        while let Some(key) = cur {
            let node = &mut self.nodes[key];
            node.activities.push(activity.clone());
            cur = node.parent;
        }
    }

    pub(crate) fn remove_activity_from_chain(&mut self, from: NodeKey, id: u64) {
        let mut cur = Some(from);
        while let Some(key) = cur {
            let node = &mut self.nodes[key];
            if let Some(i) = node.activities.iter().position(|a| a.id == id) {
                node.activities.remove(i);
            }
            cur = node.parent;
        }
    }

    pub(crate) fn refresh_active(&mut self, moved: NodeKey) {
        let nodes = &self.nodes;
        self.active_nodes
            .retain(|&k| nodes.get(k).is_some_and(|n| n.parent.is_none() && !n.activities.is_empty()));
        let canonical = self.canonical(moved);
        if !self.nodes[canonical].activities.is_empty() && !self.active_nodes.contains(&canonical) {
            self.active_nodes.insert(0, canonical);
        }
    }

    pub fn add_activity(&mut self, node: &str, name: &str, props: Props) -> GraphResult<()> {
        let key = self
            .node_key(node)
            .ok_or_else(|| GraphError::InvalidNode(format!("could not find node {node}")))?;
        let mut store = PropertyStore::new();
        if !props.is_empty() {
            store.push(props);
        }
        let activity = Activity {
            id: self.next_activity_id,
            name: name.to_string(),
            props: store,
        };
        self.next_activity_id += 1;
        self.add_activity_to_chain(key, activity);

        let canonical = self.canonical(key);
        if self.nodes[canonical].activities.len() == 1 {
            self.active_nodes.insert(0, canonical);
        }
        Ok(())
    }

    /// Ends `name` on `node`. An unknown activity is logged and ignored.
    pub fn remove_activity(&mut self, node: &str, name: &str) -> GraphResult<()> {
        let key = self
            .node_key(node)
            .ok_or_else(|| GraphError::InvalidNode(format!("could not find node {node}")))?;
        let Some(id) = self.nodes[key]
            .activities
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
        else {
            tracing::warn!(activity = name, node, "couldn't find activity");
            return Ok(());
        };
        self.remove_activity_from_chain(key, id);

        let canonical = self.canonical(key);
        if self.nodes[canonical].activities.is_empty() {
            self.active_nodes.retain(|&k| k != canonical);
        }
        Ok(())
    }

    pub fn active_nodes(&self) -> &[NodeKey] {
        &self.active_nodes
    }
}
