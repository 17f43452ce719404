use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slotmap::{new_key_type, SlotMap};
use std::collections::{BTreeMap, HashMap};
use std::f64::consts::FRAC_1_PI;

use crate::error::{GraphError, GraphResult};
use crate::graph::listener::GraphNotice;
use crate::props::PropertyStore;
use crate::registry::NodeRegistry;

new_key_type! {
    pub struct NodeKey;
    pub struct EdgeKey;
    pub struct EdgeGroupKey;
}

pub const NODE_MASS: f64 = 1.0;
/// Half the default far clipping distance divided by the camera ratio.
pub const INITIAL_MAX_NODE_DISTANCE: f64 = 50.0;
const MAX_GROUP_DEPTH: usize = 64;

pub fn radius_for_mass(mass: f64) -> f64 {
    2.0 * (0.75 * FRAC_1_PI * mass).cbrt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeArray {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub(crate) id: u64,
    pub name: String,
    pub props: PropertyStore,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub label: Option<String>,
    pub color: Option<String>,
    pub group: bool,
    pub hidden: bool,
    pub position: DVec3,
    pub velocity: DVec3,
    pub force: DVec3,
    pub mass: f64,
    pub radius: f64,
    pub event_label: Option<String>,
    pub activities: Vec<Activity>,
    pub(crate) index: usize,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) edge_groups: Vec<EdgeGroupKey>,
}

impl Node {
    fn new(name: &str, position: DVec3) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            color: None,
            group: false,
            hidden: false,
            position,
            velocity: DVec3::ZERO,
            force: DVec3::ZERO,
            mass: NODE_MASS,
            radius: radius_for_mass(NODE_MASS),
            event_label: None,
            activities: Vec::new(),
            index: 0,
            parent: None,
            children: Vec::new(),
            edge_groups: Vec::new(),
        }
    }

    /// Position inside whichever node array holds this node; doubles as the pick name.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn edge_groups(&self) -> &[EdgeGroupKey] {
        &self.edge_groups
    }

    /// Grouped nodes are always kept in the hidden array.
    pub fn is_hidden(&self) -> bool {
        self.hidden || self.parent.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub name: String,
    pub directed: bool,
    pub tail_name: String,
    pub head_name: String,
    pub props: PropertyStore,
    pub event_label: Option<String>,
    pub label_position: f64,
    pub hover_info: Option<String>,
    pub(crate) tail: NodeKey,
    pub(crate) head: Option<NodeKey>,
    pub(crate) index: usize,
}

impl Edge {
    pub fn weight(&self) -> f64 {
        self.props.lookup_f64("weight").unwrap_or(1.0)
    }

    pub fn color(&self) -> Option<&str> {
        self.props.lookup_str("color")
    }

    pub fn tail(&self) -> NodeKey {
        self.tail
    }

    /// `None` for a dead edge.
    pub fn head(&self) -> Option<NodeKey> {
        self.head
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeGroup {
    pub(crate) edges: Vec<EdgeKey>,
}

impl EdgeGroup {
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub parent: Option<String>,
    pub group: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSnapshot {
    pub tail: String,
    pub head: Option<String>,
    pub tail_name: String,
    pub head_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, NodeSnapshot>,
    pub edges: BTreeMap<String, EdgeSnapshot>,
}

#[derive(Debug)]
pub struct GraphModel {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    pub(crate) edges: SlotMap<EdgeKey, Edge>,
    pub(crate) groups: SlotMap<EdgeGroupKey, EdgeGroup>,
    pub(crate) node_table: HashMap<String, NodeKey>,
    pub(crate) edge_table: HashMap<String, EdgeKey>,
    pub(crate) visible: Vec<NodeKey>,
    pub(crate) hidden: Vec<NodeKey>,
    pub(crate) dead_edges: Vec<EdgeKey>,
    pub(crate) active_nodes: Vec<NodeKey>,
    pub(crate) labelled_nodes: Vec<NodeKey>,
    pub(crate) labelled_edges: Vec<EdgeKey>,
    pub(crate) next_activity_id: u64,
    pub(crate) max_node_distance: f64,
    forward: bool,
    two_dimensional: bool,
    rng: ChaCha8Rng,
    notices: Vec<GraphNotice>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::with_rng(ChaCha8Rng::from_rng(&mut rand::rng()))
    }
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha8Rng) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            groups: SlotMap::with_key(),
            node_table: HashMap::new(),
            edge_table: HashMap::new(),
            visible: Vec::new(),
            hidden: Vec::new(),
            dead_edges: Vec::new(),
            active_nodes: Vec::new(),
            labelled_nodes: Vec::new(),
            labelled_edges: Vec::new(),
            next_activity_id: 0,
            max_node_distance: INITIAL_MAX_NODE_DISTANCE,
            forward: true,
            two_dimensional: false,
            rng,
            notices: Vec::new(),
        }
    }

    // ----- Accessors -----

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn node_key(&self, name: &str) -> Option<NodeKey> {
        self.node_table.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_key(name).and_then(|k| self.nodes.get(k))
    }

    pub fn edge(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    pub fn edge_key(&self, name: &str) -> Option<EdgeKey> {
        self.edge_table.get(name).copied()
    }

    pub fn edge_by_name(&self, name: &str) -> Option<&Edge> {
        self.edge_key(name).and_then(|k| self.edges.get(k))
    }

    pub fn edge_group(&self, key: EdgeGroupKey) -> Option<&EdgeGroup> {
        self.groups.get(key)
    }

    pub fn visible_nodes(&self) -> &[NodeKey] {
        &self.visible
    }

    pub fn hidden_nodes(&self) -> &[NodeKey] {
        &self.hidden
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &Edge)> {
        self.edges.iter()
    }

    pub fn dead_edges(&self) -> &[EdgeKey] {
        &self.dead_edges
    }

    pub fn max_node_distance(&self) -> f64 {
        self.max_node_distance
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn set_forward(&mut self, forward: bool) {
        self.forward = forward;
    }

    pub fn two_dimensional(&self) -> bool {
        self.two_dimensional
    }

    pub fn set_two_dimensional(&mut self, two_dimensional: bool) {
        self.two_dimensional = two_dimensional;
        if two_dimensional {
            for node in self.nodes.values_mut() {
                node.position.z = 0.0;
                node.velocity.z = 0.0;
            }
        }
    }

    pub fn place_node(&mut self, name: &str, position: DVec3) -> GraphResult<()> {
        let key = self
            .node_key(name)
            .ok_or_else(|| GraphError::InvalidNode(name.to_string()))?;
        let mut position = position;
        if self.two_dimensional {
            position.z = 0.0;
        }
        self.nodes[key].position = position;
        Ok(())
    }

    pub(crate) fn notify(&mut self, notice: GraphNotice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<GraphNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Top-most ancestor of `key`.
    pub fn canonical(&self, key: NodeKey) -> NodeKey {
        let mut cur = key;
        for _ in 0..MAX_GROUP_DEPTH {
            match self.nodes[cur].parent {
                Some(parent) => cur = parent,
                None => return cur,
            }
        }
        panic!(
            "group nesting of {} exceeds {MAX_GROUP_DEPTH} levels; parent links form a cycle",
            self.nodes[key].name
        );
    }

    /// True if `name` names `key` or one of its descendants.
    pub fn node_has_name(&self, key: NodeKey, name: &str) -> bool {
        let node = &self.nodes[key];
        node.name.eq_ignore_ascii_case(name)
            || node.children.iter().any(|&c| self.node_has_name(c, name))
    }

    // ----- Node arrays -----

    pub fn membership(&self, key: NodeKey) -> Option<NodeArray> {
        let index = self.nodes.get(key)?.index;
        if self.visible.get(index) == Some(&key) {
            Some(NodeArray::Visible)
        } else if self.hidden.get(index) == Some(&key) {
            Some(NodeArray::Hidden)
        } else {
            None
        }
    }

    pub(crate) fn push_to(&mut self, which: NodeArray, key: NodeKey) {
        let (array, nodes) = match which {
            NodeArray::Visible => (&mut self.visible, &mut self.nodes),
            NodeArray::Hidden => (&mut self.hidden, &mut self.nodes),
        };
        assert!(
            array.get(nodes[key].index) != Some(&key),
            "node {} already in {which:?} array",
            nodes[key].name
        );
        nodes[key].index = array.len();
        array.push(key);
    }

    pub(crate) fn remove_from(&mut self, which: NodeArray, key: NodeKey) {
        let (array, nodes) = match which {
            NodeArray::Visible => (&mut self.visible, &mut self.nodes),
            NodeArray::Hidden => (&mut self.hidden, &mut self.nodes),
        };
        let index = nodes[key].index;
        assert!(
            array.get(index) == Some(&key),
            "node {} is not at index {index} of {which:?} array",
            nodes[key].name
        );
        array.remove(index);
        for (i, &k) in array.iter().enumerate().skip(index) {
            nodes[k].index = i;
        }
    }

    pub(crate) fn move_between(&mut self, from: NodeArray, to: NodeArray, key: NodeKey) {
        self.remove_from(from, key);
        self.push_to(to, key);
    }

    // ----- Mass -----

    pub(crate) fn edges_weight(&self, key: NodeKey) -> f64 {
        let node = &self.nodes[key];
        let mut weight = 0.0;
        for group in &node.edge_groups {
            for &ek in &self.groups[*group].edges {
                let edge = &self.edges[ek];
                let w = edge.weight();
                // intra-group edges collapse into one entry, so count them for both ends
                if node.group
                    && edge.head == Some(edge.tail)
                    && !edge.tail_name.eq_ignore_ascii_case(&edge.head_name)
                {
                    weight += w;
                }
                weight += w;
            }
        }
        weight
    }

    pub(crate) fn update_mass(&mut self, key: NodeKey) {
        let children = self.nodes[key].children.clone();
        let mut mass = NODE_MASS;
        for child in children {
            self.update_mass(child);
            mass += self.nodes[child].mass;
        }
        mass += self.edges_weight(key) / 2.0;
        let node = &mut self.nodes[key];
        node.mass = mass;
        node.radius = radius_for_mass(mass);
    }

    fn random_position(&mut self) -> DVec3 {
        let d = self.max_node_distance;
        let x = self.rng.random_range(-1.0..1.0) * d;
        let y = self.rng.random_range(-1.0..1.0) * d;
        let z = if self.two_dimensional {
            0.0
        } else {
            self.rng.random_range(-1.0..1.0) * d
        };
        DVec3::new(x, y, z)
    }

    // ----- Nodes -----

    /// Materializes a node known to `registry`, creating its group ancestors as needed.
    pub fn add_node(&mut self, name: &str, registry: &NodeRegistry) -> GraphResult<NodeKey> {
        if self.node_table.contains_key(name) {
            return Err(GraphError::InvalidNode(format!("{name} already exists")));
        }
        let Some(path) = registry.path(name) else {
            return Err(GraphError::InvalidNode(format!(
                "got add_node for a node which is not in the node registry: [{name}]"
            )));
        };

        let position = self.random_position();
        let mut node = Node::new(name, position);
        node.label = registry.explicit_label(name);
        node.color = registry.color(name);
        node.group = registry.is_group(name);
        node.hidden = registry.is_hidden(name);
        let hidden = node.hidden;

        let key = self.nodes.insert(node);
        self.update_mass(key);
        self.node_table.insert(name.to_string(), key);
        self.push_to(
            if hidden {
                NodeArray::Hidden
            } else {
                NodeArray::Visible
            },
            key,
        );
        tracing::debug!(node = name, hidden, "node added");
        self.notify(GraphNotice::NodeAdded(name.to_string()));

        if path.len() > 1 {
            let parent_name = &path[path.len() - 2];
            let parent = match self.node_key(parent_name) {
                Some(parent) => parent,
                None => self.add_node(parent_name, registry)?,
            };
            self.reparent(key, Some(parent));
        }

        if !self.forward {
            self.resolve_dead_edges(key);
        }
        Ok(key)
    }

    pub fn remove_node_by_name(&mut self, name: &str) -> GraphResult<()> {
        let key = self
            .node_key(name)
            .ok_or_else(|| GraphError::InvalidNode(format!("could not find node {name}")))?;
        self.remove_node(key);
        Ok(())
    }

    /// Removes `key`, its children, and its parent group if it was the last child.
    pub fn remove_node(&mut self, key: NodeKey) {
        if self.nodes[key].group {
            loop {
                let children = &self.nodes[key].children;
                let Some(&first) = children.first() else {
                    break;
                };
                let last = children.len() == 1;
                self.remove_node(first);
                if last {
                    // removing the last child already removed this group
                    return;
                }
            }
        }

        self.reparent(key, None);

        if self.nodes[key].event_label.take().is_some() {
            self.labelled_nodes.retain(|&k| k != key);
        }
        self.active_nodes.retain(|&k| k != key);

        match self.membership(key) {
            Some(which) => self.remove_from(which, key),
            None => panic!("node {} is in neither node array", self.nodes[key].name),
        }
        let name = self.nodes[key].name.clone();
        self.node_table.remove(&name);
        self.transfer_edges(key, None, false);
        self.nodes.remove(key);
        tracing::debug!(node = %name, "node removed");
        self.notify(GraphNotice::NodeRemoved(name));
    }

    /// Detaches `key` from its current group and attaches it to `parent`.
    pub fn reparent(&mut self, key: NodeKey, parent: Option<NodeKey>) {
        if let Some(old) = self.nodes[key].parent {
            let canonical = self.canonical(key);
            // take back the edges this node owns from the group that held them
            self.transfer_edges(canonical, Some(key), true);

            if !self.nodes[key].hidden {
                self.move_between(NodeArray::Hidden, NodeArray::Visible, key);
            }
            let ids: Vec<u64> = self.nodes[key].activities.iter().map(|a| a.id).collect();
            for id in ids {
                self.remove_activity_from_chain(old, id);
            }
            self.nodes[old].children.retain(|&c| c != key);
            self.nodes[key].parent = None;

            if self.nodes[old].children.is_empty() {
                self.remove_node(old);
            } else {
                let root = self.canonical(old);
                self.update_mass(root);
            }
        }

        if let Some(parent) = parent {
            let canonical = self.canonical(parent);
            self.transfer_edges(key, Some(canonical), false);

            self.nodes[parent].children.insert(0, key);
            self.nodes[key].parent = Some(parent);

            let activities = self.nodes[key].activities.clone();
            for activity in activities {
                self.add_activity_to_chain(parent, activity);
            }

            let child_pos = self.nodes[key].position;
            let p = &mut self.nodes[parent];
            let n = p.children.len() as f64;
            if p.children.len() == 1 {
                p.position = child_pos;
            } else {
                p.position += (child_pos - p.position) / n;
            }

            if !self.nodes[key].hidden {
                self.move_between(NodeArray::Visible, NodeArray::Hidden, key);
            }
            assert_eq!(
                self.membership(key),
                Some(NodeArray::Hidden),
                "grouped node {} must be hidden",
                self.nodes[key].name
            );
            let root = self.canonical(parent);
            self.update_mass(root);
        }
        self.refresh_active(key);
    }

    /// Mirrors a registry hidden flag, moving ungrouped nodes between arrays.
    pub fn set_node_hidden(&mut self, key: NodeKey, hidden: bool) {
        let node = &self.nodes[key];
        if node.hidden == hidden {
            return;
        }
        if node.parent.is_none() {
            if hidden {
                self.move_between(NodeArray::Visible, NodeArray::Hidden, key);
            } else {
                self.move_between(NodeArray::Hidden, NodeArray::Visible, key);
            }
        }
        self.nodes[key].hidden = hidden;
    }

    pub fn unset_data(&mut self) {
        while let Some(&key) = self.visible.first() {
            self.remove_node(key);
        }
        while let Some(&key) = self.hidden.first() {
            self.remove_node(key);
        }
        self.dead_edges.clear();
        self.labelled_nodes.clear();
        self.labelled_edges.clear();
        self.active_nodes.clear();
        self.max_node_distance = INITIAL_MAX_NODE_DISTANCE;
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let name_of = |k: NodeKey| self.nodes[k].name.clone();
        let nodes = self
            .nodes
            .values()
            .map(|n| {
                (
                    n.name.clone(),
                    NodeSnapshot {
                        parent: n.parent.map(name_of),
                        group: n.group,
                        hidden: n.is_hidden(),
                    },
                )
            })
            .collect();
        let edges = self
            .edges
            .values()
            .map(|e| {
                (
                    e.name.clone(),
                    EdgeSnapshot {
                        tail: name_of(e.tail),
                        head: e.head.map(name_of),
                        tail_name: e.tail_name.clone(),
                        head_name: e.head_name.clone(),
                    },
                )
            })
            .collect();
        GraphSnapshot { nodes, edges }
    }

    /// Verifies array density, array membership and the mass formula.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (which, array) in [(NodeArray::Visible, &self.visible), (NodeArray::Hidden, &self.hidden)] {
            for (i, &key) in array.iter().enumerate() {
                let node = self
                    .nodes
                    .get(key)
                    .ok_or_else(|| format!("stale key at {which:?}[{i}]"))?;
                if node.index != i {
                    return Err(format!("{} has index {} at {which:?}[{i}]", node.name, node.index));
                }
                if node.is_hidden() != (which == NodeArray::Hidden) {
                    return Err(format!("{} hidden={} but in {which:?}", node.name, node.is_hidden()));
                }
            }
        }
        if self.visible.len() + self.hidden.len() != self.nodes.len() {
            return Err(format!(
                "{} nodes but {} in arrays",
                self.nodes.len(),
                self.visible.len() + self.hidden.len()
            ));
        }
        for group in self.groups.values() {
            if group.edges.is_empty() {
                return Err("empty edge group".to_string());
            }
            for (i, &ek) in group.edges.iter().enumerate() {
                if self.edges[ek].index != i {
                    return Err(format!("edge {} has index {} at {i}", self.edges[ek].name, self.edges[ek].index));
                }
            }
        }
        for (key, node) in self.nodes.iter() {
            let mut expected = NODE_MASS + self.edges_weight(key) / 2.0;
            for &c in &node.children {
                expected += self.nodes[c].mass;
            }
            if (node.mass - expected).abs() > 1e-9 {
                return Err(format!("{} mass {} expected {expected}", node.name, node.mass));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_core::Props;

    fn registry(names: &[&str]) -> NodeRegistry {
        let mut reg = NodeRegistry::new();
        for name in names {
            reg.insert_node(name, Props::new()).expect("insert");
        }
        reg
    }

    #[test]
    fn add_node_requires_registry_entry() {
        let reg = registry(&["a"]);
        let mut model = GraphModel::seeded(1);
        assert!(model.add_node("a", &reg).is_ok());
        assert!(matches!(
            model.add_node("ghost", &reg),
            Err(GraphError::InvalidNode(_))
        ));
    }

    #[test]
    fn new_nodes_start_inside_the_viewing_volume() {
        let reg = registry(&["a", "b", "c"]);
        let mut model = GraphModel::seeded(7);
        model.set_two_dimensional(true);
        for name in ["a", "b", "c"] {
            model.add_node(name, &reg).expect("add");
        }
        for (_, node) in model.nodes() {
            assert!(node.position.abs().max_element() <= INITIAL_MAX_NODE_DISTANCE);
            assert_eq!(node.position.z, 0.0);
            assert_eq!(node.mass, NODE_MASS);
        }
    }

    #[test]
    fn indices_stay_dense_after_removal() {
        let reg = registry(&["a", "b", "c", "d"]);
        let mut model = GraphModel::seeded(3);
        for name in ["a", "b", "c", "d"] {
            model.add_node(name, &reg).expect("add");
        }
        model.remove_node_by_name("b").expect("remove");
        model.check_invariants().expect("invariants");
        let names: Vec<&str> = model
            .visible_nodes()
            .iter()
            .map(|&k| model.nodes[k].name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "c", "d"]);
        assert_eq!(model.node_by_name("d").map(Node::index), Some(2));
    }

    #[test]
    fn grouped_registry_entries_create_their_parent() {
        let mut reg = registry(&["a", "b"]);
        reg.create_group("g", "red").expect("group");
        reg.move_to_group(Some("g"), "a").expect("move a");
        reg.move_to_group(Some("g"), "b").expect("move b");

        let mut model = GraphModel::seeded(5);
        model.add_node("a", &reg).expect("add a");
        model.add_node("b", &reg).expect("add b");

        let g = model.node_key("g").expect("group created");
        assert!(model.nodes[g].group);
        assert_eq!(model.nodes[g].children.len(), 2);
        assert_eq!(model.visible_nodes(), &[g]);
        assert_eq!(model.hidden_nodes().len(), 2);
        assert_eq!(model.nodes[g].mass, NODE_MASS * 3.0);
        model.check_invariants().expect("invariants");
    }

    #[test]
    fn group_position_tracks_children() {
        let mut reg = registry(&["a", "b"]);
        reg.create_group("g", "red").expect("group");
        reg.move_to_group(Some("g"), "a").expect("a");
        let mut model = GraphModel::seeded(9);
        model.add_node("a", &reg).expect("a");
        let g = model.node_key("g").expect("g");
        let a = model.node_key("a").expect("a");
        assert_eq!(model.nodes[g].position, model.nodes[a].position);

        let b = model.add_node("b", &reg).expect("b");
        model.nodes[b].position = DVec3::new(10.0, 0.0, 0.0);
        let before = model.nodes[g].position;
        model.reparent(b, Some(g));
        let expected = before + (DVec3::new(10.0, 0.0, 0.0) - before) / 2.0;
        assert!((model.nodes[g].position - expected).length() < 1e-12);
    }

    #[test]
    fn removing_last_child_removes_group() {
        let mut reg = registry(&["a"]);
        reg.create_group("g", "red").expect("group");
        reg.move_to_group(Some("g"), "a").expect("a");
        let mut model = GraphModel::seeded(2);
        model.add_node("a", &reg).expect("a");
        assert!(model.node_key("g").is_some());

        model.remove_node_by_name("a").expect("remove");
        assert!(model.node_key("g").is_none());
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn removing_group_removes_children() {
        let mut reg = registry(&["a", "b"]);
        reg.create_group("g", "red").expect("group");
        reg.move_to_group(Some("g"), "a").expect("a");
        reg.move_to_group(Some("g"), "b").expect("b");
        let mut model = GraphModel::seeded(2);
        model.add_node("a", &reg).expect("a");
        model.add_node("b", &reg).expect("b");

        model.remove_node_by_name("g").expect("remove group");
        assert_eq!(model.node_count(), 0);
        model.check_invariants().expect("invariants");
    }

    #[test]
    fn hidden_flag_moves_root_nodes_between_arrays() {
        let reg = registry(&["a", "b"]);
        let mut model = GraphModel::seeded(4);
        let a = model.add_node("a", &reg).expect("a");
        model.add_node("b", &reg).expect("b");

        model.set_node_hidden(a, true);
        assert_eq!(model.membership(a), Some(NodeArray::Hidden));
        assert_eq!(model.visible_nodes().len(), 1);
        model.set_node_hidden(a, false);
        assert_eq!(model.membership(a), Some(NodeArray::Visible));
        model.check_invariants().expect("invariants");
    }

    #[test]
    fn radius_grows_with_mass() {
        assert!(radius_for_mass(2.0) > radius_for_mass(1.0));
        let r = radius_for_mass(NODE_MASS);
        assert!((r - 2.0 * (0.75 / std::f64::consts::PI).cbrt()).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn canonical_lookup_rejects_cycles() {
        let reg = registry(&["a", "b"]);
        let mut model = GraphModel::seeded(1);
        let a = model.add_node("a", &reg).expect("a");
        let b = model.add_node("b", &reg).expect("b");
        model.nodes[a].parent = Some(b);
        model.nodes[b].parent = Some(a);
        model.canonical(a);
    }
}
