//! Decoding hit-test name stacks into nodes and edges, and the selection sets
//! built from them.

use smallvec::SmallVec;

use crate::graph::model::{EdgeKey, GraphModel, NodeArray, NodeKey};

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub z_min: f32,
    /// Either `[node index]` or `[node index, edge group index, edge index]`.
    pub names: SmallVec<[u32; 3]>,
}

impl Hit {
    pub fn node(z_min: f32, index: u32) -> Self {
        Self {
            z_min,
            names: SmallVec::from_slice(&[index]),
        }
    }

    pub fn edge(z_min: f32, node: u32, group: u32, edge: u32) -> Self {
        Self {
            z_min,
            names: SmallVec::from_slice(&[node, group, edge]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picked {
    Node(NodeKey),
    Edge(EdgeKey),
}

fn visible_node(model: &GraphModel, index: u32) -> Option<NodeKey> {
    model.visible_nodes().get(index as usize).copied()
}

pub fn decode_hit(model: &GraphModel, hit: &Hit) -> Option<Picked> {
    match hit.names.as_slice() {
        [index] => visible_node(model, *index).map(Picked::Node),
        [index, group, edge] => {
            let node = model.node(visible_node(model, *index)?)?;
            let group = model.edge_group(*node.edge_groups().get(*group as usize)?)?;
            group.edges().get(*edge as usize).copied().map(Picked::Edge)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    hovered: Option<Picked>,
    picked: Vec<NodeKey>,
    selected: Vec<NodeKey>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<Picked> {
        self.hovered
    }

    pub fn picked(&self) -> &[NodeKey] {
        &self.picked
    }

    pub fn selected(&self) -> &[NodeKey] {
        &self.selected
    }

    pub fn is_selected(&self, key: NodeKey) -> bool {
        self.selected.contains(&key)
    }

    /// Hover goes to whatever is nearest the viewer.
    pub fn hover(&mut self, model: &GraphModel, hits: &[Hit]) {
        self.hovered = hits
            .iter()
            .min_by(|a, b| a.z_min.total_cmp(&b.z_min))
            .and_then(|hit| decode_hit(model, hit));
    }

    /// A point click toggles; a rectangle adds every node it caught.
    pub fn pick(&mut self, model: &GraphModel, hits: &[Hit]) {
        match hits {
            [] => {}
            [hit] => {
                let Some(Picked::Node(key)) = decode_hit(model, hit) else {
                    return;
                };
                if let Some(i) = self.selected.iter().position(|&k| k == key) {
                    self.selected.remove(i);
                } else if !self.picked.contains(&key) {
                    self.picked.push(key);
                }
            }
            _ => {
                for hit in hits.iter().filter(|h| h.names.len() == 1) {
                    if let Some(Picked::Node(key)) = decode_hit(model, hit) {
                        if !self.selected.contains(&key) && !self.picked.contains(&key) {
                            self.picked.push(key);
                        }
                    }
                }
            }
        }
    }

    pub fn commit_picked(&mut self) {
        for key in self.picked.drain(..) {
            if !self.selected.contains(&key) {
                self.selected.push(key);
            }
        }
    }

    /// Names of picked, selected and hovered nodes, each reported once.
    pub fn selected_ids(&mut self, model: &GraphModel) -> Vec<String> {
        self.prune(model);
        let hovered = match self.hovered {
            Some(Picked::Node(key)) => Some(key),
            _ => None,
        };
        if let Some(h) = hovered {
            self.picked.retain(|&k| k != h);
            self.selected.retain(|&k| k != h);
        }
        self.picked
            .iter()
            .chain(self.selected.iter())
            .chain(hovered.iter())
            .filter_map(|&k| model.node(k).map(|n| n.name.clone()))
            .collect()
    }

    /// Replaces the selection with the named nodes that are currently visible.
    pub fn set_selected_ids<S: AsRef<str>>(&mut self, model: &GraphModel, names: &[S]) {
        self.picked.clear();
        self.selected = names
            .iter()
            .filter_map(|name| model.node_key(name.as_ref()))
            .filter(|&k| model.membership(k) == Some(NodeArray::Visible))
            .collect();
        self.selected.dedup();
    }

    pub fn invert_selection(&mut self, model: &GraphModel) {
        let inverted = model
            .visible_nodes()
            .iter()
            .copied()
            .filter(|k| !self.picked.contains(k) && !self.selected.contains(k))
            .collect();
        self.picked.clear();
        self.selected = inverted;
    }

    /// Adds the heads of edges leaving selected or picked nodes.
    pub fn expand_selection(&mut self, model: &GraphModel) {
        let from: Vec<NodeKey> = self.selected.iter().chain(self.picked.iter()).copied().collect();
        self.grow(model, &from, |tail, head, node| (tail == node).then_some(head));
    }

    /// Adds the tails of edges arriving at selected nodes.
    pub fn contract_selection(&mut self, model: &GraphModel) {
        let from = self.selected.clone();
        self.grow(model, &from, |tail, head, node| (head == node).then_some(tail));
    }

    fn grow(
        &mut self,
        model: &GraphModel,
        from: &[NodeKey],
        other_end: impl Fn(NodeKey, NodeKey, NodeKey) -> Option<NodeKey>,
    ) {
        let mut added = Vec::new();
        for &key in from {
            let Some(node) = model.node(key) else { continue };
            for group in node.edge_groups() {
                let Some(group) = model.edge_group(*group) else { continue };
                for edge in group.edges().iter().filter_map(|&ek| model.edge(ek)) {
                    let Some(head) = edge.head() else { continue };
                    if let Some(k) = other_end(edge.tail(), head, key) {
                        if k != key
                            && model.membership(k) == Some(NodeArray::Visible)
                            && !self.selected.contains(&k)
                            && !self.picked.contains(&k)
                            && !added.contains(&k)
                        {
                            added.push(k);
                        }
                    }
                }
            }
        }
        self.selected.extend(added);
    }

    pub fn unselect_all(&mut self) {
        self.picked.clear();
        self.selected.clear();
    }

    pub fn prune(&mut self, model: &GraphModel) {
        self.picked.retain(|&k| model.node(k).is_some());
        self.selected.retain(|&k| model.node(k).is_some());
        self.hovered = self.hovered.filter(|p| match *p {
            Picked::Node(k) => model.node(k).is_some(),
            Picked::Edge(k) => model.edge(k).is_some(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use replay_core::Props;

    /// a -> b -> c, plus an isolated d.
    fn chain() -> GraphModel {
        let mut reg = NodeRegistry::new();
        for name in ["a", "b", "c", "d"] {
            reg.insert_node(name, Props::new()).expect("insert");
        }
        let mut model = GraphModel::seeded(8);
        for name in ["a", "b", "c", "d"] {
            model.add_node(name, &reg).expect("add");
        }
        model.add_edge(true, "ab", "a", "b", Props::new()).expect("ab");
        model.add_edge(true, "bc", "b", "c", Props::new()).expect("bc");
        model
    }

    fn index_of(model: &GraphModel, name: &str) -> u32 {
        model.node_by_name(name).map(|n| n.index() as u32).expect("node")
    }

    #[test]
    fn hover_prefers_nearest_hit() {
        let model = chain();
        let mut sel = Selection::new();
        sel.hover(
            &model,
            &[
                Hit::node(0.8, index_of(&model, "a")),
                Hit::node(0.2, index_of(&model, "c")),
            ],
        );
        assert_eq!(sel.hovered(), model.node_key("c").map(Picked::Node));
    }

    #[test]
    fn three_names_decode_to_an_edge() {
        let model = chain();
        let hit = Hit::edge(0.1, index_of(&model, "a"), 0, 0);
        assert_eq!(decode_hit(&model, &hit), model.edge_key("ab").map(Picked::Edge));
        assert_eq!(decode_hit(&model, &Hit::edge(0.1, 99, 0, 0)), None);
    }

    #[test]
    fn click_toggles_and_release_commits() {
        let model = chain();
        let mut sel = Selection::new();
        let a = [Hit::node(0.5, index_of(&model, "a"))];
        sel.pick(&model, &a);
        assert_eq!(sel.picked().len(), 1);
        sel.commit_picked();
        assert_eq!(sel.selected(), &[model.node_key("a").expect("a")]);

        sel.pick(&model, &a);
        assert!(sel.selected().is_empty());
        assert!(sel.picked().is_empty());
    }

    #[test]
    fn rectangle_skips_already_selected_and_edges() {
        let model = chain();
        let mut sel = Selection::new();
        sel.set_selected_ids(&model, &["a"]);
        sel.pick(
            &model,
            &[
                Hit::node(0.5, index_of(&model, "a")),
                Hit::node(0.5, index_of(&model, "b")),
                Hit::edge(0.5, index_of(&model, "a"), 0, 0),
            ],
        );
        assert_eq!(sel.picked(), &[model.node_key("b").expect("b")]);
    }

    #[test]
    fn hovered_node_is_reported_once() {
        let model = chain();
        let mut sel = Selection::new();
        sel.set_selected_ids(&model, &["a", "b"]);
        sel.hover(&model, &[Hit::node(0.1, index_of(&model, "a"))]);
        assert_eq!(sel.selected_ids(&model), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn invert_expand_and_contract() {
        let model = chain();
        let mut sel = Selection::new();
        sel.set_selected_ids(&model, &["a", "ghost"]);
        sel.invert_selection(&model);
        assert_eq!(sel.selected_ids(&model), vec!["b", "c", "d"]);

        sel.set_selected_ids(&model, &["a"]);
        sel.expand_selection(&model);
        assert_eq!(sel.selected_ids(&model), vec!["a", "b"]);

        sel.set_selected_ids(&model, &["c"]);
        sel.contract_selection(&model);
        assert_eq!(sel.selected_ids(&model), vec!["c", "b"]);

        sel.unselect_all();
        assert!(sel.selected_ids(&model).is_empty());
    }

    #[test]
    fn expand_follows_picked_nodes_too() {
        let model = chain();
        let mut sel = Selection::new();
        sel.pick(&model, &[Hit::node(0.5, index_of(&model, "b"))]);
        sel.expand_selection(&model);
        assert_eq!(sel.selected(), &[model.node_key("c").expect("c")]);
        assert_eq!(sel.selected_ids(&model), vec!["b", "c"]);
    }

    #[test]
    fn hidden_nodes_cannot_be_selected_by_name() {
        let mut model = chain();
        let d = model.node_key("d").expect("d");
        model.set_node_hidden(d, true);
        let mut sel = Selection::new();
        sel.set_selected_ids(&model, &["d", "c"]);
        assert_eq!(sel.selected_ids(&model), vec!["c"]);
    }
}
