//! Edge bookkeeping: shared edge groups, dead edges and edge transfer between nodes.

use replay_core::Props;

use crate::error::{GraphError, GraphResult};
use crate::graph::listener::GraphNotice;
use crate::graph::model::{Edge, EdgeGroup, EdgeGroupKey, EdgeKey, GraphModel, NodeKey};
use crate::props::PropertyStore;

impl GraphModel {
    /// Group in `node`'s list holding edges between `a` and `b`, in either direction.
    fn find_edge_group(&self, node: NodeKey, a: NodeKey, b: Option<NodeKey>) -> Option<EdgeGroupKey> {
        self.nodes[node].edge_groups.iter().copied().find(|&g| {
            let group = &self.groups[g];
            assert!(!group.edges.is_empty(), "empty edge group kept alive");
            let first = &self.edges[group.edges[0]];
            (first.tail == a && first.head == b) || (first.head == Some(a) && Some(first.tail) == b)
        })
    }

    pub(crate) fn node_add_edge(&mut self, ek: EdgeKey) {
        let (tail, head) = (self.edges[ek].tail, self.edges[ek].head);
        let group = match self.find_edge_group(tail, tail, head) {
            Some(group) => group,
            None => {
                let group = self.groups.insert(EdgeGroup::default());
                self.nodes[tail].edge_groups.push(group);
                if let Some(head) = head.filter(|&h| h != tail) {
                    self.nodes[head].edge_groups.push(group);
                }
                group
            }
        };

        let edges = &mut self.groups[group].edges;
        if !edges.contains(&ek) {
            self.edges[ek].index = edges.len();
            edges.push(ek);
            self.update_endpoint_masses(tail, head);
        }
    }

    pub(crate) fn node_remove_edge(&mut self, ek: EdgeKey) {
        let (tail, head) = (self.edges[ek].tail, self.edges[ek].head);
        let Some(group) = self.find_edge_group(tail, tail, head) else {
            panic!("edge {} missing from its tail's edge groups", self.edges[ek].name);
        };

        let index = self.edges[ek].index;
        let edges = &mut self.groups[group].edges;
        assert!(
            edges.get(index) == Some(&ek),
            "edge {} is not at index {index} of its group",
            self.edges[ek].name
        );
        edges.remove(index);
        for (i, &other) in edges.iter().enumerate().skip(index) {
            self.edges[other].index = i;
        }

        if self.groups[group].edges.is_empty() {
            self.nodes[tail].edge_groups.retain(|&g| g != group);
            if let Some(head) = head.filter(|&h| h != tail) {
                self.nodes[head].edge_groups.retain(|&g| g != group);
            }
            self.groups.remove(group);
        }
        self.update_endpoint_masses(tail, head);
    }

    fn update_endpoint_masses(&mut self, tail: NodeKey, head: Option<NodeKey>) {
        let tail_root = self.canonical(tail);
        self.update_mass(tail_root);
        if let Some(head) = head.filter(|&h| h != tail) {
            let head_root = self.canonical(head);
            if head_root != tail_root {
                self.update_mass(head_root);
            }
        }
    }

    fn free_edge(&mut self, ek: EdgeKey) {
        let Some(edge) = self.edges.remove(ek) else {
            return;
        };
        self.edge_table.remove(&edge.name);
        self.dead_edges.retain(|&k| k != ek);
        self.labelled_edges.retain(|&k| k != ek);
        tracing::debug!(edge = %edge.name, "edge removed");
        self.notify(GraphNotice::EdgeRemoved(edge.name));
    }

    /// Moves edges held by `node` over to `new`.
    ///
    /// With `match_new` only edges whose recorded tail or head name belongs to
    /// `new` (or one of its descendants) move. Edges whose tail leaves with no
    /// replacement are freed; edges whose head leaves with no replacement
    /// become dead edges.
    pub(crate) fn transfer_edges(&mut self, node: NodeKey, new: Option<NodeKey>, match_new: bool) {
        assert!(!match_new || new.is_some(), "matching transfer needs a target");
        let owned_by_new = |model: &GraphModel, name: &str| match new {
            Some(new) => !match_new || model.node_has_name(new, name),
            None => true,
        };

        let candidates: Vec<EdgeKey> = self.nodes[node]
            .edge_groups
            .iter()
            .flat_map(|&g| self.groups[g].edges.iter().copied())
            .collect();

        for ek in candidates {
            let Some(edge) = self.edges.get(ek) else {
                continue;
            };
            if edge.tail == node && owned_by_new(self, &edge.tail_name) {
                self.node_remove_edge(ek);
                match new {
                    Some(new) => {
                        self.edges[ek].tail = new;
                        self.node_add_edge(ek);
                    }
                    None => {
                        self.free_edge(ek);
                        continue;
                    }
                }
            }

            let edge = &self.edges[ek];
            if edge.head == Some(node) && owned_by_new(self, &edge.head_name) {
                self.node_remove_edge(ek);
                self.edges[ek].head = new;
                self.node_add_edge(ek);
                if new.is_none() {
                    let n = &self.nodes[node];
                    let info = format!(
                        "Original target: {} ({})\n",
                        n.label.as_deref().unwrap_or(""),
                        n.name
                    );
                    self.edges[ek].hover_info = Some(info);
                    self.dead_edges.insert(0, ek);
                }
            }
        }
    }

    pub(crate) fn resolve_dead_edges(&mut self, key: NodeKey) {
        let name = self.nodes[key].name.clone();
        let head = self.canonical(key);
        let matching: Vec<EdgeKey> = self
            .dead_edges
            .iter()
            .copied()
            .filter(|&ek| self.edges[ek].head_name.eq_ignore_ascii_case(&name))
            .collect();
        for ek in matching {
            assert!(self.edges[ek].head.is_none(), "dead edge with a head");
            self.dead_edges.retain(|&k| k != ek);
            self.node_remove_edge(ek);
            let edge = &mut self.edges[ek];
            edge.head = Some(head);
            edge.hover_info = None;
            self.node_add_edge(ek);
            tracing::debug!(edge = %self.edges[ek].name, head = %name, "dead edge resolved");
        }
    }

    /// Adds an edge between the canonical nodes of `tail` and `head`.
    ///
    /// An unknown head is only accepted while playing backward, in which case
    /// the edge is kept as a dead edge until its head is recreated.
    pub fn add_edge(
        &mut self,
        directed: bool,
        name: &str,
        tail: &str,
        head: &str,
        props: Props,
    ) -> GraphResult<EdgeKey> {
        if self.edge_table.contains_key(name) {
            return Err(GraphError::InvalidEdge(format!("edge {name} already exists")));
        }
        let tail_key = self
            .node_key(tail)
            .ok_or_else(|| GraphError::InvalidNode(format!("could not find tail node {tail}")))?;
        let tail_key = self.canonical(tail_key);
        let head_key = self.node_key(head).map(|k| self.canonical(k));

        let dead = head_key.is_none();
        if dead && (self.is_forward() || head.is_empty()) {
            return Err(GraphError::InvalidEdge(format!(
                "could not find head node {head} for edge {name}"
            )));
        }

        let mut store = PropertyStore::new();
        if !props.is_empty() {
            store.push(props);
        }
        let ek = self.edges.insert(Edge {
            name: name.to_string(),
            directed,
            tail_name: tail.to_string(),
            head_name: head.to_string(),
            props: store,
            event_label: None,
            label_position: 0.5,
            hover_info: None,
            tail: tail_key,
            head: head_key,
            index: 0,
        });
        if dead {
            self.dead_edges.insert(0, ek);
        }
        self.edge_table.insert(name.to_string(), ek);
        self.node_add_edge(ek);
        tracing::debug!(edge = name, tail, head, dead, "edge added");
        self.notify(GraphNotice::EdgeAdded(name.to_string()));
        Ok(ek)
    }

    pub fn remove_edge(&mut self, name: &str) -> GraphResult<()> {
        let ek = self
            .edge_key(name)
            .ok_or_else(|| GraphError::InvalidEdge(format!("could not find edge {name}")))?;
        self.node_remove_edge(ek);
        self.free_edge(ek);
        Ok(())
    }

    pub fn push_edge_props(&mut self, name: &str, props: Props) -> GraphResult<()> {
        let ek = self
            .edge_key(name)
            .ok_or_else(|| GraphError::InvalidEdge(format!("could not find edge {name}")))?;
        self.edges[ek].props.push(props);
        let (tail, head) = (self.edges[ek].tail, self.edges[ek].head);
        self.update_endpoint_masses(tail, head);
        Ok(())
    }

    pub fn pop_edge_props(&mut self, name: &str, props: &Props) -> GraphResult<()> {
        let ek = self
            .edge_key(name)
            .ok_or_else(|| GraphError::InvalidEdge(format!("could not find edge {name}")))?;
        self.edges[ek].props.pop(props);
        let (tail, head) = (self.edges[ek].tail, self.edges[ek].head);
        self.update_endpoint_masses(tail, head);
        Ok(())
    }
}
