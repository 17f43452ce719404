use glam::DVec3;
use std::collections::HashSet;

use crate::graph::model::{GraphModel, NodeArray, NodeKey};

pub const DEFAULT_CENTRAL_PULL: f64 = -0.005;
pub const DEFAULT_ATTRACT: f64 = -0.5;
pub const DEFAULT_REPEL: f64 = 100.0;
pub const DEFAULT_FRICTION: f64 = 2.0;
pub const DEFAULT_SPRING_LENGTH: f64 = 60.0;

const MIN_DISTANCE: f64 = 1e-7;
const DT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub central_pull: f64,
    pub attract: f64,
    pub repel: f64,
    /// Zero disables friction entirely.
    pub friction: f64,
    pub spring_length: f64,
    pub two_dimensional: bool,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            central_pull: DEFAULT_CENTRAL_PULL,
            attract: DEFAULT_ATTRACT,
            repel: DEFAULT_REPEL,
            friction: DEFAULT_FRICTION,
            spring_length: DEFAULT_SPRING_LENGTH,
            two_dimensional: false,
        }
    }
}

/// A configured constant of zero means "use the default".
pub fn or_default(value: f64, default: f64) -> f64 {
    if value == 0.0 {
        default
    } else {
        value
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Some node moved past the previous viewing volume.
    pub volume_grew: bool,
}

fn separation(model: &GraphModel, a: NodeKey, b: NodeKey) -> (DVec3, f64) {
    let d = model.nodes[b].position - model.nodes[a].position;
    (d, d.length().max(MIN_DISTANCE))
}

fn push_apart(model: &mut GraphModel, a: NodeKey, b: NodeKey, force: f64, d: DVec3, dist: f64) {
    let f = d * (force / dist);
    model.nodes[a].force += f;
    model.nodes[b].force -= f;
}

fn repel(model: &mut GraphModel, params: &LayoutParams, a: NodeKey, b: NodeKey) {
    let (d, dist) = separation(model, a, b);
    let force = params.repel * model.nodes[a].mass * model.nodes[b].mass / (dist * dist);
    push_apart(model, a, b, force, d, dist);
}

fn attract(model: &mut GraphModel, params: &LayoutParams, a: NodeKey, b: NodeKey, weight: f64) {
    let (d, dist) = separation(model, a, b);
    // springs only ever pull, and heavier edges want to be shorter
    let force = (params.attract * (dist - params.spring_length / weight) * weight).min(0.0);
    push_apart(model, a, b, force, d, dist);
}

pub fn apply_forces(model: &mut GraphModel, params: &LayoutParams) {
    let visible = model.visible.clone();
    let mut seen = HashSet::new();

    for (i, &key) in visible.iter().enumerate() {
        let node = &mut model.nodes[key];
        node.force -= params.central_pull * node.mass * node.position;

        for &other in &visible[i + 1..] {
            repel(model, params, key, other);
        }

        let groups = model.nodes[key].edge_groups.clone();
        for group in groups {
            if !seen.insert(group) {
                continue;
            }
            let edges = model.groups[group].edges.clone();
            for ek in edges {
                let edge = &model.edges[ek];
                let Some(head) = edge.head else { continue };
                let (tail, weight) = (edge.tail, edge.weight());
                if tail == head || weight == 0.0 {
                    continue;
                }
                if model.membership(head) != Some(NodeArray::Visible)
                    || model.membership(tail) != Some(NodeArray::Visible)
                {
                    continue;
                }
                attract(model, params, tail, head, weight);
            }
        }
    }
}

pub fn integrate(model: &mut GraphModel, params: &LayoutParams) -> TickOutcome {
    let flat = params.two_dimensional || model.two_dimensional();
    let previous = model.max_node_distance;
    let mut max_distance = previous;

    for i in 0..model.visible.len() {
        let key = model.visible[i];
        let node = &mut model.nodes[key];
        node.velocity += node.force * DT;
        if params.friction != 0.0 {
            node.velocity /= params.friction * node.mass;
        }
        node.position -= node.velocity * DT;
        if flat {
            node.position.z = 0.0;
            node.velocity.z = 0.0;
        }
        node.force = DVec3::ZERO;

        let reach = node.position.abs().max_element() + node.radius;
        if reach > max_distance {
            max_distance = reach;
        }
    }

    model.max_node_distance = max_distance;
    TickOutcome {
        volume_grew: max_distance > previous,
    }
}

pub fn step(model: &mut GraphModel, params: &LayoutParams) -> TickOutcome {
    apply_forces(model, params);
    integrate(model, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::NODE_MASS;
    use crate::registry::NodeRegistry;
    use approx::assert_relative_eq;
    use replay_core::Props;

    fn pair(edge: bool) -> GraphModel {
        let mut reg = NodeRegistry::new();
        reg.insert_node("a", Props::new()).expect("a");
        reg.insert_node("b", Props::new()).expect("b");
        let mut model = GraphModel::seeded(11);
        model.set_two_dimensional(true);
        model.add_node("a", &reg).expect("a");
        model.add_node("b", &reg).expect("b");
        model.place_node("a", DVec3::new(-50.0, 0.0, 0.0)).expect("a");
        model.place_node("b", DVec3::new(50.0, 0.0, 0.0)).expect("b");
        if edge {
            model.add_edge(true, "e1", "a", "b", Props::new()).expect("e1");
        }
        model
    }

    #[test]
    fn zero_means_default() {
        assert_eq!(or_default(0.0, DEFAULT_REPEL), DEFAULT_REPEL);
        assert_eq!(or_default(3.0, DEFAULT_REPEL), 3.0);
    }

    #[test]
    fn connected_nodes_move_toward_each_other() {
        let mut model = pair(true);
        let params = LayoutParams::default();
        let mass_before = model.node_by_name("a").map(|n| n.mass);

        step(&mut model, &params);

        let a = model.node_by_name("a").expect("a");
        let b = model.node_by_name("b").expect("b");
        assert!(a.position.x > -50.0);
        assert!(b.position.x < 50.0);
        assert_relative_eq!(a.position.x, -b.position.x, epsilon = 1e-9);
        assert_eq!(a.position.z, 0.0);
        assert_eq!(Some(a.mass), mass_before);

        // spring -20 plus repulsion 0.01 plus central pull -0.25, over friction*mass
        let mass = NODE_MASS + 0.5;
        let expected = -50.0 + (20.0 - 0.01 + 0.25) / (DEFAULT_FRICTION * mass);
        assert_relative_eq!(a.position.x, expected, epsilon = 1e-9);
    }

    #[test]
    fn unconnected_nodes_only_drift_inward_slightly() {
        let mut model = pair(false);
        step(&mut model, &LayoutParams::default());
        let a = model.node_by_name("a").expect("a");
        // repulsion 0.01 outward against central pull 0.25 inward
        let expected = -50.0 + (0.25 - 0.01) / (DEFAULT_FRICTION * NODE_MASS);
        assert_relative_eq!(a.position.x, expected, epsilon = 1e-9);
    }

    #[test]
    fn forces_are_reset_after_each_tick() {
        let mut model = pair(true);
        step(&mut model, &LayoutParams::default());
        assert!(model.nodes().all(|(_, n)| n.force == DVec3::ZERO));
    }

    #[test]
    fn far_nodes_grow_the_viewing_volume() {
        let mut model = pair(false);
        model.place_node("b", DVec3::new(500.0, 0.0, 0.0)).expect("b");
        let outcome = step(&mut model, &LayoutParams::default());
        assert!(outcome.volume_grew);
        assert!(model.max_node_distance() > 400.0);

        let again = step(&mut model, &LayoutParams::default());
        assert!(!again.volume_grew);
    }

    #[test]
    fn zero_weight_edges_exert_no_pull() {
        let mut with_edge = pair(false);
        with_edge
            .add_edge(true, "e", "a", "b", replay_core::props([("weight", 0.0)]))
            .expect("edge");
        let mut without = pair(false);
        step(&mut with_edge, &LayoutParams::default());
        step(&mut without, &LayoutParams::default());
        let x = |m: &GraphModel| m.node_by_name("a").map(|n| n.position.x);
        assert_eq!(x(&with_edge), x(&without));
    }
}
