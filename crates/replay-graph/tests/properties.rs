use proptest::prelude::*;
use replay_core::{props, Event, EventKind, Props};
use replay_graph::graph::layout::LayoutParams;
use replay_graph::graph::{EventPlayer, GraphModel, GraphSnapshot, GraphView, RenderContext};
use replay_graph::{EventPos, EventStore, NodeRegistry};

const NODES: [&str; 6] = ["n0", "n1", "n2", "n3", "n4", "n5"];
const GROUPS: [&str; 2] = ["g0", "g1"];

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    Connect(usize, usize, u8),
    Disconnect(usize),
    Group(usize, usize),
    Ungroup(usize),
    Hide(usize, bool),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NODES.len()).prop_map(Op::Add),
        1 => (0..NODES.len()).prop_map(Op::Remove),
        3 => (0..NODES.len(), 0..NODES.len(), 0u8..4)
            .prop_filter("no self loops", |(a, b, _)| a != b)
            .prop_map(|(a, b, w)| Op::Connect(a, b, w)),
        1 => (0..16usize).prop_map(Op::Disconnect),
        2 => (0..NODES.len(), 0..GROUPS.len()).prop_map(|(n, g)| Op::Group(n, g)),
        1 => (0..NODES.len()).prop_map(Op::Ungroup),
        1 => (0..NODES.len(), any::<bool>()).prop_map(|(n, h)| Op::Hide(n, h)),
    ]
}

fn headless_view() -> GraphView {
    let mut view = GraphView::new(GraphModel::seeded(17), LayoutParams::default(), 100);
    view.set_render_context(RenderContext {
        available: false,
        selecting: false,
    });
    view
}

fn apply(view: &mut GraphView, op: &Op, next_edge: &mut usize) {
    match *op {
        Op::Add(n) => {
            let _ = view.model().add_node(NODES[n], view.registry());
        }
        Op::Remove(n) => {
            let _ = view.model().remove_node_by_name(NODES[n]);
        }
        Op::Connect(a, b, w) => {
            let name = format!("e{next_edge}");
            *next_edge += 1;
            let _ = view.model().add_edge(
                true,
                &name,
                NODES[a],
                NODES[b],
                props([("weight", f64::from(w) * 0.5)]),
            );
        }
        Op::Disconnect(i) => {
            let names: Vec<String> = {
                let model = view.model();
                let mut names: Vec<String> = model.edges().map(|(_, e)| e.name.clone()).collect();
                names.sort();
                names
            };
            if !names.is_empty() {
                let _ = view.model().remove_edge(&names[i % names.len()]);
            }
        }
        Op::Group(n, g) => {
            let registry = view.registry_mut();
            if !registry.contains(GROUPS[g]) {
                let _ = registry.create_group(GROUPS[g], "blue");
            }
            let _ = registry.move_to_group(Some(GROUPS[g]), NODES[n]);
            view.sync_registry();
        }
        Op::Ungroup(n) => {
            let _ = view.registry_mut().remove_from_group(NODES[n]);
            view.sync_registry();
        }
        Op::Hide(n, hidden) => {
            let _ = view.registry_mut().request_hidden(NODES[n], hidden);
            view.sync_registry();
        }
    }
}

fn view_with_registry() -> GraphView {
    let mut view = headless_view();
    for name in NODES {
        view.registry_mut()
            .insert_node(name, Props::new())
            .expect("register");
    }
    view.sync_registry();
    view
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn structure_invariants_hold_after_every_mutation(ops in prop::collection::vec(op(), 1..60)) {
        let mut view = view_with_registry();
        let mut next_edge = 0;
        for op in &ops {
            apply(&mut view, op, &mut next_edge);
            let result = view.model().check_invariants();
            prop_assert!(result.is_ok(), "after {:?}: {:?}", op, result);
        }
    }

    #[test]
    fn hidden_iff_requested_or_parent_hidden_or_all_children_hidden(
        groups in prop::collection::vec((0..NODES.len(), prop::option::of(0..GROUPS.len())), 0..12),
        hides in prop::collection::vec((0..NODES.len() + GROUPS.len(), any::<bool>()), 0..12),
    ) {
        let mut reg = NodeRegistry::new();
        for name in NODES {
            reg.insert_node(name, Props::new()).expect("node");
        }
        for group in GROUPS {
            reg.create_group(group, "red").expect("group");
        }
        let _ = reg.move_to_group(Some("g0"), "g1");
        for (n, g) in groups {
            let _ = reg.move_to_group(g.map(|g| GROUPS[g]), NODES[n]);
        }
        let all: Vec<&str> = NODES.iter().chain(GROUPS.iter()).copied().collect();
        for (i, hidden) in hides {
            let _ = reg.request_hidden(all[i], hidden);
        }

        let names: Vec<String> = reg.names().map(str::to_string).collect();
        for name in &names {
            let children = reg.children(name);
            let parent_hidden = reg.parent(name).is_some_and(|p| reg.is_hidden(p));
            let children_hidden = !children.is_empty() && children.iter().all(|c| reg.is_hidden(c));
            let expected = reg.hidden_requested(name) || parent_hidden || children_hidden;
            prop_assert_eq!(reg.is_hidden(name), expected, "entry {}", name);
        }
    }
}

/// Turns arbitrary choices into a trace that only references live entities.
#[derive(Default)]
struct TraceBuilder {
    events: Vec<Event>,
    ts: i64,
    next: usize,
    live_nodes: Vec<String>,
    live_edges: Vec<(String, String, String)>,
    activities: Vec<(String, String)>,
}

impl TraceBuilder {
    fn push(&mut self, same_step: bool, kind: EventKind) {
        if !same_step {
            self.ts += 1;
        }
        self.events.push(Event::new(self.ts, "prop", kind));
    }

    fn fresh(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}{}", self.next)
    }

    fn step(&mut self, choice: u8, a: usize, b: usize, same_step: bool) {
        let nodes = self.live_nodes.len();
        match choice % 8 {
            0 => {
                let id = self.fresh("n");
                self.live_nodes.push(id.clone());
                self.push(same_step, EventKind::NodeCreate { id, props: Props::new() });
            }
            1 if nodes > 0 => {
                let id = self.live_nodes.remove(a % nodes);
                let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.live_edges)
                    .into_iter()
                    .partition(|(_, t, h)| *t == id || *h == id);
                self.live_edges = kept;
                for (edge, _, _) in gone {
                    self.push(same_step, EventKind::EdgeDelete { id: edge });
                }
                let ended: Vec<_> = self.activities.iter().filter(|(_, n)| *n == id).cloned().collect();
                self.activities.retain(|(_, n)| *n != id);
                for (act, node) in ended {
                    self.push(same_step, EventKind::ActivityEnd { id: act, node });
                }
                self.push(same_step, EventKind::NodeDelete { id });
            }
            2 if nodes > 0 => {
                let id = self.fresh("e");
                let (tail, head) = (self.live_nodes[a % nodes].clone(), self.live_nodes[b % nodes].clone());
                self.live_edges.push((id.clone(), tail.clone(), head.clone()));
                let kind = EventKind::EdgeCreate {
                    id,
                    directed: a % 2 == 0,
                    tail,
                    head,
                    props: props([("weight", 1.0 + (b % 3) as f64)]),
                };
                self.push(same_step, kind);
            }
            3 if !self.live_edges.is_empty() => {
                let (id, _, _) = self.live_edges.remove(a % self.live_edges.len());
                self.push(same_step, EventKind::EdgeDelete { id });
            }
            4 if nodes > 0 => {
                let id = self.live_nodes[a % nodes].clone();
                self.push(same_step, EventKind::NodeProps { id, props: props([("color", "red")]) });
            }
            5 if !self.live_edges.is_empty() => {
                let id = self.live_edges[a % self.live_edges.len()].0.clone();
                self.push(same_step, EventKind::EdgeProps { id, props: props([("weight", (b % 4) as f64)]) });
            }
            6 if nodes > 0 => {
                let id = self.fresh("act");
                let node = self.live_nodes[a % nodes].clone();
                self.activities.push((id.clone(), node.clone()));
                self.push(same_step, EventKind::ActivityStart { id, node, props: Props::new() });
            }
            7 if nodes > 0 => {
                let id = self.fresh("m");
                let node = self.live_nodes[a % nodes].clone();
                let edge = self
                    .live_edges
                    .iter()
                    .find(|(_, t, _)| *t == node)
                    .map(|(e, _, _)| e.clone());
                self.push(
                    same_step,
                    EventKind::MsgSend { id, node, edge, parent: None, props: props([("description", "msg")]) },
                );
            }
            _ => {}
        }
    }
}

fn trace_from(choices: Vec<(u8, usize, usize, bool)>) -> Vec<Event> {
    let mut builder = TraceBuilder::default();
    for (choice, a, b, same_step) in choices {
        builder.step(choice, a, b, same_step);
    }
    builder.events
}

/// Plays every position forward, then rewinds one position at a time and
/// compares against what was seen on the way forward.
fn assert_round_trip(events: Vec<Event>, grouping: &[(usize, usize)]) -> Result<(), TestCaseError> {
    let mut store = EventStore::from_events(events).expect("ordered trace");
    let positions: Vec<EventPos> = store.positions().collect();
    let mut view = headless_view();
    view.load_registry(&store);

    let created: Vec<String> = view.registry().names().map(str::to_string).collect();
    if !created.is_empty() {
        for &(n, g) in grouping {
            let registry = view.registry_mut();
            if !registry.contains(GROUPS[g]) {
                registry.create_group(GROUPS[g], "blue").expect("group");
            }
            let _ = registry.move_to_group(Some(GROUPS[g]), &created[n % created.len()]);
        }
        view.sync_registry();
    }

    let mut player = EventPlayer::new();
    let mut forward: Vec<GraphSnapshot> = Vec::new();
    for &pos in &positions {
        store.set_current(pos);
        player.catch_up(&store, &mut view);
        forward.push(view.snapshot());
    }

    for (i, &pos) in positions.iter().enumerate().rev() {
        store.set_current(pos);
        player.catch_up(&store, &mut view);
        prop_assert_eq!(&view.snapshot(), &forward[i], "at {:?}", pos);
        let check = view.model().check_invariants();
        prop_assert!(check.is_ok(), "at {:?}: {:?}", pos, check);
    }
    Ok(())
}

fn choices() -> impl Strategy<Value = Vec<(u8, usize, usize, bool)>> {
    prop::collection::vec((any::<u8>(), 0usize..8, 0usize..8, any::<bool>()), 1..50)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rewinding_restores_every_prefix(choices in choices()) {
        let events = trace_from(choices);
        prop_assume!(!events.is_empty());
        assert_round_trip(events, &[])?;
    }

    #[test]
    fn rewinding_restores_grouping(
        choices in choices(),
        grouping in prop::collection::vec((0usize..16, 0..GROUPS.len()), 1..8),
    ) {
        let events = trace_from(choices);
        prop_assume!(!events.is_empty());
        assert_round_trip(events, &grouping)?;
    }
}
