use replay_core::{Event, EventKind, Props};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::error::{GraphError, GraphResult};
use crate::events::{EventPos, EventStore};
use crate::graph::animation::{Animator, RenderContext};
use crate::graph::labels::message_label_parts;
use crate::graph::layout::LayoutParams;
use crate::graph::listener::{GraphListener, GraphNotice};
use crate::graph::model::{GraphModel, GraphSnapshot};
use crate::graph::picking::Selection;
use crate::graph::worker::{lock_model, SharedModel};
use crate::registry::{NodeRegistry, RegistryChange};

pub struct GraphView {
    registry: NodeRegistry,
    model: SharedModel,
    selection: Selection,
    animator: Animator,
    render: RenderContext,
    listeners: Vec<Box<dyn GraphListener>>,
}

impl GraphView {
    pub fn new(model: GraphModel, params: LayoutParams, max_fps: u32) -> Self {
        Self {
            registry: NodeRegistry::new(),
            model: Arc::new(Mutex::new(model)),
            selection: Selection::new(),
            animator: Animator::new(params, max_fps),
            render: RenderContext::default(),
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    pub fn emit(&mut self, notice: GraphNotice) {
        for listener in &mut self.listeners {
            listener.on_notice(&notice);
        }
    }

    fn flush_notices(&mut self) {
        let notices = lock_model(&self.model).take_notices();
        for notice in notices {
            self.emit(notice);
        }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Direct registry access. Call [`GraphView::sync_registry`] afterwards.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    pub fn model(&self) -> MutexGuard<'_, GraphModel> {
        lock_model(&self.model)
    }

    pub fn shared_model(&self) -> SharedModel {
        self.model.clone()
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.model().snapshot()
    }

    pub fn visible_count(&self) -> usize {
        self.model().visible_nodes().len()
    }

    /// Makes every node a trace will create known to the registry.
    pub fn load_registry(&mut self, store: &EventStore) {
        for pos in store.positions() {
            let Some(stored) = store.get(pos) else { continue };
            if let EventKind::NodeCreate { id, .. } = &stored.event.kind {
                if !self.registry.contains(id) {
                    if let Err(err) = self.registry.insert_node(id, Props::new()) {
                        tracing::warn!(node = %id, error = %err, "could not register node");
                    }
                }
            }
        }
        self.sync_registry();
        tracing::info!(nodes = self.registry.names().count(), "node registry loaded");
    }

    pub fn create_group(&mut self, group: &str, color: &str, members: &[&str]) -> GraphResult<()> {
        self.registry.create_group(group, color)?;
        for member in members {
            self.registry.move_to_group(Some(group), member)?;
        }
        self.sync_registry();
        Ok(())
    }

    pub fn sync_registry(&mut self) {
        let changes = self.registry.take_changes();
        if !changes.is_empty() {
            let mut model = lock_model(&self.model);
            for change in changes {
                if let Err(err) = apply_registry_change(&mut model, &self.registry, &change) {
                    tracing::warn!(?change, error = %err, "registry change not applied");
                }
            }
        }
        self.flush_notices();
    }

    pub fn set_forward(&mut self, forward: bool) {
        self.model().set_forward(forward);
    }

    pub fn apply_forward(&mut self, store: &EventStore, pos: EventPos) -> GraphResult<()> {
        let result = self.forward_event(store, pos);
        self.sync_registry();
        result
    }

    pub fn apply_backward(&mut self, store: &EventStore, pos: EventPos) -> GraphResult<()> {
        let result = self.backward_event(store, pos);
        self.sync_registry();
        result
    }

    fn forward_event(&mut self, store: &EventStore, pos: EventPos) -> GraphResult<()> {
        let stored = store
            .get(pos)
            .ok_or_else(|| GraphError::UnpairedEvent(format!("{}:{}", pos.step, pos.index)))?;
        let mut model = lock_model(&self.model);
        match &stored.event.kind {
            EventKind::NodeCreate { id, props } => {
                model.add_node(id, &self.registry)?;
                self.registry.push_props(id, props.clone())
            }
            EventKind::NodeDelete { id } => model.remove_node_by_name(id),
            EventKind::NodeProps { id, props } => self.registry.push_props(id, props.clone()),
            EventKind::EdgeCreate {
                id,
                directed,
                tail,
                head,
                props,
            } => model.add_edge(*directed, id, tail, head, props.clone()).map(|_| ()),
            EventKind::EdgeDelete { id } => model.remove_edge(id),
            EventKind::EdgeProps { id, props } => model.push_edge_props(id, props.clone()),
            EventKind::ActivityStart { id, node, props } => model.add_activity(node, id, props.clone()),
            EventKind::ActivityEnd { id, node } => model.remove_activity(node, id),
            kind @ (EventKind::MsgSend { .. } | EventKind::MsgRecv { .. }) => {
                let send = store.paired(pos).map(|e| &e.event.kind);
                if let (EventKind::MsgRecv { id, .. }, None) = (kind, send) {
                    return Err(GraphError::UnpairedEvent(id.clone()));
                }
                if let Some((node, edge, description)) = message_label_parts(kind, send) {
                    model.label_message(node, edge, description);
                }
                Ok(())
            }
        }
    }

    fn backward_event(&mut self, store: &EventStore, pos: EventPos) -> GraphResult<()> {
        let stored = store
            .get(pos)
            .ok_or_else(|| GraphError::UnpairedEvent(format!("{}:{}", pos.step, pos.index)))?;
        let paired = store.paired(pos).map(|e| &e.event.kind);
        let mut model = lock_model(&self.model);
        match &stored.event.kind {
            EventKind::NodeCreate { id, props } => {
                model.remove_node_by_name(id)?;
                self.registry.pop_props(id, props)
            }
            EventKind::NodeDelete { id } => model.add_node(id, &self.registry).map(|_| ()),
            EventKind::NodeProps { id, props } => self.registry.pop_props(id, props),
            EventKind::EdgeCreate { id, .. } => model.remove_edge(id),
            EventKind::EdgeDelete { id } => match paired {
                Some(EventKind::EdgeCreate {
                    directed,
                    tail,
                    head,
                    props,
                    ..
                }) => model.add_edge(*directed, id, tail, head, props.clone()).map(|_| ()),
                _ => Err(GraphError::UnpairedEvent(id.clone())),
            },
            EventKind::EdgeProps { id, props } => model.pop_edge_props(id, props),
            EventKind::ActivityStart { id, node, .. } => model.remove_activity(node, id),
            EventKind::ActivityEnd { id, node } => match paired {
                Some(EventKind::ActivityStart { props, .. }) => {
                    model.add_activity(node, id, props.clone())
                }
                _ => Err(GraphError::UnpairedEvent(id.clone())),
            },
            EventKind::MsgSend { .. } | EventKind::MsgRecv { .. } => Ok(()),
        }
    }

    /// Re-derives message labels from the event at `pos`, if it is a message.
    pub fn relabel_from(&mut self, store: &EventStore, pos: EventPos) {
        let Some(stored) = store.get(pos) else { return };
        if !stored.event.kind.is_message() {
            return;
        }
        let send = store.paired(pos).map(|e| &e.event.kind);
        if let Some((node, edge, description)) = message_label_parts(&stored.event.kind, send) {
            self.model().label_message(node, edge, description);
        }
        self.flush_notices();
    }

    pub fn clear_labels(&mut self) {
        self.model().clear_labels();
        self.flush_notices();
    }

    /// Logs a failed event and tells listeners; playback carries on.
    pub fn report_error(&mut self, err: &GraphError, event: &Event) {
        tracing::warn!(error = %err, event_type = event.kind.type_name(), "error processing event");
        self.emit(GraphNotice::EventFailed {
            message: err.to_string(),
            event: event.to_string(),
        });
    }

    pub fn unset_data(&mut self) {
        self.stop_animation();
        self.model().unset_data();
        self.selection.unselect_all();
        self.flush_notices();
    }

    // ----- Animation -----

    pub fn set_render_context(&mut self, render: RenderContext) {
        self.render = render;
        if render.selecting || !render.available {
            self.stop_animation();
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    pub fn run_animation(&mut self) -> bool {
        let visible = self.visible_count();
        self.animator.run(&self.model, visible, self.render)
    }

    pub fn stop_animation(&mut self) {
        if self.animator.stop() {
            self.emit(GraphNotice::RenderRequested);
        }
    }

    pub fn set_max_fps(&mut self, max_fps: u32) {
        self.animator.set_max_fps(max_fps);
    }

    pub fn fps(&self) -> f64 {
        self.animator.fps()
    }

    pub fn layout_params(&self) -> &LayoutParams {
        self.animator.params()
    }

    pub fn set_layout_params(&mut self, params: LayoutParams) {
        self.animator.set_params(params);
        self.model().set_two_dimensional(params.two_dimensional);
        if self.animator.is_running() {
            self.stop_animation();
            self.run_animation();
        }
    }

    /// Host frame hook: reports volume growth and whether a render is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.animator.take_volume_reset() {
            let bound = self.model().max_node_distance();
            self.emit(GraphNotice::ViewingVolumeReset(bound));
        }
        if !self.animator.render_due() {
            return false;
        }
        self.animator.record_frame(now);
        self.emit(GraphNotice::RenderRequested);
        true
    }

    // ----- Selection -----

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Runs `f` against the selection with the model locked.
    pub fn with_selection<R>(&mut self, f: impl FnOnce(&mut Selection, &GraphModel) -> R) -> R {
        let model = lock_model(&self.model);
        f(&mut self.selection, &model)
    }

    pub fn selected_ids(&mut self) -> Vec<String> {
        self.with_selection(|sel, model| sel.selected_ids(model))
    }
}

impl Drop for GraphView {
    fn drop(&mut self) {
        self.animator.stop();
    }
}

fn apply_registry_change(
    model: &mut GraphModel,
    registry: &NodeRegistry,
    change: &RegistryChange,
) -> GraphResult<()> {
    match change {
        RegistryChange::Inserted(name) => {
            let Some(key) = model.node_key(name) else {
                return Ok(());
            };
            let wanted = registry.parent(name);
            let current = model
                .node(key)
                .and_then(|n| n.parent())
                .and_then(|p| model.node(p))
                .map(|p| p.name.as_str());
            if current == wanted {
                return Ok(());
            }
            // detaching can cascade away empty ancestors, so resolve the new parent afterwards
            model.reparent(key, None);
            if let Some(parent) = wanted {
                let parent = match model.node_key(parent) {
                    Some(k) => k,
                    None => model.add_node(parent, registry)?,
                };
                model.reparent(key, Some(parent));
            }
        }
        RegistryChange::Changed(name) => {
            let Some(key) = model.node_key(name) else {
                return Ok(());
            };
            model.set_node_hidden(key, registry.is_hidden(name));
            if let Some(node) = model.node_mut(key) {
                node.label = registry.explicit_label(name);
                node.color = registry.color(name);
            }
        }
    }
    Ok(())
}
