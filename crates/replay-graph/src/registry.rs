//! Authoritative tree of known nodes and the groups they belong to.
//!
//! The graph model only materializes nodes it has been told about by the
//! event player; everything it needs to know about a node's identity,
//! grouping, label, color and hidden state comes from here. Mutations queue
//! [`RegistryChange`]s that the owner drains and mirrors into the model.

use replay_core::{props, Props};
use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::props::PropertyStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryChange {
    /// Entry was inserted or moved under a new parent.
    Inserted(String),
    /// Entry props or hidden state changed.
    Changed(String),
}

#[derive(Debug, Clone)]
struct Entry {
    group: bool,
    parent: Option<String>,
    children: Vec<String>,
    props: PropertyStore,
    override_props: PropertyStore,
    merged: Props,
    hidden_request: bool,
    hidden: bool,
}

impl Entry {
    fn new(group: bool, parent: Option<String>) -> Self {
        Self {
            group,
            parent,
            children: Vec::new(),
            props: PropertyStore::new(),
            override_props: PropertyStore::new(),
            merged: Props::new(),
            hidden_request: false,
            hidden: false,
        }
    }

    fn refresh_merged(&mut self) {
        let mut merged = self.override_props.props();
        for (k, v) in self.props.props() {
            merged.entry(k).or_insert(v);
        }
        self.merged = merged;
    }
}

#[derive(Debug, Default)]
pub struct NodeRegistry {
    entries: HashMap<String, Entry>,
    roots: Vec<String>,
    changes: Vec<RegistryChange>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_node(&mut self, name: &str, props: Props) -> GraphResult<()> {
        self.insert_entry(name, false, props)
    }

    pub fn create_group(&mut self, name: &str, color: &str) -> GraphResult<()> {
        self.insert_entry(name, true, props([("color", color), ("label", name)]))
    }

    fn insert_entry(&mut self, name: &str, group: bool, initial: Props) -> GraphResult<()> {
        if self.entries.contains_key(name) {
            return Err(GraphError::DuplicateName(name.to_string()));
        }
        let mut entry = Entry::new(group, None);
        if !initial.is_empty() {
            entry.props.push(initial);
        }
        entry.refresh_merged();
        self.entries.insert(name.to_string(), entry);
        self.roots.push(name.to_string());
        tracing::debug!(name, group, "registry entry inserted");
        self.changes.push(RegistryChange::Inserted(name.to_string()));
        self.changes.push(RegistryChange::Changed(name.to_string()));
        self.recompute_hidden();
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_group(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.group)
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.hidden)
    }

    pub fn hidden_requested(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.hidden_request)
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        self.entries.get(name)?.parent.as_deref()
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.entries
            .get(name)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names from the root down to `name`. Depth greater than one means grouped.
    pub fn path(&self, name: &str) -> Option<Vec<String>> {
        let mut path = vec![name.to_string()];
        let mut cur = self.entries.get(name)?;
        while let Some(parent) = &cur.parent {
            path.push(parent.clone());
            cur = self.entries.get(parent)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn props(&self, name: &str) -> Option<&Props> {
        self.entries.get(name).map(|e| &e.merged)
    }

    /// The "label" property, if one was ever set.
    pub fn explicit_label(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)?
            .merged
            .get("label")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    /// Display label, falling back to the entry name.
    pub fn label(&self, name: &str) -> Option<String> {
        let entry = self.entries.get(name)?;
        Some(
            entry
                .merged
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or(name)
                .to_string(),
        )
    }

    pub fn color(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)?
            .merged
            .get("color")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }

    pub fn take_changes(&mut self) -> Vec<RegistryChange> {
        std::mem::take(&mut self.changes)
    }

    // ----- Grouping -----

    /// Moves `name` under `group`, or to the root when `group` is `None`.
    pub fn move_to_group(&mut self, group: Option<&str>, name: &str) -> GraphResult<()> {
        if !self.contains(name) {
            return Err(GraphError::InvalidNode(name.to_string()));
        }
        if let Some(group) = group {
            if !self.is_group(group) {
                return Err(GraphError::InvalidNode(format!("{group} is not a group")));
            }
            let ancestry = self.path(group).unwrap_or_default();
            if ancestry.iter().any(|n| n == name) {
                return Err(GraphError::InvalidNode(format!(
                    "cannot move {name} into its own descendant {group}"
                )));
            }
        }
        self.move_entry_to_new_parent(name, group.map(str::to_string));
        Ok(())
    }

    pub fn remove_from_group(&mut self, name: &str) -> GraphResult<()> {
        let parent = self
            .parent(name)
            .map(str::to_string)
            .ok_or_else(|| GraphError::InvalidNode(format!("{name} is not in a group")))?;
        let grand_parent = self.parent(&parent).map(str::to_string);
        self.move_entry_to_new_parent(name, grand_parent);
        Ok(())
    }

    /// Moves every child of `group` up one level and drops the group.
    pub fn remove_group(&mut self, group: &str) -> GraphResult<()> {
        if !self.is_group(group) {
            return Err(GraphError::InvalidNode(format!("{group} is not a group")));
        }
        let grand_parent = self.parent(group).map(str::to_string);
        loop {
            let Some(child) = self.children(group).first().cloned() else {
                break;
            };
            let last = self.children(group).len() == 1;
            self.move_entry_to_new_parent(&child, grand_parent.clone());
            if last {
                // moving the last child out already dropped the group
                return Ok(());
            }
        }
        self.detach(group);
        self.entries.remove(group);
        self.recompute_hidden();
        Ok(())
    }

    pub fn remove_all_groups(&mut self) {
        while let Some(group) = self.roots.iter().find(|n| self.is_group(n)).cloned() {
            let _ = self.remove_group(&group);
        }
    }

    fn detach(&mut self, name: &str) {
        let parent = self.entries.get(name).and_then(|e| e.parent.clone());
        match parent {
            Some(parent) => {
                if let Some(p) = self.entries.get_mut(&parent) {
                    p.children.retain(|c| c != name);
                }
            }
            None => self.roots.retain(|r| r != name),
        }
    }

    fn move_entry_to_new_parent(&mut self, name: &str, new_parent: Option<String>) {
        let old_parent = self.entries.get(name).and_then(|e| e.parent.clone());
        self.detach(name);

        match &new_parent {
            Some(parent) => {
                if let Some(p) = self.entries.get_mut(parent) {
                    p.children.push(name.to_string());
                }
            }
            None => self.roots.push(name.to_string()),
        }
        if let Some(entry) = self.entries.get_mut(name) {
            entry.parent = new_parent;
        }
        self.changes.push(RegistryChange::Inserted(name.to_string()));

        let mut emptied = old_parent;
        while let Some(old) = emptied {
            if !self.children(&old).is_empty() {
                break;
            }
            emptied = self.parent(&old).map(str::to_string);
            self.detach(&old);
            self.entries.remove(&old);
            tracing::debug!(group = %old, "empty group removed");
        }
        self.recompute_hidden();
    }

    // ----- Properties -----

    pub fn push_props(&mut self, name: &str, props: Props) -> GraphResult<()> {
        self.update_entry(name, |e| e.props.push(props))
    }

    pub fn pop_props(&mut self, name: &str, props: &Props) -> GraphResult<()> {
        self.update_entry(name, |e| {
            e.props.pop(props);
        })
    }

    pub fn push_override_props(&mut self, name: &str, props: Props) -> GraphResult<()> {
        self.update_entry(name, |e| e.override_props.push(props))
    }

    pub fn pop_override_props(&mut self, name: &str, props: &Props) -> GraphResult<()> {
        self.update_entry(name, |e| {
            e.override_props.pop(props);
        })
    }

    pub fn clear_all_override_props(&mut self) {
        let names: Vec<String> = self.entries.keys().cloned().collect();
        for name in names {
            let _ = self.update_entry(&name, |e| e.override_props.clear());
        }
    }

    fn update_entry<F>(&mut self, name: &str, f: F) -> GraphResult<()>
    where
        F: FnOnce(&mut Entry),
    {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| GraphError::InvalidNode(name.to_string()))?;
        f(entry);
        entry.refresh_merged();
        self.changes.push(RegistryChange::Changed(name.to_string()));
        Ok(())
    }

    // ----- Hidden state -----

    pub fn request_hidden(&mut self, name: &str, hidden: bool) -> GraphResult<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| GraphError::InvalidNode(name.to_string()))?;
        if entry.hidden_request != hidden {
            entry.hidden_request = hidden;
            self.recompute_hidden();
        }
        Ok(())
    }

    pub fn unhide_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.hidden_request = false;
        }
        self.recompute_hidden();
    }

    fn recompute_hidden(&mut self) {
        let before: HashMap<String, bool> = self
            .entries
            .iter()
            .map(|(name, e)| (name.clone(), e.hidden))
            .collect();
        for entry in self.entries.values_mut() {
            entry.hidden = false;
        }
        for root in self.roots.clone() {
            self.hide_if_requested(&root);
        }

        let mut changed: Vec<&String> = self
            .entries
            .iter()
            .filter(|(name, e)| before.get(*name).copied() != Some(e.hidden))
            .map(|(name, _)| name)
            .collect();
        changed.sort();
        let changed: Vec<RegistryChange> = changed
            .into_iter()
            .map(|name| RegistryChange::Changed(name.clone()))
            .collect();
        self.changes.extend(changed);
    }

    fn hide_if_requested(&mut self, name: &str) -> bool {
        let Some(entry) = self.entries.get(name) else {
            return false;
        };
        if entry.hidden_request {
            self.hide_recursive(name);
            return true;
        }
        let children = entry.children.clone();
        if children.is_empty() {
            return false;
        }
        let mut all_hidden = true;
        for child in &children {
            if !self.hide_if_requested(child) {
                all_hidden = false;
            }
        }
        if all_hidden {
            if let Some(entry) = self.entries.get_mut(name) {
                entry.hidden = true;
            }
        }
        all_hidden
    }

    fn hide_recursive(&mut self, name: &str) {
        let children = match self.entries.get_mut(name) {
            Some(entry) => {
                entry.hidden = true;
                entry.children.clone()
            }
            None => return,
        };
        for child in &children {
            self.hide_recursive(child);
        }
    }
}
