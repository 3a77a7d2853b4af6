//! Navigation history of inspected targets.

use std::sync::mpsc::Sender;

use tracing::debug;

use crate::catalog::TypeTag;
use crate::error::{InspectError, Result};
use crate::world::{NodeId, Target, World};

#[derive(Debug, Clone)]
pub enum StackEntry {
    Instance { target: Target, label: String },
    Static { type_tag: TypeTag, label: String },
}

impl StackEntry {
    pub fn instance(target: Target, label: impl Into<String>) -> Self {
        StackEntry::Instance {
            target,
            label: label.into(),
        }
    }

    pub fn static_type(type_tag: TypeTag, label: impl Into<String>) -> Self {
        StackEntry::Static {
            type_tag,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            StackEntry::Instance { label, .. } | StackEntry::Static { label, .. } => label,
        }
    }

    pub fn target(&self) -> Option<&Target> {
        match self {
            StackEntry::Instance { target, .. } => Some(target),
            StackEntry::Static { .. } => None,
        }
    }

    fn same_target(&self, other: &StackEntry) -> bool {
        match (self, other) {
            (StackEntry::Instance { target: a, .. }, StackEntry::Instance { target: b, .. }) => {
                a.same(b)
            }
            (StackEntry::Static { type_tag: a, .. }, StackEntry::Static { type_tag: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct InspectionStack {
    entries: Vec<StackEntry>,
    tree: Option<Sender<NodeId>>,
}

impl InspectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree_notifier(tx: Sender<NodeId>) -> Self {
        Self {
            entries: Vec::new(),
            tree: Some(tx),
        }
    }

    pub fn push(&mut self, world: &World, entry: StackEntry, also_select_in_tree: bool) -> Result<bool> {
        match &entry {
            StackEntry::Instance { target, .. } if !world.contains(target) => {
                return Err(InspectError::invalid("cannot inspect a destroyed object"));
            }
            StackEntry::Static { type_tag, .. } if world.catalog().get(*type_tag).is_none() => {
                return Err(InspectError::invalid(format!(
                    "unknown type tag {}",
                    type_tag.index()
                )));
            }
            _ => {}
        }

        if self.entries.last().is_some_and(|top| top.same_target(&entry)) {
            return Ok(false);
        }

        if also_select_in_tree
            && let Some(target) = entry.target()
            && let Some(node) = world.owner_of(target)
        {
            self.notify_tree(node);
        }

        debug!(label = entry.label(), depth = self.entries.len() + 1, "inspecting");
        self.entries.push(entry);
        Ok(true)
    }

    pub fn pop(&mut self) -> Option<StackEntry> {
        self.entries.pop()
    }

    /// Keeps entries `0..=index`, discarding everything above.
    pub fn truncate_to(&mut self, index: usize) {
        self.entries.truncate(index.saturating_add(1));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&StackEntry> {
        self.entries.last()
    }

    pub fn entries(&mut self, world: &World) -> &[StackEntry] {
        self.prune(world);
        &self.entries
    }

    pub fn inspected_object(&mut self, world: &World) -> Result<Target> {
        self.prune(world);
        match self.entries.last() {
            Some(StackEntry::Instance { target, .. }) => Ok(target.clone()),
            _ => Err(InspectError::NothingInspected),
        }
    }

    fn prune(&mut self, world: &World) {
        self.entries
            .retain(|e| e.target().is_none_or(|t| world.contains(t)));
    }

    fn notify_tree(&self, node: NodeId) {
        if let Some(tx) = self.tree.as_ref() {
            let _ = tx.send(node);
        }
    }
}
