//! Arena-backed model of the host's live object graph.
//!
//! Parent/child links are ids into the entity table, never owning pointers.
//! Ids carry a generation so a destroyed entity's id can never alias a
//! later one occupying the same slot.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::catalog::{TypeCatalog, TypeTag};
use crate::error::{InspectError, Result};
use crate::inspect::Inspect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
pub enum Target {
    Node(NodeId),
    Component(ComponentId),
    Object(Arc<dyn Inspect>),
}

impl Target {
    pub fn same(&self, other: &Target) -> bool {
        match (self, other) {
            (Target::Node(a), Target::Node(b)) => a == b,
            (Target::Component(a), Target::Component(b)) => a == b,
            (Target::Object(a), Target::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_node_bound(&self) -> bool {
        matches!(self, Target::Node(_) | Target::Component(_))
    }
}

#[derive(Debug)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    components: Vec<ComponentId>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug)]
pub struct Component {
    owner: NodeId,
    type_tag: TypeTag,
    value: Box<dyn Inspect>,
}

impl Component {
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    pub fn value(&self) -> &dyn Inspect {
        self.value.as_ref()
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    fn insert(&mut self, value: T) -> (u32, u32) {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return (index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (index, 0)
    }

    fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        // A slot whose generation is exhausted is retired rather than reused.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(index);
        }
        Some(value)
    }

    fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value
                .as_ref()
                .map(|value| (i as u32, slot.generation, value))
        })
    }
}

const JOURNAL_COMPACT_MIN: usize = 64;

#[derive(Debug, Default)]
pub struct World {
    catalog: TypeCatalog,
    nodes: Arena<Node>,
    components: Arena<Component>,
    created_roots: Option<Vec<NodeId>>,
    journal_limit: usize,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: TypeCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Journal nodes that become roots so incremental refreshes can discover them.
    pub fn with_root_tracking(mut self) -> Self {
        self.created_roots = Some(Vec::new());
        self.journal_limit = JOURNAL_COMPACT_MIN;
        self
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TypeCatalog {
        &mut self.catalog
    }

    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> Result<NodeId> {
        if let Some(p) = parent
            && !self.is_alive(p)
        {
            return Err(InspectError::invalid(format!("parent {p} is not alive")));
        }
        let (index, generation) = self.nodes.insert(Node {
            name: name.into(),
            parent,
            children: Vec::new(),
            components: Vec::new(),
        });
        let id = NodeId { index, generation };
        match parent {
            Some(p) => {
                if let Some(parent) = self.node_mut(p) {
                    parent.children.push(id);
                }
            }
            None => self.journal_root(id),
        }
        Ok(id)
    }

    pub fn attach<I>(&mut self, node: NodeId, type_tag: TypeTag, value: I) -> Result<ComponentId>
    where
        I: Inspect + 'static,
    {
        if !self.is_alive(node) {
            return Err(InspectError::invalid(format!("node {node} is not alive")));
        }
        let Some(info) = self.catalog.get(type_tag) else {
            return Err(InspectError::invalid(format!(
                "unknown type tag {}",
                type_tag.index()
            )));
        };
        if !info.is_concrete() {
            return Err(InspectError::invalid(format!(
                "{} cannot have instances",
                info.full_name
            )));
        }
        let (index, generation) = self.components.insert(Component {
            owner: node,
            type_tag,
            value: Box::new(value),
        });
        let id = ComponentId { index, generation };
        if let Some(owner) = self.node_mut(node) {
            owner.components.push(id);
        }
        Ok(id)
    }

    pub fn destroy(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.node(node).map(|n| n.parent) else {
            return false;
        };
        if let Some(p) = parent
            && let Some(parent) = self.node_mut(p)
        {
            parent.children.retain(|c| *c != node);
        }
        for id in self.descendants(node) {
            if let Some(removed) = self.nodes.remove(id.index, id.generation) {
                for c in removed.components {
                    self.components.remove(c.index, c.generation);
                }
            }
        }
        true
    }

    pub fn destroy_component(&mut self, component: ComponentId) -> bool {
        let Some(removed) = self
            .components
            .remove(component.index, component.generation)
        else {
            return false;
        };
        if let Some(owner) = self.node_mut(removed.owner) {
            owner.components.retain(|c| *c != component);
        }
        true
    }

    pub fn rename(&mut self, node: NodeId, name: impl Into<String>) -> Result<()> {
        let n = self
            .node_mut(node)
            .ok_or_else(|| InspectError::invalid(format!("node {node} is not alive")))?;
        n.name = name.into();
        Ok(())
    }

    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<()> {
        let old = self
            .node(node)
            .map(|n| n.parent)
            .ok_or_else(|| InspectError::invalid(format!("node {node} is not alive")))?;
        if let Some(p) = parent {
            if !self.is_alive(p) {
                return Err(InspectError::invalid(format!("parent {p} is not alive")));
            }
            if self.descendants(node).contains(&p) {
                return Err(InspectError::invalid(format!(
                    "cannot parent {node} under its own descendant {p}"
                )));
            }
        }
        if old == parent {
            return Ok(());
        }
        if let Some(o) = old
            && let Some(old_parent) = self.node_mut(o)
        {
            old_parent.children.retain(|c| *c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = parent;
        }
        match parent {
            Some(p) => {
                if let Some(new_parent) = self.node_mut(p) {
                    new_parent.children.push(node);
                }
            }
            None => self.journal_root(node),
        }
        Ok(())
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn is_component_alive(&self, component: ComponentId) -> bool {
        self.component(component).is_some()
    }

    pub fn contains(&self, target: &Target) -> bool {
        match target {
            Target::Node(id) => self.is_alive(*id),
            Target::Component(id) => self.is_component_alive(*id),
            Target::Object(_) => true,
        }
    }

    pub fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.index, node.generation)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node.index, node.generation)
    }

    pub fn component(&self, component: ComponentId) -> Option<&Component> {
        self.components.get(component.index, component.generation)
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(Node::name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .map(|(index, generation, _)| NodeId { index, generation })
    }

    pub fn components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components
            .iter()
            .map(|(index, generation, _)| ComponentId { index, generation })
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, _, node)| node.is_root())
            .map(|(index, generation, _)| NodeId { index, generation })
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    pub fn path(&self, node: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.node(id)?;
            names.push(n.name.as_str());
            current = n.parent;
        }
        names.reverse();
        Some(names.join("/"))
    }

    pub fn instances_of(&self, tag: TypeTag) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, _, c)| self.catalog.is_assignable(c.type_tag, tag))
            .map(|(index, generation, _)| ComponentId { index, generation })
            .collect()
    }

    pub fn owner_of(&self, target: &Target) -> Option<NodeId> {
        match target {
            Target::Node(id) => self.is_alive(*id).then_some(*id),
            Target::Component(id) => self.component(*id).map(Component::owner),
            Target::Object(_) => None,
        }
    }

    pub fn component_display(&self, component: ComponentId) -> Option<String> {
        let c = self.component(component)?;
        if let Some(own) = c.value.display() {
            return Some(own);
        }
        let owner = self.name(c.owner).unwrap_or_default();
        let type_name = self
            .catalog
            .get(c.type_tag)
            .map(|info| info.full_name.as_str())
            .unwrap_or("?");
        Some(format!("{owner} ({type_name})"))
    }

    pub fn describe(&self, target: &Target) -> Option<String> {
        match target {
            Target::Node(id) => self.name(*id).map(|name| format!("{name} (Node)")),
            Target::Component(id) => self.component_display(*id),
            Target::Object(obj) => Some(obj.display().unwrap_or_else(|| "<object>".to_string())),
        }
    }

    pub fn type_name_of(&self, target: &Target) -> String {
        match target {
            Target::Node(_) => "Node".to_string(),
            Target::Component(id) => self
                .component(*id)
                .map(|c| self.catalog.type_name(c.type_tag).to_string())
                .unwrap_or_else(|| "?".to_string()),
            Target::Object(_) => "Object".to_string(),
        }
    }

    /// Roots created since the last call, or `None` without root tracking.
    pub fn drain_created_roots(&mut self) -> Option<Vec<NodeId>> {
        self.created_roots.as_mut().map(std::mem::take)
    }

    // Compacted to live, distinct roots whenever it reaches the limit.
    fn journal_root(&mut self, node: NodeId) {
        let Some(journal) = self.created_roots.as_mut() else {
            return;
        };
        journal.push(node);
        if journal.len() < self.journal_limit {
            return;
        }
        let nodes = &self.nodes;
        let mut seen = HashSet::new();
        journal.retain(|id| {
            nodes
                .get(id.index, id.generation)
                .is_some_and(Node::is_root)
                && seen.insert(*id)
        });
        self.journal_limit = JOURNAL_COMPACT_MIN.max(journal.len() * 2);
    }
}
