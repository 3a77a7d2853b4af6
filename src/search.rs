//! Text matching over nodes, their components and component members.

use tracing::trace;

use crate::error::{InspectError, Result};
use crate::inspect::{Member, MemberRead, MemberType, Value};
use crate::world::{ComponentId, NodeId, Target, World};

/// Structural members that point back into the graph; never searched.
pub const MEMBER_BLACKLIST: &[&str] = &["parent", "parentInternal", "root", "transform", "gameObject"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub include_members: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            include_members: false,
        }
    }

    pub fn with_members(mut self, include_members: bool) -> Self {
        self.include_members = include_members;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn is_searchable(member: &Member) -> bool {
    member.ty != MemberType::Bool && !MEMBER_BLACKLIST.contains(&member.name.as_str())
}

pub fn matches_component(
    world: &World,
    query: &str,
    component: ComponentId,
    include_members: bool,
) -> bool {
    let Some(c) = world.component(component) else {
        return false;
    };

    if world
        .component_display(component)
        .is_some_and(|d| contains_ignore_case(&d, query))
    {
        return true;
    }

    if contains_ignore_case(world.catalog().type_name(c.type_tag()), query) {
        return true;
    }

    if !include_members {
        return false;
    }

    let value = c.value();
    for member in value.members().iter().filter(|m| is_searchable(m)) {
        match value.read(&member.name) {
            MemberRead::Value(v) => {
                if v.display(world)
                    .is_some_and(|text| contains_ignore_case(&text, query))
                {
                    return true;
                }
            }
            MemberRead::Skip(reason) => {
                trace!(member = %member.name, %reason, "skipping unreadable member");
            }
        }
    }

    false
}

pub fn matches_node(world: &World, node: NodeId, query: &SearchQuery) -> bool {
    let Some(n) = world.node(node) else {
        return false;
    };
    contains_ignore_case(n.name(), &query.text)
        || n
            .components()
            .iter()
            .any(|c| matches_component(world, &query.text, *c, query.include_members))
}

pub fn find_references(world: &World, target: &Target) -> Result<Vec<ComponentId>> {
    if !world.contains(target) {
        return Err(InspectError::invalid("reference target is not alive"));
    }

    let mut results = Vec::new();
    for id in world.components() {
        let Some(c) = world.component(id) else {
            continue;
        };
        let value = c.value();
        let references = value
            .members()
            .iter()
            .filter(|m| is_searchable(m))
            .any(|m| matches!(value.read(&m.name), MemberRead::Value(Value::Ref(ref r)) if r.same(target)));
        if references {
            results.push(id);
        }
    }
    Ok(results)
}
