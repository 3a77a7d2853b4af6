//! JSON snapshots of a host graph, loaded into a [`World`].
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "Transform", "full_name": "Engine.Transform", "capabilities": ["positional"] },
//!     { "name": "GameManager", "statics": [
//!         { "name": "Instance", "accessor": "property", "value": { "node": "Game" } } ] }
//!   ],
//!   "nodes": [
//!     { "name": "Game", "components": [
//!         { "type": "Transform", "members": { "speed": 2.5, "tag": "main", "broken": { "fault": "boom" } } } ],
//!       "children": [] }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::catalog::{
    AccessorKind, Capability, StaticGetter, StaticRead, TypeInfo, TypeKind, TypeTag,
};
use crate::inspect::{Inspect, MemberType, Properties, Value};
use crate::world::{NodeId, Target, World};

#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub types: Vec<TypeSpec>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
pub struct TypeSpec {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub statics: Vec<StaticSpec>,
}

#[derive(Debug, Deserialize)]
pub struct StaticSpec {
    pub name: String,
    pub accessor: AccessorKind,
    pub value: StaticValueSpec,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticValueSpec {
    Null,
    Fault(String),
    Node(String),
    Object(ObjectSpec),
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectSpec {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub members: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

#[derive(Debug, Deserialize)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub members: BTreeMap<String, serde_json::Value>,
}

pub fn load_snapshot(path: &Path) -> Result<World> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    parse_snapshot(&raw).with_context(|| format!("Invalid snapshot: {}", path.display()))
}

pub fn parse_snapshot(raw: &str) -> Result<World> {
    let snapshot: Snapshot = serde_json::from_str(raw).context("Failed to parse snapshot JSON")?;
    snapshot.into_world()
}

impl Snapshot {
    pub fn into_world(self) -> Result<World> {
        let mut world = World::new().with_root_tracking();
        let mut statics = Vec::new();
        for spec in self.types {
            let tag = register_type(&mut world, &spec)?;
            for s in spec.statics {
                statics.push((tag, s));
            }
        }

        let mut pending = Vec::new();
        let mut queue: Vec<(NodeSpec, Option<NodeId>)> =
            self.nodes.into_iter().rev().map(|n| (n, None)).collect();
        while let Some((spec, parent)) = queue.pop() {
            let id = world.spawn(spec.name, parent)?;
            pending.extend(spec.components.into_iter().map(|c| (id, c)));
            queue.extend(spec.children.into_iter().rev().map(|c| (c, Some(id))));
        }

        for (node, spec) in pending {
            let tag = world
                .catalog()
                .find(&spec.type_name)
                .with_context(|| format!("Unknown component type: {}", spec.type_name))?;
            let props = build_properties(&world, spec.display, &spec.members)?;
            world.attach(node, tag, props)?;
        }

        for (tag, spec) in statics {
            let read = resolve_static(&world, spec.value)?;
            world
                .catalog_mut()
                .register_static(tag, spec.name, spec.accessor, read)?;
        }

        let _ = world.drain_created_roots();
        Ok(world)
    }
}

fn register_type(world: &mut World, spec: &TypeSpec) -> Result<TypeTag> {
    let full_name = spec.full_name.clone().unwrap_or_else(|| spec.name.clone());
    let mut info = TypeInfo::concrete(spec.name.clone(), full_name).with_kind(spec.kind);
    if let Some(base) = spec.base.as_deref() {
        let base_tag = world
            .catalog()
            .find(base)
            .with_context(|| format!("Base type {base} of {} must be declared first", spec.name))?;
        info = info.with_base(base_tag);
    }
    for capability in &spec.capabilities {
        info = info.with_capability(*capability);
    }
    Ok(world.catalog_mut().register(info)?)
}

fn resolve_static(world: &World, value: StaticValueSpec) -> Result<StaticGetter> {
    let getter: StaticGetter = match value {
        StaticValueSpec::Null => Box::new(|_: &World| StaticRead::Null),
        StaticValueSpec::Fault(message) => {
            Box::new(move |_: &World| StaticRead::Fault(message.clone()))
        }
        StaticValueSpec::Node(path) => {
            let id = find_path(world, &path)
                .with_context(|| format!("Static accessor references unknown node: {path}"))?;
            Box::new(move |_: &World| StaticRead::Value(Target::Node(id)))
        }
        StaticValueSpec::Object(spec) => {
            let obj: Arc<dyn Inspect> = Arc::new(build_properties(world, spec.display, &spec.members)?);
            Box::new(move |_: &World| StaticRead::Value(Target::Object(Arc::clone(&obj))))
        }
    };
    Ok(getter)
}

fn build_properties(
    world: &World,
    display: Option<String>,
    members: &BTreeMap<String, serde_json::Value>,
) -> Result<Properties> {
    let mut props = Properties::new();
    if let Some(d) = display {
        props = props.with_display(d);
    }
    for (name, raw) in members {
        props = match raw {
            serde_json::Value::Null => props.with_null(name, MemberType::Object),
            serde_json::Value::Bool(b) => props.with(name, Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => props.with(name, Value::Int(i)),
                None => props.with(name, Value::Float(n.as_f64().unwrap_or_default())),
            },
            serde_json::Value::String(s) => props.with(name, Value::Text(s.clone())),
            serde_json::Value::Object(map) => {
                if let Some(fault) = map.get("fault") {
                    let message = fault.as_str().map(str::to_string).unwrap_or_else(|| fault.to_string());
                    props.with_fault(name, MemberType::Object, message)
                } else if let Some(path) = map.get("node").and_then(|p| p.as_str()) {
                    let id = find_path(world, path)
                        .with_context(|| format!("Member {name} references unknown node: {path}"))?;
                    props.with(name, Value::Ref(Target::Node(id)))
                } else if map.get("inaccessible").and_then(|v| v.as_bool()) == Some(true) {
                    props.with_inaccessible(name, MemberType::Object)
                } else {
                    props.with(name, Value::Text(raw.to_string()))
                }
            }
            serde_json::Value::Array(_) => props.with(name, Value::Text(raw.to_string())),
        };
    }
    Ok(props)
}

/// Resolves a slash-separated path of node names, first match per level.
pub fn find_path(world: &World, path: &str) -> Option<NodeId> {
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let first = parts.next()?;
    let mut current = world.roots().find(|id| world.name(*id) == Some(first))?;
    for part in parts {
        let node = world.node(current)?;
        current = node
            .children()
            .iter()
            .copied()
            .find(|id| world.name(*id) == Some(part))?;
    }
    Some(current)
}
