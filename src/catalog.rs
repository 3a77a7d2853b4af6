//! The host's type universe.
//!
//! Types are registered ahead of time with their capabilities and an
//! optional base type. Capabilities are inherited through the base chain,
//! so a type deriving from a positional type is positional as well.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};
use crate::world::{Target, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(pub(crate) u32);

impl TypeTag {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Concrete,
    Abstract,
    OpenGeneric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Component,
    Positional,
    Behavioural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    Property,
    Field,
}

pub enum StaticRead {
    Value(Target),
    Null,
    Fault(String),
}

pub type StaticGetter = Box<dyn Fn(&World) -> StaticRead>;

pub struct StaticAccessor {
    pub name: String,
    pub kind: AccessorKind,
    getter: StaticGetter,
}

impl StaticAccessor {
    pub fn read(&self, world: &World) -> StaticRead {
        (self.getter)(world)
    }
}

impl fmt::Debug for StaticAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAccessor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct TypeInfo {
    pub name: String,
    pub full_name: String,
    pub kind: TypeKind,
    pub base: Option<TypeTag>,
    pub capabilities: Vec<Capability>,
    statics: Vec<StaticAccessor>,
}

impl TypeInfo {
    pub fn concrete(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
            kind: TypeKind::Concrete,
            base: None,
            capabilities: Vec::new(),
            statics: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_base(mut self, base: TypeTag) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn is_concrete(&self) -> bool {
        self.kind == TypeKind::Concrete
    }

    pub fn static_accessor(&self, name: &str, kind: AccessorKind) -> Option<&StaticAccessor> {
        self.statics
            .iter()
            .find(|s| s.kind == kind && s.name == name)
    }
}

#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: Vec<TypeInfo>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: TypeInfo) -> Result<TypeTag> {
        if let Some(base) = info.base
            && self.get(base).is_none()
        {
            return Err(InspectError::invalid(format!(
                "unknown base type for {}",
                info.full_name
            )));
        }
        let tag = TypeTag(self.types.len() as u32);
        self.types.push(info);
        Ok(tag)
    }

    pub fn register_static(
        &mut self,
        tag: TypeTag,
        name: impl Into<String>,
        kind: AccessorKind,
        getter: StaticGetter,
    ) -> Result<()> {
        let info = self
            .types
            .get_mut(tag.index())
            .ok_or_else(|| InspectError::invalid(format!("unknown type tag {}", tag.0)))?;
        info.statics.push(StaticAccessor {
            name: name.into(),
            kind,
            getter,
        });
        Ok(())
    }

    pub fn get(&self, tag: TypeTag) -> Option<&TypeInfo> {
        self.types.get(tag.index())
    }

    pub fn find(&self, name: &str) -> Option<TypeTag> {
        self.iter()
            .find(|(_, info)| info.name == name || info.full_name == name)
            .map(|(tag, _)| tag)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeTag, &TypeInfo)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, info)| (TypeTag(i as u32), info))
    }

    pub fn concrete_types(&self) -> impl Iterator<Item = (TypeTag, &TypeInfo)> {
        self.iter().filter(|(_, info)| info.is_concrete())
    }

    pub fn types_matching<F>(&self, predicate: F) -> Vec<TypeTag>
    where
        F: Fn(&TypeCatalog, TypeTag) -> bool,
    {
        self.concrete_types()
            .map(|(tag, _)| tag)
            .filter(|tag| predicate(self, *tag))
            .collect()
    }

    /// Walks the base chain starting at `tag` itself.
    pub fn ancestry(&self, tag: TypeTag) -> impl Iterator<Item = TypeTag> + '_ {
        std::iter::successors(self.get(tag).map(|_| tag), |t| {
            self.get(*t).and_then(|info| info.base)
        })
    }

    pub fn is_assignable(&self, from: TypeTag, to: TypeTag) -> bool {
        self.ancestry(from).any(|t| t == to)
    }

    pub fn has_capability(&self, tag: TypeTag, capability: Capability) -> bool {
        self.ancestry(tag).any(|t| {
            self.get(t).is_some_and(|info| {
                info.capabilities.iter().any(|c| {
                    *c == capability
                        || (capability == Capability::Component
                            && matches!(c, Capability::Positional | Capability::Behavioural))
                })
            })
        })
    }

    pub fn is_positional(&self, tag: TypeTag) -> bool {
        self.has_capability(tag, Capability::Positional)
    }

    pub fn is_behavioural(&self, tag: TypeTag) -> bool {
        self.has_capability(tag, Capability::Behavioural)
    }

    pub fn is_component(&self, tag: TypeTag) -> bool {
        self.has_capability(tag, Capability::Component)
    }

    pub fn type_name(&self, tag: TypeTag) -> &str {
        self.get(tag).map(|info| info.name.as_str()).unwrap_or("?")
    }
}
