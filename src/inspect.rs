//! Introspection capability for values hosted in the live graph.
//!
//! Instead of probing arbitrary types at runtime, every inspectable value
//! exposes its members up front and answers reads with an explicit
//! [`MemberRead`]: either a value or a reason the member was skipped.

use std::fmt;

use crate::world::{Target, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberType {
    Bool,
    Int,
    Float,
    Text,
    Reference,
    Object,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: MemberType,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: MemberType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ref(Target),
}

impl Value {
    pub fn member_type(&self) -> MemberType {
        match self {
            Value::Bool(_) => MemberType::Bool,
            Value::Int(_) => MemberType::Int,
            Value::Float(_) => MemberType::Float,
            Value::Text(_) => MemberType::Text,
            Value::Ref(_) => MemberType::Reference,
        }
    }

    pub fn display(&self, world: &World) -> Option<String> {
        match self {
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Ref(target) => world.describe(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Inaccessible,
    NullTarget,
    Faulted(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Inaccessible => f.write_str("inaccessible"),
            SkipReason::NullTarget => f.write_str("null target"),
            SkipReason::Faulted(message) => write!(f, "faulted: {message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MemberRead {
    Value(Value),
    Skip(SkipReason),
}

pub trait Inspect: fmt::Debug {
    fn members(&self) -> Vec<Member>;

    fn read(&self, member: &str) -> MemberRead;

    fn display(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct Properties {
    display: Option<String>,
    entries: Vec<(Member, MemberRead)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        let member = Member::new(name, value.member_type());
        self.entries.push((member, MemberRead::Value(value)));
        self
    }

    pub fn with_null(self, name: impl Into<String>, ty: MemberType) -> Self {
        self.with_skip(name, ty, SkipReason::NullTarget)
    }

    pub fn with_fault(
        self,
        name: impl Into<String>,
        ty: MemberType,
        message: impl Into<String>,
    ) -> Self {
        self.with_skip(name, ty, SkipReason::Faulted(message.into()))
    }

    pub fn with_inaccessible(self, name: impl Into<String>, ty: MemberType) -> Self {
        self.with_skip(name, ty, SkipReason::Inaccessible)
    }

    pub fn with_skip(mut self, name: impl Into<String>, ty: MemberType, reason: SkipReason) -> Self {
        self.entries
            .push((Member::new(name, ty), MemberRead::Skip(reason)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Inspect for Properties {
    fn members(&self) -> Vec<Member> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }

    fn read(&self, member: &str) -> MemberRead {
        self.entries
            .iter()
            .find(|(m, _)| m.name == member)
            .map(|(_, read)| read.clone())
            .unwrap_or(MemberRead::Skip(SkipReason::Inaccessible))
    }

    fn display(&self) -> Option<String> {
        self.display.clone()
    }
}
