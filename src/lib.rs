//! # graph-inspector
//!
//! Runtime inspection of a host's live object graph: a hierarchy of named
//! nodes carrying typed, reflectively readable components.
//!
//! ## Architecture
//!
//! - **world**: Generational arena of nodes and components, with root tracking
//! - **catalog**: Registry of component types, capabilities and static accessors
//! - **inspect**: Reflective member reads for components and free objects
//! - **search**: Case-insensitive text matching over components and subtrees
//! - **scan**: Whole-graph scans for roots, capabilities and singletons
//! - **roots**: Cached, sorted root set with incremental refresh and search scope
//! - **stack**: Navigation history of inspected targets
//! - **session**: Single guarded inspection session tying the above together
//! - **config**: Session settings loaded from JSON
//! - **snapshot**: JSON snapshots of a host graph for offline inspection

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod inspect;
pub mod roots;
pub mod scan;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod stack;
pub mod world;

pub use catalog::{Capability, TypeCatalog, TypeInfo, TypeTag};
pub use error::{InspectError, Result};
pub use inspect::{Inspect, MemberRead, Properties, Value};
pub use roots::RootSetCache;
pub use session::{SelectionOrigin, Session, SessionFactory};
pub use stack::{InspectionStack, StackEntry};
pub use world::{ComponentId, NodeId, Target, World};
