//! Whole-graph scanners producing labelled [`CacheEntry`] lists.
//!
//! - root entities: `Node(<name>)`
//! - capability scans: `<path> (<TypeName>)`, deduplicated by identity
//! - singletons: `<TypeName>.Instance`

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::catalog::{AccessorKind, StaticRead, TypeCatalog, TypeInfo, TypeTag};
use crate::world::{Target, World};

pub const INSTANCE_PROPERTY: &str = "Instance";
pub const INSTANCE_FIELD: &str = "_instance";

#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub label: String,
    #[serde(skip)]
    pub target: Target,
}

impl CacheEntry {
    pub fn new(label: impl Into<String>, target: Target) -> Self {
        Self {
            label: label.into(),
            target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Roots,
    Positional,
    Behavioural,
    Other,
    Singletons,
}

pub fn run_scan(world: &World, kind: ScanKind) -> Vec<CacheEntry> {
    match kind {
        ScanKind::Roots => scan_root_nodes(world),
        ScanKind::Positional => scan_positional(world),
        ScanKind::Behavioural => scan_behavioural(world),
        ScanKind::Other => scan_other_components(world),
        ScanKind::Singletons => scan_singletons(world),
    }
}

pub fn scan_root_nodes(world: &World) -> Vec<CacheEntry> {
    debug!("Looking for root nodes...");
    world
        .roots()
        .filter_map(|id| {
            world
                .name(id)
                .map(|name| CacheEntry::new(format!("Node({name})"), Target::Node(id)))
        })
        .collect()
}

pub fn scan_positional(world: &World) -> Vec<CacheEntry> {
    debug!("Looking for positional components...");
    scan_by_capability(world, |c, t| c.is_positional(t), false)
}

pub fn scan_behavioural(world: &World) -> Vec<CacheEntry> {
    debug!("Looking for behaviours...");
    scan_by_capability(world, |c, t| c.is_behavioural(t), true)
}

pub fn scan_other_components(world: &World) -> Vec<CacheEntry> {
    debug!("Looking for other components...");
    scan_by_capability(
        world,
        |c, t| c.is_component(t) && !c.is_positional(t) && !c.is_behavioural(t),
        true,
    )
}

/// With `exclude_positional`, instances whose runtime type is positional are left out.
pub fn scan_by_capability<F>(world: &World, predicate: F, exclude_positional: bool) -> Vec<CacheEntry>
where
    F: Fn(&TypeCatalog, TypeTag) -> bool,
{
    let catalog = world.catalog();
    let types = catalog.types_matching(|c, t| c.is_component(t) && predicate(c, t));

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for tag in types {
        for id in world.instances_of(tag) {
            if !seen.insert(id) {
                continue;
            }
            let Some(component) = world.component(id) else {
                continue;
            };
            let runtime_type = component.type_tag();
            if exclude_positional && catalog.is_positional(runtime_type) {
                continue;
            }
            let Some(path) = world.path(component.owner()) else {
                continue;
            };
            let label = format!("{path} ({})", catalog.type_name(runtime_type));
            entries.push(CacheEntry::new(label, Target::Component(id)));
        }
    }
    entries
}

pub fn scan_singletons(world: &World) -> Vec<CacheEntry> {
    debug!("Looking for class instances...");
    let mut entries = Vec::new();
    for (_, info) in world.catalog().concrete_types() {
        let read = match info.static_accessor(INSTANCE_PROPERTY, AccessorKind::Property) {
            Some(prop) => match live_or_null(world, prop.read(world)) {
                StaticRead::Null => read_instance_field(world, info),
                other => other,
            },
            None => read_instance_field(world, info),
        };
        match read {
            StaticRead::Value(target) => {
                entries.push(CacheEntry::new(format!("{}.Instance", info.name), target));
            }
            StaticRead::Null => {}
            StaticRead::Fault(message) => {
                debug!(type_name = %info.full_name, error = %message, "singleton probe failed");
            }
        }
    }
    entries
}

fn read_instance_field(world: &World, info: &TypeInfo) -> StaticRead {
    info.static_accessor(INSTANCE_FIELD, AccessorKind::Field)
        .map(|field| live_or_null(world, field.read(world)))
        .unwrap_or(StaticRead::Null)
}

// A destroyed target reads as null.
fn live_or_null(world: &World, read: StaticRead) -> StaticRead {
    match read {
        StaticRead::Value(target) if !world.contains(&target) => StaticRead::Null,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Capability;
    use crate::error::Result;
    use crate::inspect::Properties;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tracing_test::traced_test;

    struct Fixture {
        world: World,
        transform: TypeTag,
        rect: TypeTag,
        behaviour: TypeTag,
        collider: TypeTag,
    }

    fn fixture() -> Result<Fixture> {
        let mut catalog = TypeCatalog::new();
        let transform = catalog.register(
            TypeInfo::concrete("Transform", "Engine.Transform")
                .with_capability(Capability::Positional),
        )?;
        let rect = catalog.register(
            TypeInfo::concrete("RectTransform", "Engine.RectTransform").with_base(transform),
        )?;
        let behaviour = catalog.register(
            TypeInfo::concrete("Mover", "Game.Mover").with_capability(Capability::Behavioural),
        )?;
        let collider = catalog.register(
            TypeInfo::concrete("Collider", "Engine.Collider").with_capability(Capability::Component),
        )?;
        Ok(Fixture {
            world: World::with_catalog(catalog),
            transform,
            rect,
            behaviour,
            collider,
        })
    }

    fn labels(entries: &[CacheEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn root_scan_lists_parentless_nodes() -> Result<()> {
        let mut f = fixture()?;
        let a = f.world.spawn("A", None)?;
        f.world.spawn("child", Some(a))?;
        f.world.spawn("B", None)?;
        assert_eq!(labels(&scan_root_nodes(&f.world)), vec!["Node(A)", "Node(B)"]);
        Ok(())
    }

    #[test]
    fn positional_scan_dedupes_derived_instances() -> Result<()> {
        let mut f = fixture()?;
        let ui = f.world.spawn("UI", None)?;
        let panel = f.world.spawn("Panel", Some(ui))?;
        f.world.attach(ui, f.transform, Properties::new())?;
        f.world.attach(panel, f.rect, Properties::new())?;

        let entries = scan_positional(&f.world);
        assert_eq!(
            labels(&entries),
            vec!["UI (Transform)", "UI/Panel (RectTransform)"]
        );
        Ok(())
    }

    #[test]
    fn behaviour_and_other_scans_partition_components() -> Result<()> {
        let mut f = fixture()?;
        let n = f.world.spawn("Crate", None)?;
        f.world.attach(n, f.transform, Properties::new())?;
        f.world.attach(n, f.behaviour, Properties::new())?;
        f.world.attach(n, f.collider, Properties::new())?;

        assert_eq!(labels(&scan_behavioural(&f.world)), vec!["Crate (Mover)"]);
        assert_eq!(
            labels(&scan_other_components(&f.world)),
            vec!["Crate (Collider)"]
        );
        Ok(())
    }

    #[test]
    fn singleton_scan_prefers_property_then_field() -> Result<()> {
        let mut f = fixture()?;
        let game = f.world.spawn("Game", None)?;
        let manager = f.world.attach(game, f.behaviour, Properties::new())?;
        let catalog = f.world.catalog_mut();

        let by_prop = catalog.register(TypeInfo::concrete("GameManager", "Game.GameManager"))?;
        catalog.register_static(
            by_prop,
            INSTANCE_PROPERTY,
            AccessorKind::Property,
            Box::new(move |_: &World| StaticRead::Value(Target::Component(manager))),
        )?;

        let settings: Arc<dyn crate::inspect::Inspect> = Arc::new(Properties::new());
        let by_field = catalog.register(TypeInfo::concrete("Settings", "Game.Settings"))?;
        catalog.register_static(
            by_field,
            INSTANCE_PROPERTY,
            AccessorKind::Property,
            Box::new(|_: &World| StaticRead::Null),
        )?;
        let held = Arc::clone(&settings);
        catalog.register_static(
            by_field,
            INSTANCE_FIELD,
            AccessorKind::Field,
            Box::new(move |_: &World| StaticRead::Value(Target::Object(Arc::clone(&held)))),
        )?;

        catalog.register(TypeInfo::concrete("Plain", "Game.Plain"))?;

        let entries = scan_singletons(&f.world);
        assert_eq!(
            labels(&entries),
            vec!["GameManager.Instance", "Settings.Instance"]
        );
        assert!(entries[1].target.same(&Target::Object(settings)));
        Ok(())
    }

    #[traced_test]
    #[test]
    fn faulting_singleton_probe_is_logged_and_skipped() {
        let mut f = fixture().unwrap();
        let catalog = f.world.catalog_mut();
        let broken = catalog
            .register(TypeInfo::concrete("Broken", "Game.Broken"))
            .unwrap();
        catalog
            .register_static(
                broken,
                INSTANCE_PROPERTY,
                AccessorKind::Property,
                Box::new(|_: &World| StaticRead::Fault("static constructor threw".to_string())),
            )
            .unwrap();
        let ok = catalog
            .register(TypeInfo::concrete("Fine", "Game.Fine"))
            .unwrap();
        let obj: Arc<dyn crate::inspect::Inspect> = Arc::new(Properties::new());
        catalog
            .register_static(
                ok,
                INSTANCE_FIELD,
                AccessorKind::Field,
                Box::new(move |_: &World| StaticRead::Value(Target::Object(Arc::clone(&obj)))),
            )
            .unwrap();

        let entries = scan_singletons(&f.world);
        assert_eq!(labels(&entries), vec!["Fine.Instance"]);
        assert!(logs_contain("static constructor threw"));
    }

    #[test]
    fn singletons_pointing_at_destroyed_nodes_are_dropped() -> Result<()> {
        let mut f = fixture()?;
        let gone = f.world.spawn("Gone", None)?;
        let catalog = f.world.catalog_mut();
        let tag = catalog.register(TypeInfo::concrete("Ghost", "Game.Ghost"))?;
        catalog.register_static(
            tag,
            INSTANCE_PROPERTY,
            AccessorKind::Property,
            Box::new(move |_: &World| StaticRead::Value(Target::Node(gone))),
        )?;
        f.world.destroy(gone);
        assert!(scan_singletons(&f.world).is_empty());
        Ok(())
    }

    #[test]
    fn destroyed_property_target_falls_back_to_field() -> Result<()> {
        let mut f = fixture()?;
        let gone = f.world.spawn("Gone", None)?;
        let live = f.world.spawn("Manager", None)?;
        let catalog = f.world.catalog_mut();
        let tag = catalog.register(TypeInfo::concrete("Mgr", "Game.Mgr"))?;
        catalog.register_static(
            tag,
            INSTANCE_PROPERTY,
            AccessorKind::Property,
            Box::new(move |_: &World| StaticRead::Value(Target::Node(gone))),
        )?;
        catalog.register_static(
            tag,
            INSTANCE_FIELD,
            AccessorKind::Field,
            Box::new(move |_: &World| StaticRead::Value(Target::Node(live))),
        )?;
        f.world.destroy(gone);

        let entries = scan_singletons(&f.world);
        assert_eq!(labels(&entries), vec!["Mgr.Instance"]);
        assert!(entries[0].target.same(&Target::Node(live)));
        Ok(())
    }
}
