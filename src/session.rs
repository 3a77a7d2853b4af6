//! The inspection session: owner of the root cache and navigation stack.
//!
//! Sessions come from a [`SessionFactory`]; at most one may be open per
//! factory at a time. Opening a second one is a programming error and
//! panics. Dropping the session releases the slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};

use tracing::{debug, info};

use crate::catalog::TypeTag;
use crate::config::SessionConfig;
use crate::error::{InspectError, Result};
use crate::roots::RootSetCache;
use crate::search::SearchQuery;
use crate::stack::{InspectionStack, StackEntry};
use crate::world::{Node, NodeId, Target, World};

#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    open: Arc<AtomicBool>,
}

impl SessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// # Panics
    ///
    /// When a session from this factory is still open.
    pub fn open(&self, config: SessionConfig) -> Session {
        if self.open.swap(true, Ordering::AcqRel) {
            panic!("Can only create one inspection session at a time");
        }
        info!("inspection session opened");
        Session::new(
            config,
            SessionGuard {
                open: Arc::clone(&self.open),
            },
        )
    }
}

#[derive(Debug)]
struct SessionGuard {
    open: Arc<AtomicBool>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrigin {
    Host,
    Tree,
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    roots: RootSetCache,
    stack: InspectionStack,
    tree_rx: Receiver<NodeId>,
    selected: Option<NodeId>,
    shown: bool,
    _guard: SessionGuard,
}

impl Session {
    fn new(config: SessionConfig, guard: SessionGuard) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            roots: RootSetCache::new(),
            stack: InspectionStack::with_tree_notifier(tx),
            tree_rx: rx,
            selected: None,
            shown: false,
            _guard: guard,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn roots(&self) -> &RootSetCache {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut RootSetCache {
        &mut self.roots
    }

    pub fn stack(&self) -> &InspectionStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut InspectionStack {
        &mut self.stack
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn set_shown(&mut self, world: &mut World, show: bool) {
        if self.shown == show {
            return;
        }
        self.shown = show;
        if show {
            self.refresh(world, true);
        }
    }

    pub fn update(&mut self, world: &mut World) {
        if self.shown && self.config.refresh_on_update {
            self.refresh(world, false);
        }
    }

    pub fn refresh(&mut self, world: &mut World, full: bool) {
        match self.config.hidden_root_prefix.as_deref() {
            Some(prefix) => {
                let hide = |n: &Node| n.name().starts_with(prefix);
                self.roots.refresh(world, full, Some(&hide));
            }
            None => self.roots.refresh(world, full, None),
        }
    }

    pub fn search(&mut self, world: &World, text: &str) {
        self.search_with(world, text, false);
    }

    /// `include_members` widens the configured default, it never narrows it.
    pub fn search_with(&mut self, world: &World, text: &str, include_members: bool) {
        let query =
            SearchQuery::new(text).with_members(include_members || self.config.include_members);
        self.roots.search(world, &query);
    }

    pub fn visible_objects(&mut self, world: &World) -> &[NodeId] {
        self.roots.searched_or_all_objects(world)
    }

    pub fn on_selection_changed(
        &mut self,
        world: &World,
        node: NodeId,
        origin: SelectionOrigin,
    ) -> Result<bool> {
        let label = world
            .path(node)
            .ok_or_else(|| InspectError::invalid(format!("node {node} is not alive")))?;
        if origin == SelectionOrigin::Tree {
            self.selected = Some(node);
        }
        self.stack.push(
            world,
            StackEntry::instance(Target::Node(node), label),
            origin == SelectionOrigin::Host,
        )
    }

    /// Pushes `entries` in order; only the first one selects in the tree.
    pub fn open_in_inspector(&mut self, world: &World, entries: Vec<StackEntry>) -> Result<()> {
        for (i, entry) in entries.into_iter().enumerate() {
            self.stack.push(world, entry, i == 0)?;
        }
        Ok(())
    }

    pub fn inspect(&mut self, world: &World, target: Target) -> Result<bool> {
        let label = format!("REPL > {}", world.type_name_of(&target));
        self.stack
            .push(world, StackEntry::instance(target, label), true)
    }

    pub fn inspect_static(&mut self, world: &World, type_tag: TypeTag) -> Result<bool> {
        let info = world
            .catalog()
            .get(type_tag)
            .ok_or_else(|| InspectError::invalid(format!("unknown type tag {}", type_tag.index())))?;
        let label = format!("REPL > {}", info.name);
        self.stack
            .push(world, StackEntry::static_type(type_tag, label), true)
    }

    pub fn inspected(&mut self, world: &World) -> Result<Target> {
        self.stack.inspected_object(world)
    }

    pub fn select_in_tree(&mut self, world: &World, node: NodeId) -> Result<()> {
        if !world.is_alive(node) {
            return Err(InspectError::invalid(format!("node {node} is not alive")));
        }
        self.selected = Some(node);
        Ok(())
    }

    pub fn selected_in_tree(&self, world: &World) -> Option<NodeId> {
        self.selected.filter(|id| world.is_alive(*id))
    }

    pub fn tree_requests(&mut self, world: &World) -> Vec<NodeId> {
        let requests: Vec<NodeId> = self
            .tree_rx
            .try_iter()
            .filter(|id| world.is_alive(*id))
            .collect();
        if let Some(last) = requests.last() {
            self.selected = Some(*last);
        }
        requests
    }

    pub fn log_message(&self, message: &str) {
        info!("{message}");
    }

    pub fn teardown(mut self) {
        self.stack.clear();
        debug!("inspection stack cleared");
        info!("inspection session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Capability, TypeCatalog, TypeInfo};
    use crate::inspect::Properties;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[test]
    #[should_panic(expected = "one inspection session")]
    fn second_session_is_a_programming_error() {
        let factory = SessionFactory::new();
        let _first = factory.open(SessionConfig::default());
        let _second = factory.open(SessionConfig::default());
    }

    #[test]
    fn closing_a_session_allows_a_new_one() {
        let factory = SessionFactory::new();
        let first = factory.open(SessionConfig::default());
        assert!(factory.is_open());
        first.teardown();
        assert!(!factory.is_open());
        let _second = factory.open(SessionConfig::default());
        assert!(factory.is_open());
    }

    #[test]
    fn showing_refreshes_and_hides_prefixed_roots() -> Result<()> {
        let mut world = World::new().with_root_tracking();
        world.spawn("Gizmo_lines", None)?;
        world.spawn("Player", None)?;
        let config = SessionConfig {
            hidden_root_prefix: Some("Gizmo_".to_string()),
            ..SessionConfig::default()
        };
        let factory = SessionFactory::new();
        let mut session = factory.open(config);

        session.set_shown(&mut world, true);
        let visible: Vec<&str> = session
            .visible_objects(&world)
            .to_vec()
            .into_iter()
            .filter_map(|id| world.name(id))
            .collect();
        assert_eq!(visible, vec!["Player"]);

        world.spawn("Enemy", None)?;
        world.spawn("Gizmo_arrow", None)?;
        session.update(&mut world);
        let visible: Vec<&str> = session
            .visible_objects(&world)
            .to_vec()
            .into_iter()
            .filter_map(|id| world.name(id))
            .collect();
        assert_eq!(visible, vec!["Enemy", "Player"]);
        Ok(())
    }

    #[test]
    fn host_selection_follows_in_tree_but_tree_selection_does_not_echo() -> Result<()> {
        let mut world = World::new();
        let a = world.spawn("a", None)?;
        let b = world.spawn("b", Some(a))?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());

        session.on_selection_changed(&world, b, SelectionOrigin::Host)?;
        assert_eq!(session.tree_requests(&world), vec![b]);
        assert_eq!(session.selected_in_tree(&world), Some(b));

        session.on_selection_changed(&world, a, SelectionOrigin::Tree)?;
        assert!(session.tree_requests(&world).is_empty());
        assert_eq!(session.selected_in_tree(&world), Some(a));

        let labels: Vec<String> = session
            .stack_mut()
            .entries(&world)
            .iter()
            .map(|e| e.label().to_string())
            .collect();
        assert_eq!(labels, vec!["a/b", "a"]);
        Ok(())
    }

    #[test]
    fn open_in_inspector_selects_only_first_entry() -> Result<()> {
        let mut world = World::new();
        let a = world.spawn("a", None)?;
        let b = world.spawn("b", None)?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());

        session.open_in_inspector(
            &world,
            vec![
                StackEntry::instance(Target::Node(a), "a"),
                StackEntry::instance(Target::Node(b), "b"),
            ],
        )?;
        assert_eq!(session.tree_requests(&world), vec![a]);
        assert_eq!(session.stack().len(), 2);
        Ok(())
    }

    #[test]
    fn repl_style_inspection_labels_by_type() -> Result<()> {
        let mut catalog = TypeCatalog::new();
        let mover = catalog.register(
            TypeInfo::concrete("Mover", "Game.Mover").with_capability(Capability::Behavioural),
        )?;
        let mut world = World::with_catalog(catalog);
        let n = world.spawn("n", None)?;
        let c = world.attach(n, mover, Properties::new())?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());

        session.inspect(&world, Target::Component(c))?;
        assert_eq!(session.stack().current().map(StackEntry::label), Some("REPL > Mover"));
        assert!(matches!(session.inspected(&world)?, Target::Component(id) if id == c));

        session.inspect_static(&world, mover)?;
        assert_eq!(
            session.inspected(&world).unwrap_err(),
            InspectError::NothingInspected
        );
        Ok(())
    }

    #[test]
    fn search_uses_configured_member_default() -> Result<()> {
        let mut catalog = TypeCatalog::new();
        let label = catalog.register(
            TypeInfo::concrete("Label", "Ui.Label").with_capability(Capability::Component),
        )?;
        let mut world = World::with_catalog(catalog);
        let root = world.spawn("Hud", None)?;
        world.attach(
            root,
            label,
            Properties::new().with("text", crate::inspect::Value::Text("Score".into())),
        )?;

        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig {
            include_members: true,
            ..SessionConfig::default()
        });
        session.refresh(&mut world, true);
        session.search(&world, "score");
        assert_eq!(session.visible_objects(&world), &[root]);
        Ok(())
    }

    #[test]
    fn member_search_can_be_widened_per_call() -> Result<()> {
        let mut catalog = TypeCatalog::new();
        let label = catalog.register(
            TypeInfo::concrete("Label", "Ui.Label").with_capability(Capability::Component),
        )?;
        let mut world = World::with_catalog(catalog);
        let root = world.spawn("Hud", None)?;
        world.attach(
            root,
            label,
            Properties::new().with("text", crate::inspect::Value::Text("Score".into())),
        )?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());
        session.refresh(&mut world, true);

        session.search(&world, "score");
        assert!(session.visible_objects(&world).is_empty());
        session.search_with(&world, "score", true);
        assert_eq!(session.visible_objects(&world), &[root]);
        Ok(())
    }

    #[test]
    fn update_does_nothing_while_hidden() -> Result<()> {
        let mut world = World::new().with_root_tracking();
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());
        assert!(!session.is_shown());

        let a = world.spawn("a", None)?;
        session.update(&mut world);
        assert_eq!(world.drain_created_roots(), Some(vec![a]));
        Ok(())
    }

    #[test]
    fn update_does_nothing_when_refresh_on_update_is_off() -> Result<()> {
        let mut world = World::new().with_root_tracking();
        world.spawn("a", None)?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig {
            refresh_on_update: false,
            ..SessionConfig::default()
        });
        session.set_shown(&mut world, true);
        assert!(session.is_shown());

        let b = world.spawn("b", None)?;
        session.update(&mut world);
        assert_eq!(session.visible_objects(&world).len(), 1);
        assert_eq!(world.drain_created_roots(), Some(vec![b]));
        Ok(())
    }

    #[test]
    fn destroyed_nodes_cannot_be_selected() -> Result<()> {
        let mut world = World::new();
        let a = world.spawn("a", None)?;
        let factory = SessionFactory::new();
        let mut session = factory.open(SessionConfig::default());

        session.select_in_tree(&world, a)?;
        assert_eq!(session.selected_in_tree(&world), Some(a));

        world.destroy(a);
        assert_eq!(session.selected_in_tree(&world), None);
        assert!(matches!(
            session.select_in_tree(&world, a),
            Err(InspectError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.on_selection_changed(&world, a, SelectionOrigin::Host),
            Err(InspectError::InvalidArgument(_))
        ));
        assert!(session.stack().is_empty());
        Ok(())
    }

    #[traced_test]
    #[test]
    fn log_message_is_emitted_at_info() {
        let factory = SessionFactory::new();
        let session = factory.open(SessionConfig::default());
        session.log_message("round three started");
        assert!(logs_contain("INFO"));
        assert!(logs_contain("round three started"));
    }
}
