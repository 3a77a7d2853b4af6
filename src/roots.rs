//! Cached set of root nodes with cheap per-frame refresh and a narrowed
//! search scope.

use std::collections::HashSet;

use tracing::debug;

use crate::search::{SearchQuery, matches_node};
use crate::world::{Node, NodeId, World};

pub type RootFilter<'a> = &'a dyn Fn(&Node) -> bool;

#[derive(Debug, Default)]
pub struct RootSetCache {
    cached_roots: Option<Vec<NodeId>>,
    search_results: Option<Vec<NodeId>>,
}

impl RootSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_searching(&self) -> bool {
        self.search_results.is_some()
    }

    /// Does nothing while a search scope is active.
    pub fn refresh(&mut self, world: &mut World, full: bool, filter: Option<RootFilter<'_>>) {
        if self.is_searching() {
            return;
        }

        let mut roots = match self.cached_roots.take() {
            Some(mut roots) if !full && !roots.is_empty() => {
                roots.retain(|id| world.is_alive(*id));
                if let Some(created) = world.drain_created_roots() {
                    let mut present: HashSet<NodeId> = roots.iter().copied().collect();
                    let before = roots.len();
                    for id in created {
                        if world.node(id).is_some_and(Node::is_root) && present.insert(id) {
                            roots.push(id);
                        }
                    }
                    if roots.len() != before {
                        debug!(appended = roots.len() - before, "discovered new root nodes");
                        sort_by_name(world, &mut roots);
                    }
                }
                roots
            }
            _ => {
                let _ = world.drain_created_roots();
                scan_roots(world)
            }
        };

        if let Some(filter) = filter {
            roots.retain(|id| !world.node(*id).is_some_and(filter));
        }

        self.cached_roots = Some(roots);
    }

    pub fn root_objects(&mut self, world: &World) -> &[NodeId] {
        let roots = self.cached_roots.get_or_insert_with(|| scan_roots(world));
        roots.retain(|id| world.is_alive(*id));
        roots
    }

    /// An empty query clears the search scope.
    pub fn search(&mut self, world: &World, query: &SearchQuery) {
        if query.is_empty() {
            self.search_results = None;
            return;
        }

        let roots = self.root_objects(world).to_vec();
        let mut seen = HashSet::new();
        let mut matches: Vec<NodeId> = roots
            .into_iter()
            .flat_map(|root| world.descendants(root))
            .filter(|id| seen.insert(*id))
            .filter(|id| matches_node(world, *id, query))
            .collect();
        sort_by_name(world, &mut matches);

        debug!(query = %query.text, matches = matches.len(), "search finished");
        self.search_results = Some(matches);
    }

    pub fn searched_or_all_objects(&mut self, world: &World) -> &[NodeId] {
        if !self.is_searching() {
            return self.root_objects(world);
        }
        let results = self.search_results.get_or_insert_with(Vec::new);
        results.retain(|id| world.is_alive(*id));
        results
    }
}

fn scan_roots(world: &World) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = world.roots().collect();
    sort_by_name(world, &mut roots);
    roots
}

fn sort_by_name(world: &World, nodes: &mut [NodeId]) {
    nodes.sort_by_cached_key(|id| world.name(*id).map(str::to_lowercase).unwrap_or_default());
}
