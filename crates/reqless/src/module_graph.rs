//! Module-level dependency graph built alongside the worklist.
//!
//! The bundle itself does not need an ordering (modules are instantiated
//! lazily by the dispatcher), so the graph is used for diagnostics: it reports
//! import cycles and lets callers inspect who imports whom.

use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Dependency graph keyed by module identity. An edge `a -> b` means `a`
/// imports or requires `b`.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    graph: DiGraph<PathBuf, ()>,
    node_indices: FxHashMap<PathBuf, NodeIndex>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module, returning the existing node if it is already known
    pub fn add_module(&mut self, identity: &Path) -> NodeIndex {
        if let Some(&index) = self.node_indices.get(identity) {
            return index;
        }
        let index = self.graph.add_node(identity.to_path_buf());
        self.node_indices.insert(identity.to_path_buf(), index);
        index
    }

    /// Record that `from` depends on `to`
    pub fn add_dependency(&mut self, from: &Path, to: &Path) {
        let from = self.add_module(from);
        let to = self.add_module(to);
        if !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Modules imported by `identity`, in the order they were first recorded
    pub fn dependencies_of(&self, identity: &Path) -> Vec<&Path> {
        self.neighbors(identity, Direction::Outgoing)
    }

    /// Modules importing `identity`
    pub fn dependents_of(&self, identity: &Path) -> Vec<&Path> {
        self.neighbors(identity, Direction::Incoming)
    }

    fn neighbors(&self, identity: &Path, direction: Direction) -> Vec<&Path> {
        let Some(&index) = self.node_indices.get(identity) else {
            return Vec::new();
        };
        // petgraph yields the most recently added edge first
        let mut neighbors: Vec<&Path> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor].as_path())
            .collect();
        neighbors.reverse();
        neighbors
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Groups of modules that import each other, including modules that
    /// import themselves
    pub fn find_cycles(&self) -> Vec<Vec<PathBuf>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                _ => true,
            })
            .map(|component| {
                let mut members: Vec<PathBuf> = component
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect();
                members.sort();
                members
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleGraph;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_modules_are_deduplicated() {
        let mut graph = ModuleGraph::new();
        let first = graph.add_module(Path::new("/p/a.ts"));
        let second = graph.add_module(Path::new("/p/a.ts"));
        assert_eq!(first, second);
        graph.add_dependency(Path::new("/p/a.ts"), Path::new("/p/b.ts"));
        graph.add_dependency(Path::new("/p/a.ts"), Path::new("/p/b.ts"));
        assert_eq!(graph.module_count(), 2);
        assert_eq!(graph.dependency_count(), 1);
        assert_eq!(
            graph.dependents_of(Path::new("/p/b.ts")),
            vec![Path::new("/p/a.ts")]
        );
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let mut graph = ModuleGraph::new();
        graph.add_dependency(Path::new("/p/main.ts"), Path::new("/p/b.ts"));
        graph.add_dependency(Path::new("/p/main.ts"), Path::new("/p/c.ts"));
        graph.add_dependency(Path::new("/p/b.ts"), Path::new("/p/c.ts"));

        assert_eq!(
            graph.dependencies_of(Path::new("/p/main.ts")),
            vec![Path::new("/p/b.ts"), Path::new("/p/c.ts")]
        );
        assert_eq!(
            graph.dependents_of(Path::new("/p/c.ts")),
            vec![Path::new("/p/main.ts"), Path::new("/p/b.ts")]
        );
        assert!(graph.dependencies_of(Path::new("/p/unknown.ts")).is_empty());
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let mut graph = ModuleGraph::new();
        graph.add_dependency(Path::new("/p/main.ts"), Path::new("/p/a.ts"));
        graph.add_dependency(Path::new("/p/main.ts"), Path::new("/p/b.ts"));
        graph.add_dependency(Path::new("/p/a.ts"), Path::new("/p/b.ts"));
        assert!(!graph.has_cycles());
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn test_cycles_are_reported() {
        let mut graph = ModuleGraph::new();
        graph.add_dependency(Path::new("/p/main.ts"), Path::new("/p/a.ts"));
        graph.add_dependency(Path::new("/p/a.ts"), Path::new("/p/b.ts"));
        graph.add_dependency(Path::new("/p/b.ts"), Path::new("/p/a.ts"));
        graph.add_dependency(Path::new("/p/self.ts"), Path::new("/p/self.ts"));

        assert!(graph.has_cycles());
        let mut cycles = graph.find_cycles();
        cycles.sort();
        assert_eq!(
            cycles,
            vec![
                vec![PathBuf::from("/p/a.ts"), PathBuf::from("/p/b.ts")],
                vec![PathBuf::from("/p/self.ts")],
            ]
        );
    }
}
