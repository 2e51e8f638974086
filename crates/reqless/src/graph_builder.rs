//! Worklist traversal from the entry module to every reachable dependency.
//!
//! The builder is the only writer of the dependency collection: rewrites
//! report the identities they reference, the builder appends records for new
//! ones and marks each record visited once its rewritten source is stored.

use indexmap::IndexMap;
use log::{debug, info, trace};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BundleError, BundleWarning};
use crate::module_graph::ModuleGraph;
use crate::resolver::ModuleResolver;
use crate::rewriter::ModuleRewriter;
use crate::syntax::{PrintOptions, SourceModule};

/// One discovered module other than the entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRecord {
    identity: PathBuf,
    rewritten_source: Option<String>,
}

impl DependencyRecord {
    /// A freshly discovered, not yet rewritten module
    pub fn new(identity: PathBuf) -> Self {
        Self {
            identity,
            rewritten_source: None,
        }
    }

    pub fn identity(&self) -> &Path {
        &self.identity
    }

    pub fn is_visited(&self) -> bool {
        self.rewritten_source.is_some()
    }

    /// Rewritten source, present once the module has been visited
    pub fn rewritten_source(&self) -> Option<&str> {
        self.rewritten_source.as_deref()
    }

    pub(crate) fn mark_visited(&mut self, rewritten_source: String) {
        self.rewritten_source = Some(rewritten_source);
    }
}

/// Dependency records keyed by identity, in discovery order
pub type Dependencies = IndexMap<PathBuf, DependencyRecord>;

/// Everything the assembler needs, plus diagnostics
#[derive(Debug)]
pub struct BuildOutput {
    /// Canonical identity of the entry module
    pub entry: PathBuf,
    /// Rewritten source of the entry module
    pub entry_source: String,
    pub dependencies: Dependencies,
    pub graph: ModuleGraph,
    pub warnings: Vec<BundleWarning>,
}

/// Builds the dependency collection for one entry module
#[derive(Debug)]
pub struct GraphBuilder {
    resolver: ModuleResolver,
    print_options: PrintOptions,
    dependencies: Dependencies,
    graph: ModuleGraph,
    warnings: Vec<BundleWarning>,
}

impl GraphBuilder {
    pub fn new(print_options: PrintOptions) -> Self {
        Self {
            resolver: ModuleResolver::new(),
            print_options,
            dependencies: Dependencies::default(),
            graph: ModuleGraph::new(),
            warnings: Vec::new(),
        }
    }

    /// Rewrite the entry module and every module reachable from it
    pub fn build(mut self, entry: &Path) -> Result<BuildOutput, BundleError> {
        let entry = entry.canonicalize().map_err(|source| BundleError::Io {
            path: entry.to_path_buf(),
            source,
        })?;
        info!("Building module graph from {:?}", entry);

        let entry_source = self.visit(&entry)?;

        let mut generation = 0;
        loop {
            let pending: Vec<PathBuf> = self
                .dependencies
                .values()
                .filter(|record| !record.is_visited())
                .map(|record| record.identity.clone())
                .collect();
            if pending.is_empty() {
                break;
            }

            generation += 1;
            debug!(
                "Generation {}: {} unvisited of {} discovered modules",
                generation,
                pending.len(),
                self.dependencies.len()
            );

            for identity in pending {
                let rewritten = self.visit(&identity)?;
                if let Some(record) = self.dependencies.get_mut(&identity) {
                    record.mark_visited(rewritten);
                }
            }
        }

        for cycle in self.graph.find_cycles() {
            let members: Vec<String> = cycle
                .iter()
                .map(|identity| identity.display().to_string())
                .collect();
            info!("Import cycle: {}", members.join(" <-> "));
            for identity in &cycle {
                let importers: Vec<String> = self
                    .graph
                    .dependents_of(identity)
                    .into_iter()
                    .map(|importer| importer.display().to_string())
                    .collect();
                debug!("  {} imported by {}", identity.display(), importers.join(", "));
            }
        }
        info!(
            "Module graph complete: {} dependencies in {} generations",
            self.dependencies.len(),
            generation
        );

        Ok(BuildOutput {
            entry,
            entry_source,
            dependencies: self.dependencies,
            graph: self.graph,
            warnings: self.warnings,
        })
    }

    /// Read, parse, rewrite and print one module, recording what it references
    fn visit(&mut self, identity: &Path) -> Result<String, BundleError> {
        trace!("Visiting {:?}", identity);
        let source = fs::read_to_string(identity).map_err(|source| BundleError::Io {
            path: identity.to_path_buf(),
            source,
        })?;

        let parsed = SourceModule::parse(identity, source)?;
        let resolver = &mut self.resolver;
        let (rewritten, outcome) = parsed.transform(|module, marks| {
            ModuleRewriter::new(resolver.bind(identity), marks).rewrite(module)
        })?;

        self.graph.add_module(identity);
        for dependency in outcome.dependencies {
            self.graph.add_dependency(identity, &dependency);
            if !self.dependencies.contains_key(&dependency) {
                trace!("Discovered {:?}", dependency);
                self.dependencies
                    .insert(dependency.clone(), DependencyRecord::new(dependency));
            }
        }
        self.warnings.extend(outcome.warnings);
        trace!(
            "{:?} imports {:?}",
            identity,
            self.graph.dependencies_of(identity)
        );

        rewritten.print(self.print_options)
    }
}
