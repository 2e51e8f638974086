pub mod code_generator;
pub mod combine;
pub mod config;
pub mod dirs;
pub mod error;
pub mod graph_builder;
pub mod module_graph;
pub mod orchestrator;
pub mod resolver;
pub mod rewriter;
pub mod syntax;

pub use config::Config;
pub use error::{BundleError, BundleWarning};
pub use orchestrator::BundleOrchestrator;
