//! Error and warning types produced while bundling.
//!
//! Every fatal kind aborts the whole bundle. The only recoverable condition is
//! [`BundleWarning::MalformedRequire`], which is reported and otherwise ignored.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a bundle
#[derive(Debug, Error)]
pub enum BundleError {
    /// A specifier could not be mapped to an existing module
    #[error("Couldn't resolve: {specifier} imported from {}", importer.display())]
    Resolution {
        /// Specifier as written in source
        specifier: String,
        /// Module containing the import or require
        importer: PathBuf,
    },

    /// An import/export shape outside the supported subset
    #[error("Unsupported syntax in {}: {construct}", module.display())]
    UnsupportedSyntax {
        /// Module containing the construct
        module: PathBuf,
        /// Short description of the offending construct
        construct: String,
    },

    /// The source text of a module is malformed
    #[error("Failed to parse {}: {message}", module.display())]
    Parse {
        /// Module that failed to parse
        module: PathBuf,
        /// Parser diagnostic with location
        message: String,
    },

    /// A dependency reached the assembler without being rewritten
    #[error("Dependency wasn't transformed: {}", identity.display())]
    IncompleteDependency {
        /// Canonical identity of the unvisited dependency
        identity: PathBuf,
    },

    /// Reading a module from disk failed
    #[error("Failed to read module {}", path.display())]
    Io {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Printing a rewritten module failed
    #[error("Failed to generate code for {}", module.display())]
    Codegen {
        /// Module being printed
        module: PathBuf,
        /// Underlying writer error
        #[source]
        source: std::io::Error,
    },
}

/// Non-fatal conditions surfaced during a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleWarning {
    /// `require` was called with zero or several arguments and was left as is
    MalformedRequire {
        /// Module containing the call
        module: PathBuf,
        /// Number of arguments the call had
        arguments: usize,
    },
}

impl fmt::Display for BundleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedRequire { module, arguments } => write!(
                f,
                "require called with {} arguments in {}, left unbundled",
                arguments,
                module.display()
            ),
        }
    }
}
