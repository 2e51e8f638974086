//! Assembly of the final single-file program.
//!
//! The output is a registry of module initializers keyed by identity, a
//! dispatcher named [`DISPATCHER`] that instantiates modules on demand, and the
//! rewritten entry module. Module sources are embedded verbatim: re-indenting
//! them could change the contents of multi-line template literals.

use log::debug;
use std::path::Path;

use crate::config::Instantiation;
use crate::error::BundleError;
use crate::graph_builder::Dependencies;
use crate::rewriter::{DISPATCHER, EXPORTS_PROPERTY, MODULE_OBJECT};

/// Joins rewritten modules into one program
#[derive(Debug, Clone, Copy)]
pub struct Assembler {
    instantiation: Instantiation,
    minify: bool,
}

impl Assembler {
    pub fn new(instantiation: Instantiation, minify: bool) -> Self {
        Self {
            instantiation,
            minify,
        }
    }

    /// Build the output program.
    ///
    /// Fails if any dependency has not been rewritten yet.
    pub fn assemble(
        &self,
        entry_source: &str,
        dependencies: &Dependencies,
    ) -> Result<String, BundleError> {
        let mut out = Source::new(self.minify);

        out.line(0, &format!("const {DISPATCHER} = (() => {{"));
        out.line(1, "const registry = {");
        for record in dependencies.values() {
            let Some(rewritten) = record.rewritten_source() else {
                return Err(BundleError::IncompleteDependency {
                    identity: record.identity().to_path_buf(),
                });
            };
            self.write_initializer(&mut out, record.identity(), rewritten);
        }
        out.line(1, "};");
        self.write_dispatcher(&mut out);
        out.line(0, "})();");
        out.raw(entry_source);

        debug!(
            "Assembled {} modules into {} bytes",
            dependencies.len() + 1,
            out.text.len()
        );
        Ok(out.text)
    }

    fn write_initializer(&self, out: &mut Source, identity: &Path, rewritten: &str) {
        let key = identity_literal(identity);
        match self.instantiation {
            Instantiation::Cached => {
                out.line(2, &format!("{key}: ({MODULE_OBJECT}) => {{"));
                out.raw(rewritten);
            }
            Instantiation::PerDispatch => {
                out.line(2, &format!("{key}: () => {{"));
                out.line(
                    3,
                    &format!("const {MODULE_OBJECT} = {{ {EXPORTS_PROPERTY}: {{}} }};"),
                );
                out.raw(rewritten);
                out.line(3, &format!("return {MODULE_OBJECT}.{EXPORTS_PROPERTY};"));
            }
        }
        out.line(2, "},");
    }

    fn write_dispatcher(&self, out: &mut Source) {
        let owns = "Object.prototype.hasOwnProperty.call";
        if self.instantiation == Instantiation::Cached {
            out.line(1, "const cache = {};");
        }
        out.line(1, "return (dep) => {");
        if self.instantiation == Instantiation::Cached {
            out.line(2, &format!("if ({owns}(cache, dep)) {{"));
            out.line(3, &format!("return cache[dep].{EXPORTS_PROPERTY};"));
            out.line(2, "}");
        }
        out.line(2, &format!("if (!{owns}(registry, dep)) {{"));
        out.line(3, "throw new Error(`Unbundled dependency: ${dep}`);");
        out.line(2, "}");
        match self.instantiation {
            Instantiation::Cached => {
                // Cached before the body runs so cyclic imports see partial exports
                out.line(
                    2,
                    &format!("const {MODULE_OBJECT} = {{ {EXPORTS_PROPERTY}: {{}} }};"),
                );
                out.line(2, &format!("cache[dep] = {MODULE_OBJECT};"));
                out.line(2, &format!("registry[dep]({MODULE_OBJECT});"));
                out.line(2, &format!("return {MODULE_OBJECT}.{EXPORTS_PROPERTY};"));
            }
            Instantiation::PerDispatch => out.line(2, "return registry[dep]();"),
        }
        out.line(1, "};");
    }
}

/// JSON string literal for an identity, valid as a JS string literal
fn identity_literal(identity: &Path) -> String {
    serde_json::Value::String(identity.to_string_lossy().into_owned()).to_string()
}

/// Line-oriented output buffer
struct Source {
    text: String,
    minify: bool,
}

impl Source {
    fn new(minify: bool) -> Self {
        Self {
            text: String::new(),
            minify,
        }
    }

    fn line(&mut self, depth: usize, line: &str) {
        if !self.minify {
            self.text.extend(std::iter::repeat_n(' ', depth * 2));
        }
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Append printed module code unchanged
    fn raw(&mut self, code: &str) {
        self.text.push_str(code);
        if !code.is_empty() && !code.ends_with('\n') {
            self.text.push('\n');
        }
    }
}
