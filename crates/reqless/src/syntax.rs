//! Parsing and printing of module sources.
//!
//! Modules are parsed as TypeScript. After rewriting, TypeScript-only syntax is
//! stripped so the printed code is plain ECMAScript for the configured target.

use std::path::{Path, PathBuf};

use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, GLOBALS, Globals, Mark, SourceMap, Spanned, SyntaxContext};
use swc_core::ecma::ast::{EsVersion, Module, Program};
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::codegen::{Config as CodegenConfig, Emitter};
use swc_core::ecma::parser::{Syntax, error::Error as ParserError, parse_file_as_module};
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::transforms::typescript::strip;
use swc_core::ecma::visit::VisitMutWith;

use crate::error::BundleError;

/// Options controlling how a module is printed
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub target: EsVersion,
    pub minify: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            target: EsVersion::Es2020,
            minify: false,
        }
    }
}

/// Scope information available while a module is being rewritten
#[derive(Debug, Clone, Copy)]
pub struct ScopeMarks {
    /// Context carried by identifiers that refer to no binding in the module
    pub unresolved: SyntaxContext,
}

/// A parsed module together with the source map its spans point into
pub struct SourceModule {
    path: PathBuf,
    source_map: Lrc<SourceMap>,
    module: Module,
}

impl std::fmt::Debug for SourceModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceModule")
            .field("path", &self.path)
            .field("items", &self.module.body.len())
            .finish_non_exhaustive()
    }
}

impl SourceModule {
    /// Parse `source` as a TypeScript module
    pub fn parse(path: &Path, source: String) -> Result<Self, BundleError> {
        let source_map: Lrc<SourceMap> = Lrc::default();
        let file = source_map.new_source_file(FileName::Real(path.to_path_buf()).into(), source);

        let mut recovered = Vec::new();
        let parsed = parse_file_as_module(
            &file,
            Syntax::Typescript(Default::default()),
            EsVersion::latest(),
            None,
            &mut recovered,
        );

        let module = match parsed {
            Ok(module) => module,
            Err(err) => return Err(parse_error(&source_map, path, &err)),
        };
        if let Some(err) = recovered.first() {
            return Err(parse_error(&source_map, path, err));
        }

        Ok(Self {
            path: path.to_path_buf(),
            source_map,
            module,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `rewrite` over the module, then strip TypeScript-only syntax.
    ///
    /// Identifiers are resolved to their scopes first so `rewrite` can tell
    /// global references apart from local bindings.
    pub fn transform<T, F>(self, rewrite: F) -> Result<(Self, T), BundleError>
    where
        F: FnOnce(&mut Module, ScopeMarks) -> Result<T, BundleError>,
    {
        let Self {
            path,
            source_map,
            module,
        } = self;

        GLOBALS.set(&Globals::new(), || {
            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();

            let mut program = Program::Module(module);
            program.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, true));

            let Program::Module(mut module) = program else {
                unreachable!("parsed as a module");
            };
            let marks = ScopeMarks {
                unresolved: SyntaxContext::empty().apply_mark(unresolved_mark),
            };
            let output = rewrite(&mut module, marks)?;

            let mut program = Program::Module(module);
            program.visit_mut_with(&mut strip(unresolved_mark, top_level_mark));
            let Program::Module(module) = program else {
                unreachable!("stripping keeps the module shape");
            };

            Ok((
                Self {
                    path,
                    source_map,
                    module,
                },
                output,
            ))
        })
    }

    /// Print the module back to source text
    pub fn print(&self, options: PrintOptions) -> Result<String, BundleError> {
        let mut buf = Vec::new();
        {
            let writer = JsWriter::new(self.source_map.clone(), "\n", &mut buf, None);
            let mut emitter = Emitter {
                cfg: CodegenConfig::default()
                    .with_target(options.target)
                    .with_minify(options.minify),
                cm: self.source_map.clone(),
                comments: None,
                wr: writer,
            };
            emitter
                .emit_module(&self.module)
                .map_err(|source| BundleError::Codegen {
                    module: self.path.clone(),
                    source,
                })?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn parse_error(source_map: &SourceMap, path: &Path, err: &ParserError) -> BundleError {
    let loc = source_map.lookup_char_pos(err.span().lo);
    BundleError::Parse {
        module: path.to_path_buf(),
        message: format!(
            "{} (line {}, column {})",
            err.kind().msg(),
            loc.line,
            loc.col_display + 1
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{PrintOptions, SourceModule};
    use crate::error::BundleError;
    use std::path::Path;

    #[test]
    fn test_parse_and_print_strips_types() {
        let source = "const greet = (name: string): string => `hi ${name}`;\nconsole.log(greet(\"x\"));\n";
        let parsed = SourceModule::parse(Path::new("/virtual/main.ts"), source.to_owned())
            .expect("valid module");
        let (stripped, ()) = parsed.transform(|_, _| Ok(())).expect("transform");
        let printed = stripped.print(PrintOptions::default()).expect("print");
        assert!(!printed.contains(": string"), "{printed}");
        assert!(printed.contains("console.log(greet(\"x\"))"), "{printed}");
    }

    #[test]
    fn test_interfaces_are_erased() {
        let source = "interface Named { name: string }\nconst n: Named = { name: \"a\" };\n";
        let parsed = SourceModule::parse(Path::new("/virtual/types.ts"), source.to_owned())
            .expect("valid module");
        let (stripped, ()) = parsed.transform(|_, _| Ok(())).expect("transform");
        let printed = stripped.print(PrintOptions::default()).expect("print");
        assert!(!printed.contains("interface"), "{printed}");
        assert!(printed.contains("const n = {"), "{printed}");
    }

    #[test]
    fn test_malformed_source_reports_location() {
        let err = SourceModule::parse(Path::new("/virtual/bad.ts"), "let = ;\n".to_owned())
            .expect_err("invalid module");
        match err {
            BundleError::Parse { module, message } => {
                assert_eq!(module, Path::new("/virtual/bad.ts"));
                assert!(message.contains("line 1"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
