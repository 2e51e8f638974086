//! Per-module rewrite of import, export and require forms into registry calls.
//!
//! Top-level module declarations are first classified into the small set of
//! shapes the bundler supports ([`ImportForm`], [`ExportForm`]) and then lowered
//! to plain statements against the dispatcher and the module's export surface:
//!
//! ```js
//! import { a, b as c } from "./x";   // const { a, b: c } = _dep("/abs/x.ts");
//! export { a, c as d };              // module.exports = { ...module.exports, a, d: c };
//! const y = require("./y");          // const y = _dep("/abs/y.ts");
//! ```
//!
//! Anything else under `import`/`export` syntax is rejected.

use indexmap::IndexSet;
use log::{trace, warn};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use swc_core::common::{DUMMY_SP, SyntaxContext};
use swc_core::ecma::ast::{
    AssignExpr, AssignOp, AssignPatProp, AssignTarget, BindingIdent, CallExpr, Callee,
    ClassDecl, Decl, DefaultDecl, ExportDecl, ExportSpecifier, Expr, ExprOrSpread, ExprStmt,
    FnDecl, Ident, IdentName, ImportDecl, ImportSpecifier, KeyValuePatProp, KeyValueProp, Lit,
    MemberExpr, MemberProp, Module, ModuleDecl, ModuleExportName, ModuleItem, NamedExport,
    ObjectLit, ObjectPat, ObjectPatProp, Pat, Prop, PropName, PropOrSpread, SimpleAssignTarget,
    SpreadElement, Stmt, Str, TsModuleName, VarDecl, VarDeclKind, VarDeclarator,
};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::error::{BundleError, BundleWarning};
use crate::resolver::BoundResolver;
use crate::syntax::ScopeMarks;

/// Name of the generated dispatcher function
pub const DISPATCHER: &str = "_dep";

/// Name of the per-module object holding the export surface
pub const MODULE_OBJECT: &str = "module";

/// Property of [`MODULE_OBJECT`] holding the exports
pub const EXPORTS_PROPERTY: &str = "exports";

/// What a module rewrite discovered
#[derive(Debug, Default)]
pub struct RewriteOutcome {
    /// Canonical identities referenced by the module, in source order
    pub dependencies: IndexSet<PathBuf>,
    /// Recoverable problems found while rewriting
    pub warnings: Vec<BundleWarning>,
}

/// Import declarations the bundler can lower
#[derive(Debug)]
enum ImportForm {
    /// `import type ...` or a list made only of `type` specifiers
    TypeOnly,
    /// `import "x"`
    SideEffect { src: String },
    /// `import d, * as ns, { a, b as c } from "x"`
    Bindings {
        src: String,
        namespace: Option<Ident>,
        named: Vec<ImportBinding>,
    },
}

#[derive(Debug)]
struct ImportBinding {
    /// Export name in the dependency, `None` when it equals the local name
    imported: Option<PropName>,
    local: Ident,
}

/// Export declarations the bundler can lower
#[derive(Debug)]
enum ExportForm {
    /// Interfaces, type aliases, ambient declarations, `export type { .. }`
    TypeOnly,
    /// `export default <expr>`
    DefaultExpr(Box<Expr>),
    /// `export default function f() {}` / `export default class C {}`
    DefaultDecl { decl: Option<Decl>, value: Box<Expr> },
    /// `export { a, b as c }`
    Names(Vec<ExportBinding>),
}

#[derive(Debug)]
struct ExportBinding {
    local: Ident,
    /// Exported name, `None` when it equals the local name
    exported: Option<PropName>,
}

#[derive(Debug)]
enum ModuleForm {
    Import(ImportForm),
    Export(ExportForm),
}

/// Rewrites one module against the registry calling convention
#[derive(Debug)]
pub struct ModuleRewriter<'a> {
    resolver: BoundResolver<'a>,
    marks: ScopeMarks,
    /// Local names bound only at the type level
    type_names: FxHashSet<String>,
    outcome: RewriteOutcome,
}

impl<'a> ModuleRewriter<'a> {
    pub fn new(resolver: BoundResolver<'a>, marks: ScopeMarks) -> Self {
        Self {
            resolver,
            marks,
            type_names: FxHashSet::default(),
            outcome: RewriteOutcome::default(),
        }
    }

    /// Rewrite `module` in place, returning the identities it depends on
    pub fn rewrite(mut self, module: &mut Module) -> Result<RewriteOutcome, BundleError> {
        let items = std::mem::take(&mut module.body);
        self.type_names = type_only_names(&items);
        let mut body = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ModuleItem::ModuleDecl(decl) => {
                    let form = self.classify(decl)?;
                    body.extend(self.lower(form)?);
                }
                stmt @ ModuleItem::Stmt(_) => body.push(stmt),
            }
        }
        module.body = body;

        let mut requires = RequireRewriter {
            resolver: &mut self.resolver,
            unresolved: self.marks.unresolved,
            outcome: &mut self.outcome,
            error: None,
        };
        module.visit_mut_with(&mut requires);
        if let Some(err) = requires.error {
            return Err(err);
        }

        Ok(self.outcome)
    }

    fn module_path(&self) -> &Path {
        self.resolver.importer()
    }

    fn unsupported(&self, construct: &str) -> BundleError {
        BundleError::UnsupportedSyntax {
            module: self.module_path().to_path_buf(),
            construct: construct.to_owned(),
        }
    }

    fn classify(&self, decl: ModuleDecl) -> Result<ModuleForm, BundleError> {
        let form = match decl {
            ModuleDecl::Import(import) => ModuleForm::Import(classify_import(import)),
            ModuleDecl::ExportDefaultExpr(export) => {
                ModuleForm::Export(ExportForm::DefaultExpr(export.expr))
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                ModuleForm::Export(classify_default_decl(export.decl))
            }
            ModuleDecl::ExportNamed(export) => ModuleForm::Export(self.classify_named(export)?),
            ModuleDecl::ExportDecl(export) => {
                if is_type_level(&export.decl) {
                    ModuleForm::Export(ExportForm::TypeOnly)
                } else {
                    return Err(self.unsupported(&describe_export_decl(&export.decl)));
                }
            }
            ModuleDecl::TsNamespaceExport(_) => ModuleForm::Export(ExportForm::TypeOnly),
            ModuleDecl::TsImportEquals(import) if import.is_type_only => {
                ModuleForm::Import(ImportForm::TypeOnly)
            }
            ModuleDecl::TsImportEquals(_) => return Err(self.unsupported("import = require()")),
            ModuleDecl::ExportAll(_) => return Err(self.unsupported("export * from")),
            ModuleDecl::TsExportAssignment(_) => return Err(self.unsupported("export =")),
        };
        Ok(form)
    }

    fn classify_named(&self, export: NamedExport) -> Result<ExportForm, BundleError> {
        if export.type_only {
            return Ok(ExportForm::TypeOnly);
        }
        if export.src.is_some() {
            return Err(self.unsupported("export ... from (re-export)"));
        }

        let mut bindings = Vec::new();
        for specifier in export.specifiers {
            match specifier {
                ExportSpecifier::Named(named) if named.is_type_only => {}
                ExportSpecifier::Named(named) => {
                    let ModuleExportName::Ident(local) = named.orig else {
                        return Err(self.unsupported("export of a string-named binding"));
                    };
                    // Interfaces and type aliases have no runtime value to export
                    if self.type_names.contains(&*local.sym) {
                        trace!("Dropping type-only export {}", local.sym);
                        continue;
                    }
                    let exported = named
                        .exported
                        .map(prop_name)
                        .filter(|exported| !is_same_name(exported, &local));
                    bindings.push(ExportBinding { local, exported });
                }
                ExportSpecifier::Namespace(_) => {
                    return Err(self.unsupported("export * as namespace"));
                }
                ExportSpecifier::Default(_) => {
                    return Err(self.unsupported("export default from"));
                }
            }
        }

        if bindings.is_empty() {
            return Ok(ExportForm::TypeOnly);
        }
        Ok(ExportForm::Names(bindings))
    }

    fn lower(&mut self, form: ModuleForm) -> Result<Vec<ModuleItem>, BundleError> {
        let items = match form {
            ModuleForm::Import(ImportForm::TypeOnly) | ModuleForm::Export(ExportForm::TypeOnly) => {
                Vec::new()
            }
            ModuleForm::Import(ImportForm::SideEffect { src }) => {
                let identity = self.depend_on(&src)?;
                vec![expr_item(dispatch(&identity))]
            }
            ModuleForm::Import(ImportForm::Bindings {
                src,
                namespace,
                named,
            }) => {
                let identity = self.depend_on(&src)?;
                let mut items = Vec::with_capacity(2);
                let source = match namespace {
                    Some(namespace) => {
                        items.push(const_item(
                            Pat::Ident(BindingIdent::from(namespace.clone())),
                            dispatch(&identity),
                        ));
                        Expr::Ident(namespace)
                    }
                    None => dispatch(&identity),
                };
                if !named.is_empty() {
                    items.push(const_item(destructure(named), source));
                }
                items
            }
            ModuleForm::Export(ExportForm::DefaultExpr(expr)) => {
                vec![merge_exports(vec![key_value(ident_key("default"), expr)])]
            }
            ModuleForm::Export(ExportForm::DefaultDecl { decl, value }) => {
                let mut items = Vec::with_capacity(2);
                if let Some(decl) = decl {
                    items.push(ModuleItem::Stmt(Stmt::Decl(decl)));
                }
                items.push(merge_exports(vec![key_value(ident_key("default"), value)]));
                items
            }
            ModuleForm::Export(ExportForm::Names(bindings)) => {
                let props = bindings
                    .into_iter()
                    .map(|binding| match binding.exported {
                        Some(exported) => key_value(exported, Box::new(Expr::Ident(binding.local))),
                        None => PropOrSpread::Prop(Box::new(Prop::Shorthand(binding.local))),
                    })
                    .collect();
                vec![merge_exports(props)]
            }
        };
        Ok(items)
    }

    fn depend_on(&mut self, specifier: &str) -> Result<PathBuf, BundleError> {
        let identity = self.resolver.resolve(specifier)?;
        trace!("{:?} depends on {:?}", self.module_path(), identity);
        self.outcome.dependencies.insert(identity.clone());
        Ok(identity)
    }
}

fn classify_import(import: ImportDecl) -> ImportForm {
    if import.type_only {
        return ImportForm::TypeOnly;
    }
    let src = import.src.value.to_string();
    if import.specifiers.is_empty() {
        return ImportForm::SideEffect { src };
    }

    let mut namespace = None;
    let mut named = Vec::new();
    for specifier in import.specifiers {
        match specifier {
            ImportSpecifier::Namespace(star) => namespace = Some(star.local),
            ImportSpecifier::Default(default) => named.push(ImportBinding {
                imported: Some(ident_key("default")),
                local: default.local,
            }),
            ImportSpecifier::Named(named_import) if named_import.is_type_only => {}
            ImportSpecifier::Named(named_import) => {
                let imported = named_import
                    .imported
                    .map(prop_name)
                    .filter(|imported| !is_same_name(imported, &named_import.local));
                named.push(ImportBinding {
                    imported,
                    local: named_import.local,
                });
            }
        }
    }

    if namespace.is_none() && named.is_empty() {
        return ImportForm::TypeOnly;
    }
    ImportForm::Bindings {
        src,
        namespace,
        named,
    }
}

fn classify_default_decl(decl: DefaultDecl) -> ExportForm {
    match decl {
        DefaultDecl::Fn(function) => match function.ident {
            Some(ident) => ExportForm::DefaultDecl {
                value: Box::new(Expr::Ident(ident.clone())),
                decl: Some(Decl::Fn(FnDecl {
                    ident,
                    declare: false,
                    function: function.function,
                })),
            },
            None => ExportForm::DefaultDecl {
                decl: None,
                value: Box::new(Expr::Fn(function)),
            },
        },
        DefaultDecl::Class(class) => match class.ident {
            Some(ident) => ExportForm::DefaultDecl {
                value: Box::new(Expr::Ident(ident.clone())),
                decl: Some(Decl::Class(ClassDecl {
                    ident,
                    declare: false,
                    class: class.class,
                })),
            },
            None => ExportForm::DefaultDecl {
                decl: None,
                value: Box::new(Expr::Class(class)),
            },
        },
        DefaultDecl::TsInterfaceDecl(_) => ExportForm::TypeOnly,
    }
}

/// Declarations that vanish once types are stripped
fn is_type_level(decl: &Decl) -> bool {
    match decl {
        Decl::TsInterface(_) | Decl::TsTypeAlias(_) => true,
        Decl::Var(var) => var.declare,
        Decl::Fn(function) => function.declare,
        Decl::Class(class) => class.declare,
        Decl::TsEnum(ts_enum) => ts_enum.declare,
        Decl::TsModule(ts_module) => ts_module.declare,
        _ => false,
    }
}

/// Top-level names that only exist as types: interfaces, type aliases, ambient
/// declarations and type-only imports, minus any name also bound to a value
fn type_only_names(items: &[ModuleItem]) -> FxHashSet<String> {
    let mut types = FxHashSet::default();
    let mut values = FxHashSet::default();
    for item in items {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl))
            | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl, .. })) => {
                let names = if is_type_level(decl) {
                    &mut types
                } else {
                    &mut values
                };
                collect_decl_names(decl, names);
            }
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                for specifier in &import.specifiers {
                    let (local, type_only) = match specifier {
                        ImportSpecifier::Named(named) => (&named.local, named.is_type_only),
                        ImportSpecifier::Default(default) => (&default.local, false),
                        ImportSpecifier::Namespace(star) => (&star.local, false),
                    };
                    let names = if import.type_only || type_only {
                        &mut types
                    } else {
                        &mut values
                    };
                    names.insert(local.sym.to_string());
                }
            }
            _ => {}
        }
    }
    types.retain(|name| !values.contains(name));
    types
}

fn collect_decl_names(decl: &Decl, names: &mut FxHashSet<String>) {
    match decl {
        Decl::TsInterface(interface) => {
            names.insert(interface.id.sym.to_string());
        }
        Decl::TsTypeAlias(alias) => {
            names.insert(alias.id.sym.to_string());
        }
        Decl::Fn(function) => {
            names.insert(function.ident.sym.to_string());
        }
        Decl::Class(class) => {
            names.insert(class.ident.sym.to_string());
        }
        Decl::TsEnum(ts_enum) => {
            names.insert(ts_enum.id.sym.to_string());
        }
        Decl::TsModule(ts_module) => {
            if let TsModuleName::Ident(id) = &ts_module.id {
                names.insert(id.sym.to_string());
            }
        }
        Decl::Var(var) => {
            for declarator in &var.decls {
                if let Pat::Ident(binding) = &declarator.name {
                    names.insert(binding.id.sym.to_string());
                }
            }
        }
        _ => {}
    }
}

fn describe_export_decl(decl: &Decl) -> String {
    let keyword = match decl {
        Decl::Var(var) => match var.kind {
            VarDeclKind::Var => "var",
            VarDeclKind::Let => "let",
            VarDeclKind::Const => "const",
        },
        Decl::Fn(_) => "function",
        Decl::Class(_) => "class",
        Decl::TsEnum(_) => "enum",
        Decl::TsModule(_) => "namespace",
        _ => "declaration",
    };
    format!("export {keyword} (exported declarations are not supported, use `export {{ name }}`)")
}

struct RequireRewriter<'r, 'a> {
    resolver: &'r mut BoundResolver<'a>,
    unresolved: SyntaxContext,
    outcome: &'r mut RewriteOutcome,
    error: Option<BundleError>,
}

impl VisitMut for RequireRewriter<'_, '_> {
    fn visit_mut_call_expr(&mut self, call: &mut CallExpr) {
        if self.error.is_some() {
            return;
        }
        call.visit_mut_children_with(self);
        if self.error.is_some() {
            return;
        }

        let Callee::Expr(callee) = &mut call.callee else {
            return;
        };
        let Expr::Ident(callee) = &mut **callee else {
            return;
        };
        // Only the global `require`, not a local binding that shadows it
        if &*callee.sym != "require" || callee.ctxt != self.unresolved {
            return;
        }

        if call.args.len() != 1 {
            let warning = BundleWarning::MalformedRequire {
                module: self.resolver.importer().to_path_buf(),
                arguments: call.args.len(),
            };
            warn!("{}", warning);
            self.outcome.warnings.push(warning);
            return;
        }

        let ExprOrSpread { spread: None, expr } = &mut call.args[0] else {
            return;
        };
        let Expr::Lit(Lit::Str(specifier)) = &mut **expr else {
            return;
        };

        match self.resolver.resolve(&specifier.value) {
            Ok(identity) => {
                *callee = ident(DISPATCHER);
                *specifier = identity_literal(&identity);
                self.outcome.dependencies.insert(identity);
            }
            Err(err) => self.error = Some(err),
        }
    }
}

fn ident(name: &str) -> Ident {
    Ident::new(name.into(), DUMMY_SP, SyntaxContext::empty())
}

fn ident_key(name: &str) -> PropName {
    PropName::Ident(IdentName::new(name.into(), DUMMY_SP))
}

fn prop_name(name: ModuleExportName) -> PropName {
    match name {
        ModuleExportName::Ident(ident) => PropName::Ident(ident.into()),
        ModuleExportName::Str(name) => PropName::Str(name),
    }
}

fn is_same_name(name: &PropName, local: &Ident) -> bool {
    matches!(name, PropName::Ident(name) if name.sym == local.sym)
}

fn identity_literal(identity: &Path) -> Str {
    Str {
        span: DUMMY_SP,
        value: identity.to_string_lossy().as_ref().into(),
        raw: None,
    }
}

/// `_dep("<identity>")`
fn dispatch(identity: &Path) -> Expr {
    Expr::Call(CallExpr {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        callee: Callee::Expr(Box::new(Expr::Ident(ident(DISPATCHER)))),
        args: vec![ExprOrSpread {
            spread: None,
            expr: Box::new(Expr::Lit(Lit::Str(identity_literal(identity)))),
        }],
        type_args: None,
    })
}

fn expr_item(expr: Expr) -> ModuleItem {
    ModuleItem::Stmt(Stmt::Expr(ExprStmt {
        span: DUMMY_SP,
        expr: Box::new(expr),
    }))
}

fn const_item(name: Pat, init: Expr) -> ModuleItem {
    ModuleItem::Stmt(Stmt::Decl(Decl::Var(Box::new(VarDecl {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        kind: VarDeclKind::Const,
        declare: false,
        decls: vec![VarDeclarator {
            span: DUMMY_SP,
            name,
            init: Some(Box::new(init)),
            definite: false,
        }],
    }))))
}

/// `{ a, default: d, b: c }`
fn destructure(bindings: Vec<ImportBinding>) -> Pat {
    let props = bindings
        .into_iter()
        .map(|binding| match binding.imported {
            Some(key) => ObjectPatProp::KeyValue(KeyValuePatProp {
                key,
                value: Box::new(Pat::Ident(BindingIdent::from(binding.local))),
            }),
            None => ObjectPatProp::Assign(AssignPatProp {
                span: DUMMY_SP,
                key: BindingIdent::from(binding.local),
                value: None,
            }),
        })
        .collect();
    Pat::Object(ObjectPat {
        span: DUMMY_SP,
        props,
        optional: false,
        type_ann: None,
    })
}

fn key_value(key: PropName, value: Box<Expr>) -> PropOrSpread {
    PropOrSpread::Prop(Box::new(Prop::KeyValue(KeyValueProp { key, value })))
}

/// `module.exports`
fn exports_member() -> MemberExpr {
    MemberExpr {
        span: DUMMY_SP,
        obj: Box::new(Expr::Ident(ident(MODULE_OBJECT))),
        prop: MemberProp::Ident(IdentName::new(EXPORTS_PROPERTY.into(), DUMMY_SP)),
    }
}

/// `module.exports = { ...module.exports, <props> };`
fn merge_exports(props: Vec<PropOrSpread>) -> ModuleItem {
    let mut merged = Vec::with_capacity(props.len() + 1);
    merged.push(PropOrSpread::Spread(SpreadElement {
        dot3_token: DUMMY_SP,
        expr: Box::new(Expr::Member(exports_member())),
    }));
    merged.extend(props);

    expr_item(Expr::Assign(AssignExpr {
        span: DUMMY_SP,
        op: AssignOp::Assign,
        left: AssignTarget::Simple(SimpleAssignTarget::Member(exports_member())),
        right: Box::new(Expr::Object(ObjectLit {
            span: DUMMY_SP,
            props: merged,
        })),
    }))
}

#[cfg(test)]
mod tests {
    use super::{DISPATCHER, ModuleRewriter, RewriteOutcome};
    use crate::error::{BundleError, BundleWarning};
    use crate::resolver::ModuleResolver;
    use crate::syntax::{PrintOptions, SourceModule};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// A throwaway project with `main.ts` plus the given sibling modules
    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().expect("temp dir");
            for (name, content) in files {
                let path = dir.path().join(name);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).expect("create parent");
                }
                fs::write(path, content).expect("write module");
            }
            Self { dir }
        }

        fn identity(&self, name: &str) -> PathBuf {
            self.dir.path().join(name).canonicalize().expect("exists")
        }

        fn quoted(&self, name: &str) -> String {
            format!("\"{}\"", self.identity(name).display())
        }

        fn rewrite(&self, source: &str) -> Result<(String, RewriteOutcome), BundleError> {
            let path = self.dir.path().join("main.ts");
            let parsed = SourceModule::parse(&path, source.to_owned())?;
            let mut resolver = ModuleResolver::new();
            let (rewritten, outcome) = parsed.transform(|module, marks| {
                ModuleRewriter::new(resolver.bind(&path), marks).rewrite(module)
            })?;
            Ok((compact(&rewritten.print(PrintOptions::default())?), outcome))
        }
    }

    fn compact(code: &str) -> String {
        code.split_whitespace().collect()
    }

    #[test]
    fn test_named_imports_destructure_dispatch_result() {
        let project = Project::new(&[("greet.ts", "")]);
        let (code, outcome) = project
            .rewrite("import { greet, shout as loud } from \"./greet\";\ngreet(loud);\n")
            .expect("rewrite");

        let expected = format!(
            "const{{greet,shout:loud}}={}({});",
            DISPATCHER,
            project.quoted("greet.ts")
        );
        assert!(code.contains(&expected), "{code}");
        assert_eq!(
            outcome.dependencies.into_iter().collect::<Vec<_>>(),
            vec![project.identity("greet.ts")]
        );
    }

    #[test]
    fn test_default_and_namespace_imports() {
        let project = Project::new(&[("lib.ts", "")]);
        let (code, _) = project
            .rewrite("import lib, * as all from \"./lib\";\nconsole.log(lib, all);\n")
            .expect("rewrite");

        assert!(
            code.contains(&format!("constall=_dep({});", project.quoted("lib.ts"))),
            "{code}"
        );
        assert!(code.contains("const{default:lib}=all;"), "{code}");
    }

    #[test]
    fn test_side_effect_import_is_a_bare_dispatch() {
        let project = Project::new(&[("setup.ts", "")]);
        let (code, outcome) = project.rewrite("import \"./setup\";\n").expect("rewrite");
        assert_eq!(code, format!("_dep({});", project.quoted("setup.ts")));
        assert_eq!(outcome.dependencies.len(), 1);
    }

    #[test]
    fn test_type_only_imports_are_erased() {
        let project = Project::new(&[("types.ts", "")]);
        let (code, outcome) = project
            .rewrite(
                "import type { Shape } from \"./types\";\nimport { type Point } from \"./types\";\nconst n = 1;\n",
            )
            .expect("rewrite");
        assert_eq!(code, "constn=1;");
        assert!(outcome.dependencies.is_empty());
    }

    #[test]
    fn test_exports_merge_into_module_exports() {
        let project = Project::new(&[]);
        let (code, _) = project
            .rewrite("const a = 1;\nconst b = 2;\nexport { a, b as c };\nexport default a + b;\n")
            .expect("rewrite");
        assert_snapshot!(code, @"consta=1;constb=2;module.exports={...module.exports,a,c:b};module.exports={...module.exports,default:a+b};");
    }

    #[test]
    fn test_default_function_keeps_its_binding() {
        let project = Project::new(&[]);
        let (code, _) = project
            .rewrite("export default function main() { return 1; }\nmain();\n")
            .expect("rewrite");
        assert!(code.starts_with("functionmain(){return1;}"), "{code}");
        assert!(
            code.contains("module.exports={...module.exports,default:main};"),
            "{code}"
        );
    }

    #[test]
    fn test_type_exports_are_erased() {
        let project = Project::new(&[]);
        let (code, _) = project
            .rewrite(
                "export interface Shape { area(): number }\nexport type Id = string;\nexport declare const VERSION: string;\nconst x = 1;\nexport type { Id as Key };\n",
            )
            .expect("rewrite");
        assert_eq!(code, "constx=1;");
    }

    #[test]
    fn test_type_names_in_export_list_are_dropped() {
        let project = Project::new(&[("types.ts", "")]);
        let (code, outcome) = project
            .rewrite(
                "import type { Shape } from \"./types\";\ninterface Named { name: string }\ntype Id = string;\nconst greet = 1;\nexport { greet, Named, Id as Key, Shape };\n",
            )
            .expect("rewrite");
        assert_eq!(code, "constgreet=1;module.exports={...module.exports,greet};");
        assert!(outcome.dependencies.is_empty());

        let (code, _) = project
            .rewrite("interface Id { id: string }\ntype Alias = Id;\nexport { Id, Alias };\n")
            .expect("rewrite");
        assert_eq!(code, "");
    }

    #[test]
    fn test_name_bound_as_type_and_value_is_exported() {
        let project = Project::new(&[]);
        let (code, _) = project
            .rewrite(
                "interface Point { x: number }\nconst Point = { origin: 0 };\nexport { Point };\n",
            )
            .expect("rewrite");
        assert_eq!(
            code,
            "constPoint={origin:0};module.exports={...module.exports,Point};"
        );
    }

    #[test]
    fn test_require_is_redirected_to_dispatcher() {
        let project = Project::new(&[("util.ts", "")]);
        let (code, outcome) = project
            .rewrite("const util = require(\"./util\");\nfunction load() { return require(\"./util\").x; }\n")
            .expect("rewrite");
        let call = format!("_dep({})", project.quoted("util.ts"));
        assert!(code.contains(&format!("constutil={call};")), "{code}");
        assert!(code.contains(&format!("return{call}.x;")), "{code}");
        assert!(!code.contains("require"), "{code}");
        assert_eq!(outcome.dependencies.len(), 1);
    }

    #[test]
    fn test_malformed_require_is_left_alone_with_warning() {
        let project = Project::new(&[]);
        let (code, outcome) = project
            .rewrite("const a = require();\nconst b = require(\"./x\", \"./y\");\n")
            .expect("rewrite");
        assert!(code.contains("consta=require();"), "{code}");
        assert!(code.contains("require(\"./x\",\"./y\")"), "{code}");
        assert!(outcome.dependencies.is_empty());
        assert_eq!(
            outcome.warnings,
            vec![
                BundleWarning::MalformedRequire {
                    module: project.dir.path().join("main.ts"),
                    arguments: 0,
                },
                BundleWarning::MalformedRequire {
                    module: project.dir.path().join("main.ts"),
                    arguments: 2,
                },
            ]
        );
    }

    #[test]
    fn test_shadowed_and_dynamic_require_untouched() {
        let project = Project::new(&[]);
        let (code, outcome) = project
            .rewrite(
                "function load(require: (id: string) => unknown) { return require(\"./local\"); }\nconst name = \"./x\";\nconst y = require(name);\n",
            )
            .expect("rewrite");
        assert!(code.contains("returnrequire(\"./local\");"), "{code}");
        assert!(code.contains("consty=require(name);"), "{code}");
        assert!(outcome.dependencies.is_empty());
    }

    #[test]
    fn test_missing_require_target_fails() {
        let project = Project::new(&[]);
        let err = project
            .rewrite("const m = require(\"./missing\");\n")
            .expect_err("unresolvable");
        match err {
            BundleError::Resolution {
                specifier,
                importer,
            } => {
                assert_eq!(specifier, "./missing");
                assert_eq!(importer, project.dir.path().join("main.ts"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exported_declarations_are_rejected() {
        let project = Project::new(&[]);
        for (source, keyword) in [
            ("export const x = 1;\n", "export const"),
            ("export let y = 1;\n", "export let"),
            ("export function f() {}\n", "export function"),
            ("export class C {}\n", "export class"),
            ("export enum E { A }\n", "export enum"),
        ] {
            let err = project.rewrite(source).expect_err("unsupported");
            let BundleError::UnsupportedSyntax { module, construct } = err else {
                panic!("unexpected error for {source}");
            };
            assert_eq!(module, project.dir.path().join("main.ts"));
            assert!(construct.starts_with(keyword), "{construct}");
        }
    }

    #[test]
    fn test_reexports_are_rejected() {
        let project = Project::new(&[("a.ts", "")]);
        for source in [
            "export { x } from \"./a\";\n",
            "export * from \"./a\";\n",
            "export * as ns from \"./a\";\n",
        ] {
            let err = project.rewrite(source).expect_err("unsupported");
            assert!(
                matches!(err, BundleError::UnsupportedSyntax { .. }),
                "{source}: {err:?}"
            );
        }
    }

    #[test]
    fn test_unsupported_error_message() {
        let project = Project::new(&[]);
        let err = project
            .rewrite("export const x = 1;\n")
            .expect_err("unsupported");
        let message = err
            .to_string()
            .replace(&project.dir.path().display().to_string(), "<DIR>");
        assert_snapshot!(message, @"Unsupported syntax in <DIR>/main.ts: export const (exported declarations are not supported, use `export { name }`)");
    }

    #[test]
    fn test_identity_is_shared_between_specifiers() {
        let project = Project::new(&[("lib/index.ts", "")]);
        let (_, outcome) = project
            .rewrite("import \"./lib\";\nimport \"./lib/index\";\nconst l = require(\"./lib/index.ts\");\n")
            .expect("rewrite");
        assert_eq!(
            outcome.dependencies.into_iter().collect::<Vec<_>>(),
            vec![project.identity("lib/index.ts")]
        );
    }
}
