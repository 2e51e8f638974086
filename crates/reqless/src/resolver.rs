use log::{debug, trace};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::BundleError;

/// Extension appended to a specifier when the direct lookup fails
pub const SOURCE_EXTENSION: &str = "ts";

/// File looked up inside a directory specifier as the last resort
pub const INDEX_FILE: &str = "index.ts";

/// Extension the ecosystem lookup appends to extension-less specifiers
const SCRIPT_EXTENSION: &str = "js";

/// File the ecosystem lookup uses inside a directory without a `main` entry
const SCRIPT_INDEX_FILE: &str = "index.js";

/// The only field of `package.json` the resolver cares about
#[derive(Debug, Deserialize)]
struct PackageManifest {
    main: Option<String>,
}

/// Maps import specifiers to canonical module identities.
///
/// Resolution tries, in order:
/// 1. the specifier itself, using Node.js lookup rules (exact file, `.js`,
///    `package.json` `main`, `index.js`, and `node_modules` for bare specifiers)
/// 2. the specifier with `.ts` appended
/// 3. the specifier as a directory containing `index.ts`
///
/// Results are memoized per (importing directory, specifier).
#[derive(Debug, Default)]
pub struct ModuleResolver {
    cache: FxHashMap<(PathBuf, String), PathBuf>,
}

impl ModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `specifier` as written in `importer` to a canonical path
    pub fn resolve(&mut self, specifier: &str, importer: &Path) -> Result<PathBuf, BundleError> {
        let base_dir = importer.parent().unwrap_or_else(|| Path::new("."));
        let key = (base_dir.to_path_buf(), specifier.to_owned());
        if let Some(identity) = self.cache.get(&key) {
            trace!("Resolver cache hit: {} -> {:?}", specifier, identity);
            return Ok(identity.clone());
        }

        let attempts = [
            specifier.to_owned(),
            format!("{specifier}.{SOURCE_EXTENSION}"),
            format!("{specifier}/{INDEX_FILE}"),
        ];

        for (index, attempt) in attempts.iter().enumerate() {
            let Some(found) = locate(attempt, base_dir) else {
                trace!("No module for '{}' from {:?}", attempt, base_dir);
                continue;
            };
            let identity = found
                .canonicalize()
                .map_err(|source| BundleError::Io { path: found, source })?;
            debug!(
                "Resolved '{}' from {:?} to {:?} (attempt {})",
                specifier,
                importer,
                identity,
                index + 1
            );
            self.cache.insert(key, identity.clone());
            return Ok(identity);
        }

        Err(BundleError::Resolution {
            specifier: specifier.to_owned(),
            importer: importer.to_path_buf(),
        })
    }

    /// Bind the resolver to one importing module
    pub fn bind<'a>(&'a mut self, importer: &'a Path) -> BoundResolver<'a> {
        BoundResolver {
            resolver: self,
            importer,
        }
    }
}

/// A resolver scoped to a single module, so relative specifiers resolve
/// against that module's directory
#[derive(Debug)]
pub struct BoundResolver<'a> {
    resolver: &'a mut ModuleResolver,
    importer: &'a Path,
}

impl BoundResolver<'_> {
    pub fn importer(&self) -> &Path {
        self.importer
    }

    pub fn resolve(&mut self, specifier: &str) -> Result<PathBuf, BundleError> {
        self.resolver.resolve(specifier, self.importer)
    }
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// Find a loadable file for `specifier` relative to `base_dir`
fn locate(specifier: &str, base_dir: &Path) -> Option<PathBuf> {
    if is_path_like(specifier) {
        return load_file_or_directory(&base_dir.join(specifier));
    }

    // Bare specifier: search node_modules in every ancestor directory
    base_dir
        .ancestors()
        .filter(|dir| dir.file_name().is_none_or(|name| name != "node_modules"))
        .find_map(|dir| load_file_or_directory(&dir.join("node_modules").join(specifier)))
}

fn load_file_or_directory(path: &Path) -> Option<PathBuf> {
    load_file(path).or_else(|| load_directory(path))
}

fn load_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let mut with_extension = path.as_os_str().to_owned();
    with_extension.push(".");
    with_extension.push(SCRIPT_EXTENSION);
    let with_extension = PathBuf::from(with_extension);
    with_extension.is_file().then_some(with_extension)
}

fn load_directory(path: &Path) -> Option<PathBuf> {
    if !path.is_dir() {
        return None;
    }

    if let Some(main) = package_main(path) {
        let entry = path.join(main);
        if let Some(found) = load_file(&entry) {
            return Some(found);
        }
        let index = entry.join(SCRIPT_INDEX_FILE);
        if index.is_file() {
            return Some(index);
        }
    }

    let index = path.join(SCRIPT_INDEX_FILE);
    index.is_file().then_some(index)
}

fn package_main(dir: &Path) -> Option<String> {
    let manifest_path = dir.join("package.json");
    let content = std::fs::read_to_string(&manifest_path).ok()?;
    match serde_json::from_str::<PackageManifest>(&content) {
        Ok(manifest) => manifest.main.filter(|main| !main.is_empty()),
        Err(err) => {
            debug!("Ignoring unreadable {:?}: {}", manifest_path, err);
            None
        }
    }
}
