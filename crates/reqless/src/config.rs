use anyhow::{Context, Result, anyhow};
use cow_utils::CowUtils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use swc_core::ecma::ast::EsVersion;

use crate::combine::Combine;
use crate::dirs::{CONFIG_FILE_NAME, system_config_file, user_config_file};

/// How the generated dispatcher instantiates a module
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Instantiation {
    /// Run a module's initializer on first dispatch and reuse its exports afterwards
    #[default]
    Cached,
    /// Run a module's initializer again on every dispatch
    PerDispatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// ECMAScript version the bundle is printed for.
    /// Accepts "es3", "es5", "es2015" .. "es2022" and "esnext"
    pub target: String,

    /// Module instantiation semantics of the generated dispatcher
    pub instantiation: Instantiation,

    /// Whether to print the bundle without insignificant whitespace
    pub minify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: "es2020".to_owned(),
            instantiation: Instantiation::default(),
            minify: false,
        }
    }
}

/// One configuration layer as written in a `reqless.toml` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConfigFile {
    pub target: Option<String>,
    pub instantiation: Option<Instantiation>,
    pub minify: Option<bool>,
}

impl Combine for ConfigFile {
    fn combine(self, other: Self) -> Self {
        Self {
            target: self.target.combine(other.target),
            instantiation: self.instantiation.combine(other.instantiation),
            minify: self.minify.combine(other.minify),
        }
    }
}

impl ConfigFile {
    /// Load a single config file from a path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Fill unset values from the defaults
    pub fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            target: self.target.unwrap_or(defaults.target),
            instantiation: self.instantiation.unwrap_or(defaults.instantiation),
            minify: self.minify.unwrap_or(defaults.minify),
        }
    }
}

impl Config {
    /// Parse a target string such as "es2020" into the codegen version
    pub fn parse_target(target: &str) -> Result<EsVersion> {
        let version = match target.cow_to_lowercase().as_ref() {
            "es3" => EsVersion::Es3,
            "es5" => EsVersion::Es5,
            "es2015" | "es6" => EsVersion::Es2015,
            "es2016" => EsVersion::Es2016,
            "es2017" => EsVersion::Es2017,
            "es2018" => EsVersion::Es2018,
            "es2019" => EsVersion::Es2019,
            "es2020" => EsVersion::Es2020,
            "es2021" => EsVersion::Es2021,
            "es2022" => EsVersion::Es2022,
            "esnext" => EsVersion::EsNext,
            _ => {
                return Err(anyhow!(
                    "Invalid target '{}'. Supported targets: es3, es5, es2015 .. es2022, esnext",
                    target
                ));
            }
        };
        Ok(version)
    }

    /// The configured target as a codegen version
    pub fn es_version(&self) -> Result<EsVersion> {
        Self::parse_target(&self.target)
    }

    /// Set the target from a string value, rejecting unknown targets
    pub fn set_target(&mut self, target: String) -> Result<()> {
        Self::parse_target(&target)?;
        self.target = target;
        Ok(())
    }

    /// Load configuration with hierarchical precedence:
    /// 1. CLI-provided config path (highest precedence)
    /// 2. Project config (reqless.toml in the current directory)
    /// 3. User config (~/.config/reqless/reqless.toml)
    /// 4. System config (/etc/reqless/reqless.toml or equivalent)
    /// 5. Default values (lowest precedence)
    pub fn load(cli_config_path: Option<&Path>) -> Result<Self> {
        let layers = [
            cli_config_path.map(|path| (path.to_path_buf(), "CLI config", true)),
            Some((PathBuf::from(CONFIG_FILE_NAME), "project config", false)),
            user_config_file().map(|path| (path, "user config", false)),
            system_config_file().map(|path| (path, "system config", false)),
        ];

        let mut merged = ConfigFile::default();
        for (path, context, required) in layers.into_iter().flatten() {
            // An explicitly requested file must exist; discovered ones are optional
            if !required && !path.exists() {
                continue;
            }
            log::debug!("Loading {} from: {:?}", context, path);
            let layer = ConfigFile::load(&path)
                .with_context(|| format!("Failed to load {} from {:?}", context, path))?;
            merged = merged.combine(layer);
        }

        let config = merged.into_config();
        config
            .es_version()
            .with_context(|| format!("Invalid target in final config: {}", config.target))?;
        Ok(config)
    }
}
