use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::Path;

use crate::code_generator::Assembler;
use crate::config::Config;
use crate::error::BundleWarning;
use crate::graph_builder::GraphBuilder;
use crate::syntax::PrintOptions;

/// A finished bundle and the warnings raised while producing it
#[derive(Debug)]
pub struct Bundle {
    pub code: String,
    pub warnings: Vec<BundleWarning>,
}

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Core bundling logic shared between file and string output modes
    pub fn build(&self, entry_path: &Path) -> Result<Bundle> {
        debug!("Entry: {:?}", entry_path);
        let print_options = PrintOptions {
            target: self.config.es_version()?,
            minify: self.config.minify,
        };
        debug!(
            "Using target {} ({:?}), {:?} instantiation",
            self.config.target, print_options.target, self.config.instantiation
        );

        let output = GraphBuilder::new(print_options)
            .build(entry_path)
            .with_context(|| format!("Failed to bundle {:?}", entry_path))?;
        info!(
            "Found {} modules to bundle",
            output.dependencies.len() + 1
        );

        let code = Assembler::new(self.config.instantiation, self.config.minify)
            .assemble(&output.entry_source, &output.dependencies)
            .context("Failed to assemble bundle")?;

        Ok(Bundle {
            code,
            warnings: output.warnings,
        })
    }

    /// Bundle to string for stdout output
    pub fn bundle_to_string(&self, entry_path: &Path) -> Result<String> {
        info!("Starting bundle process for stdout output");
        Ok(self.build(entry_path)?.code)
    }

    /// Main bundling function. The output file is only written once the
    /// whole bundle has been produced.
    pub fn bundle(&self, entry_path: &Path, output_path: &Path) -> Result<()> {
        info!("Starting bundle process");
        debug!("Output: {:?}", output_path);

        let bundle = self.build(entry_path)?;

        if let Some(parent) = output_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }
        fs::write(output_path, bundle.code)
            .with_context(|| format!("Failed to write output file: {:?}", output_path))?;

        info!("Bundle written to: {:?}", output_path);
        Ok(())
    }
}
