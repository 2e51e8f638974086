use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use std::io::Write;
use std::path::PathBuf;

use reqless::config::{Config, Instantiation};
use reqless::orchestrator::BundleOrchestrator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry point TypeScript module
    entry: PathBuf,

    /// Output bundle file (stdout if omitted)
    output: Option<PathBuf>,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ECMAScript version to print the bundle for (e.g., es5, es2015, es2020, esnext)
    #[arg(long)]
    target: Option<String>,

    /// How modules are instantiated by the generated dispatcher
    #[arg(long, value_enum)]
    instantiation: Option<Instantiation>,

    /// Print the bundle without insignificant whitespace
    #[arg(long)]
    minify: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let log_level = match cli.verbose {
        0 => "warn",  // Default: warnings and errors only
        1 => "info",  // -v: informational messages
        2 => "debug", // -vv: debug messages
        _ => "trace", // -vvv or more: trace messages
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    debug!("Verbosity level: {} (log level: {})", cli.verbose, log_level);
    info!("Starting reqless bundler");
    debug!("Entry point: {:?}", cli.entry);
    debug!("Output: {:?}", cli.output);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(target) = cli.target {
        config.set_target(target)?;
    }
    if let Some(instantiation) = cli.instantiation {
        config.instantiation = instantiation;
    }
    if cli.minify {
        config.minify = true;
    }
    debug!("Configuration: {:?}", config);

    let bundler = BundleOrchestrator::new(config);
    match &cli.output {
        Some(output_path) => {
            bundler.bundle(&cli.entry, output_path)?;
            info!("Bundle created successfully at {:?}", output_path);
        }
        None => {
            let bundled_code = bundler.bundle_to_string(&cli.entry)?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bundled_code.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write bundle to stdout")?;
            info!("Bundle output to stdout");
        }
    }

    Ok(())
}
