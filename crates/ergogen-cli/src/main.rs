mod error;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ergogen_footprint::{Catalog, Resolver, SourceRegistry};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, ErrorCode};

#[derive(Parser)]
#[command(name = "ergogen-fp", version, about = "Load and render ergogen footprint modules", long_about = None)]
struct Cli {
    /// Directory of footprint modules to register (repeatable)
    #[arg(long = "sources", value_name = "DIR", global = true)]
    sources: Vec<PathBuf>,

    /// Resolve modules from registered sources only, never from disk
    #[arg(long, global = true)]
    no_fs: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a module's parameter schema as JSON
    Params {
        /// Footprint module path or built-in name
        #[arg(value_name = "MODULE")]
        module: String,
    },
    /// Render one footprint instance to stdout
    Render(render::RenderArgs),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { ErrorCode::Usage as u8 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_logging(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(code = ?err.code, "command failed");
            eprintln!("Error: {err}");
            ExitCode::from(err.code as u8)
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let sources = Arc::new(SourceRegistry::new());
    for dir in &cli.sources {
        let count = sources
            .register_dir(dir)
            .with_context(|| format!("Could not register footprints from {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), count, "registered footprint sources");
    }
    let catalog = Catalog::new(Resolver::new(sources).with_fs_fallback(!cli.no_fs));

    match cli.command {
        Command::Params { module } => render::run_params(&catalog, &module),
        Command::Render(args) => render::run_render(&catalog, &args),
    }
}
