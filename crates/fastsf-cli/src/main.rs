mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod process;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::process::Backend;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    let cli = Cli::parse();

    let backend = match &cli.command {
        Commands::Compute(args) => Backend::from_args(&args.backend),
        Commands::Partition(_) => Ok(Backend::Single),
    };
    let backend = match backend {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_app(cli, &backend) {
        if backend.is_root() {
            eprintln!("\n❌ Error: {}", e);
        }
        backend.abort(1);
        std::process::exit(1);
    }
}

fn run_app(cli: Cli, backend: &Backend) -> Result<()> {
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone(), backend.rank())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("🚀 fastSF CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let command_result = match cli.command {
        Commands::Compute(args) => {
            info!("Dispatching to 'compute' command.");
            commands::compute::run(args, backend)
        }
        Commands::Partition(args) => {
            info!("Dispatching to 'partition' command.");
            commands::partition::run(args)
        }
    };

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            if backend.is_root() {
                println!("✅ Command completed successfully.");
            }
        }
        Err(e) => error!("❌ Command failed: {}", e),
    }

    command_result
}
