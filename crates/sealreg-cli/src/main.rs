//! # sealreg CLI entry point

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sealreg_cli::config::CliConfig;
use sealreg_cli::demo::{run_demo, DemoArgs};
use sealreg_cli::keygen::{run_keygen, KeygenArgs};
use sealreg_cli::snapshot::{run_inspect, run_verify_snapshot, InspectArgs, VerifySnapshotArgs};

/// Sealed Registry toolchain.
#[derive(Parser, Debug)]
#[command(name = "sealreg", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 seed and print its public key.
    Keygen(KeygenArgs),

    /// Run the create, disclose and finalize scenario in process.
    Demo(DemoArgs),

    /// List or show records in a snapshot file.
    Inspect(InspectArgs),

    /// Check a snapshot file's invariants.
    VerifySnapshot(VerifySnapshotArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Demo(args) => CliConfig::load(cli.config.as_deref())
            .and_then(|c| c.resolve())
            .and_then(|config| run_demo(config, &args)),
        Commands::Inspect(args) => run_inspect(&args),
        Commands::VerifySnapshot(args) => run_verify_snapshot(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
