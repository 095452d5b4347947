//! nasled: disk and network activity on NAS front-panel LEDs.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

mod cli;

/// Shared shutdown flag, cleared by the Ctrl+C handler.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "nasled",
    version,
    about = "Disk and network activity LEDs for NAS front panels"
)]
struct Args {
    /// Output as JSON (for status, disks, config, leds)
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    #[cfg(not(windows))]
    {
        ctrlc::set_handler(move || {
            RUNNING.store(false, Ordering::SeqCst);
        })
        .ok();
    }

    if let Err(e) = cli::run(args.command, args.json, args.config.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
