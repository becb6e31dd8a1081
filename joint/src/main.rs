//! # Joint Demo Binary
//!
//! Wires the demo components from a TOML file, then answers requests read
//! from stdin until EOF or Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! # Serve with the default config
//! joint
//!
//! # Explicit config, verbose JSON logs
//! joint --config demo/joint.toml -v --json
//!
//! # Print what got joined and exit
//! joint --config demo/joint.toml --list
//!
//! # Everything after `--` is passed to the starters untouched
//! joint --config demo/joint.toml -- --seed-only
//! ```

#![deny(warnings)]

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use joint::components::server::{SERVER_KEY, Server};
use joint::components::{BUILD_LABEL, default_specs};
use joint::serve::serve;
use joint_common::config::{ConfigLoader, Configuration};
use joint_common::consts::DEFAULT_CONFIG_PATH;
use joint_runtime::{CancelToken, Orchestrator};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Joint demo - store, auth and request server wired at startup
#[derive(Parser, Debug)]
#[command(name = "joint")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (JOINT DEMO BUILD)"))]
#[command(about = "Demo backend assembled from starters by the joint runtime")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Print the joined components as JSON and exit
    #[arg(long)]
    list: bool,

    /// Arguments passed through to the starters
    #[arg(last = true)]
    passthrough: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("joint startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Read before tracing is up so `[shared] log_level` can set the default.
    let config = Configuration::load(&args.config);
    let shared = config
        .as_ref()
        .ok()
        .and_then(|c| c.shared().ok().flatten());
    setup_tracing(&args, shared.as_ref().map(|s| Level::from(s.log_level)));

    info!("{} v{} starting...", BUILD_LABEL, env!("CARGO_PKG_VERSION"));

    let config = config?;
    if let Some(shared) = config.shared()? {
        info!(service = %shared.service_name, "shared settings loaded");
    }

    // Ctrl-C during bootstrap cancels it; afterwards it stops the request loop.
    let cancel = CancelToken::new();
    let flag = cancel.flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })?;

    let bootstrap = Orchestrator::new(default_specs(&config)?)
        .with_args(args.passthrough.iter().cloned())
        .with_label(BUILD_LABEL)
        .with_cancel(cancel.clone())
        .run(&config)?;

    // Released on every exit path from here on.
    let registry = bootstrap.into_registry().close_on_drop();

    if args.list {
        println!("{}", serde_json::to_string_pretty(&registry.snapshot())?);
        return Ok(());
    }

    let server = registry.require::<Server>(&SERVER_KEY)?;
    info!(authenticators = ?server.authenticators(), "ready, reading requests from stdin");

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    serve(&server, &rx, &mut io::stdout().lock(), &cancel)?;
    drop(server);

    if let Err(e) = registry.close() {
        error!("shutdown completed with release errors: {}", e);
    }

    info!("{} shutdown complete", BUILD_LABEL);
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
///
/// `--verbose` wins over the configured level.
fn setup_tracing(args: &Args, configured: Option<Level>) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
}
