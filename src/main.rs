// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Strata - run CommonJS modules from a directory or a web server
//!
//! This is the main entry point for the strata CLI/REPL.
//!
//! ## Features
//!
//! - Load an entry module and print its exports
//! - Filesystem and HTTP transports
//! - Interactive REPL that shares one module registry between loads

mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use strata_loader::{Loader, LoaderConfig};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Run CommonJS modules with browser-style loading
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
struct Cli {
    /// Entry module id, e.g. `./app/main`; starts the REPL when omitted
    entry: Option<String>,

    /// Serve module sources from this directory
    #[arg(long, value_name = "DIR", conflicts_with = "base_url")]
    root: Option<PathBuf>,

    /// Fetch module sources from this URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Document location that entry ids resolve against
    #[arg(long, value_name = "PATH")]
    location: Option<String>,

    /// Extension appended to module ids
    #[arg(long, value_name = "EXT")]
    extension: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Read this config file instead of ./strata.toml
    #[arg(short, long, value_name = "FILE", env = "STRATA_CONFIG")]
    config: Option<PathBuf>,

    /// Log loader activity
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer command-line flags over the file and environment settings
    fn apply(&self, config: &mut LoaderConfig) -> Result<()> {
        if let Some(root) = &self.root {
            config.set("transport.kind", "fs")?;
            config.set("transport.root", &root.display().to_string())?;
        }
        if let Some(base_url) = &self.base_url {
            config.set("transport.kind", "http")?;
            config.set("transport.base_url", base_url)?;
        }
        if let Some(location) = &self.location {
            config.set("location", location)?;
        }
        if let Some(extension) = &self.extension {
            config.set("extension", extension)?;
        }
        if let Some(timeout) = self.timeout {
            config.set("transport.timeout_secs", &timeout.to_string())?;
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config =
        LoaderConfig::load_from(cli.config.as_deref()).context("failed to read configuration")?;
    cli.apply(&mut config)?;

    let loader = Loader::from_config(&config)?;
    let runtime = Runtime::new().context("failed to start the async runtime")?;

    match cli.entry {
        Some(entry) => Ok(runtime.block_on(run_entry(&loader, &entry))),
        None => run_repl(loader, runtime),
    }
}

/// Load `entry` and print its exports
async fn run_entry(loader: &Loader, entry: &str) -> ExitCode {
    match loader.use_common_js_module(entry).await {
        Ok(Some(exports)) => {
            println!("{}", exports);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!(
                "{}: could not load '{}'",
                "Error".red().bold(),
                entry.cyan()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Start the interactive REPL
fn run_repl(loader: Loader, runtime: Runtime) -> Result<ExitCode> {
    let mut repl = repl::Repl::new(loader, runtime).context("failed to initialize REPL")?;
    repl.run().context("REPL error")?;
    Ok(ExitCode::SUCCESS)
}

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins over the default filter.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "strata=debug,strata_loader=debug"
    } else {
        "strata=warn,strata_loader=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
