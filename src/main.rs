//! # taskd
//!
//! Delayed task scheduler with an HTTP API.
//!
//! Usage:
//!   taskd serve                        # Start the scheduler on 0.0.0.0:8080
//!   taskd serve --port 9000            # Custom port
//!   taskd config show                  # Show effective configuration
//!   taskd config init                  # Write default config file
//!   taskd info                         # Show system info

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use taskd_core::TaskdConfig;
use taskd_gateway::{AppState, GatewayServer};
use taskd_scheduler::SchedulerEngine;

#[derive(Parser)]
#[command(
    name = "taskd",
    version,
    about = "⏱️ taskd — delayed task scheduler",
    long_about = "Submit named tasks with a delay, watch them run, cancel them before they do.\nAll state is in memory for the lifetime of the process."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP scheduler service
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of static web assets
        #[arg(long)]
        web_dir: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write the default configuration file
    Init,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "taskd=debug,taskd_scheduler=debug,taskd_gateway=debug,tower_http=debug"
    } else {
        "taskd=info,taskd_scheduler=info,taskd_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config (not needed when writing a fresh one)
    let writing_defaults = matches!(
        cli.command,
        Commands::Config { action: ConfigAction::Init }
    );
    let mut config = if writing_defaults {
        TaskdConfig::default()
    } else if let Some(path) = &cli.config {
        TaskdConfig::load_from(std::path::Path::new(&expand_path(path)))?
    } else {
        TaskdConfig::load()?
    };
    tracing::debug!(
        "Config: gateway {}, {} workers, {} concurrent tasks",
        config.gateway.bind_addr(),
        config.scheduler.worker_threads,
        config.scheduler.max_concurrent_tasks
    );

    match cli.command {
        Commands::Serve { host, port, web_dir } => {
            if let Some(h) = host {
                config.gateway.host = h;
            }
            if let Some(p) = port {
                config.gateway.port = p;
            }
            if let Some(dir) = web_dir {
                config.gateway.web_dir = expand_path(&dir);
            }

            // Request handlers and task bodies share one bounded worker pool.
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(config.scheduler.worker_threads)
                .thread_name("taskd-worker")
                .enable_all()
                .build()?;

            runtime.block_on(async move {
                let engine = Arc::new(SchedulerEngine::new(config.scheduler.clone()));
                let state = Arc::new(AppState::new(engine, config.gateway.clone()));

                println!("⏱️ taskd v{}", env!("CARGO_PKG_VERSION"));
                println!("   🌐 API:      http://{}/api/tasks", config.gateway.bind_addr());
                println!("   📂 Web Dir:  {}", config.gateway.web_dir);
                println!("   🧵 Workers:  {}", config.scheduler.worker_threads);
                println!();

                GatewayServer::start(state).await?;
                anyhow::Ok(())
            })?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", config.to_toml()?);
            }
            ConfigAction::Init => {
                let path = match &cli.config {
                    Some(p) => {
                        let path = std::path::PathBuf::from(expand_path(p));
                        config.save_to(&path)?;
                        path
                    }
                    None => {
                        config.save()?;
                        TaskdConfig::default_path()
                    }
                };
                println!("✅ Config saved to: {}", path.display());
            }
        },

        Commands::Info => {
            println!("⏱️ taskd v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", TaskdConfig::default_path().display());
            println!("   Listen: {}", config.gateway.bind_addr());
            println!("   Workers: {}", config.scheduler.worker_threads);
            println!("   Max concurrent tasks: {}", config.scheduler.max_concurrent_tasks);
        }
    }

    Ok(())
}
