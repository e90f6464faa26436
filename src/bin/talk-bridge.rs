//! talk-bridge CLI - evaluate page scripts against the asset services
//!
//! Runs a script once per frame, the way the page engine does, with the
//! bridge builtins installed over a fixture backend.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use talk_bridge::bridge;
use talk_bridge::config::{self, BridgeConfig};
use talk_bridge::interpreter::{Env, Expression, FrameLoop};
use talk_bridge::service::{FixtureServices, Services};

#[derive(Parser)]
#[command(name = "talk-bridge")]
#[command(about = "Evaluate page scripts with cached asset-service builtins", long_about = None)]
struct Cli {
    /// Bridge configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script for a number of frames
    Run {
        /// Script file
        script: PathBuf,

        /// Fixture file serving identities and process results
        #[arg(long)]
        fixtures: PathBuf,

        /// Number of frames (overrides the configuration)
        #[arg(long)]
        frames: Option<u64>,

        /// Bind a symbol to a string before evaluation (name=value)
        #[arg(long = "bind")]
        bindings: Vec<String>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },

    /// List the installed builtins
    Builtins,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Commands::Run {
            script,
            fixtures,
            frames,
            bindings,
        } => {
            let source = std::fs::read_to_string(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let backend = FixtureServices::load(&fixtures)
                .with_context(|| format!("Failed to load fixtures {}", fixtures.display()))?;

            let mut env = Env::new();
            for binding in bindings {
                let Some((name, value)) = binding.split_once('=') else {
                    bail!("binding '{}' must look like name=value", binding);
                };
                env.define(name, Expression::string(value));
            }
            let bridge = bridge::load(&mut env, Services::from_backend(Arc::new(backend)), &config);

            let mut frame_loop = FrameLoop::new(&source).context("Failed to parse script")?;
            let frame_count = frames.unwrap_or(config.frames);
            for _ in 0..frame_count {
                let report = frame_loop.step(&env);
                println!("Frame {}:", report.frame);
                for (index, result) in report.results.iter().enumerate() {
                    match result {
                        Ok(value) => println!("  [{}] {}", index, value),
                        Err(err) => println!("  [{}] error: {}", index, err),
                    }
                }
                if !config.frame_interval().is_zero() {
                    std::thread::sleep(config.frame_interval());
                }
            }

            let stats = bridge.cache().stats();
            println!("Cache: {}", serde_json::to_string(&stats)?);
        }

        Commands::InitConfig { path } => {
            config::write_config(&path, &config)?;
            println!("Wrote configuration to {:?}", path);
        }

        Commands::Builtins => {
            let mut env = Env::new();
            bridge::load(
                &mut env,
                Services::from_backend(Arc::new(FixtureServices::default())),
                &config,
            );
            for name in env.builtin_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
