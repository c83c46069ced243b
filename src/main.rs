//! Mixer Bridge CLI
//!
//! Connects to a Behringer console and reads, writes or watches its state.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use mixer_bridge::config::AppConfig;
use mixer_bridge::transport::MemoryTransport;
use mixer_bridge::{Mixer, MixerModel, MixerValue};

/// Mixer Bridge - mirror and control Behringer X32, X-Air and WING consoles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "mixer.yaml")]
    config: String,

    /// Console model (X32, XR18, XR16, XR12, WING, WINGRACK, WINGCOMPACT)
    #[arg(short, long, env = "MIXER_MODEL")]
    model: Option<MixerModel>,

    /// Console host name or IP address
    #[arg(long, env = "MIXER_HOST")]
    host: Option<String>,

    /// UDP port (defaults to the model's port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Only load address table rows with these tags
    #[arg(short, long, value_delimiter = ',')]
    include: Vec<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the compiled wire/logical address table
    DumpMapping,
    /// Print the model's cardinality summary
    Info,
    /// Load state and print it (optionally below one address)
    Get { address: Option<String> },
    /// Write a logical field
    Set { address: String, value: String },
    /// Recall a scene
    Scene { number: u32 },
    /// Subscribe and stream changes as JSON lines until Ctrl+C
    Watch,
    /// Interactive shell (default)
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.log_json)?;

    let config = resolve_config(&args).await?;
    let options = config.to_options();

    match args.command.unwrap_or(Commands::Repl) {
        Commands::DumpMapping => {
            let mixer = Mixer::new(&options, Arc::new(MemoryTransport::new()))?;
            for row in mixer.dump_mapping() {
                println!("{}\t{}", row.wire, row.logical);
            }
        },
        Commands::Info => {
            println!("{}", serde_json::to_string_pretty(&options.profile().info())?);
        },
        command => {
            config.validate()?;
            info!("Starting Mixer Bridge v{}...", env!("CARGO_PKG_VERSION"));
            let mixer = Mixer::connect(&options).await?;
            mixer
                .start()
                .await
                .with_context(|| format!("Could not reach {} at {}", options.model, options.host))?;

            let result = run_command(&mixer, command).await;
            if let Err(e) = mixer.stop().await {
                warn!("Failed to stop cleanly: {}", e);
            }
            result?;
        },
    }

    Ok(())
}

async fn run_command(mixer: &Mixer, command: Commands) -> Result<()> {
    let settle = mixer.profile().scene_settle;
    match command {
        Commands::Get { address } => {
            mixer.reload().await?;
            tokio::time::sleep(settle).await;
            cli::print_state(mixer.state(address.as_deref()));
        },
        Commands::Set { address, value } => {
            mixer.set_value(&address, MixerValue::parse_loose(&value)).await?;
            tokio::time::sleep(mixer.profile().connect_timeout).await;
            cli::print_state(mixer.state(Some(&address)));
        },
        Commands::Scene { number } => {
            mixer.load_scene(number).await?;
            info!("✅ Scene {} loaded", number);
        },
        Commands::Watch => {
            mixer.subscription_status_register(|connected| {
                if connected {
                    info!("✅ Subscription recovered");
                } else {
                    warn!("⚠️  Subscription lost");
                }
            });
            mixer
                .subscribe(|change| match serde_json::to_string(change) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to encode change: {}", e),
                })
                .await?;
            mixer.reload().await?;
            info!("👀 Watching for changes (Ctrl+C to stop)");
            shutdown_signal().await;
            mixer.unsubscribe().await?;
        },
        Commands::Repl => {
            mixer.subscribe(|_| {}).await?;
            mixer.reload().await?;
            cli::run_repl(mixer).await?;
            mixer.unsubscribe().await?;
        },
        Commands::DumpMapping | Commands::Info => {},
    }
    Ok(())
}

/// Config file if present, with CLI flags layered on top
async fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = if Path::new(&args.config).exists() {
        info!("Configuration file: {}", args.config);
        AppConfig::load(&args.config).await?
    } else {
        let model = args
            .model
            .context("No configuration file found; pass --model and --host")?;
        let host = args.host.clone().unwrap_or_default();
        AppConfig::for_host(model, host)
    };

    if let Some(model) = args.model {
        config.mixer.model = model;
    }
    if let Some(host) = &args.host {
        config.mixer.host = host.clone();
    }
    if args.port.is_some() {
        config.mixer.port = args.port;
    }
    if !args.include.is_empty() {
        config.mixer.include = args.include.clone();
    }

    Ok(config)
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Shutdown signal received");
}
