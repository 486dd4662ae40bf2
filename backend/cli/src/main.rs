mod app;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use lume_agent::AgentRunner;
use lume_channels::{ChannelAdapter, ConsoleAdapter, DiscordAdapter};
use lume_commands::ActionRegistry;
use lume_config::{config_dir, config_file_path, load_and_prepare, redact, validate, LumeConfig};
use lume_core::LumeBus;
use lume_logging::init_logger;

use terminal_output::{note_error, note_success, note_warn, render_table};

#[derive(Parser)]
#[command(name = "lume")]
#[command(about = "Lume: a chat-ops assistant that manages Discord servers from natural language")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.lume/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve every channel the bot can read
    Run,
    /// Talk to the assistant in the terminal against an in-memory server
    Chat {
        /// Author name used for your messages
        #[arg(long, default_value = "console-user")]
        user: String,
    },
    /// List the actions the assistant can perform
    Actions,
    /// Validate the config file and report problems
    CheckConfig {
        /// Also print the resolved config with secrets redacted
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Run => {
            let config = load_for_runtime(&path).await?;
            run_discord(&config).await
        }
        Commands::Chat { user } => {
            let config = load_for_runtime(&path).await?;
            run_console(&config, user).await
        }
        Commands::Actions => {
            print_actions();
            Ok(())
        }
        Commands::CheckConfig { show } => check_config(&path, show).await,
    }
}

/// Load the config, start logging from it, and refuse to start on errors.
async fn load_for_runtime(path: &std::path::Path) -> Result<LumeConfig> {
    let config = load_and_prepare(path)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    init_logger(&app::log_options(&config))?;

    let report = validate(&config);
    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    for err in &report.errors {
        error!(path = %err.path, "{}", err.message);
    }
    if !report.is_valid() {
        bail!("invalid configuration in {} (see `lume check-config`)", path.display());
    }
    info!(config = %path.display(), assistant = %config.assistant_name(), "Configuration loaded");
    Ok(config)
}

/// Run the agent against `adapter` until the adapter stops.
async fn serve(runner: Arc<AgentRunner>, adapter: &dyn ChannelAdapter) -> Result<()> {
    let mut bus = LumeBus::new();
    let inbound_rx = bus.take_inbound_rx().context("inbound receiver already taken")?;
    let outbound_rx = bus.take_outbound_rx().context("outbound receiver already taken")?;
    let LumeBus {
        inbound_tx,
        outbound_tx,
        ..
    } = bus;

    let agent = tokio::spawn(runner.run(inbound_rx, outbound_tx));
    info!(adapter = adapter.name(), "Adapter starting");
    adapter.start(inbound_tx, outbound_rx).await?;

    match agent.await {
        Ok(result) => result,
        Err(e) => bail!("agent runner panicked: {e}"),
    }
}

async fn run_discord(config: &LumeConfig) -> Result<()> {
    let Some(token) = config.discord_token() else {
        bail!("no Discord token: set discord.token or DISCORD_TOKEN");
    };
    let adapter = DiscordAdapter::new(token);
    let runner = app::build_runner(config, Arc::new(adapter.server_ops()))?;

    tokio::select! {
        result = serve(runner, &adapter) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted; shutting down");
            Ok(())
        }
    }
}

async fn run_console(config: &LumeConfig, user: String) -> Result<()> {
    let server = app::console_server(&user).await;
    let runner = app::build_runner(config, server)?;
    println!(
        "{} está listo. Escribe un mensaje (Ctrl+D para salir).",
        config.assistant_name()
    );
    serve(runner, &ConsoleAdapter::new(user)).await
}

fn print_actions() {
    let registry = ActionRegistry::new();
    let rows: Vec<Vec<String>> = registry
        .all()
        .iter()
        .map(|action| {
            let params: Vec<String> = action
                .params
                .iter()
                .map(|p| if p.required { p.name.clone() } else { format!("[{}]", p.name) })
                .collect();
            vec![
                action.name.clone(),
                action.aliases.join(", "),
                params.join(", "),
                action.description.clone(),
            ]
        })
        .collect();
    print!("{}", render_table(&["acción", "alias", "parámetros", "descripción"], &rows));
}

async fn check_config(path: &std::path::Path, show: bool) -> Result<()> {
    let config = load_and_prepare(path)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    let report = validate(&config);

    println!("Config: {}", path.display());
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for err in &report.errors {
        note_error(&format!("{}: {}", err.path, err.message));
    }

    if show {
        let value = redact(&serde_json::to_value(&config)?);
        print!("{}", serde_yaml::to_string(&value)?);
    }

    if !report.is_valid() {
        bail!("{} configuration error(s)", report.errors.len());
    }
    note_success("Configuration is valid");
    Ok(())
}
