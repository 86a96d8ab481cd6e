use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;

use messenger_bot::application::messaging::{EventDispatcher, MessageRouter, ReactionHandler, StateSaver};
use messenger_bot::application::services::{run_with_retries, CommandRegistry, SessionSupervisor};
use messenger_bot::commands;
use messenger_bot::domain::traits::CredentialStore;
use messenger_bot::infrastructure::adapters::console::ConsoleConnector;
use messenger_bot::infrastructure::config::Config;
use messenger_bot::infrastructure::storage::JsonCredentialStore;

#[derive(Parser)]
#[command(name = "messenger-bot")]
#[command(about = "A command-dispatch bot for messaging platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Credentials (AppState) file (overrides config)
    #[arg(long)]
    credentials: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let (mut config, config_error) = load_config(&cli.config);
    if let Some(path) = cli.credentials {
        config.session.credentials_path = path.into();
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.session.log_level)),
        )
        .init();

    if let Some(e) = config_error {
        tracing::warn!("Failed to load config: {}, using defaults", e);
    }

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("Uncaught panic: {}", info);
    }));

    match cli.command {
        Commands::Run => {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start async runtime: {}", e);
                    std::process::exit(1);
                }
            };
            rt.block_on(run_bot(config));
        }
        Commands::Version => {
            println!("messenger-bot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config(&cli.config);
        }
    }
}

fn load_config(path: &str) -> (Config, Option<String>) {
    if !Path::new(path).exists() {
        return (Config::load_env(), None);
    }
    match Config::load(path) {
        Ok(mut config) => {
            config.apply_env();
            (config, None)
        }
        Err(e) => (Config::load_env(), Some(e.to_string())),
    }
}

async fn run_bot(config: Config) {
    tracing::info!("Starting {}", config.bot.name);

    let registry = Arc::new(CommandRegistry::new(Arc::new(commands::builtin())));
    let store: Arc<dyn CredentialStore> =
        Arc::new(JsonCredentialStore::new(&config.session.credentials_path));

    let router = MessageRouter::new(registry, &config.bot.prefix)
        .with_typing_indicator(config.behavior.typing_indicator);
    let reactions = ReactionHandler::new(config.behavior.reaction_reply_probability);
    let mut dispatcher = EventDispatcher::new(router, reactions);
    if config.session.auto_save_state {
        dispatcher = dispatcher.with_state_saver(StateSaver::new(
            store.clone(),
            config.behavior.save_state_probability,
        ));
    }

    let supervisor = SessionSupervisor::new(
        Arc::new(ConsoleConnector::new()),
        store,
        Arc::new(dispatcher),
        config.supervisor_settings(),
    );

    if let Err(e) = run_with_retries(&supervisor, &config.retry_policy()).await {
        tracing::warn!("Bot is idle until restarted: {}", e);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Bot is shutting down...");
    supervisor.stop().await;
}

fn init_config(path: &str) {
    if Path::new(path).exists() {
        println!("Config already exists at {}", path);
        return;
    }

    let yaml = match Config::default().to_yaml() {
        Ok(yaml) => yaml,
        Err(e) => {
            eprintln!("Failed to render config: {}", e);
            return;
        }
    };

    match std::fs::write(path, yaml) {
        Ok(()) => println!("Created config at {}", path),
        Err(e) => eprintln!("Failed to write config: {}", e),
    }
}
