mod config_commands;
mod send_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    linebot_config::LineBotConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    uuid::Uuid,
};

#[derive(Parser)]
#[command(name = "linebot", about = "LINE webhook relay", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config and HOST).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config and PORT).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Explicit config file; skips discovery.
    #[arg(long, global = true, env = "LINEBOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook gateway (default when no subcommand is provided).
    Gateway,
    /// Push a text message to one user, group or room.
    Push {
        #[arg(long)]
        to: String,
        #[arg(short, long)]
        message: String,
        /// Deliver without a notification.
        #[arg(long)]
        silent: bool,
        /// Reuse the key printed by an earlier ambiguous failure.
        #[arg(long)]
        retry_key: Option<Uuid>,
    },
    /// Send the same text to several users.
    Multicast {
        #[arg(long, required = true, num_args = 1..)]
        to: Vec<String>,
        #[arg(short, long)]
        message: String,
        #[arg(long)]
        silent: bool,
        #[arg(long)]
        retry_key: Option<Uuid>,
    },
    /// Fetch a user's profile.
    Profile { user_id: String },
    /// Configuration inspection.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// File (explicit or discovered), then environment, then command-line flags.
fn resolve_config(cli: &Cli) -> anyhow::Result<LineBotConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => linebot_config::load_config(path)?,
        None => linebot_config::discover_and_load(),
    };
    linebot_config::apply_env_overrides(&mut config);
    if let Some(bind) = &cli.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "linebot starting");

    let config = resolve_config(&cli)?;

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => linebot_gateway::start_gateway(config).await,
        Some(Commands::Push {
            to,
            message,
            silent,
            retry_key,
        }) => send_commands::push(&config, to, message, silent, retry_key).await,
        Some(Commands::Multicast {
            to,
            message,
            silent,
            retry_key,
        }) => send_commands::multicast(&config, to, message, silent, retry_key).await,
        Some(Commands::Profile { user_id }) => send_commands::profile(&config, user_id).await,
        Some(Commands::Config { action }) => config_commands::handle_config(action, &config),
    }
}
