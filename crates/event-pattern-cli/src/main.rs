mod commands;
mod config;
mod context;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use event_pattern::channels::redis::TokioRedisConnector;
use event_pattern::channels::ChannelRegistry;
use event_pattern::{EventManager, FsEventStore};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "event-pattern", version, about = "Publish, listen to and manage named events")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish one or more payloads on an event
    Publish {
        /// Channel to publish through (default: config, then first active channel)
        #[arg(long, env = "EVENT_PATTERN_CHANNEL")]
        channel: Option<String>,
        /// Event name
        #[arg(long)]
        event: String,
        /// Payload, JSON unless --raw; repeat for a batch
        #[arg(long = "payload", default_value = "{}")]
        payloads: Vec<String>,
        /// Send payloads verbatim instead of parsing them as JSON
        #[arg(long)]
        raw: bool,
        /// Record failed items and keep going instead of stopping
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Listen on an event and print every delivery as JSON
    Listen {
        #[arg(long, env = "EVENT_PATTERN_CHANNEL")]
        channel: Option<String>,
        #[arg(long)]
        event: String,
        /// Wait for a single message, print it and exit
        #[arg(long)]
        once: bool,
    },
    /// List channels ready for use
    Channels,
    /// Manage stored event definitions
    Events {
        /// Store directory (default: events_dir from config)
        #[arg(long, global = true)]
        dir: Option<PathBuf>,
        #[command(subcommand)]
        command: EventsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum EventsCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Get {
        #[arg(long, conflicts_with = "name")]
        id: Option<Uuid>,
        #[arg(long)]
        name: Option<String>,
    },
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Change the description of an event
    Update {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = Settings::new().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    let registry = ChannelRegistry::with_builtin(
        Arc::new(TokioRedisConnector::new(settings.connect_timeout())),
        settings.close_timeout(),
    );

    tracing::debug!(?registry, "channel registry ready");

    match cli.command {
        Command::Publish {
            channel,
            event,
            payloads,
            raw,
            continue_on_fail,
        } => {
            commands::publish(&registry, &settings, channel, &event, payloads, raw, continue_on_fail).await
        }
        Command::Listen {
            channel,
            event,
            once,
        } => commands::listen(&registry, &settings, channel, &event, once).await,
        Command::Channels => commands::channels(&registry),
        Command::Events { dir, command } => {
            let dir = dir.unwrap_or_else(|| settings.events_dir.clone());
            let manager = EventManager::new(Arc::new(FsEventStore::new(dir)));
            match command {
                EventsCommand::Create { name, description } => {
                    commands::create_event(&manager, &name, description).await
                }
                EventsCommand::Get { id, name } => commands::get_event(&manager, id, name).await,
                EventsCommand::List { limit, offset } => {
                    commands::list_events(&manager, limit, offset).await
                }
                EventsCommand::Update { name, description } => {
                    commands::update_event(&manager, &name, description).await
                }
                EventsCommand::Delete { name } => commands::delete_event(&manager, &name).await,
            }
        }
    }
}
