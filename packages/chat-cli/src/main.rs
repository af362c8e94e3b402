mod chat;
mod commands;
mod render;

use std::sync::Arc;

use agent_chat::ChatConfig;
use agent_chat_client::{AgentChatClient, CachedStore, ChatStore, MemoryStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Store every command runs against: HTTP or in-memory, behind the cache.
pub type Backend = CachedStore<Arc<dyn ChatStore>>;

#[derive(Parser)]
#[command(name = "agent-chat", about = "Chat with AI agents from the terminal")]
struct Cli {
    /// Base URL of the chat API (overrides AGENT_CHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use a seeded in-memory store instead of the HTTP API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List agents
    Agents,
    /// Create an agent
    AddAgent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        description: String,
    },
    /// Delete an agent
    DeleteAgent { id: String },
    /// List conversations
    Conversations,
    /// Print the transcript of a conversation
    History { conversation_id: String },
    /// Start an interactive chat
    Chat {
        /// Agent to address (defaults to the first agent)
        #[arg(long)]
        agent: Option<String>,
        /// Resume an existing conversation
        #[arg(long)]
        conversation: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the chat
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,agent_chat=info,agent_chat_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ChatConfig::from_env().context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    let store = connect(&config, cli.offline)?;

    match cli.command {
        Command::Agents => commands::list_agents(&store).await,
        Command::AddAgent {
            name,
            role,
            description,
        } => commands::add_agent(&store, name, role, description).await,
        Command::DeleteAgent { id } => commands::delete_agent(&store, &id).await,
        Command::Conversations => commands::list_conversations(&store).await,
        Command::History { conversation_id } => commands::history(&store, &conversation_id).await,
        Command::Chat {
            agent,
            conversation,
        } => chat::run(store, config, agent, conversation).await,
    }
}

fn connect(config: &ChatConfig, offline: bool) -> Result<Backend> {
    let inner: Arc<dyn ChatStore> = if offline {
        tracing::info!("Using in-memory store");
        Arc::new(MemoryStore::with_default_agents())
    } else {
        let client = AgentChatClient::new(&config.api_url)
            .and_then(|client| client.with_timeout(config.request_timeout))
            .with_context(|| format!("Failed to create API client for {}", config.api_url))?;
        tracing::info!(api_url = %client.base_url(), "Using HTTP store");
        Arc::new(client)
    };

    Ok(CachedStore::new(inner))
}
