//! One-shot subcommands.

use agent_chat::Transcript;
use agent_chat_client::{AgentForm, ChatStore};
use anyhow::{Context, Result};
use colored::Colorize;

use crate::render;
use crate::Backend;

pub async fn list_agents(store: &Backend) -> Result<()> {
    let agents = store.list_agents().await.context("Failed to load agents")?;
    if agents.is_empty() {
        render::notice("No agents.");
    }
    for agent in &agents {
        render::agent_row(agent);
    }
    Ok(())
}

pub async fn add_agent(
    store: &Backend,
    name: String,
    role: String,
    description: String,
) -> Result<()> {
    let new_agent = AgentForm::new(name, role, description)
        .validate()
        .context("Invalid agent")?;

    let agent = store
        .create_agent(new_agent)
        .await
        .context("Failed to create agent")?;

    println!("{} {}", "✓ Created".green(), agent.name.bold());
    render::agent_row(&agent);
    Ok(())
}

pub async fn delete_agent(store: &Backend, id: &str) -> Result<()> {
    store
        .delete_agent(id)
        .await
        .with_context(|| format!("Failed to delete agent {id}"))?;
    println!("{} {}", "✓ Deleted".green(), id);
    Ok(())
}

pub async fn list_conversations(store: &Backend) -> Result<()> {
    let conversations = store
        .list_conversations()
        .await
        .context("Failed to load conversations")?;
    if conversations.is_empty() {
        render::notice("No conversations.");
    }
    for conversation in &conversations {
        render::conversation_row(conversation);
    }
    Ok(())
}

pub async fn history(store: &Backend, conversation_id: &str) -> Result<()> {
    let transcript = Transcript::fetch(store, conversation_id)
        .await
        .with_context(|| format!("Failed to load conversation {conversation_id}"))?;
    render::transcript(&transcript);
    Ok(())
}
