//! The data-access contract shared by every backend.
//!
//! The interaction core only talks to [`ChatStore`]. The HTTP client, the
//! in-memory store and the caching wrapper all implement it, so they can be
//! stacked freely.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{Agent, ChatMessage, Conversation, NewAgent, NewConversation, NewMessage};

/// List/create/delete operations over the agent, conversation and message
/// collections.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn list_agents(&self) -> Result<Vec<Agent>>;

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent>;

    async fn delete_agent(&self, agent_id: &str) -> Result<()>;

    async fn list_conversations(&self) -> Result<Vec<Conversation>>;

    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation>;

    /// Messages of one conversation, in server order.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>>;

    async fn send_message(&self, conversation_id: &str, message: NewMessage)
        -> Result<ChatMessage>;

    /// Delete every message of one conversation.
    async fn clear_messages(&self, conversation_id: &str) -> Result<()>;
}

#[async_trait]
impl<T: ChatStore + ?Sized> ChatStore for Arc<T> {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        (**self).list_agents().await
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent> {
        (**self).create_agent(agent).await
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        (**self).delete_agent(agent_id).await
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        (**self).list_conversations().await
    }

    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        (**self).create_conversation(conversation).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        (**self).list_messages(conversation_id).await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage> {
        (**self).send_message(conversation_id, message).await
    }

    async fn clear_messages(&self, conversation_id: &str) -> Result<()> {
        (**self).clear_messages(conversation_id).await
    }
}
