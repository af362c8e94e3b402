//! In-memory [`ChatStore`] for testing and offline use.
//!
//! Mirrors the server's behavior: ids and timestamps are assigned on
//! creation, `isDefault` is never settable by clients, unknown ids answer 404.
//! Every call is recorded for assertions, and individual operations can be
//! made to fail or to take a fixed amount of time.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::store::ChatStore;
use crate::types::{Agent, ChatMessage, Conversation, NewAgent, NewConversation, NewMessage};

/// Operation kinds, used for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListAgents,
    CreateAgent,
    DeleteAgent,
    ListConversations,
    CreateConversation,
    ListMessages,
    SendMessage,
    ClearMessages,
}

/// Record of a call made to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListAgents,
    CreateAgent { name: String },
    DeleteAgent { agent_id: String },
    ListConversations,
    CreateConversation { title: String },
    ListMessages { conversation_id: String },
    SendMessage { conversation_id: String, message: NewMessage },
    ClearMessages { conversation_id: String },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::ListAgents => StoreOp::ListAgents,
            StoreCall::CreateAgent { .. } => StoreOp::CreateAgent,
            StoreCall::DeleteAgent { .. } => StoreOp::DeleteAgent,
            StoreCall::ListConversations => StoreOp::ListConversations,
            StoreCall::CreateConversation { .. } => StoreOp::CreateConversation,
            StoreCall::ListMessages { .. } => StoreOp::ListMessages,
            StoreCall::SendMessage { .. } => StoreOp::SendMessage,
            StoreCall::ClearMessages { .. } => StoreOp::ClearMessages,
        }
    }

    /// True for calls that change server state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            StoreCall::ListAgents | StoreCall::ListConversations | StoreCall::ListMessages { .. }
        )
    }
}

/// In-memory storage for agents, conversations and messages.
#[derive(Default)]
pub struct MemoryStore {
    agents: RwLock<Vec<Agent>>,
    conversations: RwLock<Vec<Conversation>>,
    messages: RwLock<HashMap<String, Vec<ChatMessage>>>,
    calls: RwLock<Vec<StoreCall>>,
    failing: RwLock<HashSet<StoreOp>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the built-in `assistant`, `researcher` and
    /// `coder` agents.
    pub fn with_default_agents() -> Self {
        let store = Self::new();
        *store.agents.write().unwrap_or_else(PoisonError::into_inner) = default_agents();
        store
    }

    /// Delay every operation by `latency` before it takes effect.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every future call of `op` fail with a 503.
    pub fn fail_on(&self, op: StoreOp) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// Let `op` succeed again.
    pub fn recover(&self, op: StoreOp) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls that changed (or tried to change) server state.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Stored messages of one conversation, without recording a call.
    pub fn messages_of(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn begin(&self, call: StoreCall) -> Result<()> {
        let op = call.op();
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failing = self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op);
        if failing {
            return Err(ApiError::Api {
                status: 503,
                message: format!("injected failure: {op:?}"),
            });
        }
        Ok(())
    }

    fn require_conversation(&self, conversation_id: &str) -> Result<()> {
        let exists = self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c.id == conversation_id);
        if !exists {
            return Err(not_found("conversation", conversation_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.begin(StoreCall::ListAgents).await?;
        Ok(self
            .agents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent> {
        self.begin(StoreCall::CreateAgent {
            name: agent.name.clone(),
        })
        .await?;

        let created = Agent {
            id: Uuid::new_v4().to_string(),
            name: agent.name,
            role: agent.role,
            description: agent.description,
            color: agent.color,
            avatar: agent.avatar,
            is_default: false,
        };
        self.agents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(created.clone());
        Ok(created)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.begin(StoreCall::DeleteAgent {
            agent_id: agent_id.to_string(),
        })
        .await?;

        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        let before = agents.len();
        agents.retain(|a| a.id != agent_id);
        if agents.len() == before {
            return Err(not_found("agent", agent_id));
        }
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.begin(StoreCall::ListConversations).await?;
        Ok(self
            .conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        self.begin(StoreCall::CreateConversation {
            title: conversation.title.clone(),
        })
        .await?;

        let now = Utc::now();
        let created = Conversation {
            id: Uuid::new_v4().to_string(),
            title: conversation.title,
            created_at: now,
            updated_at: now,
        };
        self.conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(created.clone());
        Ok(created)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.begin(StoreCall::ListMessages {
            conversation_id: conversation_id.to_string(),
        })
        .await?;
        self.require_conversation(conversation_id)?;
        Ok(self.messages_of(conversation_id))
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage> {
        self.begin(StoreCall::SendMessage {
            conversation_id: conversation_id.to_string(),
            message: message.clone(),
        })
        .await?;
        self.require_conversation(conversation_id)?;

        if message.content.trim().is_empty() {
            return Err(ApiError::Api {
                status: 400,
                message: "content must not be empty".into(),
            });
        }

        let now = Utc::now();
        let created = ChatMessage {
            id: Uuid::new_v4().to_string(),
            content: message.content,
            is_user: message.is_user,
            agent_id: if message.is_user { None } else { message.agent_id },
            created_at: now,
        };
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(conversation_id.to_string())
            .or_default()
            .push(created.clone());

        if let Some(conversation) = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.updated_at = now;
        }
        Ok(created)
    }

    async fn clear_messages(&self, conversation_id: &str) -> Result<()> {
        self.begin(StoreCall::ClearMessages {
            conversation_id: conversation_id.to_string(),
        })
        .await?;
        self.require_conversation(conversation_id)?;
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(conversation_id);
        Ok(())
    }
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::Api {
        status: 404,
        message: format!("{kind} {id} not found"),
    }
}

fn default_agents() -> Vec<Agent> {
    let agent = |id: &str, name: &str, role: &str, description: &str, color: &str| Agent {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        avatar: name.chars().next().map(|c| c.to_uppercase().collect()).unwrap_or_default(),
        is_default: true,
    };

    vec![
        agent(
            "assistant",
            "Assistant",
            "General Assistant",
            "Helps with everyday questions and tasks",
            "hsl(221.2 83.2% 53.3%)",
        ),
        agent(
            "researcher",
            "Researcher",
            "Research Specialist",
            "Digs into data, studies and market trends",
            "hsl(142.1 76.2% 36.3%)",
        ),
        agent(
            "coder",
            "Coder",
            "Software Engineer",
            "Writes, reviews and debugs code",
            "hsl(262.1 83.3% 57.8%)",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_agents_are_flagged() {
        let store = MemoryStore::with_default_agents();
        let agents = store.list_agents().await.unwrap();

        let ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["assistant", "researcher", "coder"]);
        assert!(agents.iter().all(|a| a.is_default));
    }

    #[tokio::test]
    async fn test_created_agent_is_not_default() {
        let store = MemoryStore::with_default_agents();
        let agent = store
            .create_agent(NewAgent {
                name: "Analyst".into(),
                role: "Data".into(),
                description: "Numbers".into(),
                color: "red".into(),
                avatar: "A".into(),
            })
            .await
            .unwrap();

        assert!(!agent.is_default);
        assert_eq!(store.list_agents().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_delete_unknown_agent_is_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_agent("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_messages_to_unknown_conversation_fail() {
        let store = MemoryStore::new();
        let err = store
            .send_message("missing", NewMessage::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_clear_only_touches_one_conversation() {
        let store = MemoryStore::new();
        let a = store.create_conversation(NewConversation::new("a")).await.unwrap();
        let b = store.create_conversation(NewConversation::new("b")).await.unwrap();
        store.send_message(&a.id, NewMessage::user("one")).await.unwrap();
        store.send_message(&b.id, NewMessage::user("two")).await.unwrap();

        store.clear_messages(&a.id).await.unwrap();

        assert!(store.messages_of(&a.id).is_empty());
        assert_eq!(store.messages_of(&b.id).len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_records_call_and_recovers() {
        let store = MemoryStore::new();
        store.fail_on(StoreOp::CreateConversation);

        assert!(store.create_conversation(NewConversation::new("x")).await.is_err());
        assert_eq!(store.conversation_count(), 0);
        assert_eq!(
            store.calls(),
            vec![StoreCall::CreateConversation { title: "x".into() }]
        );

        store.recover(StoreOp::CreateConversation);
        assert!(store.create_conversation(NewConversation::new("x")).await.is_ok());
        assert_eq!(store.conversation_count(), 1);
    }
}
