//! Ordered, author-resolved view of a conversation.

use agent_chat_client::{Agent, ChatMessage, ChatStore};
use serde::Serialize;

/// Who wrote a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    User,
    Agent(Agent),
    /// Agent turn whose agent is gone (deleted) or was never recorded.
    Dangling { agent_id: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub message: ChatMessage,
    pub author: Author,
}

/// Messages of one conversation ordered by `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Order `messages` and resolve their authors against `agents`.
    ///
    /// Messages with equal timestamps keep their incoming order.
    pub fn build(mut messages: Vec<ChatMessage>, agents: &[Agent]) -> Self {
        messages.sort_by_key(|m| m.created_at);

        let entries = messages
            .into_iter()
            .map(|message| {
                let author = if message.is_user {
                    Author::User
                } else {
                    match message.agent_id.as_deref() {
                        Some(id) => agents
                            .iter()
                            .find(|a| a.id == id)
                            .cloned()
                            .map(Author::Agent)
                            .unwrap_or_else(|| Author::Dangling {
                                agent_id: Some(id.to_string()),
                            }),
                        None => Author::Dangling { agent_id: None },
                    }
                };
                TranscriptEntry { message, author }
            })
            .collect();

        Self { entries }
    }

    /// Fetch a conversation's messages and the agent list, then build.
    pub async fn fetch<S: ChatStore + ?Sized>(
        store: &S,
        conversation_id: &str,
    ) -> agent_chat_client::Result<Self> {
        let messages = store.list_messages(conversation_id).await?;
        let agents = store.list_agents().await?;
        Ok(Self::build(messages, &agents))
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }
}
