//! REST client for the agent chat API.
//!
//! Typed wrappers for the agent, conversation and message collections, a keyed
//! read cache that is invalidated after every mutation, and an in-memory store
//! with the same semantics for tests and offline use.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_chat_client::{AgentChatClient, CachedStore, ChatStore, NewConversation};
//!
//! let client = AgentChatClient::new("http://localhost:5000")?;
//! let store = CachedStore::new(client);
//!
//! let conversation = store.create_conversation(NewConversation::new("Planning")).await?;
//! let messages = store.list_messages(&conversation.id).await?;
//! ```

pub mod cache;
pub mod error;
pub mod form;
pub mod memory;
pub mod store;
pub mod types;

pub use cache::{CacheKey, CachePolicy, CachedStore};
pub use error::{ApiError, Result};
pub use form::{AgentForm, FormError, AGENT_COLORS};
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use store::ChatStore;
pub use types::{Agent, ChatMessage, Conversation, NewAgent, NewConversation, NewMessage};

use async_trait::async_trait;
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP implementation of [`ChatStore`].
#[derive(Clone)]
pub struct AgentChatClient {
    client: reqwest::Client,
    base_url: Url,
}

impl AgentChatClient {
    /// Create a client for the API served under `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// Rebuild the underlying HTTP client with a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/{segments...}` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("base URL cannot carry a path: {}", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let resp = Self::check(resp).await?;
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        Self::decode(resp).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "POST");
        let resp = self.client.post(url).json(body).send().await?;
        Self::decode(resp).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<()> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%url, "DELETE");
        let resp = self.client.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for AgentChatClient {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.get(&["agents"]).await
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent> {
        let created: Agent = self.post(&["agents"], &agent).await?;
        tracing::info!(agent_id = %created.id, name = %created.name, "Agent created");
        Ok(created)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.delete(&["agents", agent_id]).await?;
        tracing::info!(agent_id, "Agent deleted");
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.get(&["conversations"]).await
    }

    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        let created: Conversation = self.post(&["conversations"], &conversation).await?;
        tracing::info!(conversation_id = %created.id, title = %created.title, "Conversation created");
        Ok(created)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.get(&["conversations", conversation_id, "messages"])
            .await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage> {
        self.post(&["conversations", conversation_id, "messages"], &message)
            .await
    }

    async fn clear_messages(&self, conversation_id: &str) -> Result<()> {
        self.delete(&["conversations", conversation_id, "messages"])
            .await?;
        tracing::info!(conversation_id, "Conversation messages cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments_under_api() {
        let client = AgentChatClient::new("http://localhost:5000").unwrap();
        let url = client.endpoint(&["conversations", "c1", "messages"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/conversations/c1/messages");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client = AgentChatClient::new("http://example.com/chat/").unwrap();
        let url = client.endpoint(&["agents"]).unwrap();
        assert_eq!(url.as_str(), "http://example.com/chat/api/agents");
    }

    #[test]
    fn test_endpoint_percent_encodes_ids() {
        let client = AgentChatClient::new("http://localhost:5000").unwrap();
        let url = client.endpoint(&["agents", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/agents/a%2Fb%20c");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = AgentChatClient::new("not a url");
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
