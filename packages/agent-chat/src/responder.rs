//! Agent reply generation.
//!
//! The session only depends on the [`Responder`] trait. [`MockResponder`] is
//! the placeholder backend: it picks a canned reply from a pool keyed by the
//! responding agent's id.

use agent_chat_client::Agent;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Pool used when the responding agent has none of its own.
pub const FALLBACK_POOL: &str = "assistant";

#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("no reply available for agent {agent_id}")]
    NoReply { agent_id: String },

    #[error("responder backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Produces an agent's reply to a user message.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Reply as `agent` to `message`. Must return non-empty text on success.
    async fn respond(&self, agent: &Agent, message: &str) -> Result<String, ResponderError>;
}

/// Canned replies chosen uniformly at random.
pub struct MockResponder {
    pools: HashMap<String, Vec<String>>,
    fallback: String,
    rng: Mutex<StdRng>,
}

impl MockResponder {
    /// Responder with the built-in `assistant`, `researcher` and `coder` pools.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic selection, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let pools = default_pools()
            .into_iter()
            .map(|(id, replies)| {
                (
                    id.to_string(),
                    replies.iter().map(|r| r.to_string()).collect(),
                )
            })
            .collect();

        Self {
            pools,
            fallback: FALLBACK_POOL.to_string(),
            rng: Mutex::new(rng),
        }
    }

    /// Replace or add the pool for one agent id. Blank replies are dropped.
    pub fn with_pool<I, T>(mut self, agent_id: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let replies = replies
            .into_iter()
            .map(Into::into)
            .filter(|r: &String| !r.trim().is_empty())
            .collect();
        self.pools.insert(agent_id.into(), replies);
        self
    }

    /// Use another agent id's pool as the fallback.
    pub fn with_fallback(mut self, agent_id: impl Into<String>) -> Self {
        self.fallback = agent_id.into();
        self
    }

    /// Candidate replies for an agent id, after fallback.
    pub fn pool_for(&self, agent_id: &str) -> &[String] {
        self.pools
            .get(agent_id)
            .or_else(|| self.pools.get(&self.fallback))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, agent: &Agent, _message: &str) -> Result<String, ResponderError> {
        let pool = self.pool_for(&agent.id);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        pool.choose(&mut *rng)
            .cloned()
            .ok_or_else(|| ResponderError::NoReply {
                agent_id: agent.id.clone(),
            })
    }
}

fn default_pools() -> [(&'static str, [&'static str; 4]); 3] {
    [
        (
            "assistant",
            [
                "I'd be happy to help you with that! Could you provide more details about what you're looking for?",
                "That's an interesting question. Let me break this down for you.",
                "Based on what you've mentioned, here are a few approaches we could take.",
                "I understand your concern. Let's work through this step by step.",
            ],
        ),
        (
            "researcher",
            [
                "Let me research that for you. Based on current data and trends...",
                "I've analyzed similar cases, and here's what the research shows:",
                "According to recent studies and market analysis...",
                "My research indicates several key factors to consider:",
            ],
        ),
        (
            "coder",
            [
                "Here's how I would approach this from a technical perspective:",
                "Looking at the code structure, I'd recommend:",
                "From a development standpoint, consider these solutions:",
                "Let me walk you through the implementation details:",
            ],
        ),
    ]
}
