//! Conversation-interaction core for multi-agent chat.
//!
//! A [`ChatSession`] owns the transient state of one chat session (the open
//! conversation, the addressed agent, the typing flag), sequences message
//! sends and simulated agent replies, and talks to the backing store through
//! the [`ChatStore`] contract from `agent-chat-client`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use agent_chat::{ChatSession, MockResponder, SessionConfig};
//! use agent_chat_client::{AgentChatClient, CachedStore, ChatStore};
//!
//! let store = CachedStore::new(AgentChatClient::new("http://localhost:5000")?);
//! let session = ChatSession::open(store, MockResponder::new(), SessionConfig::default()).await;
//!
//! let agents = session.store().list_agents().await?;
//! session.adopt_default_agent(&agents);
//!
//! if let Some(reply) = session.send_user_message("fix this bug").await?.into_reply() {
//!     let message = reply.wait().await?;
//! }
//! ```
//!
//! # Modules
//!
//! - [`coordinator`] - The session coordinator and reply scheduling
//! - [`session`] - State snapshots and session events
//! - [`responder`] - Reply generation seam and the canned-reply backend
//! - [`delay`] - Simulated typing latency
//! - [`transcript`] - Ordered, author-resolved conversation view
//! - [`config`] - Session and environment configuration

pub mod config;
pub mod coordinator;
pub mod delay;
pub mod error;
pub mod responder;
pub mod session;
pub mod transcript;

pub use agent_chat_client::{Agent, ChatMessage, ChatStore, Conversation};
pub use config::{ChatConfig, SessionConfig, DEFAULT_CONVERSATION_TITLE};
pub use coordinator::{ChatSession, ReplyHandle, SendOutcome, SkipReason};
pub use delay::ReplyDelay;
pub use error::{ChatError, Result};
pub use responder::{MockResponder, Responder, ResponderError, FALLBACK_POOL};
pub use session::{ChatEvent, SessionSnapshot};
pub use transcript::{Author, Transcript, TranscriptEntry};
