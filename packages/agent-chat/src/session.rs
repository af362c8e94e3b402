//! Session state and change notification.

use agent_chat_client::{Agent, ChatMessage};
use serde::Serialize;

/// What consumers render: the open conversation, the addressed agent and
/// whether that agent is composing a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub current_conversation_id: Option<String>,
    pub current_agent: Option<Agent>,
    pub is_typing: bool,
}

/// Mutable session state, owned by the session and guarded by its lock.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) current_conversation_id: Option<String>,
    pub(crate) current_agent: Option<Agent>,
    /// Replies scheduled but not yet persisted, failed or cancelled.
    pub(crate) pending_replies: usize,
}

impl SessionState {
    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_conversation_id: self.current_conversation_id.clone(),
            current_agent: self.current_agent.clone(),
            is_typing: self.pending_replies > 0,
        }
    }
}

/// Things that happened in a session, in the order they happened.
///
/// Failures are published here as well as returned, so presentation code can
/// surface them (toasts, banners) without owning the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    ConversationOpened {
        conversation_id: String,
    },
    ConversationClosed,
    ConversationCreateFailed {
        error: String,
    },
    AgentSelected {
        agent_id: String,
    },
    MessagePersisted {
        conversation_id: String,
        message: ChatMessage,
    },
    SendFailed {
        conversation_id: String,
        error: String,
    },
    ReplyFailed {
        conversation_id: String,
        agent_id: String,
        error: String,
    },
    ReplyCancelled {
        conversation_id: String,
        agent_id: String,
    },
    ConversationCleared {
        conversation_id: String,
    },
    ClearFailed {
        conversation_id: String,
        error: String,
    },
}

impl ChatEvent {
    /// True for events that report a rejected operation.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ChatEvent::ConversationCreateFailed { .. }
                | ChatEvent::SendFailed { .. }
                | ChatEvent::ReplyFailed { .. }
                | ChatEvent::ClearFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_follows_pending_replies() {
        let mut state = SessionState::default();
        assert!(!state.snapshot().is_typing);

        state.pending_replies = 2;
        assert!(state.snapshot().is_typing);
    }

    #[test]
    fn test_failure_events_are_flagged() {
        let failed = ChatEvent::ClearFailed {
            conversation_id: "c1".into(),
            error: "API error (503)".into(),
        };
        let cleared = ChatEvent::ConversationCleared {
            conversation_id: "c1".into(),
        };

        assert!(failed.is_failure());
        assert!(!cleared.is_failure());
    }
}
