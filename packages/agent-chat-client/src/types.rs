use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversational participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub color: String,
    pub avatar: String,
    /// Assigned by the server; never part of a creation request.
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /api/agents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub name: String,
    pub role: String,
    pub description: String,
    pub color: String,
    pub avatar: String,
}

/// A named container of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/conversations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConversation {
    pub title: String,
}

impl NewConversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    /// Author of an agent turn. Absent on user turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/conversations/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub content: String,
    pub is_user: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl NewMessage {
    /// A message authored by the human.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: true,
            agent_id: None,
        }
    }

    /// A message authored by the given agent.
    pub fn agent(content: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_user: false,
            agent_id: Some(agent_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format_uses_camel_case() {
        let json = r#"{
            "id": "m1",
            "content": "hello",
            "isUser": false,
            "agentId": "coder",
            "createdAt": "2024-05-01T12:30:00.000Z"
        }"#;

        let message: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(message.agent_id.as_deref(), Some("coder"));
        assert!(!message.is_user);
        assert_eq!(message.created_at.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn test_user_message_omits_agent_id() {
        let body = serde_json::to_value(NewMessage::user("hi")).unwrap();
        assert_eq!(body, serde_json::json!({"content": "hi", "isUser": true}));
    }

    #[test]
    fn test_agent_without_default_flag_deserializes() {
        let json = r##"{
            "id": "a1",
            "name": "Analyst",
            "role": "Data",
            "description": "Crunches numbers",
            "color": "#fff",
            "avatar": "A"
        }"##;

        let agent: Agent = serde_json::from_str(json).unwrap();
        assert!(!agent.is_default);
    }
}
