use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::delay::ReplyDelay;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Library-side settings for a [`ChatSession`](crate::ChatSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Title given to automatically created conversations
    pub default_title: String,
    pub reply_delay: ReplyDelay,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_CONVERSATION_TITLE.to_string(),
            reply_delay: ReplyDelay::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_reply_delay(mut self, reply_delay: ReplyDelay) -> Self {
        self.reply_delay = reply_delay;
        self
    }

    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub session: SessionConfig,
}

impl ChatConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let min_ms = env_millis("AGENT_CHAT_REPLY_DELAY_MIN_MS", ReplyDelay::DEFAULT_MIN)?;
        let max_ms = env_millis("AGENT_CHAT_REPLY_DELAY_MAX_MS", ReplyDelay::DEFAULT_MAX)?;
        let reply_delay = ReplyDelay::new(min_ms, max_ms)
            .context("AGENT_CHAT_REPLY_DELAY_MIN_MS must not exceed AGENT_CHAT_REPLY_DELAY_MAX_MS")?;

        let request_timeout = env::var("AGENT_CHAT_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("AGENT_CHAT_REQUEST_TIMEOUT_SECS must be a valid number")?;

        Ok(Self {
            api_url: env::var("AGENT_CHAT_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            request_timeout,
            session: SessionConfig {
                default_title: env::var("AGENT_CHAT_DEFAULT_TITLE")
                    .unwrap_or_else(|_| DEFAULT_CONVERSATION_TITLE.to_string()),
                reply_delay,
            },
        })
    }
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Duration::from_millis)
            .with_context(|| format!("{key} must be a valid number of milliseconds")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.default_title, "New Conversation");
        assert_eq!(config.reply_delay.min(), Duration::from_millis(1000));
        assert_eq!(config.reply_delay.max(), Duration::from_millis(3000));
    }

    #[test]
    fn test_env_millis_parses_and_rejects() {
        // Keys are unique to this test so parallel tests don't interfere
        env::set_var("AGENT_CHAT_TEST_DELAY_OK", " 1500 ");
        env::set_var("AGENT_CHAT_TEST_DELAY_BAD", "soon");

        assert_eq!(
            env_millis("AGENT_CHAT_TEST_DELAY_OK", Duration::ZERO).unwrap(),
            Duration::from_millis(1500)
        );
        assert!(env_millis("AGENT_CHAT_TEST_DELAY_BAD", Duration::ZERO).is_err());
        assert_eq!(
            env_millis("AGENT_CHAT_TEST_DELAY_UNSET", Duration::from_secs(1)).unwrap(),
            Duration::from_secs(1)
        );
    }
}
