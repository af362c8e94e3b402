//! The conversation-interaction core.
//!
//! [`ChatSession`] owns which conversation is open, which agent is addressed
//! and whether a reply is being composed. It sequences every user turn:
//!
//! 1. persist the user message,
//! 2. mark the session as typing,
//! 3. wait a randomized delay on a background task,
//! 4. ask the [`Responder`] for a reply as the agent addressed at send time,
//! 5. persist the reply and clear typing.
//!
//! The delay never blocks other intents. Selecting another agent, switching
//! conversation or clearing while a reply is pending does not affect that
//! reply: it keeps the conversation id and agent captured when it was sent.

use agent_chat_client::{Agent, ChatMessage, ChatStore, Conversation, NewConversation, NewMessage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::error::{ChatError, Result};
use crate::responder::Responder;
use crate::session::{ChatEvent, SessionSnapshot, SessionState};

const EVENT_CAPACITY: usize = 256;

/// Why a send did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoConversation,
    NoAgent,
    EmptyMessage,
}

/// Result of [`ChatSession::send_user_message`].
#[derive(Debug)]
pub enum SendOutcome {
    /// The user message is persisted and a reply is scheduled.
    Sent {
        user_message: ChatMessage,
        reply: ReplyHandle,
    },
    /// Preconditions were not met; nothing was persisted.
    Skipped(SkipReason),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent { .. })
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            SendOutcome::Skipped(reason) => Some(*reason),
            SendOutcome::Sent { .. } => None,
        }
    }

    pub fn into_reply(self) -> Option<ReplyHandle> {
        match self {
            SendOutcome::Sent { reply, .. } => Some(reply),
            SendOutcome::Skipped(_) => None,
        }
    }
}

/// A scheduled agent reply.
///
/// Dropping the handle does not cancel the reply.
#[derive(Debug)]
pub struct ReplyHandle {
    task: JoinHandle<Result<Option<ChatMessage>>>,
    cancel: CancellationToken,
}

impl ReplyHandle {
    /// Stop the reply if it is still waiting out its delay. A reply already
    /// being persisted is not interrupted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the reply. `Ok(None)` means it was cancelled.
    pub async fn wait(self) -> Result<Option<ChatMessage>> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(ChatError::Task(err.to_string())),
        }
    }
}

struct Inner<S, R> {
    store: S,
    responder: R,
    config: SessionConfig,
    state: Mutex<SessionState>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<ChatEvent>,
    /// Held while a conversation is being created.
    creating: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

/// Stateful coordinator for one chat session.
///
/// The session never opens a conversation on its own initiative. After
/// [`close_conversation`](Self::close_conversation), or after
/// [`open`](Self::open) failed to create one, no conversation is current until
/// the caller runs [`ensure_conversation`](Self::ensure_conversation) again;
/// sends in between are skipped with [`SkipReason::NoConversation`].
///
/// Cheap to clone; clones share the same session.
pub struct ChatSession<S, R> {
    inner: Arc<Inner<S, R>>,
}

impl<S, R> Clone for ChatSession<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, R> ChatSession<S, R>
where
    S: ChatStore + 'static,
    R: Responder + 'static,
{
    /// Create a session with no conversation open and no agent selected.
    pub fn new(store: S, responder: R, config: SessionConfig) -> Self {
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                store,
                responder,
                config,
                state: Mutex::new(SessionState::default()),
                snapshots,
                events,
                creating: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Create a session and open a conversation right away.
    ///
    /// A failed creation is logged, not returned: the session starts without
    /// a conversation and the next [`ensure_conversation`](Self::ensure_conversation)
    /// retries.
    pub async fn open(store: S, responder: R, config: SessionConfig) -> Self {
        let session = Self::new(store, responder, config);
        if let Err(error) = session.ensure_conversation().await {
            tracing::warn!(%error, "Session opened without a conversation");
        }
        session
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock_state().snapshot()
    }

    pub fn current_conversation_id(&self) -> Option<String> {
        self.lock_state().current_conversation_id.clone()
    }

    pub fn current_agent(&self) -> Option<Agent> {
        self.lock_state().current_agent.clone()
    }

    pub fn is_typing(&self) -> bool {
        self.lock_state().pending_replies > 0
    }

    /// Watch the session state. The receiver always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Receive every [`ChatEvent`] published from now on.
    pub fn events(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Make sure a conversation is open, creating one if needed.
    ///
    /// Single-flight: concurrent callers queue on the creation guard and
    /// re-check after acquiring it, so only the first one creates.
    pub async fn ensure_conversation(&self) -> Result<String> {
        if let Some(id) = self.current_conversation_id() {
            return Ok(id);
        }

        let _creating = self.inner.creating.lock().await;
        if let Some(id) = self.current_conversation_id() {
            tracing::debug!(conversation_id = %id, "Conversation created by a concurrent caller");
            return Ok(id);
        }

        let title = self.inner.config.default_title.clone();
        let conversation = self.create_and_open(&title).await?;
        Ok(conversation.id)
    }

    /// Create a new conversation and make it current, even if one is open.
    pub async fn start_new_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let _creating = self.inner.creating.lock().await;
        let title = title.unwrap_or(&self.inner.config.default_title).to_string();
        self.create_and_open(&title).await
    }

    /// Switch to an existing conversation.
    pub fn open_conversation(&self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        self.update(|state| state.current_conversation_id = Some(conversation_id.clone()));
        tracing::info!(conversation_id = %conversation_id, "Conversation opened");
        self.emit(ChatEvent::ConversationOpened { conversation_id });
    }

    /// Leave the current conversation. The next
    /// [`ensure_conversation`](Self::ensure_conversation) creates a fresh one.
    pub fn close_conversation(&self) {
        self.update(|state| state.current_conversation_id = None);
        self.emit(ChatEvent::ConversationClosed);
    }

    /// Address subsequent messages to `agent`.
    ///
    /// The agent is not checked against the agent collection; callers only
    /// offer agents they know about.
    pub fn select_agent(&self, agent: Agent) {
        let agent_id = agent.id.clone();
        self.update(|state| state.current_agent = Some(agent));
        tracing::debug!(agent_id = %agent_id, "Agent selected");
        self.emit(ChatEvent::AgentSelected { agent_id });
    }

    /// Select the first of `agents` if no agent is selected yet.
    ///
    /// Returns whether a selection was made.
    pub fn adopt_default_agent(&self, agents: &[Agent]) -> bool {
        let Some(first) = agents.first() else {
            return false;
        };

        let adopted = {
            let mut state = self.lock_state();
            if state.current_agent.is_some() {
                false
            } else {
                state.current_agent = Some(first.clone());
                self.inner.snapshots.send_replace(state.snapshot());
                true
            }
        };

        if adopted {
            self.emit(ChatEvent::AgentSelected {
                agent_id: first.id.clone(),
            });
        }
        adopted
    }

    /// Send `text` as the user and schedule the current agent's reply.
    ///
    /// Without an open conversation, without a selected agent, or with blank
    /// text this persists nothing and returns [`SendOutcome::Skipped`].
    /// A failure to persist the user message is returned. Failures after that
    /// point surface through [`ReplyHandle::wait`] and [`ChatEvent::ReplyFailed`].
    pub async fn send_user_message(&self, text: &str) -> Result<SendOutcome> {
        let content = text.trim();

        let (conversation_id, agent) = {
            let state = self.lock_state();
            match (&state.current_conversation_id, &state.current_agent) {
                (None, _) => return Ok(self.skip(SkipReason::NoConversation)),
                (_, None) => return Ok(self.skip(SkipReason::NoAgent)),
                _ if content.is_empty() => return Ok(self.skip(SkipReason::EmptyMessage)),
                (Some(conversation_id), Some(agent)) => (conversation_id.clone(), agent.clone()),
            }
        };

        let user_message = match self
            .inner
            .store
            .send_message(&conversation_id, NewMessage::user(content))
            .await
        {
            Ok(message) => message,
            Err(error) => {
                tracing::error!(conversation_id = %conversation_id, %error, "Failed to send message");
                self.emit(ChatEvent::SendFailed {
                    conversation_id,
                    error: error.to_string(),
                });
                return Err(error.into());
            }
        };
        self.emit(ChatEvent::MessagePersisted {
            conversation_id: conversation_id.clone(),
            message: user_message.clone(),
        });

        let pending = PendingReply::new(Arc::clone(&self.inner));

        let delay = self
            .inner
            .config
            .reply_delay
            .sample(&mut rand::thread_rng());
        let cancel = self.inner.shutdown.child_token();
        tracing::debug!(
            conversation_id = %conversation_id,
            agent_id = %agent.id,
            ?delay,
            "Agent reply scheduled"
        );

        let task = tokio::spawn(Arc::clone(&self.inner).deliver_reply(
            pending,
            conversation_id,
            agent,
            content.to_string(),
            delay,
            cancel.clone(),
        ));

        Ok(SendOutcome::Sent {
            user_message,
            reply: ReplyHandle { task, cancel },
        })
    }

    /// Delete every message of the open conversation.
    ///
    /// Returns `Ok(false)` without a conversation. Session state is unchanged
    /// either way.
    pub async fn clear_current_conversation(&self) -> Result<bool> {
        let Some(conversation_id) = self.current_conversation_id() else {
            return Ok(false);
        };

        match self.inner.store.clear_messages(&conversation_id).await {
            Ok(()) => {
                tracing::info!(conversation_id = %conversation_id, "Conversation cleared");
                self.emit(ChatEvent::ConversationCleared { conversation_id });
                Ok(true)
            }
            Err(error) => {
                tracing::error!(conversation_id = %conversation_id, %error, "Failed to clear messages");
                self.emit(ChatEvent::ClearFailed {
                    conversation_id,
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    /// Cancel every pending reply, including ones scheduled later.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    async fn create_and_open(&self, title: &str) -> Result<Conversation> {
        match self
            .inner
            .store
            .create_conversation(NewConversation::new(title))
            .await
        {
            Ok(conversation) => {
                self.open_conversation(conversation.id.clone());
                Ok(conversation)
            }
            Err(error) => {
                tracing::error!(%error, "Failed to create conversation");
                self.emit(ChatEvent::ConversationCreateFailed {
                    error: error.to_string(),
                });
                Err(error.into())
            }
        }
    }

    fn skip(&self, reason: SkipReason) -> SendOutcome {
        tracing::debug!(?reason, "Message not sent");
        SendOutcome::Skipped(reason)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock_state()
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        self.inner.update(apply);
    }

    fn emit(&self, event: ChatEvent) {
        self.inner.emit(event);
    }
}

impl<S, R> Inner<S, R>
where
    S: ChatStore + 'static,
    R: Responder + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate state and publish the new snapshot under the same lock.
    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.lock_state();
        apply(&mut state);
        self.snapshots.send_replace(state.snapshot());
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn deliver_reply(
        self: Arc<Self>,
        pending: PendingReply<S, R>,
        conversation_id: String,
        agent: Agent,
        prompt: String,
        delay: Duration,
        cancel: CancellationToken,
    ) -> Result<Option<ChatMessage>> {
        tokio::select! {
            _ = cancel.cancelled() => {
                drop(pending);
                tracing::info!(conversation_id = %conversation_id, agent_id = %agent.id, "Agent reply cancelled");
                self.emit(ChatEvent::ReplyCancelled {
                    conversation_id,
                    agent_id: agent.id,
                });
                return Ok(None);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let result = self.compose_reply(&conversation_id, &agent, &prompt).await;
        drop(pending);

        match result {
            Ok(message) => {
                self.emit(ChatEvent::MessagePersisted {
                    conversation_id,
                    message: message.clone(),
                });
                Ok(Some(message))
            }
            Err(error) => {
                tracing::error!(
                    conversation_id = %conversation_id,
                    agent_id = %agent.id,
                    %error,
                    "Failed to deliver agent reply"
                );
                self.emit(ChatEvent::ReplyFailed {
                    conversation_id,
                    agent_id: agent.id,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn compose_reply(
        &self,
        conversation_id: &str,
        agent: &Agent,
        prompt: &str,
    ) -> Result<ChatMessage> {
        let reply = self.responder.respond(agent, prompt).await?;
        let message = self
            .store
            .send_message(conversation_id, NewMessage::agent(reply, agent.id.clone()))
            .await?;
        tracing::debug!(conversation_id, agent_id = %agent.id, message_id = %message.id, "Agent reply persisted");
        Ok(message)
    }
}

/// One outstanding reply. Typing lasts while any of these is alive.
///
/// Released on drop, so a reply task that is cancelled, fails, panics or is
/// never polled still clears typing exactly once.
struct PendingReply<S, R>
where
    S: ChatStore + 'static,
    R: Responder + 'static,
{
    inner: Arc<Inner<S, R>>,
}

impl<S, R> PendingReply<S, R>
where
    S: ChatStore + 'static,
    R: Responder + 'static,
{
    fn new(inner: Arc<Inner<S, R>>) -> Self {
        inner.update(|state| state.pending_replies += 1);
        Self { inner }
    }
}

impl<S, R> Drop for PendingReply<S, R>
where
    S: ChatStore + 'static,
    R: Responder + 'static,
{
    fn drop(&mut self) {
        self.inner
            .update(|state| state.pending_replies = state.pending_replies.saturating_sub(1));
    }
}
