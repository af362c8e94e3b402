//! Keyed read cache in front of any [`ChatStore`].
//!
//! Reads are served from the cache when possible. Mutations always go to the
//! wrapped store and, once they succeed, invalidate exactly the lists they can
//! make stale. Cached lists are never patched in place: the next read after an
//! invalidation refetches from the source of truth.
//!
//! Every key carries a generation counter that invalidation bumps, and the
//! whole cache carries an epoch that [`CachedStore::invalidate_all`] bumps. A
//! read only fills the cache if the stamp it observed before fetching is still
//! current, so a fetch that raced a mutation cannot resurrect stale data.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::store::ChatStore;
use crate::types::{Agent, ChatMessage, Conversation, NewAgent, NewConversation, NewMessage};

const INVALIDATION_CAPACITY: usize = 64;

/// Identity of one cached list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Agents,
    Conversations,
    /// Messages of one conversation.
    Messages(String),
}

/// When reads consult the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Serve cached lists; fetch and fill on a miss.
    #[default]
    FetchOnMiss,
    /// Always fetch and never fill. Invalidation notices are still published.
    AlwaysFetch,
}

#[derive(Debug, Clone)]
enum Entry {
    Agents(Vec<Agent>),
    Conversations(Vec<Conversation>),
    Messages(Vec<ChatMessage>),
}

impl Entry {
    fn agents(&self) -> Option<&Vec<Agent>> {
        match self {
            Entry::Agents(agents) => Some(agents),
            _ => None,
        }
    }

    fn conversations(&self) -> Option<&Vec<Conversation>> {
        match self {
            Entry::Conversations(conversations) => Some(conversations),
            _ => None,
        }
    }

    fn messages(&self) -> Option<&Vec<ChatMessage>> {
        match self {
            Entry::Messages(messages) => Some(messages),
            _ => None,
        }
    }
}

/// Epoch and per-key generation seen before a fetch.
type Stamp = (u64, u64);

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    generations: HashMap<CacheKey, u64>,
    epoch: u64,
}

impl CacheState {
    fn stamp(&self, key: &CacheKey) -> Stamp {
        let generation = self.generations.get(key).copied().unwrap_or_default();
        (self.epoch, generation)
    }
}

/// A [`ChatStore`] wrapper with keyed invalidation.
pub struct CachedStore<S: ChatStore> {
    inner: S,
    policy: CachePolicy,
    state: RwLock<CacheState>,
    invalidations: broadcast::Sender<CacheKey>,
}

impl<S: ChatStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, CachePolicy::default())
    }

    pub fn with_policy(inner: S, policy: CachePolicy) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            inner,
            policy,
            state: RwLock::new(CacheState::default()),
            invalidations,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Receive every key invalidated from now on.
    ///
    /// Consumers holding a rendered list refetch when its key arrives.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.invalidations.subscribe()
    }

    /// Whether a list is currently cached.
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.read_state().entries.contains_key(key)
    }

    /// Drop one cached list and notify subscribers.
    pub fn invalidate(&self, key: &CacheKey) {
        {
            let mut state = self.write_state();
            state.entries.remove(key);
            *state.generations.entry(key.clone()).or_default() += 1;
        }
        tracing::debug!(?key, "Cache invalidated");
        // No receivers is fine
        let _ = self.invalidations.send(key.clone());
    }

    /// Drop every cached list, including ones whose fetch is still in flight.
    pub fn invalidate_all(&self) {
        let keys: Vec<CacheKey> = {
            let mut state = self.write_state();
            state.epoch += 1;
            state.entries.drain().map(|(key, _)| key).collect()
        };
        tracing::debug!(count = keys.len(), "Cache cleared");
        for key in keys {
            let _ = self.invalidations.send(key);
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn stamp(&self, key: &CacheKey) -> Stamp {
        self.read_state().stamp(key)
    }

    fn lookup<T: Clone>(
        &self,
        key: &CacheKey,
        extract: fn(&Entry) -> Option<&Vec<T>>,
    ) -> Option<Vec<T>> {
        self.read_state()
            .entries
            .get(key)
            .and_then(extract)
            .cloned()
    }

    fn fill(&self, key: CacheKey, observed: Stamp, entry: Entry) {
        let mut state = self.write_state();
        if state.stamp(&key) != observed {
            tracing::debug!(?key, "Discarding fetch that raced an invalidation");
            return;
        }
        state.entries.insert(key, entry);
    }

    async fn read_through<T, F>(
        &self,
        key: CacheKey,
        fetch: F,
        extract: fn(&Entry) -> Option<&Vec<T>>,
        wrap: fn(Vec<T>) -> Entry,
    ) -> Result<Vec<T>>
    where
        T: Clone + Send,
        F: Future<Output = Result<Vec<T>>> + Send,
    {
        if self.policy == CachePolicy::AlwaysFetch {
            return fetch.await;
        }

        if let Some(hit) = self.lookup(&key, extract) {
            tracing::debug!(?key, "Cache hit");
            return Ok(hit);
        }

        let observed = self.stamp(&key);
        let fresh = fetch.await?;
        self.fill(key, observed, wrap(fresh.clone()));
        Ok(fresh)
    }
}

#[async_trait]
impl<S: ChatStore> ChatStore for CachedStore<S> {
    async fn list_agents(&self) -> Result<Vec<Agent>> {
        self.read_through(
            CacheKey::Agents,
            self.inner.list_agents(),
            Entry::agents,
            Entry::Agents,
        )
        .await
    }

    async fn create_agent(&self, agent: NewAgent) -> Result<Agent> {
        let created = self.inner.create_agent(agent).await?;
        self.invalidate(&CacheKey::Agents);
        Ok(created)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.inner.delete_agent(agent_id).await?;
        self.invalidate(&CacheKey::Agents);
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.read_through(
            CacheKey::Conversations,
            self.inner.list_conversations(),
            Entry::conversations,
            Entry::Conversations,
        )
        .await
    }

    async fn create_conversation(&self, conversation: NewConversation) -> Result<Conversation> {
        let created = self.inner.create_conversation(conversation).await?;
        self.invalidate(&CacheKey::Conversations);
        Ok(created)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.read_through(
            CacheKey::Messages(conversation_id.to_string()),
            self.inner.list_messages(conversation_id),
            Entry::messages,
            Entry::Messages,
        )
        .await
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<ChatMessage> {
        let created = self.inner.send_message(conversation_id, message).await?;
        self.invalidate(&CacheKey::Messages(conversation_id.to_string()));
        Ok(created)
    }

    async fn clear_messages(&self, conversation_id: &str) -> Result<()> {
        self.inner.clear_messages(conversation_id).await?;
        self.invalidate(&CacheKey::Messages(conversation_id.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryStore, StoreOp};
    use std::time::Duration;

    fn count(store: &CachedStore<MemoryStore>, op: StoreOp) -> usize {
        store
            .inner()
            .calls()
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let store = CachedStore::new(MemoryStore::with_default_agents());

        let first = store.list_agents().await.unwrap();
        let second = store.list_agents().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(count(&store, StoreOp::ListAgents), 1);
        assert!(store.is_cached(&CacheKey::Agents));
    }

    #[tokio::test]
    async fn test_create_agent_invalidates_agent_list_only() {
        let store = CachedStore::new(MemoryStore::with_default_agents());
        let conversation = store
            .create_conversation(NewConversation::new("c"))
            .await
            .unwrap();
        store.list_agents().await.unwrap();
        store.list_conversations().await.unwrap();
        store.list_messages(&conversation.id).await.unwrap();

        let new_agent = NewAgent {
            name: "Analyst".into(),
            role: "Data".into(),
            description: "Numbers".into(),
            color: "red".into(),
            avatar: "A".into(),
        };
        store.create_agent(new_agent).await.unwrap();

        assert!(!store.is_cached(&CacheKey::Agents));
        assert!(store.is_cached(&CacheKey::Conversations));
        assert!(store.is_cached(&CacheKey::Messages(conversation.id.clone())));

        let agents = store.list_agents().await.unwrap();
        assert_eq!(agents.len(), 4);
        assert_eq!(count(&store, StoreOp::ListAgents), 2);
    }

    #[tokio::test]
    async fn test_send_message_invalidates_only_that_conversation() {
        let store = CachedStore::new(MemoryStore::new());
        let a = store.create_conversation(NewConversation::new("a")).await.unwrap();
        let b = store.create_conversation(NewConversation::new("b")).await.unwrap();
        store.list_messages(&a.id).await.unwrap();
        store.list_messages(&b.id).await.unwrap();
        store.list_conversations().await.unwrap();

        store
            .send_message(&a.id, NewMessage::user("hello"))
            .await
            .unwrap();

        assert!(!store.is_cached(&CacheKey::Messages(a.id.clone())));
        assert!(store.is_cached(&CacheKey::Messages(b.id.clone())));
        assert!(store.is_cached(&CacheKey::Conversations));
        assert_eq!(store.list_messages(&a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let store = CachedStore::new(MemoryStore::new());
        let c = store.create_conversation(NewConversation::new("c")).await.unwrap();
        store.list_messages(&c.id).await.unwrap();

        store.inner().fail_on(StoreOp::ClearMessages);
        assert!(store.clear_messages(&c.id).await.is_err());
        assert!(store.is_cached(&CacheKey::Messages(c.id.clone())));
    }

    #[tokio::test]
    async fn test_invalidation_is_broadcast() {
        let store = CachedStore::new(MemoryStore::new());
        let mut rx = store.subscribe();

        let c = store.create_conversation(NewConversation::new("c")).await.unwrap();
        store.clear_messages(&c.id).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), CacheKey::Conversations);
        assert_eq!(rx.recv().await.unwrap(), CacheKey::Messages(c.id));
    }

    #[tokio::test]
    async fn test_always_fetch_never_fills() {
        let store = CachedStore::with_policy(MemoryStore::with_default_agents(), CachePolicy::AlwaysFetch);

        store.list_agents().await.unwrap();
        store.list_agents().await.unwrap();

        assert!(!store.is_cached(&CacheKey::Agents));
        assert_eq!(count(&store, StoreOp::ListAgents), 2);
    }

    #[tokio::test]
    async fn test_fetch_racing_invalidation_is_not_cached() {
        let store = CachedStore::new(MemoryStore::with_default_agents());
        let observed = store.stamp(&CacheKey::Agents);

        store.invalidate(&CacheKey::Agents);
        store.fill(CacheKey::Agents, observed, Entry::Agents(vec![]));

        assert!(!store.is_cached(&CacheKey::Agents));
    }

    #[tokio::test]
    async fn test_invalidate_all_stales_keys_that_were_never_cached() {
        let store = CachedStore::new(MemoryStore::with_default_agents());
        assert!(!store.is_cached(&CacheKey::Agents));
        let observed = store.stamp(&CacheKey::Agents);

        store.invalidate_all();
        store.fill(CacheKey::Agents, observed, Entry::Agents(vec![]));

        assert!(!store.is_cached(&CacheKey::Agents));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_all_discards_in_flight_fetch() {
        let store = CachedStore::new(
            MemoryStore::with_default_agents().with_latency(Duration::from_millis(100)),
        );

        let (agents, ()) = tokio::join!(store.list_agents(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            store.invalidate_all();
        });

        assert_eq!(agents.unwrap().len(), 3);
        assert!(!store.is_cached(&CacheKey::Agents));

        store.list_agents().await.unwrap();
        assert!(store.is_cached(&CacheKey::Agents));
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_and_notifies_cached_keys() {
        let store = CachedStore::new(MemoryStore::with_default_agents());
        store.list_agents().await.unwrap();
        store.list_conversations().await.unwrap();
        let mut rx = store.subscribe();

        store.invalidate_all();

        assert!(!store.is_cached(&CacheKey::Agents));
        assert!(!store.is_cached(&CacheKey::Conversations));
        let mut notified = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        notified.sort_by_key(|key| format!("{key:?}"));
        assert_eq!(notified, vec![CacheKey::Agents, CacheKey::Conversations]);
    }
}
