use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{Handler, HandlerId, Result, SenderFilter, SenderId, Signals, Topic};

pub(crate) struct Registration<P, S> {
    pub(crate) id: HandlerId,
    pub(crate) filter: SenderFilter,
    pub(crate) handler: Arc<dyn Handler<P, S>>,
}

impl<P, S> Clone for Registration<P, S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            filter: self.filter.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Topic registry view that does not depend on the handler types.
///
/// Lets a [`Client`](crate::Client) resolve "all known topics" at connect time.
pub(crate) trait KnownTopics: Send + Sync {
    fn known_topics(&self) -> Vec<Topic>;
}

/// Maps topics to the handlers registered for them.
///
/// Reads never block behind a running dispatch: each topic's handler list is
/// an immutable `Arc<Vec<_>>` that registration replaces wholesale, so
/// [`handlers_for`](Self::handlers_for) hands out a snapshot and releases
/// the lock immediately.
///
/// The registry is owned by a [`Hub`](crate::Hub); use the hub's
/// `register` / `unregister` methods to mutate it.
pub struct TopicRegistry<P, S = Signals> {
    entries: RwLock<HashMap<Topic, Arc<Vec<Registration<P, S>>>>>,
    next_id: AtomicU64,
}

impl<P, S> TopicRegistry<P, S> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a handler to `topic`.
    ///
    /// Registering the same handler twice is allowed; both registrations fire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTopic`](crate::Error::InvalidTopic) for an
    /// unusable topic name and
    /// [`Error::EmptySenderFilter`](crate::Error::EmptySenderFilter) for a
    /// filter that can never match.
    pub fn register(
        &self,
        topic: Topic,
        filter: SenderFilter,
        handler: Arc<dyn Handler<P, S>>,
    ) -> Result<HandlerId> {
        topic.validate()?;
        filter.validate(&topic)?;

        let id = HandlerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Registration {
            id,
            filter,
            handler,
        };

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let slot = entries.entry(topic).or_default();
        let mut list = Vec::with_capacity(slot.len() + 1);
        list.extend(slot.iter().cloned());
        list.push(registration);
        *slot = Arc::new(list);
        Ok(id)
    }

    /// Remove one registration. Returns `false` when it was not registered.
    ///
    /// A topic whose last handler is removed is forgotten.
    pub fn unregister(&self, topic: &Topic, id: HandlerId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = entries.get_mut(topic) else {
            return false;
        };
        if !slot.iter().any(|r| r.id == id) {
            return false;
        }
        let remaining: Vec<_> = slot.iter().filter(|r| r.id != id).cloned().collect();
        if remaining.is_empty() {
            entries.remove(topic);
        } else {
            *slot = Arc::new(remaining);
        }
        true
    }

    /// Handlers of `topic` whose sender filter matches `sender`, in
    /// registration order.
    pub fn handlers_for(&self, topic: &Topic, sender: &SenderId) -> Vec<Arc<dyn Handler<P, S>>> {
        let Some(snapshot) = self.snapshot_of(topic) else {
            return Vec::new();
        };
        snapshot
            .iter()
            .filter(|r| r.filter.matches(sender))
            .map(|r| r.handler.clone())
            .collect()
    }

    /// Known topics, sorted by name.
    pub fn topics(&self) -> Vec<Topic> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut topics: Vec<Topic> = entries.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Total number of registrations across all topics.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(|list| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every topic with its registrations, sorted by topic.
    pub(crate) fn snapshot(&self) -> Vec<(Topic, Arc<Vec<Registration<P, S>>>)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<_> = entries
            .iter()
            .map(|(topic, list)| (topic.clone(), list.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    fn snapshot_of(&self, topic: &Topic) -> Option<Arc<Vec<Registration<P, S>>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(topic).cloned()
    }
}

impl<P, S> Default for TopicRegistry<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static, S: 'static> KnownTopics for TopicRegistry<P, S> {
    fn known_topics(&self) -> Vec<Topic> {
        self.topics()
    }
}

impl<P, S> fmt::Debug for TopicRegistry<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("topics", &self.topics())
            .field("len", &self.len())
            .finish()
    }
}
