use std::{fmt, sync::Arc};

use crate::{BurstId, SenderId, Topic};

/// Default signal type passed to handlers: a JSON object.
pub type Signals = serde_json::Map<String, serde_json::Value>;

/// Everything a handler learns about the dispatch that invoked it.
///
/// Handlers receive the trigger by value. It is cheap to clone: the signals
/// are shared between all handlers of a burst.
pub struct Trigger<S = Signals> {
    burst_id: BurstId,
    topic: Topic,
    sender: SenderId,
    signals: Arc<S>,
}

impl<S> Trigger<S> {
    pub(crate) fn new(burst_id: BurstId, topic: Topic, sender: SenderId, signals: Arc<S>) -> Self {
        Self {
            burst_id,
            topic,
            sender,
            signals,
        }
    }

    /// The burst this invocation belongs to.
    #[inline]
    pub fn burst_id(&self) -> BurstId {
        self.burst_id
    }

    #[inline]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[inline]
    pub fn sender(&self) -> &SenderId {
        &self.sender
    }

    /// Signals supplied to the dispatch call.
    #[inline]
    pub fn signals(&self) -> &S {
        &self.signals
    }

    /// Shared handle to the signals, for moving into spawned work.
    pub fn shared_signals(&self) -> Arc<S> {
        self.signals.clone()
    }
}

impl<S> Clone for Trigger<S> {
    fn clone(&self) -> Self {
        Self {
            burst_id: self.burst_id,
            topic: self.topic.clone(),
            sender: self.sender.clone(),
            signals: self.signals.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Trigger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("burst_id", &self.burst_id)
            .field("topic", &self.topic)
            .field("sender", &self.sender)
            .field("signals", &self.signals)
            .finish()
    }
}
