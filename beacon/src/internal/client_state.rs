use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio_util::sync::CancellationToken;

use super::mailbox::{Mailbox, PushError};
use crate::{ClientId, ClientStatus, Error, Item, OverflowPolicy, SenderFilter, Topic};

/// Topics a client wants, independent of whether it is connected.
#[derive(Debug, Clone, Default)]
pub(crate) struct Plan {
    /// Subscribe to every topic known at connect time.
    pub(crate) all: bool,
    pub(crate) explicit: HashMap<Topic, SenderFilter>,
    pub(crate) muted: HashSet<Topic>,
}

impl Plan {
    /// Subscriptions to open on connect.
    pub(crate) fn resolve(&self, known: &[Topic]) -> HashMap<Topic, SenderFilter> {
        let mut resolved = HashMap::new();
        if self.all {
            for topic in known {
                resolved.insert(topic.clone(), SenderFilter::Any);
            }
        }
        for (topic, filter) in &self.explicit {
            resolved.insert(topic.clone(), filter.clone());
        }
        resolved.retain(|topic, _| !self.muted.contains(topic));
        resolved
    }

    /// The filter `topic` would be subscribed with, ignoring mutes.
    pub(crate) fn filter_for(&self, topic: &Topic, known: &[Topic]) -> Option<SenderFilter> {
        if let Some(filter) = self.explicit.get(topic) {
            return Some(filter.clone());
        }
        (self.all && known.contains(topic)).then_some(SenderFilter::Any)
    }
}

#[derive(Debug)]
pub(crate) enum PushOutcome {
    Delivered,
    /// Full queue under [`OverflowPolicy::Drop`].
    Dropped,
    /// Client is not connected; nothing was written.
    Inactive,
    /// Write failed; the client must be disconnected.
    Failed(Error),
}

struct Lifecycle {
    status: ClientStatus,
    token: CancellationToken,
}

/// Shared half of a client: what the router sees.
///
/// The owning [`Client`](crate::Client) holds the only strong reference
/// besides short-lived clones; the router keeps `Weak`s.
pub(crate) struct ClientState<P> {
    id: ClientId,
    overflow: OverflowPolicy,
    mailbox: Mailbox<P>,
    lifecycle: Mutex<Lifecycle>,
    plan: Mutex<Plan>,
    subscriptions: Mutex<HashMap<Topic, SenderFilter>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P> ClientState<P> {
    pub(crate) fn new(id: ClientId, overflow: OverflowPolicy, mailbox: Mailbox<P>, plan: Plan) -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            id,
            overflow,
            mailbox,
            lifecycle: Mutex::new(Lifecycle {
                status: ClientStatus::Created,
                token,
            }),
            plan: Mutex::new(plan),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> &ClientId {
        &self.id
    }

    pub(crate) fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    pub(crate) fn status(&self) -> ClientStatus {
        lock(&self.lifecycle).status
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Token cancelled when the current connection ends.
    pub(crate) fn token(&self) -> CancellationToken {
        lock(&self.lifecycle).token.clone()
    }

    /// Mark the client connected. Returns `false` if it already was.
    pub(crate) fn begin(&self, token: CancellationToken) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.status.is_connected() {
            return false;
        }
        lifecycle.status = ClientStatus::Connected;
        lifecycle.token = token;
        true
    }

    /// Mark the client disconnected. Returns `false` if it was not connected.
    pub(crate) fn end(&self) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if !lifecycle.status.is_connected() {
            return false;
        }
        lifecycle.status = ClientStatus::Disconnected;
        lifecycle.token.cancel();
        true
    }

    /// Write one item into the queue without waiting.
    ///
    /// The status check and the write happen under the same lock as
    /// [`end`](Self::end), so nothing lands in the queue after disconnect.
    pub(crate) fn push(&self, item: Item<P>) -> PushOutcome {
        let lifecycle = lock(&self.lifecycle);
        if !lifecycle.status.is_connected() {
            return PushOutcome::Inactive;
        }
        match self.mailbox.try_send(item) {
            Ok(()) => PushOutcome::Delivered,
            Err(PushError::Full) if self.overflow.is_drop() => PushOutcome::Dropped,
            Err(PushError::Full) => PushOutcome::Failed(Error::QueueFull(self.id.clone())),
            Err(PushError::Closed) => PushOutcome::Failed(Error::QueueClosed(self.id.clone())),
        }
    }

    pub(crate) fn with_plan<R>(&self, f: impl FnOnce(&mut Plan) -> R) -> R {
        f(&mut lock(&self.plan))
    }

    pub(crate) fn is_muted(&self, topic: &Topic) -> bool {
        lock(&self.plan).muted.contains(topic)
    }

    pub(crate) fn subscriptions(&self) -> HashMap<Topic, SenderFilter> {
        lock(&self.subscriptions).clone()
    }

    pub(crate) fn set_subscription(&self, topic: Topic, filter: SenderFilter) {
        lock(&self.subscriptions).insert(topic, filter);
    }

    pub(crate) fn remove_subscription(&self, topic: &Topic) -> bool {
        lock(&self.subscriptions).remove(topic).is_some()
    }

    pub(crate) fn take_subscriptions(&self) -> HashMap<Topic, SenderFilter> {
        std::mem::take(&mut *lock(&self.subscriptions))
    }
}
