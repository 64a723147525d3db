use std::{
    collections::HashMap,
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use futures_util::{
    Stream, StreamExt, future,
    stream::{self, BoxStream},
};
use tokio::select;

use crate::{
    ClientId, ClientStatus, Item, Payload, Result, SenderFilter, Topic,
    internal::{ClientState, MailboxReceiver, PushOutcome, Router},
    registry::KnownTopics,
};

/// What a client stream yields.
///
/// Returned by [`Client::events`]. `Idle` marks a poll interval that passed
/// without an item; transports use it to send keep-alives.
#[derive(Debug)]
pub enum StreamEvent<P> {
    Item(Arc<P>),
    Idle,
}

impl<P> Clone for StreamEvent<P> {
    fn clone(&self) -> Self {
        match self {
            StreamEvent::Item(item) => StreamEvent::Item(item.clone()),
            StreamEvent::Idle => StreamEvent::Idle,
        }
    }
}

/// One long-lived consumer of routed items, typically backing one
/// streaming connection.
///
/// A client owns an inbound queue and a set of topic subscriptions. Build
/// one with [`Hub::client`](crate::Hub::client), then drain it with
/// [`stream`](Self::stream) or [`events`](Self::events).
///
/// # Lifecycle
///
/// - [`connect`](Self::connect) registers the client with the hub and opens
///   its subscriptions.
/// - [`disconnect`](Self::disconnect) removes it from every topic. Items
///   routed afterwards are silently discarded for this client.
/// - Dropping the client, or any stream borrowed from it, disconnects it.
///
/// Both `connect` and `disconnect` are idempotent.
///
/// # Example
///
/// ```rust,no_run
/// use futures_util::StreamExt;
/// use beacon::Hub;
///
/// # async fn run() -> beacon::Result {
/// let hub = Hub::<String>::default();
/// let mut client = hub.client().topic("chat").connect()?;
///
/// let mut stream = client.stream();
/// while let Some(item) = stream.next().await {
///     println!("{item}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client<P: Payload> {
    state: Arc<ClientState<P>>,
    receiver: MailboxReceiver<P>,
    router: Arc<Router<P>>,
    topics: Arc<dyn KnownTopics>,
    poll_interval: Duration,
}

impl<P: Payload> Client<P> {
    pub(crate) fn new(
        state: Arc<ClientState<P>>,
        receiver: MailboxReceiver<P>,
        router: Arc<Router<P>>,
        topics: Arc<dyn KnownTopics>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            state,
            receiver,
            router,
            topics,
            poll_interval,
        }
    }

    #[inline]
    pub fn id(&self) -> &ClientId {
        self.state.id()
    }

    pub fn status(&self) -> ClientStatus {
        self.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// The default poll interval of this client's streams.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Register with the hub and open the configured subscriptions.
    ///
    /// Does nothing when already connected. A client built with
    /// [`all_topics`](crate::ClientBuilder::all_topics) subscribes to the
    /// topics that have handlers at this moment. Muted topics are skipped.
    ///
    /// A disconnected client may connect again; items routed while it was
    /// away are not replayed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HubShutdown`](crate::Error::HubShutdown) after
    /// [`Hub::shutdown`](crate::Hub::shutdown).
    pub fn connect(&self) -> Result<()> {
        let known = self.known_topics();
        self.router.connect(&self.state, &known)?;
        Ok(())
    }

    /// Leave the hub. Returns `false` if the client was not connected.
    pub fn disconnect(&self) -> bool {
        self.router.disconnect(&self.state)
    }

    /// Subscribe to `topic`, or replace the sender filter of an existing
    /// subscription.
    ///
    /// Takes effect immediately when connected, and on every later
    /// connect. Subscribing to a muted topic unmutes it.
    ///
    /// # Errors
    ///
    /// Returns a registration error for an invalid topic or an empty
    /// sender set.
    pub fn subscribe(&self, topic: impl Into<Topic>, senders: impl Into<SenderFilter>) -> Result<()> {
        let topic = topic.into();
        let filter = senders.into();
        topic.validate()?;
        filter.validate(&topic)?;

        self.state.with_plan(|plan| {
            plan.muted.remove(&topic);
            plan.explicit.insert(topic.clone(), filter.clone());
        });
        self.router.subscribe(&self.state, &topic, &filter);
        Ok(())
    }

    /// Drop the subscription to `topic`. Returns `false` if there was none.
    ///
    /// A client built with `all_topics` picks the topic up again on its
    /// next connect; use [`mute`](Self::mute) to keep it out for good.
    pub fn unsubscribe(&self, topic: impl Into<Topic>) -> bool {
        let topic = topic.into();
        self.state.with_plan(|plan| plan.explicit.remove(&topic));
        self.router.unsubscribe(&self.state, &topic)
    }

    /// Stop receiving `topic` until [`unmute`](Self::unmute).
    ///
    /// Returns `true` if a live subscription was closed.
    pub fn mute(&self, topic: impl Into<Topic>) -> bool {
        let topic = topic.into();
        self.state.with_plan(|plan| plan.muted.insert(topic.clone()));
        self.router.unsubscribe(&self.state, &topic)
    }

    /// Lift a mute. The subscription comes back if the client would
    /// otherwise hold it.
    ///
    /// Returns `true` if a live subscription was reopened.
    pub fn unmute(&self, topic: impl Into<Topic>) -> bool {
        let topic = topic.into();
        let was_muted = self.state.with_plan(|plan| plan.muted.remove(&topic));
        if !was_muted || !self.is_connected() {
            return false;
        }
        let known = self.known_topics();
        match self.state.with_plan(|plan| plan.filter_for(&topic, &known)) {
            Some(filter) => self.router.subscribe(&self.state, &topic, &filter),
            None => false,
        }
    }

    /// Live subscriptions with their sender filters.
    pub fn subscriptions(&self) -> HashMap<Topic, SenderFilter> {
        self.state.subscriptions()
    }

    /// Muted topics, sorted.
    pub fn muted(&self) -> Vec<Topic> {
        let mut muted: Vec<Topic> = self
            .state
            .with_plan(|plan| plan.muted.iter().cloned().collect());
        muted.sort();
        muted
    }

    /// Put an item directly into this client's queue. Never waits.
    ///
    /// Returns `false` when the client is not connected or the write failed.
    /// A failed write disconnects the client, except for a full queue under
    /// [`OverflowPolicy::Drop`](crate::OverflowPolicy::Drop).
    pub fn send(&self, item: P) -> bool {
        match self.state.push(Item::from(item)) {
            PushOutcome::Delivered => true,
            PushOutcome::Dropped | PushOutcome::Inactive => false,
            PushOutcome::Failed(error) => {
                tracing::warn!(client = %self.id(), error = %error, "queue write failed, disconnecting client");
                self.disconnect();
                false
            }
        }
    }

    /// Number of queued items, markers included.
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    /// Wait for the next raw queue entry, markers included.
    ///
    /// Unlike the streams, this yields [`Item::BurstEnd`] and
    /// [`Item::Failure`], which lets a transport close a request/response
    /// cycle when its burst completes. Returns `None` once the client is
    /// disconnected. Does not disconnect on drop.
    pub async fn recv(&mut self) -> Option<Item<P>> {
        let token = self.state.token();
        if token.is_cancelled() {
            return None;
        }
        select! {
            biased;
            _ = token.cancelled() => None,
            item = self.receiver.recv() => item,
        }
    }

    /// Stream of routed items, polling at the client's interval.
    ///
    /// Ends when the client disconnects or the hub shuts down. Dropping the
    /// stream disconnects the client.
    pub fn stream(&mut self) -> ClientStream<'_, P> {
        let poll = self.poll_interval;
        self.stream_with(poll)
    }

    /// Like [`stream`](Self::stream) with an explicit poll interval.
    pub fn stream_with(&mut self, poll_interval: Duration) -> ClientStream<'_, P> {
        let inner = self
            .events_with(poll_interval)
            .filter_map(|event| {
                future::ready(match event {
                    StreamEvent::Item(item) => Some(item),
                    StreamEvent::Idle => None,
                })
            })
            .boxed();
        ClientStream { inner }
    }

    /// Stream of routed items interleaved with [`StreamEvent::Idle`] ticks.
    ///
    /// An `Idle` is yielded whenever a poll interval passes without an
    /// item. Ends and disconnects under the same rules as
    /// [`stream`](Self::stream).
    pub fn events(&mut self) -> EventStream<'_, P> {
        let poll = self.poll_interval;
        self.events_with(poll)
    }

    /// Like [`events`](Self::events) with an explicit poll interval.
    pub fn events_with(&mut self, poll_interval: Duration) -> EventStream<'_, P> {
        let guard = DisconnectGuard { client: self };
        let inner = stream::unfold(guard, move |mut guard| async move {
            let event = guard.client.next_event(poll_interval).await?;
            Some((event, guard))
        })
        .boxed();
        EventStream { inner }
    }

    async fn next_event(&mut self, poll_interval: Duration) -> Option<StreamEvent<P>> {
        let token = self.state.token();
        if token.is_cancelled() {
            return None;
        }
        loop {
            select! {
                biased;
                _ = token.cancelled() => return None,
                received = tokio::time::timeout(poll_interval, self.receiver.recv()) => match received {
                    Err(_) => return Some(StreamEvent::Idle),
                    Ok(None) => return None,
                    Ok(Some(Item::Value(item))) => return Some(StreamEvent::Item(item)),
                    Ok(Some(_)) => continue,
                },
            }
        }
    }

    fn known_topics(&self) -> Vec<Topic> {
        if self.state.with_plan(|plan| plan.all) {
            self.topics.known_topics()
        } else {
            Vec::new()
        }
    }
}

impl<P: Payload> Drop for Client<P> {
    fn drop(&mut self) {
        self.router.disconnect(&self.state);
    }
}

impl<P: Payload> fmt::Debug for Client<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", self.id())
            .field("status", &self.status())
            .field("queued", &self.queued())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Disconnects the borrowed client when a stream over it goes away.
struct DisconnectGuard<'a, P: Payload> {
    client: &'a mut Client<P>,
}

impl<P: Payload> Drop for DisconnectGuard<'_, P> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}

/// Routed items of one client. Returned by [`Client::stream`].
///
/// Dropping it disconnects the client.
pub struct ClientStream<'a, P> {
    inner: BoxStream<'a, Arc<P>>,
}

impl<P> Stream for ClientStream<'_, P> {
    type Item = Arc<P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<P> fmt::Debug for ClientStream<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientStream").finish_non_exhaustive()
    }
}

/// Routed items and idle ticks of one client. Returned by [`Client::events`].
///
/// Dropping it disconnects the client.
pub struct EventStream<'a, P> {
    inner: BoxStream<'a, StreamEvent<P>>,
}

impl<P> Stream for EventStream<'_, P> {
    type Item = StreamEvent<P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl<P> fmt::Debug for EventStream<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}
