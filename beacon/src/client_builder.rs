use std::{fmt, sync::Arc, time::Duration};

use crate::{
    Client, ClientConfig, ClientId, OverflowPolicy, Payload, Result, SenderFilter, Topic,
    internal::{ClientState, Plan, Router, mailbox},
    registry::KnownTopics,
};

/// Builder for configuring a client before it connects.
///
/// Created by [`Hub::client`](crate::Hub::client). Lets you pick the
/// client's id, its topics and per-client settings.
///
/// A client that names no topics subscribes to every topic known when it
/// connects, as if [`all_topics`](Self::all_topics) had been called.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use beacon::{Hub, OverflowPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> beacon::Result {
/// let hub = Hub::<String>::default();
/// let client = hub
///     .client()
///     .id("tab-42")
///     .topic("chat")
///     .topic_with_senders("presence", ["alice", "bob"])
///     .queue_capacity(128)
///     .overflow_policy(OverflowPolicy::Drop)
///     .poll_interval(Duration::from_secs(15))
///     .connect()?;
///
/// assert!(client.is_connected());
/// assert_eq!(client.subscriptions().len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<P: Payload> {
    router: Arc<Router<P>>,
    known: Arc<dyn KnownTopics>,
    id: Option<ClientId>,
    plan: Plan,
    config: ClientConfig,
}

impl<P: Payload> ClientBuilder<P> {
    pub(crate) fn new(router: Arc<Router<P>>, known: Arc<dyn KnownTopics>, config: ClientConfig) -> Self {
        Self {
            router,
            known,
            id: None,
            plan: Plan::default(),
            config,
        }
    }

    /// Use a stable id instead of a generated one.
    ///
    /// Connecting replaces any live client with the same id.
    pub fn id(mut self, id: impl Into<ClientId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Subscribe to `topic` for items from any sender.
    pub fn topic(self, topic: impl Into<Topic>) -> Self {
        self.topic_with_senders(topic, SenderFilter::Any)
    }

    /// Subscribe to each topic for items from any sender.
    pub fn topics<I, T>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        for topic in topics {
            self.plan.explicit.insert(topic.into(), SenderFilter::Any);
        }
        self
    }

    /// Subscribe to `topic` for items from the given senders only.
    pub fn topic_with_senders(mut self, topic: impl Into<Topic>, senders: impl Into<SenderFilter>) -> Self {
        self.plan.explicit.insert(topic.into(), senders.into());
        self
    }

    /// Also subscribe to every topic that has handlers at connect time.
    ///
    /// Explicit topics keep their own sender filters.
    pub fn all_topics(mut self) -> Self {
        self.plan.all = true;
        self
    }

    /// Never subscribe to `topic`, even through `all_topics`.
    pub fn mute(mut self, topic: impl Into<Topic>) -> Self {
        self.plan.muted.insert(topic.into());
        self
    }

    pub fn muted<I, T>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        self.plan.muted.extend(topics.into_iter().map(Into::into));
        self
    }

    /// Bound the client's queue. A zero capacity is raised to one.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_queue_capacity(Some(capacity));
        self
    }

    /// Let the client's queue grow without limit.
    pub fn unbounded(mut self) -> Self {
        self.config = self.config.with_queue_capacity(None);
        self
    }

    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config = self.config.with_overflow_policy(policy);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_poll_interval(interval);
        self
    }

    /// Replace the whole per-client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust the per-client configuration in place.
    pub fn with_config(mut self, f: impl FnOnce(ClientConfig) -> ClientConfig) -> Self {
        self.config = f(self.config);
        self
    }

    /// Build the client without connecting it.
    ///
    /// # Errors
    ///
    /// Returns a registration error for an invalid topic or an empty
    /// sender set.
    pub fn build(self) -> Result<Client<P>> {
        let mut plan = self.plan;
        for (topic, filter) in &plan.explicit {
            topic.validate()?;
            filter.validate(topic)?;
        }
        for topic in &plan.muted {
            topic.validate()?;
        }
        if plan.explicit.is_empty() {
            plan.all = true;
        }

        let id = self.id.unwrap_or_default();
        let (tx, rx) = mailbox(self.config.queue_capacity());
        let state = Arc::new(ClientState::new(id, self.config.overflow_policy(), tx, plan));
        Ok(Client::new(
            state,
            rx,
            self.router,
            self.known,
            self.config.poll_interval(),
        ))
    }

    /// Build the client and connect it.
    ///
    /// # Errors
    ///
    /// Everything [`build`](Self::build) rejects, plus
    /// [`Error::HubShutdown`](crate::Error::HubShutdown) after shutdown.
    pub fn connect(self) -> Result<Client<P>> {
        let client = self.build()?;
        client.connect()?;
        Ok(client)
    }
}

impl<P: Payload> fmt::Debug for ClientBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("id", &self.id)
            .field("plan", &self.plan)
            .field("config", &self.config)
            .finish()
    }
}
