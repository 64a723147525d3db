use std::{fmt, sync::Arc};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    BurstId, BurstSummary, ClientBuilder, ClientConfig, ClientId, Config, Handler, HandlerId,
    IntoOutput, Item, Payload, Result, SenderFilter, SenderId, Signals, Topic, TopicRegistry,
    Trigger,
    internal::{Dispatcher, Router},
};

#[cfg(feature = "monitoring")]
use crate::monitoring::MonitorRegistry;

struct HubInner<P: Payload, S: Payload> {
    config: Arc<Config>,
    registry: Arc<TopicRegistry<P, S>>,
    router: Arc<Router<P>>,
    dispatcher: Dispatcher<P, S>,
    token: CancellationToken,

    #[cfg(feature = "monitoring")]
    monitoring: MonitorRegistry<P>,
}

impl<P: Payload, S: Payload> Drop for HubInner<P, S> {
    fn drop(&mut self) {
        self.token.cancel();
        self.router.disconnect_all();
    }
}

/// Owns the topic registry and the client router, and runs dispatch bursts.
///
/// `P` is the item type handlers produce and clients receive. `S` is the
/// signal type passed to handlers, a JSON object by default.
///
/// `Hub` is a cheap handle: clone it into request handlers freely. All
/// clones share one registry and one set of clients.
///
/// # Handlers
///
/// ```rust
/// use beacon::{Hub, Output, Trigger};
///
/// let hub = Hub::<String>::default();
///
/// // Any sender
/// hub.on("greet", |t: Trigger| Some(format!("hi {}", t.sender())))?;
///
/// // Only dispatches from "admin"
/// hub.on_from("reset", "admin", |_| Some("resetting".to_string()))?;
///
/// // Several items over time
/// hub.on("count", |_| Output::iter((1..=3).map(|n| n.to_string())))?;
/// # Ok::<(), beacon::Error>(())
/// ```
///
/// # Dispatch and delivery
///
/// - [`dispatch`](Self::dispatch) runs every matching handler concurrently
///   and routes each produced item to the topic's subscribers as soon as it
///   is produced. It completes when the whole burst has settled.
/// - [`spawn_dispatch`](Self::spawn_dispatch) starts a burst without waiting
///   for it.
/// - [`publish`](Self::publish) routes a ready-made item without handlers.
/// - [`client`](Self::client) builds a consumer; see [`Client`](crate::Client).
/// - [`shutdown`](Self::shutdown) disconnects every client and ends their
///   streams.
pub struct Hub<P: Payload, S: Payload = Signals> {
    inner: Arc<HubInner<P, S>>,
}

impl<P: Payload, S: Payload> Clone for Hub<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Payload, S: Payload> Hub<P, S> {
    /// Create a new hub with the given runtime configuration.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let token = CancellationToken::new();

        #[cfg(feature = "monitoring")]
        let monitoring = MonitorRegistry::new(&config);

        let registry = Arc::new(TopicRegistry::new());
        let router = Arc::new(Router::new(
            config.routing_mode(),
            token.clone(),
            #[cfg(feature = "monitoring")]
            monitoring.sink(),
        ));
        let dispatcher = Dispatcher::new(
            registry.clone(),
            router.clone(),
            config.failure_policy(),
            config.bridge_capacity(),
            #[cfg(feature = "monitoring")]
            monitoring.sink(),
        );

        Self {
            inner: Arc::new(HubInner {
                config,
                registry,
                router,
                dispatcher,
                token,
                #[cfg(feature = "monitoring")]
                monitoring,
            }),
        }
    }

    /// Register a handler for `topic`, reacting to every sender.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTopic`](crate::Error::InvalidTopic) for an
    /// unusable topic name.
    pub fn register<H: Handler<P, S>>(&self, topic: impl Into<Topic>, handler: H) -> Result<HandlerId> {
        self.register_filtered(topic, SenderFilter::Any, handler)
    }

    /// Register a handler for `topic` that reacts only to some senders.
    ///
    /// # Errors
    ///
    /// Returns a registration error for an invalid topic or an empty
    /// sender set.
    pub fn register_filtered<H: Handler<P, S>>(
        &self,
        topic: impl Into<Topic>,
        senders: impl Into<SenderFilter>,
        handler: H,
    ) -> Result<HandlerId> {
        let topic = topic.into();
        let filter = senders.into();
        let name = handler.name().to_string();
        let id = self
            .inner
            .registry
            .register(topic.clone(), filter.clone(), Arc::new(handler))?;
        tracing::debug!(topic = %topic, handler = %name, id = %id, senders = %filter, "handler registered");
        Ok(id)
    }

    /// Register a closure for `topic`.
    ///
    /// Same as [`register`](Self::register), but closure arguments need no
    /// type annotation.
    pub fn on<F, O>(&self, topic: impl Into<Topic>, handler: F) -> Result<HandlerId>
    where
        F: Fn(Trigger<S>) -> O + Send + Sync + 'static,
        O: IntoOutput<P>,
    {
        self.register(topic, handler)
    }

    /// Register a closure for `topic` that reacts only to some senders.
    pub fn on_from<F, O>(
        &self,
        topic: impl Into<Topic>,
        senders: impl Into<SenderFilter>,
        handler: F,
    ) -> Result<HandlerId>
    where
        F: Fn(Trigger<S>) -> O + Send + Sync + 'static,
        O: IntoOutput<P>,
    {
        self.register_filtered(topic, senders, handler)
    }

    /// Remove one handler registration. Returns `false` if it was not
    /// registered.
    pub fn unregister(&self, topic: impl Into<Topic>, id: HandlerId) -> bool {
        let topic = topic.into();
        let removed = self.inner.registry.unregister(&topic, id);
        if removed {
            tracing::debug!(topic = %topic, id = %id, "handler unregistered");
        }
        removed
    }

    /// Run every handler of `topic` that accepts `sender`, and route what
    /// they produce.
    ///
    /// Completes once every handler has settled and the burst's completion
    /// marker has been routed. Handler failures are contained: they show up
    /// in the returned [`BurstSummary`] and in logs, never as an error.
    /// A topic without handlers completes immediately.
    ///
    /// The burst runs on its own task. Dropping the returned future stops
    /// waiting for the summary but not the burst: every item and the
    /// completion marker are still routed.
    pub async fn dispatch(&self, topic: impl Into<Topic>, sender: impl Into<SenderId>, signals: S) -> BurstSummary {
        let burst_id = BurstId::new();
        let topic = topic.into();
        let sender = sender.into();
        let burst = self.spawn_burst(burst_id, topic.clone(), sender.clone(), signals);

        match burst.await {
            Ok(summary) => summary,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                // Only the runtime shutting down cancels a burst task.
                tracing::error!(burst_id = %burst_id, topic = %topic, error = %e, "burst cancelled");
                BurstSummary {
                    burst_id,
                    topic,
                    sender,
                    handlers: 0,
                    items: 0,
                    failures: 0,
                }
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), but returns the burst's task
    /// handle instead of waiting for it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_dispatch(
        &self,
        topic: impl Into<Topic>,
        sender: impl Into<SenderId>,
        signals: S,
    ) -> JoinHandle<BurstSummary> {
        self.spawn_burst(BurstId::new(), topic.into(), sender.into(), signals)
    }

    fn spawn_burst(
        &self,
        burst_id: BurstId,
        topic: Topic,
        sender: SenderId,
        signals: S,
    ) -> JoinHandle<BurstSummary> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner
                .dispatcher
                .run(burst_id, topic, sender, Arc::new(signals))
                .await
        })
    }

    /// Route a ready-made item to the subscribers of `topic`.
    ///
    /// No handler runs and no completion marker is routed. Returns the
    /// number of clients that accepted the item.
    pub fn publish(&self, topic: impl Into<Topic>, sender: impl Into<SenderId>, item: P) -> usize {
        self.inner
            .router
            .route(&topic.into(), &sender.into(), &Item::from(item))
    }

    /// Route one item to the subscribers of several topics.
    ///
    /// The item is shared, not cloned. A client subscribed to more than one
    /// of the topics receives it once per topic.
    pub fn publish_many<I, T>(&self, topics: I, sender: impl Into<SenderId>, item: P) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<Topic>,
    {
        let sender = sender.into();
        let item = Item::from(item);
        topics
            .into_iter()
            .map(|topic| self.inner.router.route(&topic.into(), &sender, &item))
            .sum()
    }

    /// Start building a client with the hub's default client settings.
    pub fn client(&self) -> ClientBuilder<P> {
        ClientBuilder::new(
            self.inner.router.clone(),
            self.inner.registry.clone(),
            ClientConfig::new(&self.inner.config),
        )
    }

    /// Ids of connected clients, sorted.
    pub fn active_clients(&self) -> Vec<ClientId> {
        self.inner.router.active_ids()
    }

    pub fn is_active(&self, id: &ClientId) -> bool {
        self.inner.router.is_active(id)
    }

    /// Topics with at least one handler, sorted.
    pub fn topics(&self) -> Vec<Topic> {
        self.inner.registry.topics()
    }

    /// Topics with at least one subscribed client, sorted.
    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.inner.router.known_topics()
    }

    /// Number of clients subscribed to `topic`.
    pub fn subscriber_count(&self, topic: impl Into<Topic>) -> usize {
        self.inner.router.subscriber_count(&topic.into())
    }

    /// Disconnect every client, end their streams, and stop monitoring.
    ///
    /// New clients can no longer connect afterwards. Bursts already running
    /// finish, but their items reach no one.
    pub async fn shutdown(&self) {
        self.inner.token.cancel();
        let disconnected = self.inner.router.disconnect_all();
        tracing::info!(clients = disconnected, "hub shut down");

        #[cfg(feature = "monitoring")]
        {
            self.inner
                .monitoring
                .flush(std::time::Duration::from_millis(1))
                .await;
            self.inner.monitoring.stop().await;
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Returns the hub's configuration.
    pub fn config(&self) -> &Config {
        self.inner.config.as_ref()
    }

    pub fn registry(&self) -> &TopicRegistry<P, S> {
        &self.inner.registry
    }

    #[cfg(feature = "monitoring")]
    #[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
    pub fn monitors(&self) -> &MonitorRegistry<P> {
        &self.inner.monitoring
    }

    /// Generate a Mermaid flowchart of handlers, topics and clients.
    ///
    /// Handlers are boxes, topics are circles, clients are rounded boxes.
    /// An arrow from a handler to a topic means the handler produces for
    /// it; an arrow from a topic to a client means the client subscribes.
    ///
    /// # Example output
    ///
    /// ```text
    /// flowchart LR
    ///     h1["echo"] --> t_msg((msg))
    ///     t_msg --> c_tab_1("tab-1")
    /// ```
    pub fn to_mermaid(&self) -> String {
        let mut lines = vec!["flowchart LR".to_string()];
        let mut declared = std::collections::HashSet::new();

        let mut topic_node = |topic: &Topic| {
            let id = format!("t_{}", node_id(topic.as_str()));
            if declared.insert(id.clone()) {
                format!("{id}(({topic}))")
            } else {
                id
            }
        };

        for (topic, registrations) in self.inner.registry.snapshot() {
            for registration in registrations.iter() {
                lines.push(format!(
                    "    h{}[\"{}\"] --> {}",
                    registration.id.value(),
                    registration.handler.name(),
                    topic_node(&topic)
                ));
            }
        }

        for (client, topics) in self.inner.router.subscriptions() {
            if topics.is_empty() {
                lines.push(format!("    c_{}(\"{}\")", node_id(client.as_str()), client));
            }
            for topic in &topics {
                lines.push(format!(
                    "    {} --> c_{}(\"{}\")",
                    topic_node(topic),
                    node_id(client.as_str()),
                    client
                ));
            }
        }

        lines.join("\n")
    }
}

/// Mermaid node ids allow only a restricted character set.
fn node_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl<P: Payload, S: Payload> Default for Hub<P, S> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<P: Payload, S: Payload> fmt::Debug for Hub<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.inner.config)
            .field("topics", &self.topics())
            .field("active_clients", &self.active_clients().len())
            .field("is_shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(feature = "serde")]
impl<P: Payload, S: Payload> Hub<P, S> {
    /// Export the hub's topology as JSON.
    ///
    /// This mirrors the information shown by [`to_mermaid`](Self::to_mermaid)
    /// in a machine-readable form. The output is a list with one entry per
    /// topic that has handlers or subscribers:
    ///
    /// - `topic` - the topic name
    /// - `handlers` - registered handlers with their id, name and sender filter
    /// - `clients` - ids of connected clients subscribed to the topic
    ///
    /// # Errors
    ///
    /// Returns any serialization error produced by `serde_json`.
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn to_json(&self) -> serde_json::Result<String> {
        use std::collections::BTreeMap;

        use serde::Serialize;

        #[derive(Serialize)]
        struct HandlerExport {
            id: u64,
            name: String,
            senders: String,
        }

        #[derive(Serialize, Default)]
        struct TopicExport {
            topic: String,
            handlers: Vec<HandlerExport>,
            clients: Vec<String>,
        }

        let mut exports: BTreeMap<Topic, TopicExport> = BTreeMap::new();

        for (topic, registrations) in self.inner.registry.snapshot() {
            let entry = exports.entry(topic.clone()).or_default();
            entry.topic = topic.to_string();
            entry.handlers = registrations
                .iter()
                .map(|r| HandlerExport {
                    id: r.id.value(),
                    name: r.handler.name().to_string(),
                    senders: r.filter.to_string(),
                })
                .collect();
        }

        for (client, topics) in self.inner.router.subscriptions() {
            for topic in topics {
                let entry = exports.entry(topic.clone()).or_default();
                entry.topic = topic.to_string();
                entry.clients.push(client.to_string());
            }
        }

        let exports: Vec<TopicExport> = exports.into_values().collect();
        serde_json::to_string_pretty(&exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, handler};

    type TestHub = Hub<String>;

    #[tokio::test]
    async fn test_dispatch_without_handlers_completes() {
        let hub = TestHub::default();
        let summary = hub.dispatch("nothing", "user", Signals::new()).await;
        assert_eq!(summary.handlers, 0);
        assert_eq!(summary.items, 0);
        assert!(summary.is_clean());
    }

    #[tokio::test]
    async fn test_registration_errors_surface() {
        let hub = TestHub::default();
        assert_eq!(
            hub.on("bad topic", |_| Option::<String>::None),
            Err(Error::InvalidTopic("bad topic".into()))
        );
        assert!(matches!(
            hub.on_from("msg", Vec::<&str>::new(), |_| Option::<String>::None),
            Err(Error::EmptySenderFilter(_))
        ));
        assert!(hub.topics().is_empty());
    }

    #[tokio::test]
    async fn test_unregister_stops_handler() {
        let hub = TestHub::default();
        let id = hub.on("msg", |_| Some("hello".to_string())).unwrap();
        assert_eq!(hub.dispatch("msg", "u", Signals::new()).await.items, 1);

        assert!(hub.unregister("msg", id));
        assert!(!hub.unregister("msg", id));
        assert_eq!(hub.dispatch("msg", "u", Signals::new()).await.handlers, 0);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = TestHub::default();
        let mut a = hub.client().topic("news").connect().unwrap();
        let _b = hub.client().topic("weather").connect().unwrap();

        assert_eq!(hub.publish("news", SenderId::system(), "extra".into()), 1);
        assert_eq!(
            hub.publish_many(["news", "weather"], SenderId::system(), "both".into()),
            2
        );

        assert_eq!(hub.subscribed_topics(), vec![Topic::new("news"), Topic::new("weather")]);
        assert!(matches!(a.recv().await, Some(Item::Value(v)) if *v == "extra"));
        assert!(matches!(a.recv().await, Some(Item::Value(v)) if *v == "both"));
        assert_eq!(a.queued(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_clients() {
        let hub = TestHub::default();
        let client = hub.client().topic("msg").connect().unwrap();
        assert_eq!(hub.active_clients(), vec![client.id().clone()]);

        hub.shutdown().await;

        assert!(hub.is_shutdown());
        assert!(!client.is_connected());
        assert!(hub.active_clients().is_empty());
        assert_eq!(
            hub.client().topic("msg").connect().unwrap_err(),
            Error::HubShutdown
        );
    }

    #[tokio::test]
    async fn test_to_mermaid() {
        let hub = TestHub::default();
        hub.register("chat.msg", handler::named("echo", |_| Some(String::new())))
            .unwrap();
        hub.register("chat.msg", handler::named("log", |_| Option::<String>::None))
            .unwrap();
        let _client = hub.client().id("tab-1").topic("chat.msg").connect().unwrap();

        let mermaid = hub.to_mermaid();
        assert!(mermaid.starts_with("flowchart LR"));
        assert!(mermaid.contains("h1[\"echo\"] --> t_chat_msg((chat.msg))"));
        assert!(mermaid.contains("h2[\"log\"] --> t_chat_msg\n"));
        assert!(mermaid.contains("t_chat_msg --> c_tab_1(\"tab-1\")"));
    }

    #[cfg(feature = "serde")]
    #[tokio::test]
    async fn test_to_json() {
        use serde_json::Value;

        let hub = TestHub::default();
        hub.register_filtered("msg", "alice", handler::named("echo", |_| Some(String::new())))
            .unwrap();
        let _client = hub.client().id("c1").topics(["msg", "other"]).connect().unwrap();

        let json = hub.to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 2);

        let msg = arr.iter().find(|v| v["topic"] == "msg").unwrap();
        assert_eq!(msg["handlers"][0]["name"], "echo");
        assert_eq!(msg["handlers"][0]["senders"], "alice");
        assert_eq!(msg["clients"][0], "c1");

        let other = arr.iter().find(|v| v["topic"] == "other").unwrap();
        assert!(other["handlers"].as_array().unwrap().is_empty());
    }
}
