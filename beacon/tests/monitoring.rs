#![cfg(feature = "monitoring")]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use beacon::{
    BurstId, BurstSummary, ClientId, Config, Error, Hub, OverflowPolicy, Output, SenderId,
    Signals, Topic, handler, monitoring::Monitor, monitors::Tracer,
};

const SETTLE: Duration = Duration::from_millis(10);

#[derive(Default, Clone)]
struct Collector {
    log: Arc<Mutex<Vec<String>>>,
}

impl Collector {
    fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl Monitor<String> for Collector {
    fn on_burst_completed(&self, summary: &BurstSummary) {
        self.push(format!(
            "completed {} items={} failures={}",
            summary.topic, summary.items, summary.failures
        ));
    }

    fn on_item_routed(&self, topic: &Topic, _sender: &SenderId, item: &String, receivers: usize) {
        self.push(format!("routed {topic} {item} to {receivers}"));
    }

    fn on_handler_failed(&self, _burst_id: BurstId, topic: &Topic, error: &Error) {
        self.push(format!("failed {topic}: {error}"));
    }

    fn on_client_connected(&self, client: &ClientId, topics: &[Topic]) {
        self.push(format!("connected {client} {}", topics.len()));
    }

    fn on_client_disconnected(&self, client: &ClientId) {
        self.push(format!("disconnected {client}"));
    }

    fn on_overflow(&self, client: &ClientId, topic: &Topic, policy: OverflowPolicy) {
        self.push(format!("overflow {client} {topic} {policy:?}"));
    }
}

#[tokio::test]
async fn monitor_observes_burst_lifecycle() {
    let hub = Hub::<String>::default();
    let collector = Collector::default();
    hub.monitors().add(collector.clone()).await.unwrap();

    hub.register("t", handler::named("ok", |_| Some("item".to_string())))
        .unwrap();
    hub.register(
        "t",
        handler::named("bad", |_| Err::<Output<String>, _>(std::io::Error::other("boom"))),
    )
    .unwrap();
    let client = hub.client().id("c1").topic("t").connect().unwrap();

    hub.dispatch("t", "s", Signals::new()).await;
    client.disconnect();
    hub.monitors().flush(SETTLE).await;

    let entries = collector.entries();
    assert_eq!(
        entries,
        vec![
            "connected c1 1".to_string(),
            "routed t item to 1".to_string(),
            "failed t: Handler 'bad' failed: boom".to_string(),
            "completed t items=1 failures=1".to_string(),
            "disconnected c1".to_string(),
        ]
    );
}

#[tokio::test]
async fn monitor_observes_overflow_and_forced_disconnect() {
    let hub = Hub::<String>::new(Config::default().with_default_queue_capacity(Some(1)));
    let collector = Collector::default();
    hub.monitors().add(collector.clone()).await.unwrap();

    let dropping = hub
        .client()
        .id("dropping")
        .topic("t")
        .overflow_policy(OverflowPolicy::Drop)
        .connect()
        .unwrap();
    let strict = hub.client().id("strict").topic("t").connect().unwrap();

    hub.publish("t", SenderId::system(), "one".into());
    hub.publish("t", SenderId::system(), "two".into());
    hub.monitors().flush(SETTLE).await;

    assert!(dropping.is_connected());
    assert!(!strict.is_connected());

    let entries = collector.entries();
    assert!(entries.contains(&"overflow dropping t Drop".to_string()));
    assert!(entries.contains(&"overflow strict t Disconnect".to_string()));
    assert!(entries.contains(&"disconnected strict".to_string()));
    assert!(!entries.contains(&"disconnected dropping".to_string()));
}

#[tokio::test]
async fn paused_monitor_sees_nothing() {
    let hub = Hub::<String>::default();
    let collector = Collector::default();
    let handle = hub.monitors().add(collector.clone()).await.unwrap();
    hub.monitors().add(Tracer).await.unwrap();

    handle.pause().await;
    hub.on("t", |_| Some("x".to_string())).unwrap();
    hub.dispatch("t", "s", Signals::new()).await;
    hub.monitors().flush(SETTLE).await;
    assert!(collector.entries().is_empty());

    handle.resume().await;
    hub.dispatch("t", "s", Signals::new()).await;
    hub.monitors().flush(SETTLE).await;
    assert_eq!(
        collector.entries(),
        vec!["routed t x to 0", "completed t items=1 failures=0"]
    );
}

struct Panicky;

impl Monitor<String> for Panicky {
    fn on_burst_completed(&self, _summary: &BurstSummary) {
        panic!("monitor bug");
    }
}

#[tokio::test]
async fn panicking_monitor_is_removed_without_affecting_others() {
    let hub = Hub::<String>::default();
    let collector = Collector::default();
    hub.monitors().add(Panicky).await.unwrap();
    hub.monitors().add(collector.clone()).await.unwrap();

    hub.on("t", |_| Option::<String>::None).unwrap();
    hub.dispatch("t", "s", Signals::new()).await;
    hub.dispatch("t", "s", Signals::new()).await;
    hub.monitors().flush(SETTLE).await;

    assert_eq!(
        collector.entries(),
        vec![
            "completed t items=0 failures=0",
            "completed t items=0 failures=0"
        ]
    );
}

#[tokio::test]
async fn shutdown_stops_monitoring() {
    let hub = Hub::<String>::default();
    hub.monitors().add(Tracer).await.unwrap();
    let client = hub.client().topic("t").connect().unwrap();

    hub.shutdown().await;

    assert!(!client.is_connected());
    assert!(matches!(
        hub.monitors().add(Tracer).await,
        Err(Error::HubShutdown)
    ));
}
