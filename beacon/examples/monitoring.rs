use std::time::Duration;

use beacon::{
    BurstId, BurstSummary, ClientId, Error, Hub, Output, Result, Signals, Topic, handler,
    monitoring::Monitor, monitors::Tracer,
};

// Custom monitor demonstrating the Monitor trait.
// For plain logging, consider using `beacon::monitors::Tracer` instead.
struct Printer;

impl Monitor<String> for Printer {
    fn on_burst_completed(&self, summary: &BurstSummary) {
        println!("{summary}");
    }

    fn on_handler_failed(&self, burst_id: BurstId, topic: &Topic, error: &Error) {
        eprintln!("burst {burst_id} on {topic}: {error}");
    }

    fn on_client_connected(&self, client: &ClientId, topics: &[Topic]) {
        println!("client {client} connected to {topics:?}");
    }

    fn on_client_disconnected(&self, client: &ClientId) {
        println!("client {client} disconnected");
    }
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let hub = Hub::<String>::default();
    hub.monitors().add(Printer).await?;
    hub.monitors().add(Tracer).await?;

    hub.register("greet", handler::named("hello", |_| Some("hello".to_string())))?;
    hub.register(
        "greet",
        handler::named("flaky", |_| {
            Output::try_iter([Ok("almost".to_string()), Err(std::io::Error::other("gave up"))])
        }),
    )?;

    let client = hub.client().id("demo").topic("greet").connect()?;
    hub.dispatch("greet", "world", Signals::new()).await;
    drop(client);

    hub.monitors().flush(Duration::from_millis(10)).await;
    hub.shutdown().await;
    Ok(())
}
