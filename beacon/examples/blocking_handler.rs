//! A handler backed by a slow blocking iterator.
//!
//! `Output::iter` advances the iterator on Tokio's blocking pool and hands
//! each element over as soon as it is ready, so a report that takes a while
//! to compute reaches the client row by row. A second, async handler on the
//! same topic keeps producing meanwhile.

use std::time::Duration;

use beacon::{Error, Hub, Item, Output, Result, Signals, handler};
use futures_util::stream;

fn slow_rows() -> impl Iterator<Item = String> + Send + 'static {
    (1..=5).map(|n| {
        // Stands in for a database cursor or a file scan.
        std::thread::sleep(Duration::from_millis(150));
        format!("row {n}")
    })
}

#[tokio::main]
async fn main() -> Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let hub = Hub::<String>::default();
    hub.register("report", handler::named("rows", |_| Output::iter(slow_rows())))?;
    hub.register(
        "report",
        handler::named("progress", |_| {
            Output::stream(stream::unfold(0, |n| async move {
                if n == 3 {
                    return None;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
                Some((format!("still working ({})", n + 1), n + 1))
            }))
        }),
    )?;

    let mut client = hub.client().id("viewer").topic("report").connect()?;

    let burst = hub.spawn_dispatch("report", "cli", Signals::new());

    // `recv` exposes the completion marker, so the viewer knows when to stop.
    while let Some(item) = client.recv().await {
        match item {
            Item::Value(line) => println!("{line}"),
            Item::BurstEnd(id) => {
                println!("burst {id} complete");
                break;
            }
            Item::Failure(error) => eprintln!("handler failed: {error}"),
        }
    }

    let summary = burst.await.map_err(Error::external)?;
    println!("{summary}");
    Ok(())
}
