//! A chat room: several browser tabs share one topic.
//!
//! Every tab is a [`Client`]. A message sent by one user is dispatched on the
//! `chat.message` topic, where the echo handler repeats it to the room. Each
//! message is followed by a dispatch on `chat.receipt`, whose handler
//! produces a read receipt visible only to tabs that follow that sender.
//!
//! ```text
//! dispatch("chat.message", "alice") ──► echo ─────► alice-tab, bob-tab
//! dispatch("chat.receipt", "alice") ──► receipt ──► bob-tab (follows alice)
//! ```

use std::time::Duration;

use beacon::{Client, Hub, Result, Signals, StreamEvent, Trigger, handler};
use futures_util::StreamExt;

fn text(t: &Trigger) -> String {
    t.signals()
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

async fn print_tab(mut tab: Client<String>) {
    let id = tab.id().clone();
    let mut events = tab.events_with(Duration::from_millis(200));
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Item(line) => println!("[{id}] {line}"),
            StreamEvent::Idle => println!("[{id}] (keep-alive)"),
        }
    }
    println!("[{id}] stream closed");
}

#[tokio::main]
async fn main() -> Result {
    let hub = Hub::<String>::default();

    hub.register(
        "chat.message",
        handler::named("echo", |t: Trigger| Some(format!("{}: {}", t.sender(), text(&t)))),
    )?;
    hub.register(
        "chat.receipt",
        handler::named("receipt", |t: Trigger| Some(format!("{} read the room", t.sender()))),
    )?;

    let alice = hub.client().id("alice-tab").topic("chat.message").connect()?;
    let bob = hub
        .client()
        .id("bob-tab")
        .topic("chat.message")
        .topic_with_senders("chat.receipt", "alice")
        .connect()?;

    let tabs = [tokio::spawn(print_tab(alice)), tokio::spawn(print_tab(bob))];

    for (sender, line) in [("alice", "hi bob"), ("bob", "hey alice"), ("alice", "lunch?")] {
        let mut signals = Signals::new();
        signals.insert("text".into(), line.into());
        let summary = hub.dispatch("chat.message", sender, signals).await;
        println!("{summary}");
        hub.dispatch("chat.receipt", sender, Signals::new()).await;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("{}", hub.to_mermaid());

    hub.shutdown().await;
    for tab in tabs {
        let _ = tab.await;
    }
    Ok(())
}
