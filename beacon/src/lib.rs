#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Beacon
//!
//! Topic-based event dispatch and client fan-out for streaming servers on Tokio.
//!
//! Beacon sits between the code that reacts to client signals and the
//! long-lived connections (Server-Sent Events, WebSockets, long polling)
//! that push results back out. Register handlers on topics, connect clients
//! to topics, and dispatch: every item a handler produces is delivered to
//! each subscribed client's queue as soon as it is produced.
//!
//! ## Quick Start
//!
//! ```rust
//! use beacon::{Hub, Output, Signals, Trigger};
//! use futures_util::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> beacon::Result {
//!     let hub = Hub::<String>::default();
//!
//!     hub.on("greet", |t: Trigger| Some(format!("hello, {}", t.sender())))?;
//!     hub.on("greet", |_| Output::iter(["and", "welcome"].map(String::from)))?;
//!
//!     let mut client = hub.client().topic("greet").connect()?;
//!
//!     let summary = hub.dispatch("greet", "alice", Signals::new()).await;
//!     assert_eq!(summary.items, 3);
//!
//!     let mut stream = client.stream();
//!     let first = stream.next().await.unwrap();
//!     assert!(first.starts_with("hello") || first.as_str() == "and");
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Hub`] | Owns handlers and clients, runs dispatch bursts |
//! | [`Handler`] | Reacts to a [`Trigger`] by producing an [`Output`] |
//! | [`Output`] | Zero or more items: value, future, blocking iterator or stream |
//! | [`Topic`] | Routes produced items to interested clients |
//! | [`SenderFilter`] | Restricts a handler or subscription to some senders |
//! | [`Client`] | A consumer with its own queue and subscriptions |
//! | [`ClientStream`] | Async stream of a client's items |
//! | [`BurstSummary`] | What one dispatch produced and how it went |
//! | [`OverflowPolicy`] | What happens when a client's queue is full |
//!
//! ## Dispatch Bursts
//!
//! A call to [`Hub::dispatch`] starts a *burst*: every handler registered on
//! the topic whose sender filter accepts the caller runs concurrently.
//! Items are routed while the burst runs, never buffered until the end.
//! A failing or panicking handler fails alone; its siblings keep running.
//! When every handler has settled the hub routes one completion marker,
//! after all of the burst's items, and the dispatch call returns.
//!
//! ## Flow Control
//!
//! Each client owns one queue, bounded or unbounded per [`ClientConfig`].
//! A full queue is governed by [`OverflowPolicy`]:
//!
//! - [`OverflowPolicy::Disconnect`] (default) - the client is disconnected
//!   and its stream ends
//! - [`OverflowPolicy::Drop`] - the item is skipped for that client only
//!
//! Routing never waits on a slow client.
//!
//! ## Features
//!
//! - **`monitoring`** (default) - Burst and client lifecycle hooks for debugging, metrics, and logging
//! - **`serde`** - JSON serialization support (e.g. `Hub::to_json()`)
//!
//! ## Examples
//!
//! See the `examples/` directory of the crate:
//!
//! - `chat.rs` - Several clients sharing a topic, with sender filters
//! - `blocking_handler.rs` - A handler backed by a slow blocking iterator
//! - `monitoring.rs` - Observing bursts with the `Tracer` monitor

mod burst_id;
mod burst_summary;
mod client;
mod client_builder;
mod client_config;
mod client_id;
mod client_status;
mod config;
mod error;
mod failure_policy;
mod hub;
mod item;
mod output;
mod overflow_policy;
mod payload;
mod registry;
mod routing_mode;
mod sender;
mod topic;
mod trigger;

pub mod handler;

mod internal;

#[cfg(feature = "monitoring")]
#[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
pub mod monitoring;

#[cfg(feature = "monitoring")]
#[cfg_attr(docsrs, doc(cfg(feature = "monitoring")))]
pub mod monitors;

pub use burst_id::BurstId;
pub use burst_summary::BurstSummary;
pub use client::{Client, ClientStream, EventStream, StreamEvent};
pub use client_builder::ClientBuilder;
pub use client_config::ClientConfig;
pub use client_id::ClientId;
pub use client_status::ClientStatus;
pub use config::Config;
pub use error::Error;
pub use failure_policy::FailurePolicy;
pub use handler::{Handler, HandlerId};
pub use hub::Hub;
pub use item::Item;
pub use output::{IntoOutput, Output};
pub use overflow_policy::OverflowPolicy;
pub use payload::Payload;
pub use registry::TopicRegistry;
pub use routing_mode::RoutingMode;
pub use sender::{SenderFilter, SenderId};
pub use topic::Topic;
pub use trigger::{Signals, Trigger};

/// Convenience alias for `Result<T, beacon::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
