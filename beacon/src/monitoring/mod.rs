//! Monitoring API for observing dispatch bursts and client lifecycles.
//!
//! Enabled by default through the `monitoring` feature:
//!
//! ```toml
//! [dependencies]
//! beacon = { version = "0.1", features = ["monitoring"] }
//! ```
//!
//! # Overview
//!
//! The monitoring system provides hooks into:
//! - Burst started and completed, items routed, handler failures
//! - Client connected, disconnected, and queue overflows
//!
//! Hooks run on a dedicated task fed by a bounded channel, so a slow
//! monitor never delays routing. When the channel is full, monitoring
//! events are dropped rather than applying backpressure to dispatch.
//!
//! # Example
//!
//! ```ignore
//! use beacon::monitoring::Monitor;
//!
//! struct FailureLogger;
//!
//! impl<P> Monitor<P> for FailureLogger {
//!     fn on_handler_failed(&self, burst_id: BurstId, topic: &Topic, error: &Error) {
//!         eprintln!("[{burst_id}] {topic}: {error}");
//!     }
//! }
//!
//! // Register with the hub
//! let handle = hub.monitors().add(FailureLogger).await;
//! ```

mod command;
mod dispatcher;
mod monitor;
mod monitor_handle;
mod monitoring_event;
mod registry;
mod sink;

/// Unique identifier for a registered monitor.
pub type MonitorId = u16;

pub(crate) use command::MonitorCommand;
pub(crate) use dispatcher::MonitorDispatcher;
pub use monitor::Monitor;
pub use monitor_handle::MonitorHandle;
pub(crate) use monitoring_event::MonitoringEvent;
pub use registry::MonitorRegistry;

pub(crate) use sink::MonitoringSink;
