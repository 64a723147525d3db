//! Ready-to-use monitor implementations.
//!
//! This module contains concrete [`Monitor`](crate::monitoring::Monitor)
//! implementations for common use cases.
//!
//! # Available Monitors
//!
//! - [`Tracer`] - Logs burst and client lifecycle via the `tracing` crate
//!
//! # Example
//!
//! ```ignore
//! use beacon::monitors::Tracer;
//!
//! hub.monitors().add(Tracer).await?;
//! ```

mod tracer;
pub use tracer::Tracer;
