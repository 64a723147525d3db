use crate::{
    BurstId, BurstSummary, ClientId, Error, OverflowPolicy, SenderId, Topic, monitoring::Monitor,
};

/// A monitor that logs hub activity to the `tracing` crate.
///
/// Provides visibility into dispatch and connections without custom code.
/// Log levels:
/// - `trace` - burst started, item routed (high volume)
/// - `debug` - burst completed, overflow
/// - `info` - client connected/disconnected
/// - `warn` - handler failures
///
/// # Example
///
/// ```ignore
/// use beacon::monitors::Tracer;
///
/// hub.monitors().add(Tracer).await?;
/// ```
#[derive(Debug)]
pub struct Tracer;

impl<P: std::fmt::Debug> Monitor<P> for Tracer {
    fn on_burst_started(&self, burst_id: BurstId, topic: &Topic, sender: &SenderId, handlers: usize) {
        tracing::trace!(
            burst_id = %burst_id,
            topic = %topic,
            sender = %sender,
            handlers,
            "burst started"
        );
    }

    fn on_burst_completed(&self, summary: &BurstSummary) {
        tracing::debug!(
            burst_id = %summary.burst_id,
            topic = %summary.topic,
            handlers = summary.handlers,
            items = summary.items,
            failures = summary.failures,
            "burst completed"
        );
    }

    fn on_item_routed(&self, topic: &Topic, sender: &SenderId, item: &P, receivers: usize) {
        tracing::trace!(
            topic = %topic,
            sender = %sender,
            receivers,
            item = ?item,
            "item routed"
        );
    }

    fn on_handler_failed(&self, burst_id: BurstId, topic: &Topic, error: &Error) {
        tracing::warn!(
            burst_id = %burst_id,
            topic = %topic,
            error = %error,
            "handler failed"
        );
    }

    fn on_client_connected(&self, client: &ClientId, topics: &[Topic]) {
        tracing::info!(
            client = %client,
            topics = ?topics,
            "client connected"
        );
    }

    fn on_client_disconnected(&self, client: &ClientId) {
        tracing::info!(client = %client, "client disconnected");
    }

    fn on_overflow(&self, client: &ClientId, topic: &Topic, policy: OverflowPolicy) {
        tracing::debug!(
            client = %client,
            topic = %topic,
            policy = %policy,
            "overflow"
        );
    }
}
