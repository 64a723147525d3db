use crate::{BurstId, BurstSummary, ClientId, Error, OverflowPolicy, SenderId, Topic};

/// Trait for observing what the hub does.
///
/// Implement this trait to receive callbacks during dispatch and client
/// lifecycle stages. All methods have default no-op implementations, so you
/// only need to override the ones you care about.
///
/// # Example
///
/// ```rust
/// use beacon::{BurstSummary, ClientId, Topic};
/// use beacon::monitoring::Monitor;
///
/// struct BurstLogger;
///
/// impl<P> Monitor<P> for BurstLogger {
///     fn on_burst_completed(&self, summary: &BurstSummary) {
///         println!("[burst] {summary}");
///     }
///
///     fn on_client_connected(&self, client: &ClientId, topics: &[Topic]) {
///         println!("[connect] {client} -> {topics:?}");
///     }
/// }
/// ```
///
/// # Burst Lifecycle
///
/// A dispatch burst flows through these stages:
/// 1. **Started**  - matching handlers resolved, about to run
/// 2. **Item routed**  - once per produced item, after it reached the queues
/// 3. **Handler failed**  - once per failing handler
/// 4. **Completed**  - every handler settled, completion marker routed
///
/// A monitor that panics is removed and never called again.
pub trait Monitor<P>: Send {
    /// Called when a burst starts, before any handler runs.
    fn on_burst_started(&self, burst_id: BurstId, topic: &Topic, sender: &SenderId, handlers: usize) {
        let _b = burst_id;
        let _t = topic;
        let _s = sender;
        let _h = handlers;
    }

    /// Called after every handler of a burst has settled.
    fn on_burst_completed(&self, summary: &BurstSummary) {
        let _s = summary;
    }

    /// Called after an item has been pushed to its clients.
    ///
    /// `receivers` is the number of client queues that accepted it. Fires
    /// for published items as well as for handler output.
    fn on_item_routed(&self, topic: &Topic, sender: &SenderId, item: &P, receivers: usize) {
        let _t = topic;
        let _s = sender;
        let _i = item;
        let _r = receivers;
    }

    /// Called when a handler returns an error or panics.
    fn on_handler_failed(&self, burst_id: BurstId, topic: &Topic, error: &Error) {
        let _b = burst_id;
        let _t = topic;
        let _e = error;
    }

    /// Called when a client connects, with the topics it subscribed to.
    fn on_client_connected(&self, client: &ClientId, topics: &[Topic]) {
        let _c = client;
        let _t = topics;
    }

    /// Called when a client disconnects, explicitly or implicitly.
    fn on_client_disconnected(&self, client: &ClientId) {
        let _c = client;
    }

    /// Called when a client's queue is full and its overflow policy is applied.
    ///
    /// See [`OverflowPolicy`] for details.
    fn on_overflow(&self, client: &ClientId, topic: &Topic, policy: OverflowPolicy) {
        let _c = client;
        let _t = topic;
        let _p = policy;
    }
}
