use std::time::Duration;

use crate::{FailurePolicy, OverflowPolicy, RoutingMode};

/// Hub-wide runtime configuration.
///
/// Controls routing, failure handling and the defaults every new client
/// inherits. Use the builder methods to customize, or [`Default`] for
/// settings that match a typical streaming server.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use beacon::{Config, FailurePolicy, OverflowPolicy};
///
/// let config = Config::default()
///     .with_failure_policy(FailurePolicy::Route)       // surface handler errors to monitors
///     .with_default_queue_capacity(Some(256))          // bounded client queues
///     .with_default_overflow_policy(OverflowPolicy::Drop)
///     .with_default_poll_interval(Duration::from_secs(15));
///
/// assert_eq!(config.default_queue_capacity(), Some(256));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    routing_mode: RoutingMode,
    failure_policy: FailurePolicy,
    default_poll_interval: Duration,
    default_queue_capacity: Option<usize>,
    default_overflow_policy: OverflowPolicy,
    bridge_capacity: usize,
    monitoring_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            routing_mode: RoutingMode::default(),
            failure_policy: FailurePolicy::default(),
            default_poll_interval: Duration::from_millis(100),
            default_queue_capacity: None,
            default_overflow_policy: OverflowPolicy::default(),
            bridge_capacity: 16,
            monitoring_channel_capacity: 1024,
        }
    }
}

impl Config {
    /// Set how produced items find their clients.
    pub fn with_routing_mode(mut self, mode: RoutingMode) -> Self {
        self.routing_mode = mode;
        self
    }

    /// Returns the routing mode.
    pub fn routing_mode(&self) -> RoutingMode {
        self.routing_mode
    }

    /// Set what happens to a failure raised by a handler.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Returns the handler failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Set how long a client stream waits for an item before reporting idle.
    ///
    /// This is the keep-alive cadence of [`Client::events`](crate::Client::events).
    /// It never affects delivery: queued items are yielded immediately.
    /// Default: 100ms
    pub fn with_default_poll_interval(mut self, interval: Duration) -> Self {
        self.default_poll_interval = interval;
        self
    }

    /// Returns the default poll interval for new clients.
    pub fn default_poll_interval(&self) -> Duration {
        self.default_poll_interval
    }

    /// Set the default client queue capacity. `None` means unbounded.
    ///
    /// A zero capacity is raised to one.
    /// Default: `None`
    pub fn with_default_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.default_queue_capacity = capacity.map(|c| c.max(1));
        self
    }

    /// Returns the default client queue capacity.
    pub fn default_queue_capacity(&self) -> Option<usize> {
        self.default_queue_capacity
    }

    /// Set what happens when a bounded client queue is full.
    pub fn with_default_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.default_overflow_policy = policy;
        self
    }

    /// Returns the default overflow policy for new clients.
    pub fn default_overflow_policy(&self) -> OverflowPolicy {
        self.default_overflow_policy
    }

    /// Set the hand-off buffer between a blocking iterator and its burst.
    ///
    /// A blocking iterator runs ahead of routing by at most this many items.
    /// Default: 16
    pub fn with_bridge_capacity(mut self, capacity: usize) -> Self {
        self.bridge_capacity = capacity.max(1);
        self
    }

    /// Returns the blocking iterator hand-off capacity.
    pub fn bridge_capacity(&self) -> usize {
        self.bridge_capacity
    }

    /// Set the buffer size for the monitoring event channel.
    /// Default: 1024
    pub fn with_monitoring_channel_capacity(mut self, capacity: usize) -> Self {
        self.monitoring_channel_capacity = capacity.max(1);
        self
    }

    /// Returns the monitoring event channel capacity.
    pub fn monitoring_channel_capacity(&self) -> usize {
        self.monitoring_channel_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.routing_mode(), RoutingMode::Topics);
        assert_eq!(config.failure_policy(), FailurePolicy::Log);
        assert_eq!(config.default_poll_interval(), Duration::from_millis(100));
        assert_eq!(config.default_queue_capacity(), None);
        assert_eq!(config.default_overflow_policy(), OverflowPolicy::Disconnect);
    }

    #[test]
    fn test_zero_capacities_are_raised() {
        let config = Config::default()
            .with_default_queue_capacity(Some(0))
            .with_bridge_capacity(0);
        assert_eq!(config.default_queue_capacity(), Some(1));
        assert_eq!(config.bridge_capacity(), 1);
    }
}
