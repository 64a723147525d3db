use std::time::Duration;

use crate::{Config, OverflowPolicy};

/// Per-client configuration.
///
/// Controls settings that vary between clients: queue capacity, overflow
/// policy and poll interval. Created by [`Hub::client`](crate::Hub::client)
/// from the defaults in [`Config`], or customized via
/// [`ClientBuilder`](crate::ClientBuilder).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use beacon::{ClientConfig, Config, OverflowPolicy};
///
/// let config = ClientConfig::new(&Config::default())
///     .with_queue_capacity(Some(64))
///     .with_overflow_policy(OverflowPolicy::Drop)
///     .with_poll_interval(Duration::from_secs(30));
///
/// assert_eq!(config.queue_capacity(), Some(64));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    queue_capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
    poll_interval: Duration,
}

impl ClientConfig {
    /// Create a new config inheriting defaults from the global [`Config`].
    pub fn new(global_config: &Config) -> Self {
        Self {
            queue_capacity: global_config.default_queue_capacity(),
            overflow_policy: global_config.default_overflow_policy(),
            poll_interval: global_config.default_poll_interval(),
        }
    }

    /// Set the client's queue capacity. `None` means unbounded.
    ///
    /// This is the number of items that can wait for the client before its
    /// overflow policy takes effect.
    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity.map(|c| c.max(1));
        self
    }

    /// Returns the client's queue capacity.
    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow_policy
    }

    /// Set how long a stream waits for an item before reporting idle.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::new(&Config::default())
    }
}
