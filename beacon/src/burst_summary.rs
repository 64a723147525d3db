use std::fmt;

use crate::{BurstId, SenderId, Topic};

/// Outcome of one dispatch burst.
///
/// Returned by [`Hub::dispatch`](crate::Hub::dispatch) once every handler of
/// the burst has settled and the completion marker has been routed. Handler
/// failures are counted here but never returned as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BurstSummary {
    pub burst_id: BurstId,
    pub topic: Topic,
    pub sender: SenderId,
    /// Number of handlers that matched the topic and sender.
    pub handlers: usize,
    /// Items produced by all handlers, `None` steps excluded.
    pub items: usize,
    /// Handlers that returned an error or panicked.
    pub failures: usize,
}

impl BurstSummary {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

impl fmt::Display for BurstSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "burst {} on '{}' from '{}': {} handler(s), {} item(s), {} failure(s)",
            self.burst_id, self.topic, self.sender, self.handlers, self.items, self.failures
        )
    }
}
