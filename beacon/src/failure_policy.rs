use std::fmt;

/// What the dispatcher does with a handler that fails during a burst.
///
/// A failure is always contained: sibling handlers keep running, the burst
/// still completes, and the dispatch caller never sees the error. The policy
/// only decides who else gets to know about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Log the failure with `tracing` and notify monitors.
    #[default]
    Log,

    /// Additionally route the failure as an [`Item::Failure`](crate::Item::Failure)
    /// to the burst topic's subscribers. Client streams skip it; it exists
    /// for observers that inspect queues directly.
    Route,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Log => write!(f, "Log"),
            FailurePolicy::Route => write!(f, "Route"),
        }
    }
}
