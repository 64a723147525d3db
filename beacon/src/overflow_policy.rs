use std::fmt;

/// Controls what happens when a client's bounded queue is full.
///
/// Routing never waits for a slow client: a push into a client queue is
/// always a non-blocking `try_send`. The policy decides what that failed
/// push means for the client. Unbounded queues never overflow.
///
/// | Policy | On full queue | Use case |
/// |--------|---------------|----------|
/// | [`Disconnect`](Self::Disconnect) | Disconnect the client | Streams where a gap is worse than a reconnect |
/// | [`Drop`](Self::Drop) | Discard the item, keep the client | Expendable updates (progress, presence) |
///
/// # Default
///
/// The default policy is `Disconnect`: a failed queue write is treated as an
/// implicit disconnect, so the transport notices and the client reconnects
/// with a fresh queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverflowPolicy {
    /// Disconnect the client. Its stream ends and it is removed from
    /// every topic.
    #[default]
    Disconnect,

    /// Discard the item for this client only. The client stays connected
    /// and keeps receiving later items.
    Drop,
}

impl OverflowPolicy {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, OverflowPolicy::Disconnect)
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, OverflowPolicy::Drop)
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Disconnect => write!(f, "Disconnect"),
            OverflowPolicy::Drop => write!(f, "Drop"),
        }
    }
}
