use std::fmt;

/// How the router picks the clients that receive an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoutingMode {
    /// Deliver to clients subscribed to the item's topic whose sender
    /// filter accepts the item's sender.
    #[default]
    Topics,

    /// Deliver to every connected client regardless of subscriptions.
    ///
    /// Meant for single-topic deployments where every connection wants
    /// every update.
    Broadcast,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingMode::Topics => write!(f, "Topics"),
            RoutingMode::Broadcast => write!(f, "Broadcast"),
        }
    }
}
