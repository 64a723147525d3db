use std::fmt;

/// Lifecycle state of a [`Client`](crate::Client).
///
/// ```text
/// Created ──connect()──► Connected ──disconnect()──► Disconnected
///                            ▲                            │
///                            └─────────connect()──────────┘
/// ```
///
/// Only a `Connected` client receives items. Every other state turns queue
/// writes into silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClientStatus {
    #[default]
    Created,
    Connected,
    Disconnected,
}

impl ClientStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ClientStatus::Connected)
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientStatus::Created => write!(f, "Created"),
            ClientStatus::Connected => write!(f, "Connected"),
            ClientStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}
