use std::{fmt, hash::Hash, sync::Arc};

use uuid::Uuid;

/// Unique identifier of a [`Client`](crate::Client).
///
/// Supplied by the transport layer when it wants a stable identity across
/// reconnects, or generated from a random UUID otherwise.
///
/// ```
/// use beacon::ClientId;
///
/// let generated = ClientId::generate();
/// assert_eq!(generated.as_str().len(), 36);
/// assert_eq!(ClientId::new("tab-1").as_str(), "tab-1");
/// ```
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientId(Arc<str>);

impl ClientId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for ClientId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ClientId {}

impl Hash for ClientId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ClientId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        ClientId::generate()
    }
}
