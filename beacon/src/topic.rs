use std::{borrow::Borrow, fmt, hash::Hash, sync::Arc};

use crate::{Error, Result};

/// Name of a channel that routes produced items from handlers to clients.
///
/// Handlers are registered against a topic, clients subscribe to topics, and
/// every item produced during a dispatch burst is routed to the subscribers of
/// the burst's topic.
///
/// `Topic` is cheap to clone. Construction is infallible so topics can be
/// built anywhere; validation happens where a topic enters a registry
/// (handler registration, client subscription) via [`Topic::validate`].
///
/// ```
/// use beacon::Topic;
///
/// let topic = Topic::new("message.send");
/// assert!(topic.validate().is_ok());
/// assert!(Topic::new("").validate().is_err());
/// assert!(Topic::new("two words").validate().is_err());
/// ```
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topic(Arc<str>);

impl Topic {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the topic name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks that the topic is a usable identifier.
    ///
    /// A valid topic is non-empty and contains no whitespace or control
    /// characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTopic`] otherwise.
    pub fn validate(&self) -> Result<()> {
        let valid =
            !self.0.is_empty() && !self.0.chars().any(|c| c.is_whitespace() || c.is_control());
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidTopic(self.0.to_string()))
        }
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&Topic> for Topic {
    fn from(t: &Topic) -> Self {
        t.clone()
    }
}
