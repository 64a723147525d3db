use std::{borrow::Borrow, collections::HashSet, fmt, hash::Hash, sync::Arc};

use crate::{Error, Result, Topic};

/// Identity attached to a dispatch call.
///
/// The sender is used for optional filtering: handlers and client
/// subscriptions may restrict themselves to particular senders with a
/// [`SenderFilter`].
///
/// `SenderId` is cheap to clone. Equality uses string comparison with a
/// fast-path for pointer equality when ids share the same allocation.
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SenderId(Arc<str>);

impl SenderId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// The identity the hub uses for its own publications.
    pub fn system() -> Self {
        Self::new("system")
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for SenderId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SenderId {}

impl Hash for SenderId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for SenderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SenderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SenderId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&SenderId> for SenderId {
    fn from(s: &SenderId) -> Self {
        s.clone()
    }
}

/// Restricts which senders a handler or a subscription reacts to.
///
/// - [`SenderFilter::Any`] - every sender (the default)
/// - [`SenderFilter::One`] - exactly one sender
/// - [`SenderFilter::Set`] - any sender from a set
///
/// For convenience a `&str`, a [`SenderId`], or an array of either converts
/// into a filter:
///
/// ```
/// use beacon::{SenderFilter, SenderId};
///
/// let one: SenderFilter = "alice".into();
/// let many: SenderFilter = ["alice", "bob"].into();
///
/// assert!(one.matches(&SenderId::new("alice")));
/// assert!(!one.matches(&SenderId::new("bob")));
/// assert!(many.matches(&SenderId::new("bob")));
/// assert!(SenderFilter::Any.matches(&SenderId::new("anyone")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SenderFilter {
    #[default]
    Any,
    One(SenderId),
    Set(HashSet<SenderId>),
}

impl SenderFilter {
    /// Builds a filter from any collection of sender ids.
    ///
    /// A single id collapses to [`SenderFilter::One`].
    pub fn set<I, S>(senders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SenderId>,
    {
        let mut set: HashSet<SenderId> = senders.into_iter().map(Into::into).collect();
        if set.len() == 1 {
            if let Some(only) = set.drain().next() {
                return SenderFilter::One(only);
            }
        }
        SenderFilter::Set(set)
    }

    /// Whether items from `sender` pass this filter.
    pub fn matches(&self, sender: &SenderId) -> bool {
        match self {
            SenderFilter::Any => true,
            SenderFilter::One(id) => id == sender,
            SenderFilter::Set(ids) => ids.contains(sender),
        }
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self, SenderFilter::Any)
    }

    /// Rejects filters that can never match.
    pub(crate) fn validate(&self, topic: &Topic) -> Result<()> {
        match self {
            SenderFilter::Set(ids) if ids.is_empty() => {
                Err(Error::EmptySenderFilter(topic.clone()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SenderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderFilter::Any => write!(f, "*"),
            SenderFilter::One(id) => write!(f, "{id}"),
            SenderFilter::Set(ids) => {
                let mut names: Vec<&str> = ids.iter().map(SenderId::as_str).collect();
                names.sort_unstable();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

impl From<SenderId> for SenderFilter {
    fn from(id: SenderId) -> Self {
        SenderFilter::One(id)
    }
}

impl From<&SenderId> for SenderFilter {
    fn from(id: &SenderId) -> Self {
        SenderFilter::One(id.clone())
    }
}

impl From<&str> for SenderFilter {
    fn from(id: &str) -> Self {
        SenderFilter::One(SenderId::new(id))
    }
}

impl From<String> for SenderFilter {
    fn from(id: String) -> Self {
        SenderFilter::One(SenderId::from(id))
    }
}

impl<S: Into<SenderId>, const N: usize> From<[S; N]> for SenderFilter {
    fn from(ids: [S; N]) -> Self {
        SenderFilter::set(ids)
    }
}

impl<S: Into<SenderId>> From<Vec<S>> for SenderFilter {
    fn from(ids: Vec<S>) -> Self {
        SenderFilter::set(ids)
    }
}

impl From<HashSet<SenderId>> for SenderFilter {
    fn from(ids: HashSet<SenderId>) -> Self {
        SenderFilter::Set(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        let alice = SenderId::new("alice");
        let bob = SenderId::new("bob");

        assert!(SenderFilter::Any.matches(&alice));
        assert!(SenderFilter::from("alice").matches(&alice));
        assert!(!SenderFilter::from("alice").matches(&bob));

        let both = SenderFilter::from(["alice", "bob"]);
        assert!(both.matches(&alice));
        assert!(both.matches(&bob));
        assert!(!both.matches(&SenderId::new("carol")));
    }

    #[test]
    fn test_single_element_set_collapses() {
        assert_eq!(
            SenderFilter::set(["alice"]),
            SenderFilter::One(SenderId::new("alice"))
        );
        assert_eq!(
            SenderFilter::set(vec!["alice", "alice"]),
            SenderFilter::One(SenderId::new("alice"))
        );
    }

    #[test]
    fn test_empty_set_is_rejected() {
        let topic = Topic::new("msg");
        let empty = SenderFilter::set(Vec::<SenderId>::new());
        assert_eq!(
            empty.validate(&topic),
            Err(Error::EmptySenderFilter(topic.clone()))
        );
        assert!(SenderFilter::Any.validate(&topic).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(SenderFilter::Any.to_string(), "*");
        assert_eq!(SenderFilter::from("bob").to_string(), "bob");
        assert_eq!(
            SenderFilter::from(["bob", "alice"]).to_string(),
            "{alice, bob}"
        );
    }
}
