use std::{fmt, sync::Arc};

use crate::{BurstId, Error};

/// The unit carried through every client queue.
///
/// Handlers produce opaque payloads; the router wraps them in `Item::Value`
/// and shares one `Arc` across all receiving clients. Besides payloads a
/// queue may carry the two internal markers of a dispatch burst:
///
/// - [`Item::Failure`] - a contained handler failure, routed only when the
///   hub runs with [`FailurePolicy::Route`](crate::FailurePolicy::Route)
/// - [`Item::BurstEnd`] - the burst-completion sentinel
///
/// Client streams recognise both markers and never yield them to their
/// consumer.
pub enum Item<P> {
    Value(Arc<P>),
    Failure(Error),
    BurstEnd(BurstId),
}

impl<P> Item<P> {
    /// Returns the payload when this item carries one.
    pub fn value(&self) -> Option<&Arc<P>> {
        match self {
            Item::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` for markers that must not reach a stream consumer.
    #[inline]
    pub fn is_internal(&self) -> bool {
        !matches!(self, Item::Value(_))
    }
}

impl<P> Clone for Item<P> {
    fn clone(&self) -> Self {
        match self {
            Item::Value(v) => Item::Value(v.clone()),
            Item::Failure(e) => Item::Failure(e.clone()),
            Item::BurstEnd(id) => Item::BurstEnd(*id),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for Item<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Item::Failure(e) => f.debug_tuple("Failure").field(e).finish(),
            Item::BurstEnd(id) => f.debug_tuple("BurstEnd").field(id).finish(),
        }
    }
}

impl<P> From<P> for Item<P> {
    fn from(value: P) -> Self {
        Item::Value(Arc::new(value))
    }
}
