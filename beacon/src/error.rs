use std::{any::Any, sync::Arc};

use crate::{ClientId, Topic};

/// The single error type for all beacon operations.
///
/// Every fallible API returns `beacon::Result<T>` (alias for
/// `Result<T, beacon::Error>`). The variants fall into three groups:
///
/// - registration errors ([`InvalidTopic`](Self::InvalidTopic),
///   [`EmptySenderFilter`](Self::EmptySenderFilter)) surface synchronously to
///   whoever registers a handler or a subscription;
/// - handler errors ([`Handler`](Self::Handler),
///   [`HandlerPanicked`](Self::HandlerPanicked)) are contained inside the
///   dispatch burst that produced them and never reach the dispatch caller;
/// - queue errors ([`QueueFull`](Self::QueueFull),
///   [`QueueClosed`](Self::QueueClosed)) are treated as an implicit client
///   disconnect.
///
/// The error is `Clone` so a handler failure can be routed to every
/// interested observer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Invalid topic name {0:?}")]
    InvalidTopic(String),

    #[error("Sender filter for topic '{0}' is an empty set")]
    EmptySenderFilter(Topic),

    #[error("Handler '{handler}' failed: {source}")]
    Handler {
        handler: Arc<str>,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    #[error("Handler '{handler}' panicked: {message}")]
    HandlerPanicked { handler: Arc<str>, message: String },

    #[error("Queue of client '{0}' is full")]
    QueueFull(ClientId),

    #[error("Queue of client '{0}' is closed")]
    QueueClosed(ClientId),

    #[error("The hub has been shut down")]
    HubShutdown,

    #[error("External error: {0}")]
    External(#[source] Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn external(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::External(Arc::new(e))
    }

    /// Wraps an error raised while calling or iterating a handler.
    pub fn handler(
        handler: impl Into<Arc<str>>,
        e: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Handler {
            handler: handler.into(),
            source: Arc::from(e.into()),
        }
    }

    pub(crate) fn panicked(handler: impl Into<Arc<str>>, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        Error::HandlerPanicked {
            handler: handler.into(),
            message,
        }
    }

    /// Attributes an anonymous error to the handler that produced it.
    ///
    /// Errors that already name a handler are returned unchanged.
    pub(crate) fn attribute(self, handler: &str) -> Self {
        match self {
            Error::External(source) => Error::Handler {
                handler: Arc::from(handler),
                source,
            },
            e @ (Error::Handler { .. } | Error::HandlerPanicked { .. }) => e,
            other => Error::Handler {
                handler: Arc::from(handler),
                source: Arc::new(other),
            },
        }
    }

    /// Returns `true` for errors raised while registering handlers or subscriptions.
    pub fn is_registration(&self) -> bool {
        matches!(self, Error::InvalidTopic(_) | Error::EmptySenderFilter(_))
    }

    /// Returns `true` for errors raised by a handler during a burst.
    pub fn is_handler(&self) -> bool {
        matches!(self, Error::Handler { .. } | Error::HandlerPanicked { .. })
    }

    /// Returns `true` for failed writes to a client queue.
    pub fn is_queue(&self) -> bool {
        matches!(self, Error::QueueFull(_) | Error::QueueClosed(_))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidTopic(a), Self::InvalidTopic(b)) => a == b,
            (Self::EmptySenderFilter(a), Self::EmptySenderFilter(b)) => a == b,
            (
                Self::Handler {
                    handler: h1,
                    source: s1,
                },
                Self::Handler {
                    handler: h2,
                    source: s2,
                },
            ) => h1 == h2 && Arc::ptr_eq(s1, s2),
            (
                Self::HandlerPanicked {
                    handler: h1,
                    message: m1,
                },
                Self::HandlerPanicked {
                    handler: h2,
                    message: m2,
                },
            ) => h1 == h2 && m1 == m2,
            (Self::QueueFull(a), Self::QueueFull(b)) => a == b,
            (Self::QueueClosed(a), Self::QueueClosed(b)) => a == b,
            (Self::HubShutdown, Self::HubShutdown) => true,
            (Self::External(a), Self::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}
