use std::{fmt, sync::Arc};

use crate::{IntoOutput, Output, Result, Signals, Trigger};

/// Identifies one handler registration.
///
/// Returned by [`Hub::register`](crate::Hub::register) and used to remove
/// that exact registration later. Registering the same callable twice yields
/// two distinct ids, and both registrations fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reacts to a dispatch on a topic by producing zero or more items.
///
/// A handler is invoked once per dispatch burst whose topic and sender it
/// matches. It receives the [`Trigger`] by value and returns an [`Output`]
/// describing what it produces. The call itself should be quick: anything
/// slow belongs inside the returned future, stream or iterator, which the
/// hub drives concurrently with the other handlers of the burst.
///
/// Closures implement `Handler` directly when they return anything
/// [`IntoOutput`]:
///
/// ```rust
/// use beacon::{Hub, Output, Trigger};
///
/// let hub = Hub::<String>::default();
/// hub.on("greet", |t: Trigger| Some(format!("hello from {}", t.sender())))?;
/// hub.on("count", |_| Output::iter((1..=3).map(|n| n.to_string())))?;
/// # Ok::<(), beacon::Error>(())
/// ```
///
/// Implement the trait by hand for handlers that carry state:
///
/// ```rust
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use beacon::{Handler, Output, Result, Trigger};
///
/// struct Counter(AtomicU64);
///
/// impl Handler<u64> for Counter {
///     fn call(&self, _trigger: Trigger) -> Result<Output<u64>> {
///         Ok(Output::value(self.0.fetch_add(1, Ordering::Relaxed)))
///     }
///
///     fn name(&self) -> &str {
///         "counter"
///     }
/// }
/// ```
///
/// # Errors
///
/// An `Err` from `call`, an `Err` element of the produced sequence, or a
/// panic anywhere inside the handler fails only this handler. Sibling
/// handlers of the same burst keep running; see
/// [`FailurePolicy`](crate::FailurePolicy) for what happens to the failure.
pub trait Handler<P, S = Signals>: Send + Sync + 'static {
    fn call(&self, trigger: Trigger<S>) -> Result<Output<P>>;

    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<P, S, F, O> Handler<P, S> for F
where
    F: Fn(Trigger<S>) -> O + Send + Sync + 'static,
    O: IntoOutput<P>,
{
    fn call(&self, trigger: Trigger<S>) -> Result<Output<P>> {
        (self)(trigger).into_output()
    }
}

/// A handler with a readable name.
///
/// Created by [`named`].
pub struct Named<H> {
    name: Arc<str>,
    handler: H,
}

impl<P, S, H: Handler<P, S>> Handler<P, S> for Named<H> {
    fn call(&self, trigger: Trigger<S>) -> Result<Output<P>> {
        self.handler.call(trigger)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<H> fmt::Debug for Named<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Named").field("name", &self.name).finish()
    }
}

/// Attach a name to a closure handler.
///
/// Closure type names are unreadable in logs, so prefer this for anything
/// that may fail.
///
/// ```rust
/// use beacon::{Hub, handler};
///
/// let hub = Hub::<String>::default();
/// hub.register("msg", handler::named("echo", |t| Some(t.topic().to_string())))?;
/// # Ok::<(), beacon::Error>(())
/// ```
pub fn named<P, S, F, O>(name: &str, handler: F) -> Named<F>
where
    F: Fn(Trigger<S>) -> O + Send + Sync + 'static,
    O: IntoOutput<P>,
{
    Named {
        name: Arc::from(name),
        handler,
    }
}
