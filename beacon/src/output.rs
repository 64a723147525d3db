use std::{fmt, future::Future, sync::Arc};

use futures_util::{
    FutureExt, Stream, StreamExt,
    future::BoxFuture,
    stream::BoxStream,
};

use crate::{Error, Payload, Result};

/// One step of a handler's output: an item, a skipped `None`, or a failure.
pub(crate) type Step<P> = Result<Option<P>>;

/// What a handler produced, before the hub turns it into a stream of items.
///
/// A handler may produce zero or more items, synchronously or
/// asynchronously. `Output` names each shape explicitly so the dispatcher
/// can consume all of them the same way:
///
/// | Shape | Constructor | Items |
/// |-------|-------------|-------|
/// | nothing | [`Output::none`] | none |
/// | plain value | [`Output::value`] | one, or none for `None` |
/// | future | [`Output::future`], [`Output::try_future`] | the resolved value |
/// | blocking iterator | [`Output::iter`], [`Output::try_iter`] | each element, pulled on a blocking worker |
/// | async stream | [`Output::stream`], [`Output::try_stream`] | each element |
///
/// Every constructor accepts `P` or `Option<P>` elements. `None` elements
/// are dropped and never reach a client.
///
/// ```
/// use beacon::Output;
///
/// let one: Output<String> = Output::value("hello".to_string());
/// let nothing: Output<String> = Output::value(None);
/// let many = Output::<String>::iter(vec!["a".to_string(), "b".to_string()]);
/// let later = Output::<String>::future(async { Some("done".to_string()) });
/// # let _ = (one, nothing, many, later);
/// ```
pub enum Output<P> {
    Empty,
    Value(P),
    Future(BoxFuture<'static, Step<P>>),
    Iter(Box<dyn Iterator<Item = Step<P>> + Send>),
    Stream(BoxStream<'static, Step<P>>),
}

impl<P: Payload> Output<P> {
    pub fn none() -> Self {
        Output::Empty
    }

    pub fn value(value: impl Into<Option<P>>) -> Self {
        match value.into() {
            Some(v) => Output::Value(v),
            None => Output::Empty,
        }
    }

    /// Resolve a future to a single item.
    pub fn future<F, V>(future: F) -> Self
    where
        F: Future<Output = V> + Send + 'static,
        V: Into<Option<P>>,
    {
        Output::Future(future.map(|v| Ok(v.into())).boxed())
    }

    /// Resolve a fallible future to a single item.
    pub fn try_future<F, V, E>(future: F) -> Self
    where
        F: Future<Output = std::result::Result<V, E>> + Send + 'static,
        V: Into<Option<P>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Output::Future(
            future
                .map(|r| r.map(Into::into).map_err(into_error))
                .boxed(),
        )
    }

    /// Produce every element of a blocking iterator.
    ///
    /// The iterator is advanced on a blocking worker thread and handed over
    /// through a bounded channel, so a slow `next()` never stalls other
    /// handlers of the same burst.
    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Send + 'static,
        I::Item: Into<Option<P>>,
    {
        Output::Iter(Box::new(iter.into_iter().map(|v| Ok(v.into()))))
    }

    /// Like [`Output::iter`], but the first `Err` element fails the handler.
    pub fn try_iter<I, V, E>(iter: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<V, E>>,
        I::IntoIter: Send + 'static,
        V: Into<Option<P>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Output::Iter(Box::new(
            iter.into_iter()
                .map(|r| r.map(Into::into).map_err(into_error)),
        ))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream + Send + 'static,
        S::Item: Into<Option<P>>,
    {
        Output::Stream(stream.map(|v| Ok(v.into())).boxed())
    }

    /// Like [`Output::stream`], but the first `Err` element fails the handler.
    pub fn try_stream<S, V, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<V, E>> + Send + 'static,
        V: Into<Option<P>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Output::Stream(
            stream
                .map(|r| r.map(Into::into).map_err(into_error))
                .boxed(),
        )
    }

    /// Name of the shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Output::Empty => "empty",
            Output::Value(_) => "value",
            Output::Future(_) => "future",
            Output::Iter(_) => "iter",
            Output::Stream(_) => "stream",
        }
    }
}

impl<P> fmt::Debug for Output<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Output::Empty => "Empty",
            Output::Value(_) => "Value",
            Output::Future(_) => "Future",
            Output::Iter(_) => "Iter",
            Output::Stream(_) => "Stream",
        };
        f.debug_tuple("Output").field(&kind).finish()
    }
}

fn into_error(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error::External(Arc::from(e.into()))
}

/// Conversion from a handler's return value into an [`Output`].
///
/// Lets closures return whatever reads best:
///
/// - `Output<P>` - any shape
/// - `Option<P>` - a single optional item
/// - `()` - nothing (a pure side-effect handler)
/// - `Result<Output<P>, E>` - a handler that can fail before producing
pub trait IntoOutput<P> {
    fn into_output(self) -> Result<Output<P>>;
}

impl<P> IntoOutput<P> for Output<P> {
    fn into_output(self) -> Result<Output<P>> {
        Ok(self)
    }
}

impl<P> IntoOutput<P> for Option<P> {
    fn into_output(self) -> Result<Output<P>> {
        Ok(match self {
            Some(v) => Output::Value(v),
            None => Output::Empty,
        })
    }
}

impl<P> IntoOutput<P> for () {
    fn into_output(self) -> Result<Output<P>> {
        Ok(Output::Empty)
    }
}

impl<P, E> IntoOutput<P> for std::result::Result<Output<P>, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn into_output(self) -> Result<Output<P>> {
        self.map_err(into_error)
    }
}
