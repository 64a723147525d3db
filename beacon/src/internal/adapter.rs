use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use futures_util::{
    FutureExt, StreamExt, future,
    stream::{self, BoxStream},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{Error, Output, Payload, Result, output::Step};

/// Turn any handler output into one asynchronous sequence of items.
///
/// `None` steps are dropped here, so the dispatcher only ever sees real
/// items and failures. The shape of the output never causes an error.
pub(crate) fn into_stream<P: Payload>(
    output: Output<P>,
    handler: Arc<str>,
    bridge_capacity: usize,
) -> BoxStream<'static, Result<P>> {
    let steps: BoxStream<'static, Step<P>> = match output {
        Output::Empty => stream::empty().boxed(),
        Output::Value(value) => stream::once(future::ready(Ok(Some(value)))).boxed(),
        Output::Future(fut) => fut.into_stream().boxed(),
        Output::Iter(iter) => bridge(iter, handler, bridge_capacity),
        Output::Stream(steps) => steps,
    };
    steps
        .filter_map(|step| future::ready(step.transpose()))
        .boxed()
}

/// Drive a blocking iterator on the blocking pool.
///
/// The worker only touches its own hand-off channel. It stops after the
/// first error, on panic, or as soon as the consuming side is gone.
fn bridge<P: Payload>(
    mut iter: Box<dyn Iterator<Item = Step<P>> + Send>,
    handler: Arc<str>,
    capacity: usize,
) -> BoxStream<'static, Step<P>> {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    tokio::task::spawn_blocking(move || {
        loop {
            let step = match catch_unwind(AssertUnwindSafe(|| iter.next())) {
                Ok(Some(step)) => step,
                Ok(None) => break,
                Err(panic) => Err(Error::panicked(handler.clone(), panic)),
            };
            let last = step.is_err();
            if tx.blocking_send(step).is_err() || last {
                break;
            }
        }
        tracing::trace!(handler = %handler, "blocking iterator finished");
    });

    ReceiverStream::new(rx).boxed()
}
