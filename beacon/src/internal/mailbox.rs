use tokio::sync::mpsc::{self, error::TrySendError};

use crate::Item;

/// Why a push into a mailbox failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PushError {
    Full,
    Closed,
}

/// Sending half of a client queue, bounded or unbounded.
pub(crate) enum Mailbox<P> {
    Bounded(mpsc::Sender<Item<P>>),
    Unbounded(mpsc::UnboundedSender<Item<P>>),
}

pub(crate) enum MailboxReceiver<P> {
    Bounded(mpsc::Receiver<Item<P>>),
    Unbounded(mpsc::UnboundedReceiver<Item<P>>),
}

/// Create a client queue. `None` capacity means unbounded.
pub(crate) fn mailbox<P>(capacity: Option<usize>) -> (Mailbox<P>, MailboxReceiver<P>) {
    match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (Mailbox::Bounded(tx), MailboxReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Mailbox::Unbounded(tx), MailboxReceiver::Unbounded(rx))
        }
    }
}

impl<P> Mailbox<P> {
    /// Never waits.
    pub(crate) fn try_send(&self, item: Item<P>) -> Result<(), PushError> {
        match self {
            Mailbox::Bounded(tx) => tx.try_send(item).map_err(|e| match e {
                TrySendError::Full(_) => PushError::Full,
                TrySendError::Closed(_) => PushError::Closed,
            }),
            Mailbox::Unbounded(tx) => tx.send(item).map_err(|_| PushError::Closed),
        }
    }
}

impl<P> MailboxReceiver<P> {
    pub(crate) async fn recv(&mut self) -> Option<Item<P>> {
        match self {
            MailboxReceiver::Bounded(rx) => rx.recv().await,
            MailboxReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<Item<P>> {
        match self {
            MailboxReceiver::Bounded(rx) => rx.try_recv().ok(),
            MailboxReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            MailboxReceiver::Bounded(rx) => rx.len(),
            MailboxReceiver::Unbounded(rx) => rx.len(),
        }
    }
}
