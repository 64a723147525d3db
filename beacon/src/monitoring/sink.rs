use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::sync::mpsc::Sender;

use crate::monitoring::{MonitorCommand, MonitoringEvent};

/// Producer side of the monitoring channel, held by the router and the
/// dispatcher.
pub(crate) struct MonitoringSink<P> {
    sender: Sender<MonitorCommand<P>>,
    is_active: Arc<AtomicBool>,
}

impl<P> MonitoringSink<P> {
    pub(crate) fn new(sender: Sender<MonitorCommand<P>>, is_active: Arc<AtomicBool>) -> Self {
        Self { sender, is_active }
    }

    /// `true` while at least one monitor is registered and not paused.
    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }

    /// Never waits: events are dropped when the channel is full.
    pub(crate) fn send(&self, event: MonitoringEvent<P>) {
        if self
            .sender
            .try_send(MonitorCommand::DispatchEvent(event))
            .is_err()
        {
            tracing::trace!("monitoring channel full or closed, event dropped");
        }
    }
}

impl<P> Clone for MonitoringSink<P> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            is_active: self.is_active.clone(),
        }
    }
}
