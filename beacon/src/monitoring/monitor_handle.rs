use std::fmt;

use tokio::sync::mpsc::Sender;

use crate::monitoring::{MonitorCommand, MonitorId};

/// Handle for controlling one registered monitor.
///
/// Returned by [`MonitorRegistry::add`](crate::monitoring::MonitorRegistry::add).
/// Dropping the handle leaves the monitor registered.
pub struct MonitorHandle<P> {
    id: MonitorId,
    sender: Sender<MonitorCommand<P>>,
}

impl<P> MonitorHandle<P> {
    pub(crate) fn new(id: MonitorId, sender: Sender<MonitorCommand<P>>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> MonitorId {
        self.id
    }

    /// Stop delivering callbacks to this monitor until [`resume`](Self::resume).
    pub async fn pause(&self) {
        let _ = self.sender.send(MonitorCommand::PauseOne(self.id)).await;
    }

    pub async fn resume(&self) {
        let _ = self.sender.send(MonitorCommand::ResumeOne(self.id)).await;
    }

    /// Unregister the monitor.
    pub async fn remove(self) {
        let _ = self.sender.send(MonitorCommand::RemoveMonitor(self.id)).await;
    }
}

impl<P> fmt::Debug for MonitorHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle").field("id", &self.id).finish()
    }
}
