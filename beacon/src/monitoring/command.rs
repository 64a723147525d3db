use std::time::Duration;

use tokio::sync::oneshot;

use crate::monitoring::{Monitor, MonitorId, MonitoringEvent};

pub(crate) enum MonitorCommand<P> {
    AddMonitor(Box<dyn Monitor<P>>, oneshot::Sender<MonitorId>),
    RemoveMonitor(MonitorId),
    PauseAll,
    ResumeAll,
    PauseOne(MonitorId),
    ResumeOne(MonitorId),
    DispatchEvent(MonitoringEvent<P>),
    /// Flush waits for the command queue to be empty and stay empty for the
    /// specified settle window before responding.
    Flush {
        response: oneshot::Sender<()>,
        settle_window: Duration,
    },
    Shutdown,
}
