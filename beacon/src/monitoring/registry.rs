use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, atomic::AtomicBool},
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    Config, Error, Payload, Result,
    monitoring::{
        Monitor, MonitorCommand, MonitorDispatcher, MonitorHandle, MonitorId, MonitoringSink,
    },
};

/// Registry for managing monitors attached to a hub.
///
/// Access via [`Hub::monitors()`](crate::Hub::monitors). The dispatcher task
/// is spawned when the first monitor is added, so a hub can be built
/// outside a Tokio runtime.
///
/// # Example
///
/// ```ignore
/// let registry = hub.monitors();
///
/// // Add a monitor
/// let handle = registry.add(MyMonitor).await?;
///
/// // Pause all monitors
/// registry.pause().await;
///
/// // Resume all monitors
/// registry.resume().await;
/// ```
pub struct MonitorRegistry<P> {
    dispatcher: Mutex<Option<MonitorDispatcher<P>>>,
    dispatcher_handle: Mutex<Option<JoinHandle<()>>>,
    sender: mpsc::Sender<MonitorCommand<P>>,
    is_active: Arc<AtomicBool>,
}

impl<P: Payload> MonitorRegistry<P> {
    pub(crate) fn new(config: &Config) -> Self {
        let (tx, rx) = mpsc::channel(config.monitoring_channel_capacity());
        let is_active = Arc::new(AtomicBool::new(false));
        let dispatcher = MonitorDispatcher::new(rx, is_active.clone());
        Self {
            sender: tx,
            dispatcher: Mutex::new(Some(dispatcher)),
            dispatcher_handle: Mutex::new(None),
            is_active,
        }
    }

    /// Spawn the dispatcher task unless it is already running.
    fn ensure_started(&self) {
        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut dispatcher) = dispatcher {
            let handle = tokio::spawn(async move {
                dispatcher.run().await;
            });
            *self
                .dispatcher_handle
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(handle);
        }
    }

    pub(crate) async fn stop(&self) {
        let handle = self
            .dispatcher_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match (self.sender.send(MonitorCommand::Shutdown).await, handle) {
            (Ok(_), Some(handle)) => {
                let _ = handle.await;
            }
            (Err(_), Some(handle)) => {
                handle.abort();
            }
            _ => {}
        }
    }

    pub(crate) fn sink(&self) -> MonitoringSink<P> {
        MonitoringSink::new(self.sender.clone(), self.is_active.clone())
    }

    /// Register a new monitor and return a handle for controlling it.
    ///
    /// The monitor starts in the active (non-paused) state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HubShutdown`] if the monitoring task has stopped.
    pub async fn add<M: Monitor<P> + 'static>(&self, monitor: M) -> Result<MonitorHandle<P>> {
        self.ensure_started();
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::AddMonitor(Box::new(monitor), tx))
            .await
            .map_err(|_| Error::HubShutdown)?;
        let id = rx.await.map_err(|_| Error::HubShutdown)?;
        Ok(MonitorHandle::new(id, self.sender.clone()))
    }

    /// Remove a monitor by its ID.
    ///
    /// Prefer using [`MonitorHandle::remove()`] instead.
    pub async fn remove(&self, id: MonitorId) {
        let _ = self.sender.send(MonitorCommand::RemoveMonitor(id)).await;
    }

    /// Pause all registered monitors.
    ///
    /// Paused monitors do not receive callbacks. Items continue to flow
    /// through the hub normally.
    pub async fn pause(&self) {
        let _ = self.sender.send(MonitorCommand::PauseAll).await;
    }

    /// Resume all registered monitors.
    pub async fn resume(&self) {
        let _ = self.sender.send(MonitorCommand::ResumeAll).await;
    }

    /// Wait until every queued monitoring event has been delivered.
    ///
    /// Completes once the monitoring queue has been empty for
    /// `settle_window`. Returns immediately when no monitor was ever added.
    pub async fn flush(&self, settle_window: Duration) {
        let started = self
            .dispatcher_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        if !started {
            return;
        }
        let (tx, rx) = oneshot::channel();
        let flush = MonitorCommand::Flush {
            response: tx,
            settle_window,
        };
        if self.sender.send(flush).await.is_ok() {
            let _ = rx.await;
        }
    }
}

impl<P> Drop for MonitorRegistry<P> {
    fn drop(&mut self) {
        if !self.sender.is_closed() {
            let _ = self.sender.try_send(MonitorCommand::Shutdown);
        }
        let handle = self
            .dispatcher_handle
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl<P> fmt::Debug for MonitorRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}
