use std::{
    collections::HashMap,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    select,
    sync::{mpsc::Receiver, oneshot},
    time::Instant,
};

use crate::monitoring::{Monitor, MonitorCommand, MonitorId, MonitoringEvent};

struct MonitorEntry<P> {
    monitor: Box<dyn Monitor<P>>,
    paused: bool,
}

impl<P> MonitorEntry<P> {
    fn new(monitor: Box<dyn Monitor<P>>) -> Self {
        Self {
            monitor,
            paused: false,
        }
    }
}

/// Owns the registered monitors and calls them, one command at a time.
pub(crate) struct MonitorDispatcher<P> {
    receiver: Receiver<MonitorCommand<P>>,
    monitors: HashMap<MonitorId, MonitorEntry<P>>,
    last_id: MonitorId,
    ids_to_remove: Vec<MonitorId>,
    is_active: Arc<AtomicBool>,
    flush_pending: Option<(oneshot::Sender<()>, Duration)>,
    last_activity: Instant,
    is_alive: bool,
}

impl<P> MonitorDispatcher<P> {
    pub fn new(receiver: Receiver<MonitorCommand<P>>, is_active: Arc<AtomicBool>) -> Self {
        Self {
            receiver,
            monitors: HashMap::new(),
            last_id: 0,
            ids_to_remove: Vec::with_capacity(8),
            is_active,
            flush_pending: None,
            last_activity: Instant::now(),
            is_alive: true,
        }
    }

    fn update_is_active(&mut self) {
        let active = self.monitors.values().any(|m| !m.paused);
        self.is_active.store(active, Ordering::Relaxed);
    }

    fn remove_monitor(&mut self, id: MonitorId) {
        self.monitors.remove(&id);
        self.update_is_active();
    }

    fn set_monitor_paused(&mut self, id: MonitorId, paused: bool) {
        if let Some(entry) = self.monitors.get_mut(&id) {
            entry.paused = paused;
            self.update_is_active();
        }
    }

    fn set_monitors_paused_to_all(&mut self, paused: bool) {
        for entry in self.monitors.values_mut() {
            entry.paused = paused;
        }
        self.update_is_active();
    }

    fn try_complete_flush(&mut self) {
        if let Some((_, settle_window)) = &self.flush_pending {
            if self.receiver.is_empty() && self.last_activity.elapsed() >= *settle_window {
                if let Some((response, _)) = self.flush_pending.take() {
                    let _ = response.send(());
                }
            }
        }
    }

    pub async fn run(&mut self) {
        const FLUSH_CHECK_INTERVAL: Duration = Duration::from_micros(100);

        while self.is_alive {
            select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => {
                        self.last_activity = Instant::now();
                        self.handle_command(cmd);
                    }
                    None => self.is_alive = false,
                },
                _ = tokio::time::sleep(FLUSH_CHECK_INTERVAL), if self.flush_pending.is_some() => {
                    self.try_complete_flush();
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: MonitorCommand<P>) {
        use MonitorCommand::*;
        match cmd {
            AddMonitor(monitor, resp) => {
                let id = self.last_id;
                self.monitors.insert(id, MonitorEntry::new(monitor));
                self.last_id = self.last_id.wrapping_add(1);
                self.update_is_active();
                let _ = resp.send(id);
            }
            RemoveMonitor(id) => {
                self.remove_monitor(id);
            }
            PauseAll => {
                self.set_monitors_paused_to_all(true);
            }
            ResumeAll => {
                self.set_monitors_paused_to_all(false);
            }
            PauseOne(id) => {
                self.set_monitor_paused(id, true);
            }
            ResumeOne(id) => {
                self.set_monitor_paused(id, false);
            }
            DispatchEvent(event) if self.is_active.load(Ordering::Relaxed) => {
                self.handle_event(event);
            }
            Flush {
                response,
                settle_window,
            } => {
                self.flush_pending = Some((response, settle_window));
                self.try_complete_flush();
            }
            Shutdown => {
                self.is_alive = false;
            }
            _ => {}
        }
    }

    fn handle_event(&mut self, event: MonitoringEvent<P>) {
        use MonitoringEvent::*;
        match event {
            BurstStarted(burst_id, topic, sender, handlers) => {
                self.notify(|m| m.on_burst_started(burst_id, &topic, &sender, handlers));
            }
            BurstCompleted(summary) => {
                self.notify(|m| m.on_burst_completed(&summary));
            }
            ItemRouted(topic, sender, item, receivers) => {
                self.notify(|m| m.on_item_routed(&topic, &sender, &item, receivers));
            }
            HandlerFailed(burst_id, topic, error) => {
                self.notify(|m| m.on_handler_failed(burst_id, &topic, &error));
            }
            ClientConnected(client, topics) => {
                self.notify(|m| m.on_client_connected(&client, &topics));
            }
            ClientDisconnected(client) => {
                self.notify(|m| m.on_client_disconnected(&client));
            }
            Overflow(client, topic, policy) => {
                self.notify(|m| m.on_overflow(&client, &topic, policy));
            }
        }
    }

    fn notify(&mut self, f: impl Fn(&dyn Monitor<P>)) {
        for (id, entry) in &self.monitors {
            if entry.paused {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| f(entry.monitor.as_ref())));
            if result.is_err() {
                tracing::error!(monitor_id = %id, "Monitor panicked, removing");
                self.ids_to_remove.push(*id);
            }
        }

        while let Some(id) = self.ids_to_remove.pop() {
            self.remove_monitor(id);
        }
    }
}

impl<P> fmt::Debug for MonitorDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorDispatcher")
            .field("monitors.len()", &self.monitors.len())
            .field("last_id", &self.last_id)
            .field("is_active", &self.is_active)
            .field("flush_pending", &self.flush_pending.is_some())
            .field("is_alive", &self.is_alive)
            .finish()
    }
}
