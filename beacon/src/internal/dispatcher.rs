use std::{panic::AssertUnwindSafe, sync::Arc};

use futures_util::{FutureExt, StreamExt, future::join_all};

use super::{Router, into_stream};
use crate::{
    BurstId, BurstSummary, Error, FailurePolicy, Handler, Item, Payload, SenderId, Topic,
    TopicRegistry, Trigger,
};

#[cfg(feature = "monitoring")]
use crate::monitoring::{MonitoringEvent, MonitoringSink};

/// How one handler of a burst ended.
struct Settled {
    items: usize,
    failed: bool,
}

/// Runs dispatch bursts: every matching handler concurrently, each item
/// routed the moment it is produced, the completion marker routed last.
pub(crate) struct Dispatcher<P, S> {
    registry: Arc<TopicRegistry<P, S>>,
    router: Arc<Router<P>>,
    failure_policy: FailurePolicy,
    bridge_capacity: usize,

    #[cfg(feature = "monitoring")]
    monitoring: MonitoringSink<P>,
}

impl<P: Payload, S: Payload> Dispatcher<P, S> {
    pub(crate) fn new(
        registry: Arc<TopicRegistry<P, S>>,
        router: Arc<Router<P>>,
        failure_policy: FailurePolicy,
        bridge_capacity: usize,
        #[cfg(feature = "monitoring")] monitoring: MonitoringSink<P>,
    ) -> Self {
        Self {
            registry,
            router,
            failure_policy,
            bridge_capacity,
            #[cfg(feature = "monitoring")]
            monitoring,
        }
    }

    /// Run one burst to completion.
    ///
    /// Handler failures are contained and counted; they never abort the
    /// burst or reach the caller.
    pub(crate) async fn run(
        &self,
        burst_id: BurstId,
        topic: Topic,
        sender: SenderId,
        signals: Arc<S>,
    ) -> BurstSummary {
        let handlers = self.registry.handlers_for(&topic, &sender);

        tracing::trace!(burst_id = %burst_id, topic = %topic, sender = %sender, handlers = handlers.len(), "burst started");
        #[cfg(feature = "monitoring")]
        self.record_started(burst_id, &topic, &sender, handlers.len());

        let runs = handlers.iter().map(|handler| {
            let trigger = Trigger::new(burst_id, topic.clone(), sender.clone(), signals.clone());
            self.run_handler(handler.clone(), trigger)
        });
        let settled = join_all(runs).await;

        self.router.route(&topic, &sender, &Item::BurstEnd(burst_id));

        let summary = BurstSummary {
            burst_id,
            topic,
            sender,
            handlers: handlers.len(),
            items: settled.iter().map(|s| s.items).sum(),
            failures: settled.iter().filter(|s| s.failed).count(),
        };

        tracing::debug!(
            burst_id = %summary.burst_id,
            topic = %summary.topic,
            handlers = summary.handlers,
            items = summary.items,
            failures = summary.failures,
            "burst completed"
        );
        #[cfg(feature = "monitoring")]
        self.record_completed(&summary);

        summary
    }

    async fn run_handler(&self, handler: Arc<dyn Handler<P, S>>, trigger: Trigger<S>) -> Settled {
        let name: Arc<str> = Arc::from(handler.name());
        let burst_id = trigger.burst_id();
        let topic = trigger.topic().clone();
        let sender = trigger.sender().clone();
        let mut items = 0;

        let run = async {
            let output = handler.call(trigger)?;
            let mut produced = into_stream(output, name.clone(), self.bridge_capacity);
            while let Some(item) = produced.next().await {
                let item = Item::from(item?);
                items += 1;
                self.router.route(&topic, &sender, &item);
            }
            Ok::<_, Error>(())
        };

        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result.map_err(|e| e.attribute(&name)),
            Err(panic) => Err(Error::panicked(name.clone(), panic)),
        };

        match result {
            Ok(()) => Settled {
                items,
                failed: false,
            },
            Err(error) => {
                self.handle_failure(burst_id, &topic, &sender, error);
                Settled {
                    items,
                    failed: true,
                }
            }
        }
    }

    fn handle_failure(&self, burst_id: BurstId, topic: &Topic, sender: &SenderId, error: Error) {
        tracing::warn!(burst_id = %burst_id, topic = %topic, sender = %sender, error = %error, "handler failed");

        #[cfg(feature = "monitoring")]
        self.record_failed(burst_id, topic, &error);

        if self.failure_policy == FailurePolicy::Route {
            self.router.route(topic, sender, &Item::Failure(error));
        }
    }
}

#[cfg(feature = "monitoring")]
impl<P: Payload, S: Payload> Dispatcher<P, S> {
    fn record_started(&self, burst_id: BurstId, topic: &Topic, sender: &SenderId, handlers: usize) {
        if self.monitoring.is_active() {
            self.monitoring.send(MonitoringEvent::BurstStarted(
                burst_id,
                topic.clone(),
                sender.clone(),
                handlers,
            ));
        }
    }

    fn record_completed(&self, summary: &BurstSummary) {
        if self.monitoring.is_active() {
            self.monitoring
                .send(MonitoringEvent::BurstCompleted(summary.clone()));
        }
    }

    fn record_failed(&self, burst_id: BurstId, topic: &Topic, error: &Error) {
        if self.monitoring.is_active() {
            self.monitoring.send(MonitoringEvent::HandlerFailed(
                burst_id,
                topic.clone(),
                error.clone(),
            ));
        }
    }
}
