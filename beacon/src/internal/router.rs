use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};

use tokio_util::sync::CancellationToken;

use super::{ClientState, PushOutcome};
use crate::{ClientId, Error, Item, Result, RoutingMode, SenderFilter, SenderId, Topic};

#[cfg(feature = "monitoring")]
use crate::monitoring::{MonitoringEvent, MonitoringSink};

struct Subscriber<P> {
    filter: SenderFilter,
    client: Weak<ClientState<P>>,
}

impl<P> Subscriber<P> {
    fn is(&self, state: &Arc<ClientState<P>>) -> bool {
        std::ptr::eq(self.client.as_ptr(), Arc::as_ptr(state))
    }
}

struct Table<P> {
    topics: HashMap<Topic, HashMap<ClientId, Subscriber<P>>>,
    active: HashMap<ClientId, Weak<ClientState<P>>>,
}

impl<P> Table<P> {
    fn remove_subscriber(&mut self, topic: &Topic, state: &Arc<ClientState<P>>) -> bool {
        let Some(subscribers) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = match subscribers.get(state.id()) {
            Some(sub) if sub.is(state) => subscribers.remove(state.id()).is_some(),
            _ => false,
        };
        if subscribers.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    /// Drop `state` from every index. Returns `false` if it was not connected.
    fn detach(&mut self, state: &Arc<ClientState<P>>) -> bool {
        if !state.end() {
            return false;
        }
        for topic in state.take_subscriptions().keys() {
            self.remove_subscriber(topic, state);
        }
        if let Some(weak) = self.active.get(state.id()) {
            if std::ptr::eq(weak.as_ptr(), Arc::as_ptr(state)) {
                self.active.remove(state.id());
            }
        }
        true
    }
}

/// Places routed items into client queues.
///
/// Holds only `Weak` references: a client's lifetime belongs to its
/// [`Client`](crate::Client) handle. Routing takes the read lock and never
/// waits on a queue; clients whose write fails are collected and
/// disconnected after the lock is released.
///
/// Lock order: router table, then client lifecycle, then client plan and
/// subscriptions.
pub(crate) struct Router<P> {
    table: RwLock<Table<P>>,
    mode: RoutingMode,
    token: CancellationToken,

    #[cfg(feature = "monitoring")]
    monitoring: MonitoringSink<P>,
}

impl<P: Send + Sync + 'static> Router<P> {
    pub(crate) fn new(
        mode: RoutingMode,
        token: CancellationToken,
        #[cfg(feature = "monitoring")] monitoring: MonitoringSink<P>,
    ) -> Self {
        Self {
            table: RwLock::new(Table {
                topics: HashMap::new(),
                active: HashMap::new(),
            }),
            mode,
            token,
            #[cfg(feature = "monitoring")]
            monitoring,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Table<P>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table<P>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect `state` and open the subscriptions its plan resolves to.
    ///
    /// Returns `Ok(false)` when the client was already connected. A live
    /// client with the same id is disconnected first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HubShutdown`] once the hub has been shut down.
    pub(crate) fn connect(&self, state: &Arc<ClientState<P>>, known: &[Topic]) -> Result<bool> {
        if self.token.is_cancelled() {
            return Err(Error::HubShutdown);
        }

        let mut table = self.write();
        if state.is_connected() {
            return Ok(false);
        }

        let previous = table.active.get(state.id()).and_then(Weak::upgrade);
        let replaced = match previous {
            Some(previous) if !Arc::ptr_eq(&previous, state) => table.detach(&previous),
            _ => false,
        };

        state.begin(self.token.child_token());
        let subscriptions = state.with_plan(|plan| plan.resolve(known));
        for (topic, filter) in &subscriptions {
            table.topics.entry(topic.clone()).or_default().insert(
                state.id().clone(),
                Subscriber {
                    filter: filter.clone(),
                    client: Arc::downgrade(state),
                },
            );
            state.set_subscription(topic.clone(), filter.clone());
        }
        table
            .active
            .insert(state.id().clone(), Arc::downgrade(state));
        drop(table);

        if replaced {
            tracing::warn!(client = %state.id(), "client id reused, previous connection closed");
            #[cfg(feature = "monitoring")]
            self.record_disconnected(state.id());
        }

        let mut topics: Vec<Topic> = subscriptions.into_keys().collect();
        topics.sort();
        tracing::debug!(client = %state.id(), topics = ?topics, "client connected");

        #[cfg(feature = "monitoring")]
        self.record_connected(state.id(), topics);

        Ok(true)
    }

    /// Disconnect `state`. Returns `false` if it was not connected.
    pub(crate) fn disconnect(&self, state: &Arc<ClientState<P>>) -> bool {
        let detached = self.write().detach(state);
        if detached {
            tracing::debug!(client = %state.id(), "client disconnected");
            #[cfg(feature = "monitoring")]
            self.record_disconnected(state.id());
        }
        detached
    }

    /// Disconnect every active client. Returns how many were connected.
    pub(crate) fn disconnect_all(&self) -> usize {
        let clients: Vec<_> = self
            .read()
            .active
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        clients
            .iter()
            .filter(|state| self.disconnect(state))
            .count()
    }

    /// Open or replace one subscription of a connected client.
    ///
    /// The client's plan must already contain the topic.
    pub(crate) fn subscribe(&self, state: &Arc<ClientState<P>>, topic: &Topic, filter: &SenderFilter) -> bool {
        let mut table = self.write();
        if !state.is_connected() {
            return false;
        }
        table.topics.entry(topic.clone()).or_default().insert(
            state.id().clone(),
            Subscriber {
                filter: filter.clone(),
                client: Arc::downgrade(state),
            },
        );
        state.set_subscription(topic.clone(), filter.clone());
        tracing::trace!(client = %state.id(), topic = %topic, senders = %filter, "subscribed");
        true
    }

    /// Close one subscription. Returns `false` if it was not open.
    pub(crate) fn unsubscribe(&self, state: &Arc<ClientState<P>>, topic: &Topic) -> bool {
        let mut table = self.write();
        let removed = table.remove_subscriber(topic, state);
        state.remove_subscription(topic);
        if removed {
            tracing::trace!(client = %state.id(), topic = %topic, "unsubscribed");
        }
        removed
    }

    /// Push `item` to every client that should see it.
    ///
    /// Returns the number of clients whose queue accepted the item.
    pub(crate) fn route(&self, topic: &Topic, sender: &SenderId, item: &Item<P>) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        let mut stale = false;

        {
            let table = self.read();
            match self.mode {
                RoutingMode::Topics => {
                    if let Some(subscribers) = table.topics.get(topic) {
                        for sub in subscribers.values() {
                            if !sub.filter.matches(sender) {
                                continue;
                            }
                            match sub.client.upgrade() {
                                Some(client) => {
                                    self.deliver(client, topic, item, &mut delivered, &mut failed)
                                }
                                None => stale = true,
                            }
                        }
                    }
                }
                RoutingMode::Broadcast => {
                    for weak in table.active.values() {
                        match weak.upgrade() {
                            Some(client) if client.is_muted(topic) => {}
                            Some(client) => {
                                self.deliver(client, topic, item, &mut delivered, &mut failed)
                            }
                            None => stale = true,
                        }
                    }
                }
            }
        }

        for (client, error) in failed {
            tracing::warn!(client = %client.id(), topic = %topic, error = %error, "queue write failed, disconnecting client");
            self.disconnect(&client);
        }

        if stale {
            self.prune();
        }

        if !item.is_internal() {
            tracing::trace!(topic = %topic, sender = %sender, receivers = delivered, "item routed");

            #[cfg(feature = "monitoring")]
            self.record_item_routed(topic, sender, item, delivered);
        }

        delivered
    }

    fn deliver(
        &self,
        client: Arc<ClientState<P>>,
        topic: &Topic,
        item: &Item<P>,
        delivered: &mut usize,
        failed: &mut Vec<(Arc<ClientState<P>>, Error)>,
    ) {
        match client.push(item.clone()) {
            PushOutcome::Delivered => *delivered += 1,
            PushOutcome::Inactive => {}
            PushOutcome::Dropped => {
                tracing::debug!(client = %client.id(), topic = %topic, "queue full, item dropped");
                #[cfg(feature = "monitoring")]
                self.record_overflow(&client, topic);
            }
            PushOutcome::Failed(error) => {
                #[cfg(feature = "monitoring")]
                self.record_failed_push(&client, topic, &error);
                failed.push((client, error));
            }
        }
    }

    /// Forget references to clients that were dropped without disconnecting.
    fn prune(&self) {
        let mut table = self.write();
        table.active.retain(|_, weak| weak.strong_count() > 0);
        table.topics.retain(|_, subscribers| {
            subscribers.retain(|_, sub| sub.client.strong_count() > 0);
            !subscribers.is_empty()
        });
    }

    /// Ids of connected clients, sorted.
    pub(crate) fn active_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self
            .read()
            .active
            .iter()
            .filter(|(_, weak)| weak.upgrade().is_some_and(|c| c.is_connected()))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn is_active(&self, id: &ClientId) -> bool {
        self.read()
            .active
            .get(id)
            .and_then(Weak::upgrade)
            .is_some_and(|c| c.is_connected())
    }

    /// Number of live subscriptions to `topic`.
    pub(crate) fn subscriber_count(&self, topic: &Topic) -> usize {
        self.read().topics.get(topic).map_or(0, |subscribers| {
            subscribers
                .values()
                .filter(|sub| sub.client.strong_count() > 0)
                .count()
        })
    }

    /// Topics with at least one subscriber, sorted.
    pub(crate) fn known_topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.read().topics.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Every connected client with its subscribed topics, sorted by id.
    pub(crate) fn subscriptions(&self) -> Vec<(ClientId, Vec<Topic>)> {
        let clients: Vec<_> = self
            .read()
            .active
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        let mut all: Vec<_> = clients
            .iter()
            .map(|client| {
                let mut topics: Vec<Topic> = client.subscriptions().into_keys().collect();
                topics.sort();
                (client.id().clone(), topics)
            })
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(feature = "monitoring")]
impl<P: Send + Sync + 'static> Router<P> {
    fn record_connected(&self, id: &ClientId, topics: Vec<Topic>) {
        if self.monitoring.is_active() {
            self.monitoring
                .send(MonitoringEvent::ClientConnected(id.clone(), topics));
        }
    }

    fn record_item_routed(&self, topic: &Topic, sender: &SenderId, item: &Item<P>, receivers: usize) {
        if let (true, Some(value)) = (self.monitoring.is_active(), item.value()) {
            self.monitoring.send(MonitoringEvent::ItemRouted(
                topic.clone(),
                sender.clone(),
                value.clone(),
                receivers,
            ));
        }
    }

    fn record_disconnected(&self, id: &ClientId) {
        if self.monitoring.is_active() {
            self.monitoring
                .send(MonitoringEvent::ClientDisconnected(id.clone()));
        }
    }

    fn record_failed_push(&self, client: &ClientState<P>, topic: &Topic, error: &Error) {
        if let Error::QueueFull(_) = error {
            self.record_overflow(client, topic);
        }
    }

    #[inline]
    fn record_overflow(&self, client: &ClientState<P>, topic: &Topic) {
        if self.monitoring.is_active() {
            self.monitoring.send(MonitoringEvent::Overflow(
                client.id().clone(),
                topic.clone(),
                client.overflow(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        OverflowPolicy,
        internal::{MailboxReceiver, Plan, mailbox},
    };

    fn router(mode: RoutingMode) -> Router<u32> {
        Router::new(
            mode,
            CancellationToken::new(),
            #[cfg(feature = "monitoring")]
            crate::monitoring::MonitorRegistry::new(&crate::Config::default()).sink(),
        )
    }

    fn client(id: &str, topics: &[&str]) -> (Arc<ClientState<u32>>, MailboxReceiver<u32>) {
        client_with(id, topics, Some(8), OverflowPolicy::Disconnect)
    }

    fn client_with(
        id: &str,
        topics: &[&str],
        capacity: Option<usize>,
        overflow: OverflowPolicy,
    ) -> (Arc<ClientState<u32>>, MailboxReceiver<u32>) {
        let (tx, rx) = mailbox(capacity);
        let plan = Plan {
            explicit: topics
                .iter()
                .map(|t| (Topic::new(t), SenderFilter::Any))
                .collect(),
            ..Plan::default()
        };
        (
            Arc::new(ClientState::new(ClientId::new(id), overflow, tx, plan)),
            rx,
        )
    }

    fn drain(rx: &mut MailboxReceiver<u32>) -> Vec<u32> {
        let mut values = Vec::new();
        while let Some(item) = rx.try_recv() {
            if let Some(v) = item.value() {
                values.push(**v);
            }
        }
        values
    }

    fn alice() -> SenderId {
        SenderId::new("alice")
    }

    #[test]
    fn test_route_reaches_only_subscribers() {
        let router = router(RoutingMode::Topics);
        let (a, mut rx_a) = client("a", &["msg"]);
        let (b, mut rx_b) = client("b", &["msg", "other"]);
        let (c, mut rx_c) = client("c", &["other"]);
        for state in [&a, &b, &c] {
            assert_eq!(router.connect(state, &[]), Ok(true));
        }
        assert_eq!(router.known_topics(), vec![Topic::new("msg"), Topic::new("other")]);

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 2);
        assert_eq!(drain(&mut rx_a), vec![1]);
        assert_eq!(drain(&mut rx_b), vec![1]);
        assert!(drain(&mut rx_c).is_empty());
    }

    #[test]
    fn test_sender_filter_applies_per_subscription() {
        let router = router(RoutingMode::Topics);
        let (a, mut rx_a) = client("a", &[]);
        router.connect(&a, &[]).unwrap();
        a.with_plan(|p| p.explicit.insert(Topic::new("msg"), SenderFilter::from("bob")));
        assert!(router.subscribe(&a, &Topic::new("msg"), &SenderFilter::from("bob")));

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 0);
        assert_eq!(
            router.route(&Topic::new("msg"), &SenderId::new("bob"), &Item::from(2)),
            1
        );
        assert_eq!(drain(&mut rx_a), vec![2]);
    }

    #[test]
    fn test_connect_and_disconnect_are_idempotent() {
        let router = router(RoutingMode::Topics);
        let (a, _rx) = client("a", &["msg"]);

        assert_eq!(router.connect(&a, &[]), Ok(true));
        assert_eq!(router.connect(&a, &[]), Ok(false));
        assert!(router.is_active(a.id()));
        assert_eq!(router.subscriber_count(&Topic::new("msg")), 1);

        assert!(router.disconnect(&a));
        assert!(!router.disconnect(&a));
        assert!(!router.is_active(a.id()));
        assert_eq!(router.subscriber_count(&Topic::new("msg")), 0);
        assert!(a.token().is_cancelled());
    }

    #[test]
    fn test_disconnected_client_receives_nothing() {
        let router = router(RoutingMode::Topics);
        let (a, mut rx_a) = client("a", &["msg"]);
        router.connect(&a, &[]).unwrap();
        router.disconnect(&a);

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 0);
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn test_full_queue_disconnects_under_default_policy() {
        let router = router(RoutingMode::Topics);
        let (slow, mut rx_slow) = client_with("slow", &["msg"], Some(1), OverflowPolicy::Disconnect);
        let (fast, mut rx_fast) = client("fast", &["msg"]);
        router.connect(&slow, &[]).unwrap();
        router.connect(&fast, &[]).unwrap();

        let topic = Topic::new("msg");
        assert_eq!(router.route(&topic, &alice(), &Item::from(1)), 2);
        assert_eq!(router.route(&topic, &alice(), &Item::from(2)), 1);

        assert!(!slow.is_connected());
        assert_eq!(router.active_ids(), vec![ClientId::new("fast")]);
        assert_eq!(drain(&mut rx_slow), vec![1]);
        assert_eq!(drain(&mut rx_fast), vec![1, 2]);
    }

    #[test]
    fn test_full_queue_drops_under_drop_policy() {
        let router = router(RoutingMode::Topics);
        let (slow, mut rx_slow) = client_with("slow", &["msg"], Some(1), OverflowPolicy::Drop);
        router.connect(&slow, &[]).unwrap();

        let topic = Topic::new("msg");
        router.route(&topic, &alice(), &Item::from(1));
        assert_eq!(router.route(&topic, &alice(), &Item::from(2)), 0);
        assert!(slow.is_connected());

        assert_eq!(drain(&mut rx_slow), vec![1]);
        assert_eq!(router.route(&topic, &alice(), &Item::from(3)), 1);
        assert_eq!(drain(&mut rx_slow), vec![3]);
    }

    #[test]
    fn test_closed_queue_disconnects() {
        let router = router(RoutingMode::Topics);
        let (a, rx_a) = client("a", &["msg"]);
        router.connect(&a, &[]).unwrap();
        drop(rx_a);

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 0);
        assert!(!a.is_connected());
    }

    #[test]
    fn test_dropped_client_is_pruned() {
        let router = router(RoutingMode::Topics);
        let (a, _rx) = client("a", &["msg"]);
        router.connect(&a, &[]).unwrap();
        drop(a);

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 0);
        assert!(router.active_ids().is_empty());
        assert_eq!(router.subscriber_count(&Topic::new("msg")), 0);
    }

    #[test]
    fn test_same_id_replaces_previous_connection() {
        let router = router(RoutingMode::Topics);
        let (first, _rx1) = client("tab", &["msg"]);
        let (second, mut rx2) = client("tab", &["msg"]);

        router.connect(&first, &[]).unwrap();
        router.connect(&second, &[]).unwrap();

        assert!(!first.is_connected());
        assert!(second.is_connected());
        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(7)), 1);
        assert_eq!(drain(&mut rx2), vec![7]);

        // Disconnecting the stale handle must not evict the new one.
        assert!(!router.disconnect(&first));
        assert!(router.is_active(&ClientId::new("tab")));
    }

    #[test]
    fn test_all_topics_resolves_known_and_skips_muted() {
        let router = router(RoutingMode::Topics);
        let (a, _rx) = client("a", &[]);
        a.with_plan(|p| {
            p.all = true;
            p.muted.insert(Topic::new("noise"));
        });
        router.connect(&a, &[Topic::new("msg"), Topic::new("noise")]).unwrap();

        assert_eq!(
            router.subscriptions(),
            vec![(ClientId::new("a"), vec![Topic::new("msg")])]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let router = router(RoutingMode::Topics);
        let (a, mut rx_a) = client("a", &["msg"]);
        router.connect(&a, &[]).unwrap();

        assert!(router.unsubscribe(&a, &Topic::new("msg")));
        assert!(!router.unsubscribe(&a, &Topic::new("msg")));
        assert!(router.known_topics().is_empty());
        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 0);
        assert!(drain(&mut rx_a).is_empty());
        assert!(a.subscriptions().is_empty());
    }

    #[test]
    fn test_broadcast_reaches_every_unmuted_client() {
        let router = router(RoutingMode::Broadcast);
        let (a, mut rx_a) = client("a", &[]);
        let (b, mut rx_b) = client("b", &["other"]);
        b.with_plan(|p| p.muted.insert(Topic::new("msg")));
        router.connect(&a, &[]).unwrap();
        router.connect(&b, &[]).unwrap();

        assert_eq!(router.route(&Topic::new("msg"), &alice(), &Item::from(1)), 1);
        assert_eq!(router.route(&Topic::new("x"), &alice(), &Item::from(2)), 2);
        assert_eq!(drain(&mut rx_a), vec![1, 2]);
        assert_eq!(drain(&mut rx_b), vec![2]);
    }

    #[test]
    fn test_cancelled_hub_rejects_connect() {
        let token = CancellationToken::new();
        let router: Router<u32> = Router::new(
            RoutingMode::Topics,
            token.clone(),
            #[cfg(feature = "monitoring")]
            crate::monitoring::MonitorRegistry::new(&crate::Config::default()).sink(),
        );
        let (a, _rx) = client("a", &["msg"]);
        router.connect(&a, &[]).unwrap();

        token.cancel();
        assert!(a.token().is_cancelled());
        assert_eq!(router.disconnect_all(), 1);

        let (b, _rx) = client("b", &["msg"]);
        assert_eq!(router.connect(&b, &[]), Err(Error::HubShutdown));
    }
}
