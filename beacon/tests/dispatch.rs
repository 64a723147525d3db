use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use beacon::{
    Client, Config, Error, FailurePolicy, Hub, Item, Output, SenderId, Signals, Trigger, handler,
};
use futures_util::{StreamExt, stream};
use tokio::{sync::oneshot, time::timeout};

type TestHub = Hub<String>;

const LIMIT: Duration = Duration::from_secs(5);

/// Read raw queue entries up to and including the next burst marker.
async fn until_burst_end(client: &mut Client<String>) -> Vec<Item<String>> {
    let mut seen = Vec::new();
    loop {
        let item = timeout(LIMIT, client.recv())
            .await
            .expect("burst marker never arrived")
            .expect("client disconnected");
        let done = matches!(item, Item::BurstEnd(_));
        seen.push(item);
        if done {
            return seen;
        }
    }
}

fn values(items: &[Item<String>]) -> Vec<String> {
    items
        .iter()
        .filter_map(|i| i.value().map(|v| v.to_string()))
        .collect()
}

#[tokio::test]
async fn scenario_a_items_arrive_in_order_without_sentinel() {
    let hub = TestHub::default();
    hub.register(
        "msg",
        handler::named("h1", |_| Output::iter(["hello", "world"].map(String::from))),
    )
    .unwrap();
    let mut c1 = hub.client().id("c1").topic("msg").connect().unwrap();

    let summary = timeout(LIMIT, hub.dispatch("msg", "user1", Signals::new()))
        .await
        .unwrap();
    assert_eq!(summary.items, 2);

    let mut stream = c1.stream();
    assert_eq!(stream.next().await.unwrap().as_str(), "hello");
    assert_eq!(stream.next().await.unwrap().as_str(), "world");
}

#[tokio::test]
async fn scenario_b_items_stay_on_their_topic() {
    let hub = TestHub::default();
    hub.on("a", |t: Trigger| t.signals().get("v").and_then(|v| v.as_str()).map(String::from))
        .unwrap();
    let mut c1 = hub.client().topic("a").connect().unwrap();
    let c2 = hub.client().topic("b").connect().unwrap();

    let mut signals = Signals::new();
    signals.insert("v".into(), "x".into());
    hub.dispatch("a", "sender", signals).await;

    assert_eq!(values(&until_burst_end(&mut c1).await), vec!["x"]);
    assert_eq!(c2.queued(), 0);
}

#[tokio::test]
async fn scenario_c_failing_handler_still_completes_burst() {
    let hub = TestHub::default();
    hub.register(
        "c",
        handler::named("raises", |_| {
            Err::<Output<String>, _>(std::io::Error::other("bad value"))
        }),
    )
    .unwrap();
    let mut client = hub.client().topic("c").connect().unwrap();

    let summary = timeout(LIMIT, hub.dispatch("c", "user", Signals::new()))
        .await
        .expect("dispatch hung");
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.items, 0);

    let seen = until_burst_end(&mut client).await;
    assert_eq!(seen.len(), 1);
    assert!(matches!(seen[0], Item::BurstEnd(id) if id == summary.burst_id));
}

#[tokio::test]
async fn p1_fan_out_reaches_every_subscriber_once() {
    let hub = TestHub::default();
    hub.on("t", |_| Some("X".to_string())).unwrap();

    let mut subscribed: Vec<_> = (0..4)
        .map(|_| hub.client().topic("t").connect().unwrap())
        .collect();
    let other = hub.client().topic("u").connect().unwrap();

    hub.dispatch("t", "s", Signals::new()).await;

    for client in &mut subscribed {
        assert_eq!(values(&until_burst_end(client).await), vec!["X"]);
        assert_eq!(client.queued(), 0);
    }
    assert_eq!(other.queued(), 0);
}

#[tokio::test]
async fn p2_sender_filter_blocks_other_senders() {
    let hub = TestHub::default();
    hub.on("t", |t: Trigger| Some(format!("from {}", t.sender())))
        .unwrap();
    let mut alice_only = hub
        .client()
        .topic_with_senders("t", "alice")
        .connect()
        .unwrap();

    hub.dispatch("t", "bob", Signals::new()).await;
    assert_eq!(alice_only.queued(), 0);

    hub.dispatch("t", "alice", Signals::new()).await;
    assert_eq!(
        values(&until_burst_end(&mut alice_only).await),
        vec!["from alice"]
    );
}

#[tokio::test]
async fn p2_handler_filter_limits_which_handlers_run() {
    let hub = TestHub::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    hub.on_from("t", ["alice", "carol"], move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        Option::<String>::None
    })
    .unwrap();

    assert_eq!(hub.dispatch("t", "bob", Signals::new()).await.handlers, 0);
    assert_eq!(hub.dispatch("t", "carol", Signals::new()).await.handlers, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn p3_none_is_never_delivered() {
    let hub = TestHub::default();
    hub.on("t", |_| Option::<String>::None).unwrap();
    hub.on("t", |_| Output::iter([None, Some("kept".to_string()), None]))
        .unwrap();
    hub.on("t", |_| Output::future(async { Option::<String>::None }))
        .unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    let summary = hub.dispatch("t", "s", Signals::new()).await;
    assert_eq!(summary.items, 1);
    assert_eq!(values(&until_burst_end(&mut client).await), vec!["kept"]);
}

#[tokio::test]
async fn p4_failure_does_not_affect_siblings() {
    let hub = TestHub::default();
    hub.register(
        "t",
        handler::named("broken", |_| {
            Output::try_stream(stream::iter(vec![
                Ok("partial".to_string()),
                Err(std::io::Error::other("mid-iteration")),
                Ok("never".to_string()),
            ]))
        }),
    )
    .unwrap();
    hub.register("t", handler::named("panics", |_| -> Option<String> {
        panic!("handler bug")
    }))
    .unwrap();
    hub.register("t", handler::named("healthy", |_| Some("Y".to_string())))
        .unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    let summary = timeout(LIMIT, hub.dispatch("t", "s", Signals::new()))
        .await
        .unwrap();
    assert_eq!(summary.handlers, 3);
    assert_eq!(summary.failures, 2);

    let mut got = values(&until_burst_end(&mut client).await);
    got.sort();
    assert_eq!(got, vec!["Y", "partial"]);
}

#[tokio::test]
async fn p4_failures_can_be_routed_to_clients() {
    let hub = TestHub::new(Config::default().with_failure_policy(FailurePolicy::Route));
    hub.register(
        "t",
        handler::named("raises", |_| Err::<Output<String>, _>(std::io::Error::other("nope"))),
    )
    .unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    hub.dispatch("t", "s", Signals::new()).await;

    let seen = until_burst_end(&mut client).await;
    assert_eq!(seen.len(), 2);
    match &seen[0] {
        Item::Failure(Error::Handler { handler, .. }) => assert_eq!(&**handler, "raises"),
        other => panic!("expected a routed failure, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn p5_sentinel_follows_every_item_of_its_burst() {
    let hub = TestHub::default();
    hub.on("t", |_| {
        Output::iter((0..20).map(|n| {
            std::thread::sleep(Duration::from_millis(1));
            format!("iter-{n}")
        }))
    })
    .unwrap();
    hub.on("t", |_| {
        Output::stream(stream::iter(0..20).then(|n| async move {
            tokio::task::yield_now().await;
            format!("stream-{n}")
        }))
    })
    .unwrap();
    let mut client = hub.client().topic("t").unbounded().connect().unwrap();

    let summary = timeout(LIMIT, hub.dispatch("t", "s", Signals::new()))
        .await
        .unwrap();

    let seen = until_burst_end(&mut client).await;
    assert_eq!(seen.len(), summary.items + 1);
    assert_eq!(values(&seen).len(), 40);
    assert!(matches!(seen.last(), Some(Item::BurstEnd(_))));

    // Per-handler order is preserved.
    let iter_items: Vec<String> = values(&seen)
        .into_iter()
        .filter(|v| v.starts_with("iter-"))
        .collect();
    let expected: Vec<String> = (0..20).map(|n| format!("iter-{n}")).collect();
    assert_eq!(iter_items, expected);
}

#[tokio::test]
async fn p6_disconnect_twice_is_safe() {
    let hub = TestHub::default();
    let client = hub.client().topics(["a", "b"]).connect().unwrap();
    assert_eq!(hub.subscriber_count("a"), 1);
    assert_eq!(hub.subscriber_count("b"), 1);

    assert!(client.disconnect());
    assert!(!client.disconnect());
    assert_eq!(hub.subscriber_count("a"), 0);
    assert_eq!(hub.subscriber_count("b"), 0);
    assert!(hub.active_clients().is_empty());
}

#[tokio::test]
async fn p7_every_output_shape_yields_the_same_item() {
    let hub = Hub::<u32>::default();
    hub.on("value", |_| Some(5_u32)).unwrap();
    hub.on("future", |_| Output::future(async { 5_u32 })).unwrap();
    hub.on("iter", |_| Output::iter(std::iter::once(5_u32))).unwrap();
    hub.on("stream", |_| Output::stream(stream::once(async { 5_u32 })))
        .unwrap();

    for topic in ["value", "future", "iter", "stream"] {
        let mut client = hub.client().topic(topic).connect().unwrap();
        let summary = hub.dispatch(topic, SenderId::system(), Signals::new()).await;
        assert_eq!(summary.items, 1, "{topic}");

        let mut stream = client.stream();
        assert_eq!(*stream.next().await.unwrap(), 5, "{topic}");
    }
}

#[tokio::test]
async fn dispatch_from_spawned_task() {
    let hub = TestHub::default();
    hub.on("t", |_| Some("bg".to_string())).unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    let summary = hub
        .spawn_dispatch("t", "s", Signals::new())
        .await
        .unwrap();
    assert!(summary.is_clean());
    assert_eq!(values(&until_burst_end(&mut client).await), vec!["bg"]);
}

#[tokio::test]
async fn all_topics_client_follows_registry_at_connect() {
    let hub = TestHub::default();
    hub.on("a", |_| Some("from a".to_string())).unwrap();
    let mut early = hub.client().all_topics().connect().unwrap();
    hub.on("b", |_| Some("from b".to_string())).unwrap();

    hub.dispatch("b", "s", Signals::new()).await;
    assert_eq!(early.queued(), 0);

    hub.dispatch("a", "s", Signals::new()).await;
    assert_eq!(values(&until_burst_end(&mut early).await), vec!["from a"]);
}

#[tokio::test]
async fn dropped_dispatch_still_completes_its_burst() {
    let hub = TestHub::default();
    hub.on("t", |_| {
        Output::stream(stream::unfold(0_u32, |n| async move {
            match n {
                0 => Some(("item-0".to_string(), 1)),
                1 => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Some(("item-1".to_string(), 2))
                }
                _ => None,
            }
        }))
    })
    .unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    let abandoned = timeout(
        Duration::from_millis(20),
        hub.dispatch("t", "s", Signals::new()),
    )
    .await;
    assert!(abandoned.is_err());

    let seen = until_burst_end(&mut client).await;
    assert_eq!(values(&seen), vec!["item-0", "item-1"]);
    assert!(matches!(seen.last(), Some(Item::BurstEnd(_))));
}

#[tokio::test]
async fn items_reach_clients_while_their_handler_runs() {
    let hub = TestHub::default();
    let (release, held) = oneshot::channel::<()>();
    let held = Arc::new(Mutex::new(Some(held)));
    hub.on("t", move |_| {
        let held = held.lock().unwrap().take();
        Output::stream(
            stream::once(async { "first".to_string() }).chain(stream::once(async move {
                if let Some(held) = held {
                    let _ = held.await;
                }
                "second".to_string()
            })),
        )
    })
    .unwrap();
    let mut client = hub.client().topic("t").connect().unwrap();

    let burst = hub.spawn_dispatch("t", "s", Signals::new());
    let first = timeout(LIMIT, client.recv())
        .await
        .expect("first item was held back")
        .expect("client disconnected");
    assert_eq!(values(&[first]), vec!["first"]);
    assert!(!burst.is_finished());

    release.send(()).unwrap();
    assert_eq!(burst.await.unwrap().items, 2);
    assert_eq!(values(&until_burst_end(&mut client).await), vec!["second"]);
}

#[tokio::test(flavor = "current_thread")]
async fn blocking_iterator_does_not_stall_sibling_handlers() {
    let hub = TestHub::default();
    hub.on("t", |_| {
        Output::iter((0..3).map(|n| {
            std::thread::sleep(Duration::from_millis(50));
            format!("slow-{n}")
        }))
    })
    .unwrap();
    hub.on("t", |_| {
        Output::stream(stream::iter(0..3).then(|n| async move {
            tokio::task::yield_now().await;
            format!("fast-{n}")
        }))
    })
    .unwrap();
    let mut client = hub.client().topic("t").unbounded().connect().unwrap();

    timeout(LIMIT, hub.dispatch("t", "s", Signals::new()))
        .await
        .unwrap();

    let seen = values(&until_burst_end(&mut client).await);
    let last_slow = seen.iter().position(|v| v == "slow-2").unwrap();
    let fast: Vec<usize> = seen
        .iter()
        .enumerate()
        .filter(|(_, v)| v.starts_with("fast-"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(fast.len(), 3);
    assert!(fast.iter().all(|&i| i < last_slow), "{seen:?}");
}
