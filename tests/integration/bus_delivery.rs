use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use storage_agent::EventBus;

use crate::helpers::within;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishers_reach_every_mailbox_once() {
    const PUBLISHERS: u32 = 8;
    const PER_PUBLISHER: u32 = 50;

    let bus = Arc::new(EventBus::<(u32, u32)>::new(
        (PUBLISHERS * PER_PUBLISHER) as usize,
    ));
    let mut first = bus.subscribe(&["t"]);
    let mut second = bus.subscribe(&["t", "other"]);

    let handles: Vec<_> = (0..PUBLISHERS)
        .map(|publisher| {
            let bus = bus.clone();
            tokio::spawn(async move {
                for seq in 0..PER_PUBLISHER {
                    bus.publish("t", (publisher, seq));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    for mailbox in [&mut first, &mut second] {
        let mut last_seen: HashMap<u32, u32> = HashMap::new();
        let mut total = 0;

        while let Ok((publisher, seq)) = mailbox.try_recv() {
            // each publisher's messages keep their relative order
            if let Some(prev) = last_seen.insert(publisher, seq) {
                assert!(seq > prev, "publisher {publisher} reordered: {prev} then {seq}");
            }
            total += 1;
        }

        assert_eq!(total, PUBLISHERS * PER_PUBLISHER);
        assert!(last_seen.values().all(|&seq| seq == PER_PUBLISHER - 1));
    }
}

#[tokio::test]
async fn test_recv_returns_none_after_unsubscribe() {
    let bus = EventBus::<&'static str>::new(4);
    let mut mailbox = bus.subscribe(&["a", "b"]);

    bus.publish("a", "queued");
    bus.unsubscribe(&mailbox, &[]);

    assert_eq!(within(mailbox.recv()).await, Some("queued"));
    assert_eq!(within(mailbox.recv()).await, None);
    assert_eq!(bus.topic_count(), 0);
}

#[tokio::test]
async fn test_waiting_receiver_wakes_on_publish() {
    let bus = Arc::new(EventBus::<u64>::new(4));
    let mut mailbox = bus.subscribe(&["tick"]);

    let receiver = tokio::spawn(async move { mailbox.recv().await });
    tokio::task::yield_now().await;

    assert_eq!(bus.publish("tick", 9), 1);
    assert_eq!(within(receiver).await.unwrap(), Some(9));
}

#[test]
fn test_slow_mailbox_does_not_starve_fast_one() {
    let bus = EventBus::<u32>::new(2);
    let mut slow = bus.subscribe(&["t"]);
    let mut fast = bus.subscribe(&["t"]);

    for i in 0..6 {
        bus.publish("t", i);
        // fast drains after every publish, slow never does
        assert_eq!(fast.try_recv(), Ok(i));
    }

    assert_eq!(slow.try_recv(), Ok(0));
    assert_eq!(slow.try_recv(), Ok(1));
    assert!(slow.try_recv().is_err());
}
