//! Property tests for event hub fan-out.

use std::sync::Arc;

use proptest::prelude::*;
use tindur_api::EventHub;
use tindur_core::{ChangeKind, SessionId, StreamEvent};
use tindur_test_utils::generators::arb_record;

fn drain_changes(receiver: &mut tokio::sync::mpsc::Receiver<StreamEvent>) -> Vec<i64> {
    let mut ids = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let StreamEvent::Change(change) = event {
            ids.push(change.record.id.0);
        }
    }
    ids
}

proptest! {
    /// Every subscriber other than the origin sees every event, in publish
    /// order; the origin sees none of its own.
    #[test]
    fn prop_fanout_is_ordered_and_skips_origin(
        records in prop::collection::vec(arb_record(), 1..20),
        subscribers in 1usize..6,
        origin_index in 0usize..6,
    ) {
        let hub = EventHub::new(64);
        let mut subs: Vec<_> = (0..subscribers)
            .map(|_| hub.subscribe(SessionId::generate()).unwrap())
            .collect();
        let origin = subs.get(origin_index).map(|s| s.session_id);

        for record in &records {
            hub.publish(ChangeKind::Create, record, origin);
        }

        let expected: Vec<i64> = records.iter().map(|r| r.id.0).collect();
        for sub in subs.iter_mut() {
            let first = sub.receiver.try_recv().unwrap();
            let is_init = matches!(first, StreamEvent::Init { .. });
            prop_assert!(is_init);
            let seen = drain_changes(&mut sub.receiver);
            if Some(sub.session_id) == origin {
                prop_assert!(seen.is_empty());
            } else {
                prop_assert_eq!(&seen, &expected);
            }
        }
    }

    /// A queue that overflows is evicted; the others keep receiving.
    #[test]
    fn prop_overflowing_subscriber_is_evicted(
        records in prop::collection::vec(arb_record(), 5..15),
    ) {
        let hub = EventHub::new(4);
        let slow = hub.subscribe(SessionId::generate()).unwrap();
        let mut fast = hub.subscribe(SessionId::generate()).unwrap();

        let mut evicted = Vec::new();
        for record in &records {
            fast.receiver.try_recv().ok();
            let report = hub.publish(ChangeKind::Update, record, None);
            evicted.extend(report.evicted);
        }

        prop_assert_eq!(evicted, vec![slow.session_id]);
        prop_assert!(!hub.is_subscribed(slow.session_id));
        prop_assert!(hub.is_subscribed(fast.session_id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publish_and_unsubscribe() {
    let hub = Arc::new(EventHub::new(256));
    let sessions: Vec<SessionId> = (0..16).map(|_| SessionId::generate()).collect();
    let mut receivers = Vec::new();
    for session in &sessions {
        receivers.push(hub.subscribe(*session).unwrap());
    }

    let record = tindur_test_utils::fixtures::record(1, tindur_core::Lane::Todo, "2024-01-01");
    let publisher = {
        let hub = hub.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                hub.publish(ChangeKind::Update, &record, None);
                tokio::task::yield_now().await;
            }
        })
    };
    let remover = {
        let hub = hub.clone();
        let sessions = sessions.clone();
        tokio::spawn(async move {
            for session in sessions {
                hub.unsubscribe(session);
                hub.unsubscribe(session);
                tokio::task::yield_now().await;
            }
        })
    };

    publisher.await.unwrap();
    remover.await.unwrap();
    assert_eq!(hub.subscriber_count(), 0);
    drop(receivers);
}
