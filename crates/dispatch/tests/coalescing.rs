//! Coalescing behaviour of the dispatcher, end to end through the bus and an
//! event-loop delivery context.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{
    drive_until, init_tracing, Delivery, GatedTransport, GetUsers, GetUsersText, Recorder,
};
use dispatch::{event_loop, params_from_pairs, Api, CallbackGroup, Dispatcher, Headers, Params, Verb};
use serde_json::json;

#[tokio::test]
async fn test_two_callers_share_one_call() {
    init_tracing();
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let a = recorder.handle("A");
    let b = recorder.handle("B");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &a);
    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &b);

    let fingerprint = GetUsers.fingerprint(Verb::Get, &Params::new());
    assert_eq!(dispatcher.listener_count(&fingerprint), 2);

    gate.release(1);
    drive_until(&mut event_loop, &recorder, 2).await;

    assert_eq!(gate.calls(), 1);
    assert_eq!(
        recorder.for_listener("A"),
        vec![Delivery::Success(200, json!({"id": 1}))]
    );
    assert_eq!(
        recorder.for_listener("B"),
        vec![Delivery::Success(200, json!({"id": 1}))]
    );
    assert_eq!(dispatcher.pending_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_from_many_threads_make_one_call() {
    const CALLERS: usize = 12;
    let (transport, gate) = GatedTransport::json(200, r#"{"users":[]}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| recorder.handle(&format!("caller-{i}")))
        .collect();

    let barrier = Arc::new(Barrier::new(CALLERS));
    thread::scope(|scope| {
        for handle in &handles {
            let dispatcher = dispatcher.clone();
            let barrier = barrier.clone();
            scope.spawn(move || {
                barrier.wait();
                dispatcher.get(&GetUsers, Headers::new(), Params::new(), handle);
            });
        }
    });

    gate.release(1);
    drive_until(&mut event_loop, &recorder, CALLERS).await;

    assert_eq!(gate.calls(), 1);
    let deliveries = recorder.deliveries();
    assert_eq!(deliveries.len(), CALLERS);
    assert!(deliveries
        .iter()
        .all(|(_, d)| *d == Delivery::Success(200, json!({"users": []}))));
}

#[tokio::test]
async fn test_parameter_order_does_not_matter() {
    let (transport, gate) = GatedTransport::json(200, "[]");
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let a = recorder.handle("A");
    let b = recorder.handle("B");

    dispatcher.get(&GetUsers, Headers::new(), params_from_pairs(&["a", "1", "b", "2"]), &a);
    dispatcher.get(&GetUsers, Headers::new(), params_from_pairs(&["b", "2", "a", "1"]), &b);

    gate.release(1);
    drive_until(&mut event_loop, &recorder, 2).await;

    assert_eq!(gate.calls(), 1);
    assert_eq!(gate.requests()[0].url, "https://api.test/users?a=1&b=2");
}

#[tokio::test]
async fn test_different_requests_are_not_coalesced() {
    let (transport, gate) = GatedTransport::json(200, "{}");
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let a = recorder.handle("A");
    let b = recorder.handle("B");
    let c = recorder.handle("C");

    dispatcher.get(&GetUsers, Headers::new(), params_from_pairs(&["page", "1"]), &a);
    dispatcher.get(&GetUsers, Headers::new(), params_from_pairs(&["page", "2"]), &b);
    dispatcher.post(&GetUsers, Headers::new(), params_from_pairs(&["page", "1"]), &c);
    assert_eq!(dispatcher.pending_calls(), 3);

    gate.release(3);
    drive_until(&mut event_loop, &recorder, 3).await;

    assert_eq!(gate.calls(), 3);
}

#[tokio::test]
async fn test_descriptors_with_different_responses_do_not_share_a_call() {
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let json = recorder.handle("json");
    let text = recorder.text_handle("text");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &json);
    dispatcher.get(&GetUsersText, Headers::new(), Params::new(), &text);
    assert_eq!(dispatcher.pending_calls(), 2);

    gate.release(2);
    drive_until(&mut event_loop, &recorder, 2).await;

    assert_eq!(gate.calls(), 2);
    assert_eq!(
        recorder.for_listener("json"),
        vec![Delivery::Success(200, json!({"id": 1}))]
    );
    assert_eq!(
        recorder.for_listener("text"),
        vec![Delivery::Success(200, json!(r#"{"id":1}"#))]
    );
}

#[tokio::test]
async fn test_completed_fingerprint_starts_fresh_call() {
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let a = recorder.handle("A");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &a);
    gate.release(1);
    drive_until(&mut event_loop, &recorder, 1).await;

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &a);
    gate.release(1);
    drive_until(&mut event_loop, &recorder, 2).await;

    assert_eq!(gate.calls(), 2);
    assert_eq!(recorder.for_listener("A").len(), 2);
}

#[tokio::test]
async fn test_expired_listener_is_skipped() {
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let gone = recorder.handle("gone");
    let kept = recorder.handle("kept");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &gone);
    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &kept);
    drop(gone);

    gate.release(1);
    drive_until(&mut event_loop, &recorder, 1).await;
    event_loop.run_pending();

    assert!(recorder.for_listener("gone").is_empty());
    assert_eq!(recorder.for_listener("kept").len(), 1);
}

#[tokio::test]
async fn test_released_group_receives_nothing() {
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let screen = CallbackGroup::new("users-screen");
    let witness = recorder.handle("witness");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), screen.adopt(recorder.handle("screen")));
    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &witness);
    screen.unregister_all();

    gate.release(1);
    drive_until(&mut event_loop, &recorder, 1).await;
    event_loop.run_pending();

    assert!(recorder.for_listener("screen").is_empty());
    assert_eq!(recorder.for_listener("witness").len(), 1);
}

#[tokio::test]
async fn test_callbacks_wait_for_the_event_loop() {
    let (transport, gate) = GatedTransport::json(200, r#"{"id":1}"#);
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::new(transport, handle).unwrap();
    let recorder = Recorder::default();
    let a = recorder.handle("A");

    dispatcher.get(&GetUsers, Headers::new(), Params::new(), &a);
    gate.release(1);

    // The call completes on the worker, but nothing runs until the loop does.
    while dispatcher.pending_calls() > 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(recorder.len(), 0);

    drive_until(&mut event_loop, &recorder, 1).await;
    assert_eq!(recorder.len(), 1);
}

#[tokio::test]
async fn test_fixed_pool_limits_concurrent_calls() {
    let (transport, gate) = GatedTransport::json(200, "{}");
    let (handle, mut event_loop) = event_loop();
    let dispatcher = Dispatcher::builder()
        .max_in_flight(1)
        .build(transport, handle)
        .unwrap();
    let recorder = Recorder::default();
    let handles: Vec<_> = (0..3).map(|i| recorder.handle(&i.to_string())).collect();

    for (page, handle) in handles.iter().enumerate() {
        let params = params_from_pairs(&["page", &page.to_string()]);
        dispatcher.get(&GetUsers, Headers::new(), params, handle);
    }

    gate.release(3);
    drive_until(&mut event_loop, &recorder, 3).await;

    assert_eq!(gate.calls(), 3);
    assert_eq!(gate.max_active(), 1);
}
