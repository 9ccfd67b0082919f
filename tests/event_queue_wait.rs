//! Purpose: Blocking event waits across threads, fed through the C ABI queue bridge.
//! Exports: None (integration test module).
//! Role: Validate that a break from another thread releases a blocked waiter and that events
//!       pushed by the native side arrive typed and in order.
//! Invariants: Bounded waits; a hung waiter fails the test instead of blocking it forever.

use privbridge::abi::{
    pbx_event_queue, pbx_event_queue_free, pbx_event_queue_push, pbx_value, pbx_value_new_int64,
    pbx_value_new_object, pbx_value_new_string, pbx_value_object_set,
};
use privbridge::api::EventQueueApi;
use privbridge::api::events::Event;
use privbridge::core::event_queue::EventQueue;
use std::ptr;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn set_string(object: *mut pbx_value, key: &str, text: &str) {
    let mut item = ptr::null_mut();
    assert_eq!(
        pbx_value_new_string(text.as_ptr(), text.len(), &mut item, ptr::null_mut()),
        0
    );
    assert_eq!(
        pbx_value_object_set(object, key.as_ptr(), key.len(), item, ptr::null_mut()),
        0
    );
}

fn connected_event(connection_id: i64) -> *mut pbx_value {
    let event = pbx_value_new_object();
    set_string(event, "__type", "core$LibConnectedEvent");
    set_string(event, "type", "libConnected");
    set_string(event, "channel", "channel/lib_connected");
    let key = "connectionId";
    assert_eq!(
        pbx_value_object_set(
            event,
            key.as_ptr(),
            key.len(),
            pbx_value_new_int64(connection_id),
            ptr::null_mut(),
        ),
        0
    );
    event
}

#[test]
fn break_from_another_thread_releases_wait() {
    let queue = Arc::new(EventQueue::new());
    let (tx, rx) = mpsc::channel();
    let waiter = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let api = EventQueueApi::local(queue);
            tx.send(api.wait_event()).expect("send");
        })
    };

    thread::sleep(Duration::from_millis(50));
    EventQueueApi::local(Arc::clone(&queue))
        .emit_break_event()
        .expect("break");

    let event = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("waiter released")
        .expect("event");
    assert!(event.is_break());
    waiter.join().expect("join");
}

#[test]
fn native_pushed_events_arrive_typed_and_in_order() {
    let queue = Arc::new(EventQueue::new());
    let raw = pbx_event_queue::into_raw(Arc::clone(&queue));
    for id in [1, 2] {
        assert_eq!(pbx_event_queue_push(raw, connected_event(id), ptr::null_mut()), 0);
    }
    pbx_event_queue_free(raw);

    let api = EventQueueApi::local(queue);
    for expected in [1, 2] {
        match api.wait_event().expect("event") {
            Event::LibConnected(event) => assert_eq!(event.connection_id, expected),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(api.get_event().expect("poll"), None);
}
