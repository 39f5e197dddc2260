// SPDX-License-Identifier: MIT

use super::*;
use crate::ipc::EVENT_BIT;

fn event_message(code: u32, payload: serde_json::Value) -> Message {
    Message {
        msg_type: EVENT_BIT | code,
        payload: serde_json::to_vec(&payload).unwrap(),
    }
}

#[test]
fn decodes_window_event() {
    let msg = event_message(
        EVENT_WINDOW,
        serde_json::json!({
            "change": "new",
            "container": {"id": 42, "type": "con", "app_id": "firefox"}
        }),
    );

    match WmEvent::decode(&msg).unwrap() {
        Some(WmEvent::Window(e)) => {
            assert_eq!(e.change, "new");
            assert_eq!(e.container.id, 42);
        }
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn decodes_binding_event() {
    let msg = event_message(
        EVENT_BINDING,
        serde_json::json!({
            "change": "run",
            "binding": {"command": "exec zed", "symbol": "Return", "input_type": "keyboard"}
        }),
    );

    match WmEvent::decode(&msg).unwrap() {
        Some(WmEvent::Binding(e)) => {
            assert_eq!(e.binding.command, "exec zed");
            assert_eq!(e.binding.symbol.as_deref(), Some("Return"));
        }
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn decodes_tick_and_shutdown() {
    let tick = event_message(EVENT_TICK, serde_json::json!({"first": false, "payload": "i3pm:reload-config"}));
    match WmEvent::decode(&tick).unwrap() {
        Some(WmEvent::Tick(e)) => assert_eq!(e.payload, "i3pm:reload-config"),
        other => panic!("unexpected decode: {other:?}"),
    }

    let shutdown = event_message(EVENT_SHUTDOWN, serde_json::json!({"change": "restart"}));
    match WmEvent::decode(&shutdown).unwrap() {
        Some(WmEvent::Shutdown(e)) => assert_eq!(e.change, "restart"),
        other => panic!("unexpected decode: {other:?}"),
    }
}

#[test]
fn non_event_message_decodes_to_none() {
    let msg = Message {
        msg_type: crate::ipc::GET_TREE,
        payload: b"{}".to_vec(),
    };
    assert_eq!(WmEvent::decode(&msg).unwrap(), None);
}

#[test]
fn unknown_event_code_is_skipped() {
    let msg = event_message(4, serde_json::json!({})); // barconfig_update
    assert_eq!(WmEvent::decode(&msg).unwrap(), None);
}

#[test]
fn event_class_serializes_lowercase() {
    let classes = vec![EventClass::Window, EventClass::Tick];
    assert_eq!(
        serde_json::to_string(&classes).unwrap(),
        r#"["window","tick"]"#
    );
}
