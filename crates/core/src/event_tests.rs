// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn serializes_with_type_tag() {
    let event = Event::WindowNew {
        con_id: 42,
        class: "firefox".to_string(),
        title: "Mozilla Firefox".to_string(),
        workspace: Some("3".to_string()),
        project: None,
        app: None,
        correlation: None,
    };

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "window::new");
    assert_eq!(json["con_id"], 42);
    // None fields are omitted entirely
    assert!(json.get("project").is_none());
    assert!(json.get("correlation").is_none());
}

#[test]
fn round_trips_through_json() {
    let event = Event::ProjectSwitch {
        old: Some("nixos".to_string()),
        new: None,
        windows_hidden: 3,
        windows_restored: 0,
        duration_ms: 12,
    };

    let json = serde_json::to_string(&event).unwrap();
    let restored: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, event);
}

#[test]
fn event_type_matches_serde_tag() {
    let events = vec![
        Event::WindowClose {
            con_id: 1,
            class: "x".into(),
            project: None,
        },
        Event::WorkspaceFocus {
            name: "3".into(),
            num: Some(3),
        },
        Event::Tick {
            payload: "i3pm:reload-config".into(),
        },
        Event::DaemonStop,
    ];

    for event in events {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_type());
    }
}

#[test]
fn source_uses_lowercase_names() {
    assert_eq!(serde_json::to_value(Source::Wm).unwrap(), "wm");
    assert_eq!(serde_json::to_value(Source::Systemd).unwrap(), "systemd");
    let src: Source = serde_json::from_value(serde_json::json!("proc")).unwrap();
    assert_eq!(src, Source::Proc);
}
