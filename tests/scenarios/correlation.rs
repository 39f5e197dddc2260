// SPDX-License-Identifier: MIT

//! Launch→window and action→event correlation scenarios, driven through
//! the router.

use crate::prelude::*;
use i3pm_core::{ConfidenceLevel, Event};
use i3pm_engine::ActionCorrelator;
use i3pm_wm::{WindowEvent, WmEvent};
use std::sync::Arc;

#[tokio::test]
async fn launch_notification_attributes_the_window() {
    let s = stack(vec![]);
    s.wm.set_workspaces(vec![workspace(5, "eDP-1")]);
    s.wm.set_tree(tree(5, &[(42, "Zed", &[])]));

    // t=0: launcher wrapper announces the spawn
    s.registry
        .lock()
        .add("zed", Some("P"), "Zed", Some(5))
        .unwrap();

    // t=300ms: the window appears
    s.clock.advance(300);
    let container = serde_json::from_value(serde_json::json!({
        "id": 42, "type": "con", "app_id": "Zed", "name": "Zed"
    }))
    .unwrap();
    s.router
        .handle_wm_event(WmEvent::Window(WindowEvent {
            change: "new".to_string(),
            container,
        }))
        .await;

    let record = s.state.lock().get_window(42).unwrap();
    assert_eq!(record.project.as_deref(), Some("P"));
    let correlation = record.correlation.expect("correlation attached");
    assert_eq!(correlation.confidence, 1.0);
    assert!(correlation.signals.workspace_match);

    // The ring entry references the correlation
    let ring = s.ring.lock();
    let entry = &ring.query(1, Some("window::new"), None)[0];
    match &entry.event {
        Event::WindowNew {
            project,
            correlation,
            ..
        } => {
            assert_eq!(project.as_deref(), Some("P"));
            assert_eq!(correlation.as_ref().unwrap().confidence, 1.0);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn binding_to_window_new_is_likely() {
    // t=0: binding "exec zed"; t=80ms: the window event
    let clock = i3pm_core::FakeClock::new(500_000);
    let mut correlator = ActionCorrelator::new(Arc::new(clock.clone()));

    correlator.add_action(
        i3pm_core::ActionType::Binding,
        Some("Return".to_string()),
        "exec zed".to_string(),
    );
    clock.advance(80);

    let correlation = correlator
        .correlate(1, "window::new", clock.now_ms())
        .expect("correlation produced");

    assert_eq!(correlation.factors.temporal, 0.9);
    assert_eq!(correlation.factors.semantic, 0.6);
    assert_eq!(correlation.factors.exclusivity, 1.0);
    assert_eq!(correlation.factors.cascade, 1.0);
    assert!((correlation.confidence - 0.84).abs() < 1e-9);
    assert_eq!(correlation.level, ConfidenceLevel::Likely);
}
