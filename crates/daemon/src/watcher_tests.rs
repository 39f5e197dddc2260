// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test]
async fn detects_rule_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("window-rules.json");
    let classes = dir.path().join("app-classes.json");
    let outputs = dir.path().join("output-states.json");
    std::fs::write(&rules, "[]").unwrap();

    let (_watcher, mut rx) = watch_config_files(&rules, &classes, &outputs).unwrap();

    // Give the watcher a moment to arm before writing
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&rules, r#"[{"match": {}, "actions": []}]"#).unwrap();

    let change = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("change notification")
        .expect("channel open");
    assert_eq!(change, ConfigChange::WindowRules);
}

#[tokio::test]
async fn burst_of_writes_is_debounced() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("window-rules.json");
    let classes = dir.path().join("app-classes.json");
    let outputs = dir.path().join("output-states.json");
    std::fs::write(&rules, "[]").unwrap();

    let (_watcher, mut rx) = watch_config_files(&rules, &classes, &outputs).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    for i in 0..5 {
        std::fs::write(&rules, format!("[{i}]")).unwrap();
    }

    let first = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("change notification")
        .expect("channel open");
    assert_eq!(first, ConfigChange::WindowRules);

    // The burst collapsed into (at most) one more pending notification;
    // after draining, the channel goes quiet
    tokio::time::sleep(Duration::from_millis(300)).await;
    while rx.try_recv().is_ok() {}
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unrelated_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let rules = dir.path().join("window-rules.json");
    let classes = dir.path().join("app-classes.json");
    let outputs = dir.path().join("output-states.json");
    std::fs::write(&rules, "[]").unwrap();

    let (_watcher, mut rx) = watch_config_files(&rules, &classes, &outputs).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    std::fs::write(dir.path().join("unrelated.txt"), "hi").unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
}
