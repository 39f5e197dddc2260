// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;

fn config_in(dir: &tempfile::TempDir) -> Config {
    let state_dir = dir.path().join("state");
    let config_dir = dir.path().join("config");
    Config {
        socket_path: state_dir.join("i3pmd.sock"),
        lock_path: state_dir.join("i3pmd.pid"),
        log_path: state_dir.join("i3pmd.log"),
        tracker_path: config_dir.join("window-workspace-map.json"),
        active_project_path: config_dir.join("active-project.json"),
        focus_state_path: state_dir.join("focus-state.json"),
        projects_dir: config_dir.join("projects"),
        app_classes_path: config_dir.join("app-classes.json"),
        window_rules_path: config_dir.join("window-rules.json"),
        output_states_path: config_dir.join("output-states.json"),
        state_dir,
        config_dir,
    }
}

#[test]
fn lock_is_exclusive_within_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);

    let lock = acquire_lock(&config).unwrap();
    // The lock file carries our PID
    let contents = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(contents.trim(), std::process::id().to_string());

    drop(lock);
    // Released: can be taken again
    let _relock = acquire_lock(&config).unwrap();
}

#[test]
fn rotate_log_shifts_generations() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");

    // Oversized current log plus one rotation
    std::fs::write(&log, vec![b'x'; (MAX_LOG_SIZE + 1) as usize]).unwrap();
    std::fs::write(format!("{}.1", log.display()), "old-1").unwrap();

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    assert!(dir.path().join("daemon.log.1").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("daemon.log.2")).unwrap(),
        "old-1"
    );
}

#[test]
fn small_log_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("daemon.log");
    std::fs::write(&log, "short").unwrap();

    rotate_log_if_needed(&log);
    assert!(log.exists());
}

#[tokio::test]
async fn bind_creates_socket_and_replaces_stale_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    std::fs::create_dir_all(&config.state_dir).unwrap();

    // Stale socket file from a previous run
    std::fs::write(&config.socket_path, "").unwrap();

    let _listener = bind_rpc_socket(&config).unwrap();
    assert!(config.socket_path.exists());
}

#[test]
#[serial]
fn sd_notify_without_socket_is_a_noop() {
    // No NOTIFY_SOCKET in the test environment; must not panic
    sd_notify("READY=1");
}

#[test]
#[serial]
fn sd_notify_sends_datagram() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notify.sock");
    let receiver = std::os::unix::net::UnixDatagram::bind(&path).unwrap();

    std::env::set_var("NOTIFY_SOCKET", &path);
    sd_notify("READY=1");
    std::env::remove_var("NOTIFY_SOCKET");

    receiver
        .set_read_timeout(Some(std::time::Duration::from_secs(1)))
        .unwrap();
    let mut buf = [0u8; 64];
    let n = receiver.recv(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"READY=1");
}

#[test]
#[serial]
fn watchdog_interval_is_a_third() {
    std::env::set_var("WATCHDOG_USEC", "30000000");
    assert_eq!(
        watchdog_interval(),
        Some(std::time::Duration::from_secs(10))
    );
    std::env::remove_var("WATCHDOG_USEC");
    assert_eq!(watchdog_interval(), None);
}

#[test]
#[serial]
fn config_paths_follow_xdg() {
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg-state");
    std::env::set_var("XDG_CONFIG_HOME", "/tmp/xdg-config");

    let config = Config::load().unwrap();
    assert_eq!(config.state_dir, PathBuf::from("/tmp/xdg-state/i3pm"));
    assert_eq!(config.config_dir, PathBuf::from("/tmp/xdg-config/i3pm"));
    assert_eq!(
        config.socket_path,
        PathBuf::from("/tmp/xdg-state/i3pm/i3pmd.sock")
    );

    let tree_config = Config::load_tree().unwrap();
    assert_eq!(
        tree_config.socket_path,
        PathBuf::from("/tmp/xdg-state/i3pm/i3pm-treed.sock")
    );

    std::env::remove_var("XDG_STATE_HOME");
    std::env::remove_var("XDG_CONFIG_HOME");
}
