// SPDX-License-Identifier: MIT

//! Per-window environment derived from `/proc/<pid>/environ`.
//!
//! The launcher wrapper exports `I3PM_*` variables into processes it
//! spawns; reading them back attaches project identity to windows.
//! Permission errors, vanished processes, and undecodable bytes all
//! degrade to "no environment".

use std::collections::BTreeMap;

/// `I3PM_*` variables read from a process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct I3pmEnv {
    vars: BTreeMap<String, String>,
}

impl I3pmEnv {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.get("I3PM_PROJECT_NAME")
    }

    pub fn app_name(&self) -> Option<&str> {
        self.get("I3PM_APP_NAME")
    }

    pub fn app_id(&self) -> Option<&str> {
        self.get("I3PM_APP_ID")
    }

    pub fn scope(&self) -> Option<&str> {
        self.get("I3PM_SCOPE")
    }

    pub fn context_key(&self) -> Option<&str> {
        self.get("I3PM_CONTEXT_KEY")
    }
}

/// Parse NUL-separated `KEY=VALUE` pairs, keeping only `I3PM_*` keys.
pub fn parse_environ(bytes: &[u8]) -> I3pmEnv {
    let mut vars = BTreeMap::new();

    for entry in bytes.split(|b| *b == 0) {
        let Ok(entry) = std::str::from_utf8(entry) else {
            continue;
        };
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        if key.starts_with("I3PM_") {
            vars.insert(key.to_string(), value.to_string());
        }
    }

    I3pmEnv { vars }
}

/// Read a process's `I3PM_*` environment. Any failure yields the empty
/// environment.
pub fn read_i3pm_env(pid: i32) -> I3pmEnv {
    match std::fs::read(format!("/proc/{pid}/environ")) {
        Ok(bytes) => parse_environ(&bytes),
        Err(_) => I3pmEnv::default(),
    }
}

#[cfg(test)]
#[path = "procenv_tests.rs"]
mod tests;
