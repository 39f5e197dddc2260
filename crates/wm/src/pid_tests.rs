// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    typical = { "_NET_WM_PID(CARDINAL) = 1234\n", Some(1234) },
    no_space = { "_NET_WM_PID(CARDINAL)=77", Some(77) },
    not_set = { "_NET_WM_PID:  not found.\n", None },
    garbage = { "whatever", None },
    non_numeric = { "_NET_WM_PID(CARDINAL) = abc", None },
)]
fn parses_xprop_output(stdout: &str, expected: Option<i32>) {
    assert_eq!(parse_xprop_pid(stdout), expected);
}

#[tokio::test]
async fn no_pid_probe_is_always_none() {
    assert_eq!(NoPidProbe.probe(0x1400001).await, None);
}
