//! Contract tests for the sentinel shell channel
//!
//! These tests pin the protocol behavior every caller relies on: lazy
//! stream opening and reuse, completion detection that is not fooled by the
//! shell's own echo, output cleanup, timeout reporting, and the
//! stream-replacement rule after a timeout.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use test_utils::mock_transport::MockHost;
use vzremote::channel::{ExecChannel, ShellChannel, SENTINEL};
use vzremote::Error;

#[tokio::test]
async fn test_execute_returns_cleaned_output() {
    let host = MockHost::new();
    host.respond("vzlist -a", "101  5  running  2.6  10.0.0.5  host1");
    let mut channel = ShellChannel::new(host.session());

    let output = channel.execute("vzlist -a").await.unwrap();

    assert!(output.contains("101  5  running"));
    assert!(!output.contains(SENTINEL));
    assert_eq!(host.executed(), vec!["vzlist -a".to_string()]);
}

#[tokio::test]
async fn test_shell_stream_opens_lazily_and_is_reused() {
    let host = MockHost::new();
    host.respond("uptime", "14:02:11 up 3 days");
    let mut channel = ShellChannel::new(host.session());
    assert_eq!(host.shells_opened(), 0);

    channel.execute("uptime").await.unwrap();
    channel.execute("uptime").await.unwrap();

    assert_eq!(host.shells_opened(), 1);
}

#[tokio::test]
async fn test_command_echo_does_not_satisfy_completion() {
    // The shell echoes the composed command line, sentinel included, before
    // any real output. A quote follows the token there, so completion must
    // wait for the bare sentinel after the reply.
    let host = MockHost::new();
    host.respond("vzctl stop 101", "Container was stopped");
    let mut channel = ShellChannel::new(host.session());

    let output = channel.execute("vzctl stop 101").await.unwrap();
    assert!(output.contains("Container was stopped"));
}

#[tokio::test]
async fn test_timeout_reports_configured_seconds() {
    let host = MockHost::new();
    host.swallow("sleep", "");
    let mut channel = ShellChannel::new(host.session());
    channel.set_timeout(0);

    match channel.execute("sleep 600").await {
        Err(Error::CommandTimeout { seconds }) => assert_eq!(seconds, 0),
        other => panic!("expected CommandTimeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timed_out_stream_is_replaced_before_next_command() {
    let host = MockHost::new();
    host.swallow("sleep", "");
    host.respond("echo hi", "hi");
    let mut channel = ShellChannel::new(host.session());
    channel.set_timeout(0);

    assert!(channel.execute("sleep 600").await.is_err());
    assert_eq!(host.shells_opened(), 1);

    channel.set_timeout(5);
    let output = channel.execute("echo hi").await.unwrap();
    assert!(output.contains("hi"));
    assert_eq!(host.shells_opened(), 2);
}

#[tokio::test]
async fn test_partial_output_is_retained_after_timeout() {
    let host = MockHost::new();
    host.swallow("vzctl start 101", "Starting container...");
    let mut channel = ShellChannel::new(host.session());
    channel.set_timeout(0);

    assert!(channel.execute("vzctl start 101").await.is_err());
    let raw = channel.last_raw_output().expect("partial output retained");
    assert!(raw.contains("Starting container..."));
}

#[tokio::test]
async fn test_execute_without_session_is_not_connected() {
    let host = MockHost::new();
    host.sever();
    let mut channel = ShellChannel::new(host.session());

    match channel.execute("uptime").await {
        Err(Error::NotConnected) => {}
        other => panic!("expected NotConnected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_closed_channel_reopens_on_next_command() {
    let host = MockHost::new();
    host.respond("uptime", "up");
    let mut channel = ShellChannel::new(host.session());

    channel.execute("uptime").await.unwrap();
    channel.close().await.unwrap();
    channel.execute("uptime").await.unwrap();

    assert_eq!(host.shells_opened(), 2);
}

#[tokio::test]
async fn test_send_raw_skips_the_completion_protocol() {
    let host = MockHost::new();
    host.respond("whoami", "root");
    let mut channel = ShellChannel::new(host.session());

    channel.send_raw("sudo su root", 0).await.unwrap();
    let output = channel.execute("whoami").await.unwrap();

    assert!(output.lines().any(|l| l.trim() == "root"));
    // The raw line reaches the remote verbatim, on the same stream.
    assert_eq!(host.executed()[0], "sudo su root");
    assert_eq!(host.shells_opened(), 1);
}

#[tokio::test]
async fn test_exec_channel_runs_one_command_per_stream() {
    let host = MockHost::new();
    host.respond("uname", "Linux node1 2.6.32");
    let exec = ExecChannel::new(host.session());

    let output = exec.execute("uname -a").await.unwrap();
    assert!(output.contains("Linux node1"));
    assert!(!output.contains(SENTINEL));
    assert_eq!(host.executed(), vec!["uname -a".to_string()]);
}

#[tokio::test]
async fn test_last_output_tracks_most_recent_command() {
    let host = MockHost::new();
    host.respond("first", "one");
    host.respond("second", "two");
    let mut channel = ShellChannel::new(host.session());

    channel.execute("first").await.unwrap();
    channel.execute("second").await.unwrap();

    assert!(channel.last_output().unwrap().contains("two"));
    assert!(!channel.last_output().unwrap().contains("one"));
}
