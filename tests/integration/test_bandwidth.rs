//! Integration tests for bandwidth accounting

#[path = "../test_utils/mod.rs"]
mod test_utils;

use test_utils::mock_transport::MockHost;
use test_utils::test_config;
use vzremote::{Error, VzClient};

fn client_for(host: &MockHost) -> VzClient {
    VzClient::with_session(test_config(), "node1.example.com", "root", host.session())
}

#[tokio::test]
async fn test_monitor_add_appends_paired_forward_rules() {
    let host = MockHost::new();
    let mut vz = client_for(&host);

    vz.bandwidth_monitor_add("10.0.0.5").await.unwrap();

    let executed = host.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[0], "/sbin/iptables -A FORWARD -o eth0 -s 10.0.0.5");
    assert_eq!(executed[1], "/sbin/iptables -A FORWARD -i eth0 -d 10.0.0.5");
}

#[tokio::test]
async fn test_monitor_remove_deletes_both_rules() {
    let host = MockHost::new();
    let mut vz = client_for(&host);

    vz.bandwidth_monitor_remove("10.0.0.5").await.unwrap();

    let executed = host.executed();
    assert!(executed
        .iter()
        .any(|c| c == "/sbin/iptables -D FORWARD -o eth0 -s 10.0.0.5"));
    assert!(executed
        .iter()
        .any(|c| c == "/sbin/iptables -D FORWARD -i eth0 -d 10.0.0.5"));
}

#[tokio::test]
async fn test_usage_splits_counters_by_direction() {
    let host = MockHost::new();
    host.respond(
        "iptables -L FORWARD",
        "   12      3456            all  --  *      eth0    10.0.0.5     0.0.0.0/0\n\
            34      7890            all  --  eth0   *       0.0.0.0/0    10.0.0.5",
    );
    let mut vz = client_for(&host);

    let usage = vz.bandwidth_usage("10.0.0.5").await.unwrap();
    assert_eq!(usage.bytes_out, 3456);
    assert_eq!(usage.bytes_in, 7890);
    assert_eq!(usage.total(), 3456 + 7890);
}

#[tokio::test]
async fn test_usage_without_matching_rules_is_a_parse_error() {
    let host = MockHost::new();
    host.respond("iptables -L FORWARD", "");
    let mut vz = client_for(&host);

    match vz.bandwidth_usage("10.0.0.99").await {
        Err(Error::ParseError { context, .. }) => {
            assert_eq!(context, "bandwidth counters");
        }
        other => panic!("expected ParseError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_address_is_rejected_before_any_command() {
    let host = MockHost::new();
    let mut vz = client_for(&host);

    match vz.bandwidth_monitor_add("not-an-ip").await {
        Err(Error::InvalidAddress { address }) => assert_eq!(address, "not-an-ip"),
        other => panic!("expected InvalidAddress, got {:?}", other),
    }
    assert!(host.executed().is_empty());
}

#[tokio::test]
async fn test_counter_reset_is_node_wide() {
    let host = MockHost::new();
    let mut vz = client_for(&host);

    vz.bandwidth_counters_reset().await.unwrap();
    assert_eq!(host.executed(), vec!["/sbin/iptables -Z".to_string()]);
}
