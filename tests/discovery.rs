mod common;

use std::fs;

use common::{options, switch};
use fabricmap::config_loader::load_config;
use fabricmap::device::DiscoveryStatus;
use fabricmap::fabric::{DiscoveryOptions, Fabric, Probe, ScanProfile};
use fabricmap::report::{build_report, generate_json_report, generate_text_report};
use fabricmap::session::memory::MemoryConnector;
use fabricmap::session::snapshot::SnapshotConnector;
use fabricmap::session::{Credential, DeviceRecord, Protocol, TransportOptions};

fn pair() -> MemoryConnector {
    MemoryConnector::new()
        .with_device("10.0.0.1", switch("sw1", &[("sw2", "10.0.0.2", "Gi0/0")], &[]))
        .with_device("10.0.0.2", switch("sw2", &[("sw1", "10.0.0.1", "Gi0/0")], &[]))
}

#[test]
fn test_rediscovery_contacts_nobody() {
    let connector = pair();
    let mut fabric = Fabric::new();

    fabric.discover(&["10.0.0.1"], &connector, &options(), |_| true).unwrap();
    let attempts = connector.attempts().len();
    assert_eq!(attempts, 2);

    let summary = fabric.discover(&["10.0.0.1", "10.0.0.2"], &connector, &options(), |_| true).unwrap();
    assert_eq!(summary.completed, 0);
    assert_eq!(connector.attempts().len(), attempts);
    assert_eq!(fabric.len(), 2);
}

#[test]
fn test_credentials_and_transports_tried_in_order() {
    let record = DeviceRecord {
        username: Some("netops".to_string()),
        protocols: Some(vec![Protocol::Telnet]),
        ..switch("sw1", &[], &[])
    };
    let connector = MemoryConnector::new().with_device("10.0.0.1", record);
    let options = DiscoveryOptions {
        credentials: vec![Credential::new("admin", "x"), Credential::new("netops", "y")],
        transports: vec![
            TransportOptions::default(),
            TransportOptions {
                protocol: Protocol::Telnet,
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let mut fabric = Fabric::new();
    let summary = fabric.discover(&["10.0.0.1"], &connector, &options, |_| true).unwrap();

    assert_eq!(summary.completed, 1);
    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 4);
    assert_eq!(attempts[0].protocol, Protocol::Ssh);
    assert_eq!(attempts[3].protocol, Protocol::Telnet);
    assert_eq!(attempts[3].username, "netops");
}

#[test]
fn test_unreachable_seed_is_recorded_as_failed() {
    let connector = MemoryConnector::new();
    let mut fabric = Fabric::new();

    let summary = fabric.discover(&["10.9.9.9"], &connector, &options(), |_| true).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(fabric.status_of("10.9.9.9"), DiscoveryStatus::Failed);
    assert_eq!(fabric.len(), 1);
}

#[test]
fn test_scan_profile_limits_probes() {
    let record = DeviceRecord {
        broken_probes: vec!["inventory".to_string()],
        ..switch("sw1", &[("sw2", "10.0.0.2", "Gi0/0")], &[("0000.0000.0001", "Gi0/9")])
    };
    let connector = MemoryConnector::new().with_device("10.0.0.1", record);
    let options = DiscoveryOptions {
        scan: ScanProfile::blacklist([Probe::CdpNeighbors, Probe::MacAddress]),
        ..options()
    };

    let mut fabric = Fabric::new();
    let summary = fabric.discover(&["10.0.0.1"], &connector, &options, |_| true).unwrap();

    // Broken inventory probe is only a warning; no neighbors were read
    assert_eq!(summary.completed, 1);
    assert_eq!(fabric.len(), 1);
    assert!(fabric.mac_table().is_empty());
}

#[test]
fn test_crawl_from_snapshot_directory() {
    let dir = tempfile::tempdir().unwrap();
    let snapshots = dir.path().join("snapshots");
    fs::create_dir(&snapshots).unwrap();

    let records = [
        (
            "10.0.0.1",
            switch(
                "sw1",
                &[("sw2", "10.0.0.2", "Gi0/0")],
                &[("0000.0000.0001", "Gi0/0"), ("0000.0000.0002", "Gi0/0")],
            ),
        ),
        ("10.0.0.2", switch("sw2", &[("sw1", "10.0.0.1", "Gi0/0")], &[("0000.0000.0001", "Gi0/9")])),
    ];
    for (address, record) in &records {
        let yaml = serde_yaml::to_string(record).unwrap();
        fs::write(snapshots.join(format!("{}.yaml", address)), yaml).unwrap();
    }

    let config_path = dir.path().join("scan.yaml");
    fs::write(
        &config_path,
        format!(
            "seeds: [10.0.0.1]\ncredentials:\n  - username: admin\n    password: admin\nparallelism: 2\nsession_timeout: 10s\nsnapshot_dir: {}\n",
            snapshots.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let filter = config.neighbor_filter.compile().unwrap();
    let connector = SnapshotConnector::new(&config.snapshot_dir);

    let mut fabric = Fabric::new();
    let summary = fabric
        .discover(config.seeds.as_slice(), &connector, &config.to_options(), |n| filter.allows(n))
        .unwrap();
    assert_eq!(summary.completed, 2);

    let report = build_report(&fabric, Some(summary));
    let text = generate_text_report(&report);
    assert!(text.contains("sw1 (10.0.0.1)"));
    assert!(text.contains("-> sw2 GigabitEthernet0/0"));
    assert!(text.contains("sw2 GigabitEthernet0/9"));

    let json: serde_json::Value = serde_json::from_str(&generate_json_report(&report).unwrap()).unwrap();
    assert_eq!(json["summary"]["completed"], 2);
    // sw1 learned the host on its uplink next to another MAC, sw2 on an edge port
    assert_eq!(json["mac_table"][0]["attached_to"], "sw2 GigabitEthernet0/9");
    assert_eq!(json["mac_table"][1]["attached_to"], "sw1 GigabitEthernet0/0");
}
