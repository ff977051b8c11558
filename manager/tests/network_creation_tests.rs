//! Fleet creation tests
//!
//! A network request becomes one instance per region entry, each with a fresh
//! data volume, started seed-first and optionally version-checked.

mod common;

use common::fixtures::*;
use fleet_manager::config::RegionConfig;
use fleet_manager::constants::{ports, scripts};
use fleet_manager::errors::{ChainError, ConfigError};
use fleet_manager::network::NetworkRequest;
use fleet_manager::node::ChainType;
use std::collections::HashMap;

fn fleet_with_eu_defaults() -> TestFleet {
    TestFleet::with_config(|config| {
        config.regions.insert(
            regions::EU_WEST.to_string(),
            RegionConfig {
                name: regions::EU_WEST.to_string(),
                default_ami: Some("ami-eu-default".to_string()),
                instance_type: "t2.small".to_string(),
                volume_size_gb: 20,
            },
        );
    })
}

fn request(node_regions: &[&str]) -> NetworkRequest {
    NetworkRequest {
        regions: node_regions.iter().map(|r| r.to_string()).collect(),
        images: HashMap::from([(regions::US_WEST.to_string(), keys::IMAGE.to_string())]),
        security_groups: HashMap::from([(
            regions::US_WEST.to_string(),
            vec!["ethermint-network".to_string()],
        )]),
        key_name: keys::KEY_NAME.to_string(),
        chain_type: ChainType::Ethermint,
        expected_version: None,
    }
}

#[test]
fn test_plan_uses_region_default_image() {
    let t = fleet_with_eu_defaults();
    let specs = t
        .fleet
        .networks
        .plan(&request(&[regions::US_WEST, regions::EU_WEST, regions::US_WEST]))
        .unwrap();

    assert_eq!(specs.len(), 3);
    assert_eq!(specs[0].image_id, keys::IMAGE);
    assert_eq!(specs[1].image_id, "ami-eu-default");
    assert!(specs.iter().all(|s| s.add_volume));
    assert_eq!(specs[0].security_groups, vec!["ethermint-network".to_string()]);
    assert!(specs[1].security_groups.is_empty());
    assert_eq!(specs[2].tags[0].value, format!("test-ethermint-{}2", keys::IMAGE));
}

#[test]
fn test_plan_rejects_region_without_image() {
    let t = TestFleet::new();
    let err = t
        .fleet
        .networks
        .plan(&request(&[regions::AP_SOUTH]))
        .unwrap_err();

    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::MissingRequired { field }) => assert_eq!(field, "images.ap-south-1"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_plan_rejects_empty_request() {
    let t = TestFleet::new();
    let err = t.fleet.networks.plan(&request(&[])).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingRequired { .. })
    ));
}

#[tokio::test]
async fn test_create_network_provisions_and_starts_chain() {
    let t = fleet_with_eu_defaults();

    let chain = t
        .fleet
        .networks
        .create_network(&request(&[regions::US_WEST, regions::EU_WEST]))
        .await
        .expect("Network creation should succeed");

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.nodes[0].region, regions::US_WEST);
    assert_eq!(chain.nodes[1].region, regions::EU_WEST);

    let eu_volume = t.fleet.directory.data_volume(&chain.nodes[1]).await.unwrap();
    assert_eq!(eu_volume.size_gb, 20);
    let eu_instance = t.cloud.peek_instance(&chain.nodes[1].instance_id).await.unwrap();
    assert_eq!(eu_instance.instance_type, "t2.small");

    assert_eq!(
        t.transport.scripts(),
        vec![
            scripts::MOUNT_NEW_VOLUME,
            scripts::MOUNT_NEW_VOLUME,
            scripts::RUN,
            scripts::RUN
        ]
    );
    let seed_address = t.fleet.directory.public_address(&chain.nodes[0]).await.unwrap();
    let runs = t.transport.calls_for(scripts::RUN);
    assert_eq!(
        runs[1].command.args,
        vec![format!("{}:{}", seed_address, ports::P2P)]
    );
}

#[tokio::test]
async fn test_create_network_checks_version() {
    let t = TestFleet::new();
    t.transport.respond_with(scripts::GET_VERSION, "0.5.0\n");
    let mut req = request(&[regions::US_WEST, regions::US_WEST]);
    req.expected_version = Some("0.5.0".to_string());

    let chain = t.fleet.networks.create_network(&req).await.unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(t.transport.calls_for(scripts::GET_VERSION).len(), 2);
}

#[tokio::test]
async fn test_create_network_version_mismatch() {
    let t = TestFleet::new();
    t.transport.respond_with(scripts::GET_VERSION, "0.4.1");
    let mut req = request(&[regions::US_WEST]);
    req.expected_version = Some("0.5.0".to_string());

    let err = t.fleet.networks.create_network(&req).await.unwrap_err();

    match err.downcast_ref::<ChainError>() {
        Some(ChainError::VersionMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "0.5.0");
            assert_eq!(actual, "0.4.1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_create_network_respects_parallelism_order() {
    let t = TestFleet::with_config(|config| config.provisioning_parallelism = 3);
    let chain = t
        .fleet
        .networks
        .create_network(&request(&[
            regions::US_WEST,
            regions::US_WEST,
            regions::US_WEST,
        ]))
        .await
        .unwrap();

    // results keep request order even when launched concurrently
    let names: Vec<String> = {
        let mut names = Vec::new();
        for node in &chain.nodes {
            names.push(t.fleet.directory.instance_name(node).await.unwrap());
        }
        names
    };
    assert_eq!(
        names,
        (0..3)
            .map(|i| format!("test-ethermint-{}{}", keys::IMAGE, i))
            .collect::<Vec<_>>()
    );
}
