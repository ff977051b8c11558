//! Integration tests for operation tracking
//!
//! These tests verify that node reservations are all-or-nothing and that
//! concurrent operations on the same node are prevented.

mod common;

use common::fixtures::*;
use fleet_manager::errors::OperationError;
use fleet_manager::node::Node;
use fleet_manager::operation_tracker::OperationTracker;

fn chain_targets(nodes: &[Node]) -> Vec<String> {
    nodes.iter().map(Node::target_key).collect()
}

#[tokio::test]
async fn test_target_keys_include_region() {
    let tracker = OperationTracker::new();
    let us = Node::new(regions::US_WEST, "i-0a");
    let eu = Node::new(regions::EU_WEST, "i-0a");

    tracker
        .try_start_operation(&chain_targets(&[us.clone()]), operations::CHAINSHOT, None)
        .await
        .unwrap();

    // same instance id in another region is a different node
    assert!(tracker.is_busy(&us.target_key()).await);
    assert!(!tracker.is_busy(&eu.target_key()).await);
    assert!(tracker
        .try_start_operation(&chain_targets(&[eu]), operations::CHAINSHOT, None)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_busy_error_names_holder() {
    let tracker = OperationTracker::new();
    let node = Node::new(regions::US_WEST, "i-0a");
    tracker
        .try_start_operation(
            &chain_targets(&[node.clone()]),
            operations::CHAINSHOT,
            Some("scheduler".to_string()),
        )
        .await
        .unwrap();

    let err = tracker
        .try_start_operation(&chain_targets(&[node.clone()]), operations::THAW, None)
        .await
        .unwrap_err();

    match err.downcast_ref::<OperationError>() {
        Some(OperationError::NodeBusy {
            target,
            current_operation,
        }) => {
            assert_eq!(target, &node.target_key());
            assert_eq!(current_operation, operations::CHAINSHOT);
        }
        other => panic!("expected NodeBusy, got {:?}", other),
    }
    assert!(err.to_string().contains(&node.target_key()));
}

#[tokio::test]
async fn test_clones_share_reservations() {
    let tracker = OperationTracker::new();
    let clone = tracker.clone();
    let targets = chain_targets(&[
        Node::new(regions::US_WEST, "i-0a"),
        Node::new(regions::EU_WEST, "i-0b"),
    ]);

    tracker
        .try_start_operation(&targets, operations::CHAINSHOT, None)
        .await
        .unwrap();
    assert_eq!(clone.get_operation_status().await.total_active, 2);

    clone.finish_operation(&targets).await;
    assert_eq!(tracker.get_operation_status().await.total_active, 0);
}

#[tokio::test]
async fn test_concurrent_starts_admit_exactly_one() {
    let tracker = OperationTracker::new();
    let targets = chain_targets(&[
        Node::new(regions::US_WEST, "i-0a"),
        Node::new(regions::EU_WEST, "i-0b"),
        Node::new(regions::US_WEST, "i-0c"),
    ]);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let tracker = tracker.clone();
            let mut targets = targets.clone();
            // vary reservation order between contenders
            targets.rotate_left(i % 3);
            tokio::spawn(async move {
                tracker
                    .try_start_operation(&targets, operations::CHAINSHOT, None)
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(tracker.get_operation_status().await.total_active, 3);
}

#[tokio::test]
async fn test_finish_ignores_unreserved_targets() {
    let tracker = OperationTracker::new();
    let held = chain_targets(&[Node::new(regions::US_WEST, "i-0a")]);
    tracker
        .try_start_operation(&held, operations::CHAINSHOT, None)
        .await
        .unwrap();

    tracker
        .finish_operation(&chain_targets(&[Node::new(regions::EU_WEST, "i-0z")]))
        .await;

    assert!(tracker.is_busy(&held[0]).await);
}

#[tokio::test]
async fn test_cancel_releases_single_node() {
    let tracker = OperationTracker::new();
    let targets = chain_targets(&[
        Node::new(regions::US_WEST, "i-0a"),
        Node::new(regions::EU_WEST, "i-0b"),
    ]);
    tracker
        .try_start_operation(&targets, operations::CHAINSHOT, None)
        .await
        .unwrap();

    tracker.cancel_operation(&targets[0]).await.unwrap();

    assert!(!tracker.is_busy(&targets[0]).await);
    assert!(tracker.is_busy(&targets[1]).await);
    assert!(tracker.cancel_operation("us-west-1/i-unknown").await.is_err());
}
