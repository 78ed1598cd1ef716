//! Tests for error types

use armada_allocation::core::SchedulingError;

#[test]
fn test_data_incomplete_error() {
    let err = SchedulingError::DataIncomplete("node-1 allocatable".to_string());
    assert_eq!(format!("{}", err), "data incomplete: node-1 allocatable");
}

#[test]
fn test_overcommit_error() {
    let err = SchedulingError::OvercommitDetected("cpu".to_string());
    assert_eq!(format!("{}", err), "overcommit detected: cpu");
}

#[test]
fn test_configuration_invalid_error() {
    let err = SchedulingError::ConfigurationInvalid("negative fraction".to_string());
    assert_eq!(format!("{}", err), "configuration invalid: negative fraction");
}

#[test]
fn test_invalid_quantity_error() {
    let err = "12Zi".parse::<armada_allocation::core::Quantity>().unwrap_err();
    assert_eq!(format!("{}", err), "invalid quantity: 12Zi");
}

#[test]
fn test_queue_full_error() {
    let err = SchedulingError::QueueFull("queue-a".to_string());
    assert_eq!(format!("{}", err), "queue full: queue-a");
}

#[test]
fn test_backend_error() {
    let err = SchedulingError::Backend("connection failed".to_string());
    assert_eq!(format!("{}", err), "backend error: connection failed");
}
