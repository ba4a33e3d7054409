//! Integration tests for the task component lifecycle
//!
//! These tests validate the complete component workflow:
//! - Deployment and resolution through the runtime
//! - Configure, start, stop and reconfigure
//! - Data written before start becoming visible once running

mod common;

use common::mock_helpers::{test_runtime, CounterHooks};
use common::wait_until;
use portflow::{PortflowError, TaskState};
use std::time::Duration;

#[test]
fn test_start_unconfigured_is_a_lifecycle_error() {
    let runtime = test_runtime();
    let task = runtime.deploy("counter", CounterHooks::MODEL, CounterHooks::default()).unwrap();

    let err = task.start().unwrap_err();
    assert!(matches!(err, PortflowError::Lifecycle { operation: "start", .. }));
    assert_eq!(task.state(), TaskState::Unconfigured);
}

#[test]
fn test_configure_start_stop_cycle() {
    let runtime = test_runtime();
    let task = runtime.deploy("counter", CounterHooks::MODEL, CounterHooks::default()).unwrap();
    let mut count = task.output::<u64>("count").unwrap().reader();

    runtime.apply_config(&task, &["default"], true).unwrap();
    assert_eq!(task.period(), Duration::from_millis(1));
    task.start().unwrap();
    assert!(wait_until(|| count.read().is_some_and(|c| c >= 3)));

    task.stop().unwrap();
    assert_eq!(task.state(), TaskState::Stopped);
    count.clear();
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(count.read(), None, "a stopped task must not publish");

    // Reconfigure and run again
    runtime.apply_config(&task, &["default"], true).unwrap();
    task.start().unwrap();
    assert!(wait_until(|| count.read().is_some()));
    task.stop().unwrap();
}

#[test]
fn test_write_before_start_is_seen_when_running() {
    let runtime = test_runtime();
    let task = runtime.deploy("counter", CounterHooks::MODEL, CounterHooks::default()).unwrap();
    let input = task.input::<u64>("input").unwrap().writer().unwrap();
    let mut echo = task.output::<u64>("echo").unwrap().reader();

    runtime.apply_config(&task, &["default"], true).unwrap();
    input.write(42);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(echo.read(), None);

    task.start().unwrap();
    let mut seen = None;
    assert!(wait_until(|| {
        seen = echo.read();
        seen.is_some()
    }));
    assert_eq!(seen, Some(42));
}

#[test]
fn test_shutdown_stops_running_tasks() {
    let runtime = test_runtime();
    let task = runtime.deploy("counter", CounterHooks::MODEL, CounterHooks::default()).unwrap();
    runtime.apply_config(&task, &["default"], true).unwrap();
    task.start().unwrap();

    runtime.shutdown();
    assert_eq!(task.state(), TaskState::Stopped);
    assert!(matches!(runtime.task("counter"), Err(PortflowError::NotFound(_))));
}

#[test]
fn test_port_lookups_are_typed() {
    let runtime = test_runtime();
    let task = runtime.deploy("counter", CounterHooks::MODEL, CounterHooks::default()).unwrap();

    assert!(matches!(
        task.input::<f64>("input"),
        Err(PortflowError::PortMismatch { .. })
    ));
    assert!(matches!(
        task.input::<u64>("count"),
        Err(PortflowError::PortMismatch { .. })
    ));
    assert!(matches!(task.output::<u64>("missing"), Err(PortflowError::NotFound(_))));
    assert_eq!(task.port_descriptors().len(), 3);
}
