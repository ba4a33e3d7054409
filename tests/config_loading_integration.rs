//! Integration tests for profile loading
//!
//! These tests validate:
//! - Loading a directory of model files into the runtime
//! - Config directory resolution through the environment
//! - The profiles shipped in `config/`

use portflow::config::CONFIG_DIR_ENV;
use portflow::tasks::interpolator::{self, CartesianInterpolator};
use portflow::{PortflowError, Runtime, RuntimeConfig, TaskState};
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

const PROFILES: &str = r#"
[default]
period = 0.005
[default.default_constraint]
max_speed = 1.0
max_acceleration = 1.0
max_jerk = 1.0
"#;

fn config_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

#[test]
fn test_runtime_loads_profiles_from_directory() {
    let dir = config_dir(&[
        ("cartesian_interpolator.toml", PROFILES),
        ("notes.txt", "not a profile"),
    ]);
    let runtime = Runtime::init(RuntimeConfig::default().with_config_dir(dir.path())).unwrap();
    assert_eq!(runtime.store().profile_names(interpolator::MODEL), ["default"]);

    let task = runtime
        .deploy("interpolator", interpolator::MODEL, CartesianInterpolator::new())
        .unwrap();
    runtime.apply_config(&task, &["default"], true).unwrap();
    assert_eq!(task.state(), TaskState::Configured);
    assert_eq!(task.period(), Duration::from_millis(5));
}

#[test]
fn test_malformed_file_names_the_path() {
    let dir = config_dir(&[("cartesian_interpolator.toml", "[default\nperiod = 1")]);
    let err = Runtime::init(RuntimeConfig::default().with_config_dir(dir.path()))
        .err()
        .unwrap();
    assert!(err.to_string().contains("cartesian_interpolator.toml"));
    assert!(matches!(err.root(), PortflowError::Configuration(_)));
}

#[test]
fn test_malformed_profile_value_is_a_configuration_error() {
    let dir = config_dir(&[(
        "cartesian_interpolator.toml",
        "[default]\npositional_limits_behavior = \"sometimes\"\n",
    )]);
    let runtime = Runtime::init(RuntimeConfig::default().with_config_dir(dir.path())).unwrap();
    let task = runtime
        .deploy("interpolator", interpolator::MODEL, CartesianInterpolator::new())
        .unwrap();

    let err = runtime.apply_config(&task, &["default"], true).unwrap_err();
    assert!(matches!(err.root(), PortflowError::Configuration(_)));
    assert_eq!(task.state(), TaskState::Unconfigured);
}

#[test]
#[serial]
fn test_config_dir_from_environment() {
    let dir = config_dir(&[("cartesian_interpolator.toml", PROFILES)]);
    std::env::set_var(CONFIG_DIR_ENV, dir.path());
    let runtime = Runtime::init(RuntimeConfig::default());
    std::env::remove_var(CONFIG_DIR_ENV);

    let runtime = runtime.unwrap();
    assert!(runtime.store().has_profile(interpolator::MODEL, "default"));
}

#[test]
fn test_shipped_profiles_are_valid() {
    let runtime =
        Runtime::init(RuntimeConfig::default().with_config_dir(shipped_config_dir())).unwrap();
    let combinations: [&[&str]; 3] = [&["default"], &["default", "slow"], &["default", "bounded"]];
    for (i, profiles) in combinations.into_iter().enumerate() {
        let task = runtime
            .deploy(&format!("interpolator-{i}"), interpolator::MODEL, CartesianInterpolator::new())
            .unwrap();
        runtime.apply_config(&task, profiles, true).unwrap();
        assert_eq!(task.state(), TaskState::Configured);
    }

    let period = |name: &str| runtime.task(name).unwrap().period();
    assert_eq!(period("interpolator-0"), Duration::from_millis(10));
    assert_eq!(period("interpolator-1"), Duration::from_millis(20));
}
