//! # portflow: port-based data flow between task components
//!
//! A driver feeds pose samples into a running component through typed input
//! ports and observes its commands on an output port. Components run on their
//! own threads and exchange data only through latest-value channels.
//!
//! ## Architecture
//!
//! - **Flow**: latest-value [`SampleChannel`]s and the typed ports built on them
//! - **Task**: [`TaskComponent`] lifecycle (configure, start, stop) around pluggable hooks
//! - **Runtime**: registry of deployed components plus the configuration store
//! - **Driver**: the session protocol that feeds a component and reports its commands
//! - **Tasks**: built-in behaviors, currently a Cartesian interpolator
//!
//! ## Configuration
//!
//! Component profiles are TOML files named after the component model, one
//! table per profile:
//!
//! ```toml
//! # config/cartesian_interpolator.toml
//! [default]
//! period = 0.01
//! [default.linear]
//! max_speed = 0.5
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use portflow::{CartesianInterpolator, Driver, DriverConfig, Runtime, RuntimeConfig};
//!
//! let runtime = Runtime::init(RuntimeConfig::default())?;
//! runtime.deploy("interpolator", "cartesian_interpolator", CartesianInterpolator::new())?;
//! let driver = Driver::new(&runtime, DriverConfig::default());
//! let summary = driver.run(initial, target, &go_ahead, &stop, &mut reporter)?;
//! runtime.shutdown();
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod flow;
pub mod runtime;
pub mod task;
pub mod tasks;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigProfile, ConfigStore, RuntimeConfig};
pub use driver::{Driver, DriverConfig, SessionSummary, StopSignal};
pub use error::{PortflowError, Result, SessionPhase};
pub use flow::{FlowStatus, PortSet, SampleChannel};
pub use runtime::Runtime;
pub use task::{TaskComponent, TaskHooks, TaskState};
pub use tasks::CartesianInterpolator;
pub use types::{EulerZyx, PoseSample};
