//! Behavior plug-in for task components.

use crate::config::ConfigProfile;
use crate::error::Result;
use crate::flow::{PortSet, PortSetBuilder};
use std::time::Duration;

/// Context passed to lifecycle hooks.
pub struct TaskContext<'a> {
    /// Instance name of the component.
    pub name: &'a str,
    /// The component's ports. Hooks take their handles from here.
    pub ports: &'a PortSet,
    /// Nominal scheduling period.
    pub period: Duration,
    /// Time since `start()`.
    pub timestamp: Duration,
    /// Measured time since the previous update.
    pub dt: Duration,
    /// Monotonic update counter, reset on start.
    pub cycle: u64,
}

/// Behavior of a task component.
///
/// Hooks run on the caller's thread for `configure_hook` and `start_hook`,
/// and on the component's own thread for `update_hook` and `stop_hook`.
pub trait TaskHooks: Send + 'static {
    /// Declare the component's ports. Called once, at instantiation.
    fn declare_ports(&self, ports: PortSetBuilder) -> PortSetBuilder;

    /// Top-level configuration keys the hooks understand, besides `period`.
    fn properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Apply a resolved profile. Errors are reported as configuration errors.
    fn configure_hook(&mut self, ctx: &TaskContext, profile: &ConfigProfile) -> Result<()>;

    /// Called before scheduling begins. An error keeps the component configured.
    fn start_hook(&mut self, _ctx: &TaskContext) -> Result<()> {
        Ok(())
    }

    /// Called once per period while running.
    ///
    /// An error or a panic moves the component to `Exception` and ends
    /// scheduling.
    fn update_hook(&mut self, ctx: &TaskContext) -> Result<()>;

    /// Called on the component's thread when scheduling ends normally.
    fn stop_hook(&mut self, _ctx: &TaskContext) {}
}
