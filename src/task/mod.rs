//! Task components: named, independently scheduled units with typed ports.
//!
//! A [`TaskComponent`] owns a fixed [`PortSet`], a lifecycle [`TaskState`] and
//! the [`TaskHooks`] that implement its behavior. After `start()` the hooks
//! move to a dedicated thread that calls `update_hook` once per period. They
//! come back to the component when `stop()` joins that thread, so the
//! component can be configured and started again.
//!
//! # Example
//!
//! ```ignore
//! let task = TaskComponent::new("interpolator", "cartesian_interpolator",
//!     Box::new(CartesianInterpolator::new()), Duration::from_millis(10))?;
//! task.configure(&profile)?;
//! task.start()?;
//! let writer = task.input::<PoseSample>("target")?.writer()?;
//! ```

pub mod hooks;
pub mod state;

pub use hooks::{TaskContext, TaskHooks};
pub use state::{TaskState, Transition};

use crate::config::ConfigProfile;
use crate::error::{PortflowError, Result};
use crate::flow::{Port, PortDescriptor, PortSet, PortSetBuilder};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Configuration key every component accepts: the period in seconds.
pub const PERIOD_PROPERTY: &str = "period";

/// Lifecycle bookkeeping guarded by one lock.
struct Inner {
    /// `None` while the hooks live on the worker thread.
    hooks: Option<Box<dyn TaskHooks>>,
    worker: Option<JoinHandle<Box<dyn TaskHooks>>>,
    running: Arc<AtomicBool>,
    period: Duration,
    default_period: Duration,
}

/// A named task component.
pub struct TaskComponent {
    name: String,
    model: String,
    ports: PortSet,
    properties: &'static [&'static str],
    state: Arc<RwLock<TaskState>>,
    /// Message of the last update failure, cleared on configure.
    failure: Arc<Mutex<Option<String>>>,
    inner: Mutex<Inner>,
}

impl TaskComponent {
    /// Instantiate a component. Ports are declared here and never change.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        hooks: Box<dyn TaskHooks>,
        default_period: Duration,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(PortflowError::Configuration(
                "task names must not be empty".to_string(),
            ));
        }
        let ports = hooks
            .declare_ports(PortSetBuilder::new())
            .build()
            .map_err(|e| e.with_context(format!("declaring ports of task '{name}'")))?;
        let properties = hooks.properties();

        Ok(Self {
            name,
            model: model.into(),
            ports,
            properties,
            state: Arc::new(RwLock::new(TaskState::Unconfigured)),
            failure: Arc::new(Mutex::new(None)),
            inner: Mutex::new(Inner {
                hooks: Some(hooks),
                worker: None,
                running: Arc::new(AtomicBool::new(false)),
                period: default_period,
                default_period,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model name, used to find configuration profiles.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn state(&self) -> TaskState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// Scheduling period in effect after the last `configure()`.
    pub fn period(&self) -> Duration {
        self.inner.lock().period
    }

    /// Message of the update failure that caused `Exception`, if any.
    pub fn last_error(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// All configuration keys this component accepts.
    pub fn properties(&self) -> Vec<&'static str> {
        let mut keys = vec![PERIOD_PROPERTY];
        keys.extend_from_slice(self.properties);
        keys
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub fn port_descriptors(&self) -> Vec<PortDescriptor> {
        self.ports.descriptors().cloned().collect()
    }

    /// Typed input port lookup.
    pub fn input<T: Clone + Send + Sync + 'static>(&self, port: &str) -> Result<Port<T>> {
        self.ports.input(port)
    }

    /// Typed output port lookup.
    pub fn output<T: Clone + Send + Sync + 'static>(&self, port: &str) -> Result<Port<T>> {
        self.ports.output(port)
    }

    /// Apply a resolved profile. Legal from `Unconfigured` and `Stopped`.
    pub fn configure(&self, profile: &ConfigProfile) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check(Transition::Configure)?;

        let period = profile
            .duration(PERIOD_PROPERTY)?
            .unwrap_or(inner.default_period);

        let hooks = inner.hooks.as_mut().ok_or_else(|| self.hooks_lost())?;
        let ctx = TaskContext {
            name: &self.name,
            ports: &self.ports,
            period,
            timestamp: Duration::ZERO,
            dt: Duration::ZERO,
            cycle: 0,
        };
        hooks
            .configure_hook(&ctx, profile)
            .map_err(into_configuration_error)?;

        inner.period = period;
        *self.failure.lock() = None;
        self.set_state(TaskState::Configured);
        tracing::info!(
            "Task '{}' configured with profiles {:?} (period {:?})",
            self.name,
            profile.names(),
            period
        );
        Ok(())
    }

    /// Begin independent scheduling. Legal from `Configured` only.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check(Transition::Start)?;

        let period = inner.period;
        let mut hooks = inner.hooks.take().ok_or_else(|| self.hooks_lost())?;
        let ctx = TaskContext {
            name: &self.name,
            ports: &self.ports,
            period,
            timestamp: Duration::ZERO,
            dt: Duration::ZERO,
            cycle: 0,
        };
        if let Err(e) = hooks.start_hook(&ctx) {
            inner.hooks = Some(hooks);
            return Err(e.with_context(format!("starting task '{}'", self.name)));
        }

        let running = Arc::new(AtomicBool::new(true));
        inner.running = Arc::clone(&running);
        let worker = Worker {
            name: self.name.clone(),
            ports: self.ports.clone(),
            period,
            running,
            state: Arc::clone(&self.state),
            failure: Arc::clone(&self.failure),
            hooks,
        };

        // Set before spawning so an early update failure is not overwritten.
        self.set_state(TaskState::Running);
        match std::thread::Builder::new()
            .name(format!("task-{}", self.name))
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                inner.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                *self.failure.lock() = Some(format!("failed to spawn thread: {e}"));
                self.set_state(TaskState::Exception);
                Err(PortflowError::Io(e))
            }
        }
    }

    /// Halt scheduling. Legal from `Running`, and from `Exception` to recover.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        self.check(Transition::Stop)?;

        inner.running.store(false, Ordering::Release);
        if let Some(handle) = inner.worker.take() {
            match handle.join() {
                Ok(hooks) => inner.hooks = Some(hooks),
                Err(_) => {
                    let message = "update hook panicked".to_string();
                    *self.failure.lock() = Some(message.clone());
                    self.set_state(TaskState::Exception);
                    return Err(PortflowError::Task {
                        task: self.name.clone(),
                        message,
                    });
                }
            }
        }

        self.set_state(TaskState::Stopped);
        tracing::info!("Task '{}' stopped", self.name);
        Ok(())
    }

    fn check(&self, transition: Transition) -> Result<()> {
        let state = self.state();
        if transition.allowed_from(state) {
            Ok(())
        } else {
            Err(PortflowError::Lifecycle {
                task: self.name.clone(),
                operation: transition.as_str(),
                state,
            })
        }
    }

    fn set_state(&self, state: TaskState) {
        *self.state.write() = state;
    }

    fn hooks_lost(&self) -> PortflowError {
        PortflowError::Task {
            task: self.name.clone(),
            message: "hooks are unavailable after a failed run".to_string(),
        }
    }
}

impl Drop for TaskComponent {
    fn drop(&mut self) {
        if matches!(self.state(), TaskState::Running | TaskState::Exception) {
            if let Err(e) = self.stop() {
                tracing::warn!("Task '{}' did not stop cleanly: {}", self.name, e);
            }
        }
    }
}

impl std::fmt::Debug for TaskComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskComponent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("state", &self.state())
            .field("ports", &self.ports)
            .finish()
    }
}

fn into_configuration_error(err: PortflowError) -> PortflowError {
    match err {
        PortflowError::Configuration(_) => err,
        other => PortflowError::Configuration(other.to_string()),
    }
}

/// The scheduling loop, owned by the component's thread.
struct Worker {
    name: String,
    ports: PortSet,
    period: Duration,
    running: Arc<AtomicBool>,
    state: Arc<RwLock<TaskState>>,
    failure: Arc<Mutex<Option<String>>>,
    hooks: Box<dyn TaskHooks>,
}

impl Worker {
    fn run(mut self) -> Box<dyn TaskHooks> {
        tracing::info!("Task '{}' running (period {:?})", self.name, self.period);

        let start = Instant::now();
        let mut last_tick: Option<Instant> = None;
        let mut cycle = 0u64;

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            let dt = last_tick
                .map(|t| now.duration_since(t))
                .unwrap_or(self.period);
            last_tick = Some(now);

            let ctx = TaskContext {
                name: &self.name,
                ports: &self.ports,
                period: self.period,
                timestamp: now.duration_since(start),
                dt,
                cycle,
            };
            let hooks = &mut self.hooks;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| hooks.update_hook(&ctx)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(message) = failure {
                tracing::error!("Task '{}' update failed: {}", self.name, message);
                *self.failure.lock() = Some(message);
                *self.state.write() = TaskState::Exception;
                return self.hooks;
            }

            cycle += 1;
            rate_limit(now, self.period);
        }

        let ctx = TaskContext {
            name: &self.name,
            ports: &self.ports,
            period: self.period,
            timestamp: start.elapsed(),
            dt: Duration::ZERO,
            cycle,
        };
        self.hooks.stop_hook(&ctx);
        tracing::debug!("Task '{}' left its loop after {} cycles", self.name, cycle);
        self.hooks
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    match detail {
        Some(detail) => format!("update hook panicked: {detail}"),
        None => "update hook panicked".to_string(),
    }
}

/// Sleep until one period after `tick_start`.
pub(crate) fn rate_limit(tick_start: Instant, period: Duration) {
    let elapsed = tick_start.elapsed();
    if elapsed >= period {
        return;
    }
    let remaining = period - elapsed;
    // Spin for sub-millisecond accuracy, sleep for larger waits
    if remaining > Duration::from_millis(2) {
        std::thread::sleep(remaining - Duration::from_millis(1));
    }
    while tick_start.elapsed() < period {
        std::hint::spin_loop();
    }
}
