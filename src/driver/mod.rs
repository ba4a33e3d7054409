//! Driver loop: feeds a running component and observes its commands.
//!
//! A session goes through four fallible phases before it touches any data:
//! resolve the component by name, take handles on its ports, configure it
//! from profiles, and start it. Errors in these phases come back as
//! [`PortflowError::Session`] naming the phase. After that the driver writes
//! the initial state, waits for the go-ahead, writes the target and polls the
//! command port until it is told to stop.
//!
//! The driver never stops the component. Its lifetime belongs to whoever
//! owns the [`Runtime`].
//!
//! # Example
//!
//! ```ignore
//! let (go_tx, go_rx) = crossbeam_channel::bounded(1);
//! let stop = StopSignal::new();
//! let driver = Driver::new(&runtime, DriverConfig::default());
//! let summary = driver.run(initial, target, &go_rx, &stop, &mut ConsoleReporter::stdout())?;
//! ```
//!
//! [`PortflowError::Session`]: crate::error::PortflowError::Session

pub mod report;

pub use report::{CommandReport, ConsoleReporter, JsonLinesReporter, Reporter};

use crate::error::{Result, SessionPhase};
use crate::flow::{ReadHandle, WriteHandle};
use crate::runtime::Runtime;
use crate::task::{rate_limit, TaskComponent};
use crate::types::PoseSample;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Settings of one driver session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name the component was deployed under
    pub task_name: String,
    /// Profiles applied in order, later ones override earlier ones
    pub profiles: Vec<String>,
    /// Fail on unknown configuration options instead of warning
    pub strict: bool,
    #[serde(with = "crate::config::duration_ms")]
    pub poll_interval: Duration,
    pub current_state_port: String,
    pub target_port: String,
    pub command_port: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            task_name: "interpolator".to_string(),
            profiles: vec!["default".to_string()],
            strict: true,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            current_state_port: "cartesian_state".to_string(),
            target_port: "target".to_string(),
            command_port: "command".to_string(),
        }
    }
}

/// Cooperative cancellation flag shared between threads.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a session observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Reads attempted on the command port
    pub polls: u64,
    /// Reads that returned a command
    pub commands: u64,
    pub last_command: Option<PoseSample>,
}

pub struct Driver<'rt> {
    runtime: &'rt Runtime,
    config: DriverConfig,
}

impl<'rt> Driver<'rt> {
    pub fn new(runtime: &'rt Runtime, config: DriverConfig) -> Self {
        Self { runtime, config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Resolve, configure and start the component, then take port handles.
    pub fn prepare(&self) -> Result<Session> {
        let cfg = &self.config;

        let task = self
            .runtime
            .task(&cfg.task_name)
            .map_err(|e| e.in_phase(SessionPhase::Resolution))?;

        // Port handles are taken before any lifecycle change, so a bad port
        // name leaves the component as it was.
        let ports = || -> Result<Session> {
            Ok(Session {
                current_state: task.input::<PoseSample>(&cfg.current_state_port)?.writer()?,
                target: task.input::<PoseSample>(&cfg.target_port)?.writer()?,
                command: task.output::<PoseSample>(&cfg.command_port)?.reader(),
                poll_interval: cfg.poll_interval,
                task: Arc::clone(&task),
            })
        };
        let session = ports().map_err(|e| e.in_phase(SessionPhase::Ports))?;

        self.runtime
            .apply_config(&task, &cfg.profiles, cfg.strict)
            .map_err(|e| e.in_phase(SessionPhase::Configuration))?;

        task.start().map_err(|e| e.in_phase(SessionPhase::Lifecycle))?;

        tracing::info!(
            "Driver attached to task '{}' with profiles {:?}",
            cfg.task_name,
            cfg.profiles
        );
        Ok(session)
    }

    /// Prepare a session and run it to completion.
    pub fn run(
        &self,
        initial: PoseSample,
        target: PoseSample,
        go_ahead: &Receiver<()>,
        stop: &StopSignal,
        reporter: &mut dyn Reporter,
    ) -> Result<SessionSummary> {
        self.prepare()?.run(initial, target, go_ahead, stop, reporter)
    }
}

/// A prepared session holding the driver's port handles.
///
/// Dropping it releases the writer roles on the component's input ports.
pub struct Session {
    task: Arc<TaskComponent>,
    current_state: WriteHandle<PoseSample>,
    target: WriteHandle<PoseSample>,
    command: ReadHandle<PoseSample>,
    poll_interval: Duration,
}

impl Session {
    pub fn task(&self) -> &Arc<TaskComponent> {
        &self.task
    }

    /// Run the data-flow protocol until `stop` is raised.
    ///
    /// Returns early with an empty summary when stopped before the go-ahead
    /// or when the go-ahead sender goes away.
    pub fn run(
        mut self,
        initial: PoseSample,
        target: PoseSample,
        go_ahead: &Receiver<()>,
        stop: &StopSignal,
        reporter: &mut dyn Reporter,
    ) -> Result<SessionSummary> {
        let mut summary = SessionSummary::default();

        self.current_state.write(initial);
        tracing::info!("Initial state written, waiting for go-ahead");

        if !self.wait_for_go_ahead(go_ahead, stop) {
            tracing::info!("Session on '{}' stopped before go-ahead", self.task.name());
            return Ok(summary);
        }

        self.target.write(target.clone());
        tracing::info!("Target written, polling '{}'", self.command.channel_name());

        while !stop.is_stopped() {
            let tick = Instant::now();
            summary.polls += 1;

            match self.command.read() {
                Some(command) => {
                    summary.commands += 1;
                    reporter
                        .report(&CommandReport::new(&target, &command))
                        .map_err(|e| e.with_context("reporting command"))?;
                    summary.last_command = Some(command);
                }
                None => tracing::trace!("No command sample"),
            }

            rate_limit(tick, self.poll_interval);
        }

        tracing::info!(
            "Session on '{}' stopped after {} polls, {} commands",
            self.task.name(),
            summary.polls,
            summary.commands
        );
        Ok(summary)
    }

    /// Block until the go-ahead arrives. `false` means the session was cancelled.
    fn wait_for_go_ahead(&self, go_ahead: &Receiver<()>, stop: &StopSignal) -> bool {
        loop {
            if stop.is_stopped() {
                return false;
            }
            match go_ahead.recv_timeout(self.poll_interval) {
                Ok(()) => return true,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Go-ahead source disconnected");
                    return false;
                }
            }
        }
    }
}
