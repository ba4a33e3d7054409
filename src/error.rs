//! Error handling for portflow
//!
//! This module defines the error taxonomy shared by channels, ports, task
//! components and the driver loop, plus a Result alias.
//!
//! Absence of data on a channel is deliberately *not* represented here: reads
//! return `Option` and an empty read is a normal outcome.

use std::fmt;
use thiserror::Error;

/// Phase of a driver session, used to tag fatal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Looking up the task component by name
    Resolution,
    /// Resolving profiles and running `configure()`
    Configuration,
    /// `start()` or another lifecycle transition
    Lifecycle,
    /// Acquiring port handles
    Ports,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Resolution => "resolution",
            SessionPhase::Configuration => "configuration",
            SessionPhase::Lifecycle => "lifecycle transition",
            SessionPhase::Ports => "port acquisition",
        };
        f.write_str(name)
    }
}

/// Main error type for portflow operations
#[derive(Error, Debug)]
pub enum PortflowError {
    /// A profile is missing, malformed, or has unknown options in strict mode
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A lifecycle transition was attempted from an illegal state
    #[error("Lifecycle error: cannot {operation} task '{task}' in state {state}")]
    Lifecycle {
        task: String,
        operation: &'static str,
        state: crate::task::TaskState,
    },

    /// A named task or port does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A port was requested with the wrong type or direction
    #[error("Port mismatch on '{port}': {message}")]
    PortMismatch { port: String, message: String },

    /// The single writer role of a channel is already held
    #[error("Port '{0}' already has a live writer")]
    WriterInUse(String),

    /// A sample violated its construction invariants
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    /// A component's update hook failed while running
    #[error("Task '{task}' failed: {message}")]
    Task { task: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A fatal error that aborted a driver session
    #[error("Session failed during {phase}: {source}")]
    Session {
        phase: SessionPhase,
        #[source]
        source: Box<PortflowError>,
    },

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PortflowError>,
    },
}

impl PortflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PortflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Tag an error with the session phase it aborted
    pub fn in_phase(self, phase: SessionPhase) -> Self {
        PortflowError::Session {
            phase,
            source: Box::new(self),
        }
    }

    /// The session phase this error aborted, if it was tagged with one
    pub fn phase(&self) -> Option<SessionPhase> {
        match self {
            PortflowError::Session { phase, .. } => Some(*phase),
            PortflowError::WithContext { source, .. } => source.phase(),
            _ => None,
        }
    }

    /// The innermost error, with session and context wrappers removed
    pub fn root(&self) -> &PortflowError {
        match self {
            PortflowError::Session { source, .. } | PortflowError::WithContext { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}

impl From<toml::de::Error> for PortflowError {
    fn from(err: toml::de::Error) -> Self {
        PortflowError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for PortflowError {
    fn from(err: serde_json::Error) -> Self {
        PortflowError::Serialization(err.to_string())
    }
}

/// Result type alias for portflow operations
pub type Result<T> = std::result::Result<T, PortflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
