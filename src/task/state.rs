//! Lifecycle state machine of a task component.
//!
//! ```text
//!                configure          start
//! Unconfigured ───────────► Configured ─────► Running
//!                              ▲                │  │
//!                    configure │           stop │  │ update error
//!                              │                ▼  ▼
//!                           Stopped ◄──stop── Exception
//! ```

use std::fmt;

/// Lifecycle state of a task component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Unconfigured,
    Configured,
    Running,
    Stopped,
    /// The update hook failed; scheduling has ended.
    Exception,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Configure,
    Start,
    Stop,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Configure => "configure",
            Transition::Start => "start",
            Transition::Stop => "stop",
        }
    }

    /// Whether the transition is legal from `state`.
    pub fn allowed_from(self, state: TaskState) -> bool {
        matches!(
            (self, state),
            (Transition::Configure, TaskState::Unconfigured)
                | (Transition::Configure, TaskState::Stopped)
                | (Transition::Start, TaskState::Configured)
                | (Transition::Stop, TaskState::Running)
                | (Transition::Stop, TaskState::Exception)
        )
    }

    /// State reached on success.
    pub fn target(self) -> TaskState {
        match self {
            Transition::Configure => TaskState::Configured,
            Transition::Start => TaskState::Running,
            Transition::Stop => TaskState::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskState; 5] = [
        TaskState::Unconfigured,
        TaskState::Configured,
        TaskState::Running,
        TaskState::Stopped,
        TaskState::Exception,
    ];

    #[test]
    fn test_start_only_from_configured() {
        for state in ALL {
            assert_eq!(
                Transition::Start.allowed_from(state),
                state == TaskState::Configured,
                "{state}"
            );
        }
    }

    #[test]
    fn test_configure_from_fresh_or_stopped() {
        assert!(Transition::Configure.allowed_from(TaskState::Unconfigured));
        assert!(Transition::Configure.allowed_from(TaskState::Stopped));
        assert!(!Transition::Configure.allowed_from(TaskState::Running));
        assert!(!Transition::Configure.allowed_from(TaskState::Exception));
    }

    #[test]
    fn test_stop_targets() {
        assert!(Transition::Stop.allowed_from(TaskState::Running));
        assert!(Transition::Stop.allowed_from(TaskState::Exception));
        assert!(!Transition::Stop.allowed_from(TaskState::Stopped));
        assert_eq!(Transition::Stop.target(), TaskState::Stopped);
    }
}
