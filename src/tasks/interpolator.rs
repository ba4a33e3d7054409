//! Reference Cartesian interpolator.
//!
//! A simple velocity-limited generator that moves a pose towards a target:
//! each cycle the position advances by at most `linear.max_speed * period`
//! per axis, and the orientation rotates by at most
//! `angular.max_speed * period` radians about the shortest axis. It is a
//! stand-in producer for exercising the port protocol, not a jerk-limited
//! online trajectory generator.
//!
//! # Ports
//!
//! | name                 | dir | type              |
//! |----------------------|-----|-------------------|
//! | `cartesian_state`    | in  | `PoseSample`      |
//! | `target`             | in  | `PoseSample`      |
//! | `constrained_target` | in  | `ConstrainedPose` |
//! | `command`            | out | `PoseSample`      |
//! | `current_sample`     | out | `PoseSample`      |
//! | `status`             | out | `GeneratorStatus` |
//!
//! The first `cartesian_state` sample initializes the generator. From then on
//! each command is fed back as the current state, so later state samples only
//! refresh `current_sample`.
//!
//! A target on `constrained_target` moves under its own constraints, completed
//! from the configured ones. Once both target ports have ever carried data,
//! every update fails.

use crate::config::ConfigProfile;
use crate::error::{PortflowError, Result, ResultExt};
use crate::flow::{FlowStatus, PortSetBuilder, ReadHandle, WriteHandle};
use crate::task::{TaskContext, TaskHooks};
use crate::tasks::constraints::{
    ConstrainedPose, GeneratorStatus, MotionConstraint, PositionalLimitsBehavior,
};
use crate::types::PoseSample;
use chrono::Utc;
use nalgebra::UnitQuaternion;
use serde::Deserialize;

/// Model name used to look up configuration profiles.
pub const MODEL: &str = "cartesian_interpolator";

pub const CARTESIAN_STATE_PORT: &str = "cartesian_state";
pub const TARGET_PORT: &str = "target";
pub const CONSTRAINED_TARGET_PORT: &str = "constrained_target";
pub const COMMAND_PORT: &str = "command";
pub const CURRENT_SAMPLE_PORT: &str = "current_sample";
pub const STATUS_PORT: &str = "status";

/// Distance below which the target counts as reached.
const REACHED_EPSILON: f64 = 1e-9;

/// Configuration of the interpolator, deserialized from a profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    pub positional_limits_behavior: PositionalLimitsBehavior,
    /// Fills unset fields of `linear` and `angular`.
    pub default_constraint: MotionConstraint,
    /// Limits for x, y and z (m, m/s, ...).
    pub linear: MotionConstraint,
    /// Limits for the rotation angle (rad, rad/s, ...).
    pub angular: MotionConstraint,
}

impl InterpolatorConfig {
    /// Apply defaults and validate both constraint groups.
    pub fn resolved(mut self) -> Result<Self> {
        let default = self.default_constraint;
        self.linear.apply_default_if_unset(&default);
        self.angular.apply_default_if_unset(&default);
        self.linear.validate().context("linear")?;
        self.angular.validate().context("angular")?;
        Ok(self)
    }
}

struct Io {
    cartesian_state: ReadHandle<PoseSample>,
    target: ReadHandle<PoseSample>,
    constrained_target: ReadHandle<ConstrainedPose>,
    command: WriteHandle<PoseSample>,
    current_sample: WriteHandle<PoseSample>,
    status: WriteHandle<GeneratorStatus>,
}

impl Io {
    fn acquire(ctx: &TaskContext) -> Result<Self> {
        let ports = ctx.ports;
        Ok(Self {
            cartesian_state: ports.input(CARTESIAN_STATE_PORT)?.reader(),
            target: ports.input(TARGET_PORT)?.reader(),
            constrained_target: ports.input(CONSTRAINED_TARGET_PORT)?.reader(),
            command: ports.output(COMMAND_PORT)?.writer()?,
            current_sample: ports.output(CURRENT_SAMPLE_PORT)?.writer()?,
            status: ports.output(STATUS_PORT)?.writer()?,
        })
    }
}

/// The target being approached and the limits of that motion.
struct Motion {
    target: PoseSample,
    linear: MotionConstraint,
    angular: MotionConstraint,
}

/// The reference interpolator's hooks.
#[derive(Default)]
pub struct CartesianInterpolator {
    config: InterpolatorConfig,
    io: Option<Io>,
    current: Option<PoseSample>,
    motion: Option<Motion>,
}

impl CartesianInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }

    fn reset(&mut self) {
        self.current = None;
        self.motion = None;
    }
}

impl TaskHooks for CartesianInterpolator {
    fn declare_ports(&self, ports: PortSetBuilder) -> PortSetBuilder {
        ports
            .input::<PoseSample>(CARTESIAN_STATE_PORT)
            .input::<PoseSample>(TARGET_PORT)
            .input::<ConstrainedPose>(CONSTRAINED_TARGET_PORT)
            .output::<PoseSample>(COMMAND_PORT)
            .output::<PoseSample>(CURRENT_SAMPLE_PORT)
            .output::<GeneratorStatus>(STATUS_PORT)
    }

    fn properties(&self) -> &'static [&'static str] {
        &[
            "positional_limits_behavior",
            "default_constraint",
            "linear",
            "angular",
        ]
    }

    fn configure_hook(&mut self, ctx: &TaskContext, profile: &ConfigProfile) -> Result<()> {
        self.config = profile.deserialize::<InterpolatorConfig>()?.resolved()?;
        if self.io.is_none() {
            self.io = Some(Io::acquire(ctx)?);
        }
        self.reset();
        tracing::debug!("Interpolator '{}' constraints: {:?}", ctx.name, self.config);
        Ok(())
    }

    fn start_hook(&mut self, _ctx: &TaskContext) -> Result<()> {
        self.reset();
        Ok(())
    }

    fn update_hook(&mut self, ctx: &TaskContext) -> Result<()> {
        let Some(io) = self.io.as_mut() else {
            return Ok(());
        };

        let (flow, state) = io.cartesian_state.read_newest();
        if self.current.is_none() {
            if let Some(state) = state {
                tracing::debug!("Interpolator '{}' initialized from current state", ctx.name);
                self.current = Some(state);
            }
        }
        if flow != FlowStatus::NoData {
            if let Some(current) = &self.current {
                io.current_sample.write(current.clone().with_time(Utc::now()));
            }
        }

        if io.target.status() != FlowStatus::NoData
            && io.constrained_target.status() != FlowStatus::NoData
        {
            io.status.write(GeneratorStatus::Error);
            return Err(PortflowError::Task {
                task: ctx.name.to_string(),
                message: format!(
                    "there is data on both the {TARGET_PORT} and the \
                     {CONSTRAINED_TARGET_PORT} port; use only one of them"
                ),
            });
        }

        let incoming = match io.target.read() {
            Some(target) => Some(Ok(Motion {
                target,
                linear: self.config.linear,
                angular: self.config.angular,
            })),
            None => io.constrained_target.read().map(|constrained| {
                constrained
                    .constraints(&self.config.linear, &self.config.angular)
                    .map(|(linear, angular)| Motion {
                        target: constrained.pose,
                        linear,
                        angular,
                    })
                    .map_err(|e| PortflowError::Task {
                        task: ctx.name.to_string(),
                        message: format!("rejected constrained target: {e}"),
                    })
            }),
        };
        if let Some(motion) = incoming {
            let limited = motion.and_then(|mut motion| {
                motion.target = limit_target(
                    ctx.name,
                    motion.target,
                    &motion.linear,
                    self.config.positional_limits_behavior,
                )?;
                Ok(motion)
            });
            match limited {
                Ok(motion) => self.motion = Some(motion),
                Err(e) => {
                    io.status.write(GeneratorStatus::Error);
                    return Err(e);
                }
            }
        }

        let (Some(current), Some(motion)) = (&self.current, &self.motion) else {
            if self.current.is_none() && self.motion.is_some() {
                io.status.write(GeneratorStatus::NotInitialized);
            }
            return Ok(());
        };

        let command = step(current, motion, ctx.period.as_secs_f64());
        let status = if reached(&command, &motion.target) {
            GeneratorStatus::FinalStateReached
        } else {
            GeneratorStatus::Working
        };

        io.command.write(command.clone());
        io.status.write(status);
        self.current = Some(command);
        Ok(())
    }
}

/// Apply the positional-limits behavior to a new target.
fn limit_target(
    task: &str,
    mut target: PoseSample,
    limits: &MotionConstraint,
    behavior: PositionalLimitsBehavior,
) -> Result<PoseSample> {
    match behavior {
        PositionalLimitsBehavior::Ignore => {}
        PositionalLimitsBehavior::ErrorMsgOnly => {
            if let Some(axis) = target.position.iter().position(|&p| !limits.contains(p)) {
                return Err(PortflowError::Task {
                    task: task.to_string(),
                    message: format!(
                        "target position {} on axis {} is outside [{:?}, {:?}]",
                        target.position[axis], axis, limits.min_position, limits.max_position
                    ),
                });
            }
        }
        PositionalLimitsBehavior::ActivelyPrevent => {
            target.position = target.position.map(|p| limits.crop(p));
        }
    }
    Ok(target)
}

/// One interpolation cycle from `current` towards the motion's target.
fn step(current: &PoseSample, motion: &Motion, dt: f64) -> PoseSample {
    let target = &motion.target;
    let max_linear = motion.linear.max_speed.unwrap_or(0.0) * dt;
    let delta = target.position - current.position;
    let position = current.position + delta.map(|d| d.clamp(-max_linear, max_linear));

    let max_angular = motion.angular.max_speed.unwrap_or(0.0) * dt;
    let rotation = current.orientation.rotation_to(&target.orientation);
    let orientation = match rotation.axis_angle() {
        Some((axis, angle)) if angle > max_angular => {
            UnitQuaternion::from_axis_angle(&axis, max_angular) * current.orientation
        }
        _ => target.orientation,
    };

    PoseSample {
        time: Utc::now(),
        source_frame: target.source_frame.clone(),
        target_frame: target.target_frame.clone(),
        position,
        orientation,
    }
}

fn reached(command: &PoseSample, target: &PoseSample) -> bool {
    (target.position - command.position).norm() < REACHED_EPSILON
        && command.orientation.angle_to(&target.orientation) < REACHED_EPSILON
}
