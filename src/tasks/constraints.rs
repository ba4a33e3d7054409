//! Motion constraints and generator status types.

use crate::error::{PortflowError, Result, ResultExt};
use crate::types::PoseSample;
use serde::{Deserialize, Serialize};

/// Dynamic limits for one degree of freedom, or one group of them.
///
/// Units are m, m/s, m/s², m/s³ for linear motion and rad, rad/s, ... for
/// angular motion. Unset fields may be filled from a default constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotionConstraint {
    pub max_position: Option<f64>,
    pub min_position: Option<f64>,
    pub max_speed: Option<f64>,
    pub max_acceleration: Option<f64>,
    pub max_jerk: Option<f64>,
}

impl MotionConstraint {
    pub fn has_max_position(&self) -> bool {
        self.max_position.is_some()
    }

    pub fn has_min_position(&self) -> bool {
        self.min_position.is_some()
    }

    /// Check that the constraint is usable for trajectory generation.
    pub fn validate(&self) -> Result<()> {
        let positive = |value: Option<f64>, what: &str| match value {
            None => Err(invalid(format!("maximum {what} is unset"))),
            Some(v) if v.is_nan() || v <= 0.0 => {
                Err(invalid(format!("max. {what} has to be > 0, got {v}")))
            }
            Some(_) => Ok(()),
        };
        positive(self.max_speed, "speed")?;
        positive(self.max_acceleration, "acceleration")?;
        positive(self.max_jerk, "jerk")?;

        if let (Some(max), Some(min)) = (self.max_position, self.min_position) {
            if max <= min {
                return Err(invalid(format!(
                    "max. position ({max}) has to be > min. position ({min})"
                )));
            }
        }
        Ok(())
    }

    /// Fill every unset field from `default`.
    pub fn apply_default_if_unset(&mut self, default: &MotionConstraint) {
        self.max_position = self.max_position.or(default.max_position);
        self.min_position = self.min_position.or(default.min_position);
        self.max_speed = self.max_speed.or(default.max_speed);
        self.max_acceleration = self.max_acceleration.or(default.max_acceleration);
        self.max_jerk = self.max_jerk.or(default.max_jerk);
    }

    /// Clamp `value` into the position limits that are set.
    pub fn crop(&self, value: f64) -> f64 {
        let value = self.max_position.map_or(value, |max| value.min(max));
        self.min_position.map_or(value, |min| value.max(min))
    }

    /// Whether `value` lies inside the position limits that are set.
    pub fn contains(&self, value: f64) -> bool {
        self.max_position.map_or(true, |max| value <= max)
            && self.min_position.map_or(true, |min| value >= min)
    }
}

fn invalid(message: String) -> PortflowError {
    PortflowError::Configuration(format!("motion constraints: {message}"))
}

/// A target pose that carries its own motion constraints.
///
/// The constraints hold for this motion only. A missing group, and every unset
/// field of a given group, falls back to the configured constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstrainedPose {
    pub pose: PoseSample,
    #[serde(default)]
    pub linear: Option<MotionConstraint>,
    #[serde(default)]
    pub angular: Option<MotionConstraint>,
}

impl ConstrainedPose {
    pub fn new(pose: PoseSample) -> Self {
        Self {
            pose,
            linear: None,
            angular: None,
        }
    }

    pub fn with_linear(mut self, linear: MotionConstraint) -> Self {
        self.linear = Some(linear);
        self
    }

    pub fn with_angular(mut self, angular: MotionConstraint) -> Self {
        self.angular = Some(angular);
        self
    }

    /// Resolve the `(linear, angular)` constraints for this motion.
    ///
    /// Overrides are completed from the configured groups and validated.
    pub fn constraints(
        &self,
        linear: &MotionConstraint,
        angular: &MotionConstraint,
    ) -> Result<(MotionConstraint, MotionConstraint)> {
        let merge = |group: Option<MotionConstraint>, configured: &MotionConstraint| {
            let mut merged = group.unwrap_or(*configured);
            merged.apply_default_if_unset(configured);
            merged.validate().map(|()| merged)
        };
        Ok((
            merge(self.linear, linear).context("linear")?,
            merge(self.angular, angular).context("angular")?,
        ))
    }
}

/// What the generator does with targets outside the position limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionalLimitsBehavior {
    /// Limits are not consulted.
    #[default]
    Ignore,
    /// An out-of-bounds target is an error.
    ErrorMsgOnly,
    /// Targets are cropped to the limits.
    ActivelyPrevent,
}

/// State of the trajectory generator, published every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorStatus {
    /// No current state has been received yet.
    NotInitialized,
    /// Moving towards the target.
    Working,
    /// The target has been reached.
    FinalStateReached,
    /// The last target could not be processed.
    Error,
}
