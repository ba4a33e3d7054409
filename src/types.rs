//! Core data types for portflow
//!
//! # Main Types
//!
//! - [`PoseSample`] - A timestamped rigid-body pose between two labeled frames
//! - [`EulerZyx`] - Euler angles extracted in axis order 2, 1, 0 (yaw, pitch, roll)
//!
//! # Orientation invariant
//!
//! A [`PoseSample`] always holds a unit quaternion. Raw quaternions whose norm
//! deviates from one by more than [`UNIT_NORM_TOLERANCE`] are rejected at
//! construction instead of being normalized.

use crate::error::{PortflowError, Result};
use chrono::{DateTime, Utc};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Maximum allowed deviation of a quaternion norm from 1
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// Euler angles in extraction order Z, Y, X
///
/// `z` is the rotation about axis 2 (yaw), `y` about axis 1 (pitch), `x` about
/// axis 0 (roll). The rotation is `Rz(z) * Ry(y) * Rx(x)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EulerZyx {
    pub z: f64,
    pub y: f64,
    pub x: f64,
}

impl EulerZyx {
    pub fn new(z: f64, y: f64, x: f64) -> Self {
        Self { z, y, x }
    }

    /// Extract Z, Y, X angles from a rotation
    pub fn from_quaternion(q: &UnitQuaternion<f64>) -> Self {
        let (roll, pitch, yaw) = q.euler_angles();
        Self {
            z: yaw,
            y: pitch,
            x: roll,
        }
    }

    /// Build the rotation `Rz(z) * Ry(y) * Rx(x)`
    pub fn to_quaternion(self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.x, self.y, self.z)
    }

    /// Angles in printing order: axis 2, axis 1, axis 0
    pub fn as_array(&self) -> [f64; 3] {
        [self.z, self.y, self.x]
    }
}

/// A rigid-body pose snapshot
///
/// The pose of `source_frame` expressed in `target_frame`, valid at `time`.
/// Deserialization runs the same checks as [`PoseSample::from_raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoseSample")]
pub struct PoseSample {
    pub time: DateTime<Utc>,
    pub source_frame: String,
    pub target_frame: String,
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl PoseSample {
    /// Create a sample from an already-normalized rotation
    ///
    /// Fails if any position component is not finite.
    pub fn new(
        position: Vector3<f64>,
        orientation: UnitQuaternion<f64>,
        source_frame: impl Into<String>,
        target_frame: impl Into<String>,
    ) -> Result<Self> {
        check_finite(&position)?;
        Ok(Self {
            time: Utc::now(),
            source_frame: source_frame.into(),
            target_frame: target_frame.into(),
            position,
            orientation,
        })
    }

    /// Create a sample from a raw quaternion, rejecting non-unit norms
    pub fn from_raw(
        position: Vector3<f64>,
        orientation: Quaternion<f64>,
        source_frame: impl Into<String>,
        target_frame: impl Into<String>,
    ) -> Result<Self> {
        let norm = orientation.norm();
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
            return Err(PortflowError::InvalidSample(format!(
                "orientation is not a unit quaternion (norm {norm})"
            )));
        }
        let unit = UnitQuaternion::new_unchecked(orientation);
        Self::new(position, unit, source_frame, target_frame)
    }

    /// Create a sample whose orientation is given as Z, Y, X Euler angles
    pub fn from_euler(
        position: Vector3<f64>,
        euler: EulerZyx,
        source_frame: impl Into<String>,
        target_frame: impl Into<String>,
    ) -> Result<Self> {
        Self::new(position, euler.to_quaternion(), source_frame, target_frame)
    }

    /// Override the timestamp
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Orientation as Z, Y, X Euler angles
    pub fn euler(&self) -> EulerZyx {
        EulerZyx::from_quaternion(&self.orientation)
    }
}

/// Unvalidated wire form of a [`PoseSample`].
#[derive(Deserialize)]
struct RawPoseSample {
    time: DateTime<Utc>,
    source_frame: String,
    target_frame: String,
    position: Vector3<f64>,
    orientation: Quaternion<f64>,
}

impl TryFrom<RawPoseSample> for PoseSample {
    type Error = PortflowError;

    fn try_from(raw: RawPoseSample) -> Result<Self> {
        let sample = Self::from_raw(
            raw.position,
            raw.orientation,
            raw.source_frame,
            raw.target_frame,
        )?;
        Ok(sample.with_time(raw.time))
    }
}

fn check_finite(position: &Vector3<f64>) -> Result<()> {
    if position.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(PortflowError::InvalidSample(format!(
            "position has non-finite components: {:?}",
            position.as_slice()
        )))
    }
}
