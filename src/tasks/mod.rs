//! Built-in task behaviors.

pub mod constraints;
pub mod interpolator;

pub use constraints::{ConstrainedPose, GeneratorStatus, MotionConstraint, PositionalLimitsBehavior};
pub use interpolator::{CartesianInterpolator, InterpolatorConfig};
