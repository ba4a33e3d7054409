//! Test data builders for creating test objects

use nalgebra::Vector3;
use portflow::{EulerZyx, PoseSample};

/// Builder for creating test PoseSamples
pub struct PoseBuilder {
    position: Vector3<f64>,
    euler: EulerZyx,
    source_frame: String,
    target_frame: String,
}

impl PoseBuilder {
    pub fn new() -> Self {
        Self {
            position: Vector3::zeros(),
            euler: EulerZyx::new(0.0, 0.0, 0.0),
            source_frame: "tip".to_string(),
            target_frame: "root".to_string(),
        }
    }

    pub fn position(mut self, x: f64, y: f64, z: f64) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    pub fn euler(mut self, z: f64, y: f64, x: f64) -> Self {
        self.euler = EulerZyx::new(z, y, x);
        self
    }

    pub fn frames(mut self, source: &str, target: &str) -> Self {
        self.source_frame = source.to_string();
        self.target_frame = target.to_string();
        self
    }

    pub fn build(self) -> PoseSample {
        PoseSample::from_euler(
            self.position,
            self.euler,
            self.source_frame,
            self.target_frame,
        )
        .expect("builder poses are finite")
    }
}

impl Default for PoseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_builder() {
        let pose = PoseBuilder::new()
            .position(1.0, 2.0, 3.0)
            .frames("a", "b")
            .build();

        assert_eq!(pose.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.source_frame, "a");
        assert_eq!(pose.target_frame, "b");
    }
}
