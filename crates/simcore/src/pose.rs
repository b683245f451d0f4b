//! Rigid transforms and backbone pose sequences.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::error::ContractViolation;

/// A rigid transform in world space.
pub type Pose = Isometry3<f64>;

/// Placement of the robot's proximal end, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasePose {
    /// Position in world coordinates (m)
    pub translation: [f64; 3],
    /// Roll, pitch, yaw (rad)
    pub rpy: [f64; 3],
}

impl Default for BasePose {
    fn default() -> Self {
        BasePose {
            translation: [0.0; 3],
            rpy: [0.0; 3],
        }
    }
}

impl BasePose {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rpy(mut self, rpy: [f64; 3]) -> Self {
        self.rpy = rpy;
        self
    }

    pub fn is_finite(&self) -> bool {
        self.translation.iter().chain(self.rpy.iter()).all(|v| v.is_finite())
    }

    /// Convert to an isometry, rejecting NaN or infinite components.
    pub fn to_isometry(&self) -> Result<Pose, ContractViolation> {
        if !self.is_finite() {
            return Err(ContractViolation::NonFiniteBasePose);
        }
        let [x, y, z] = self.translation;
        let [roll, pitch, yaw] = self.rpy;
        Ok(Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        ))
    }
}

/// Disk poses of every segment, proximal first.
///
/// Segment `k + 1` starts at the last pose of segment `k`, so the boundary
/// pose appears in both. Built once per evaluation and replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct BackbonePoses {
    segments: Vec<Vec<Pose>>,
}

impl BackbonePoses {
    /// Wrap per-segment pose lists. Every segment must hold at least one pose.
    pub fn new(segments: Vec<Vec<Pose>>) -> Result<Self, ContractViolation> {
        if segments.is_empty() {
            return Err(ContractViolation::EmptyPoseSequence { segment: 0 });
        }
        if let Some(segment) = segments.iter().position(|s| s.is_empty()) {
            return Err(ContractViolation::EmptyPoseSequence { segment });
        }
        Ok(Self { segments })
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Option<&[Pose]> {
        self.segments.get(index).map(Vec::as_slice)
    }

    pub fn segments(&self) -> impl Iterator<Item = &[Pose]> {
        self.segments.iter().map(Vec::as_slice)
    }

    /// All poses in order, boundary poses included once per segment.
    pub fn iter(&self) -> impl Iterator<Item = &Pose> {
        self.segments.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The distal-most disk pose.
    pub fn end_effector(&self) -> &Pose {
        let last = &self.segments[self.segments.len() - 1];
        &last[last.len() - 1]
    }

    /// Disk centres in world coordinates.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.iter().map(|pose| Point3::from(pose.translation.vector)).collect()
    }
}

/// Result of a successful forward kinematics evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSolution {
    pub end_effector: Pose,
    pub disks: BackbonePoses,
}

impl From<BackbonePoses> for KinematicSolution {
    fn from(disks: BackbonePoses) -> Self {
        KinematicSolution {
            end_effector: *disks.end_effector(),
            disks,
        }
    }
}
