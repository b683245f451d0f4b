//! Error types for kinematic evaluation and model construction.

use thiserror::Error;

/// Caller errors: malformed configuration or a mis-sized actuation vector.
///
/// These are never coerced into something valid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("actuation vector has {actual} components, model expects {expected}")]
    ActuationLength { expected: usize, actual: usize },

    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("segment {segment} needs at least 2 disks, got {disk_count}")]
    TooFewDisks { segment: usize, disk_count: usize },

    #[error("expected between {min} and {max} segments, got {actual}")]
    SegmentCount { min: usize, max: usize, actual: usize },

    #[error("base pose must be finite")]
    NonFiniteBasePose,

    #[error("pose sequence segment {segment} is empty")]
    EmptyPoseSequence { segment: usize },

    #[error("tube {tube} must be longer than the tube around it")]
    TubeNesting { tube: usize },
}

impl ContractViolation {
    /// Check that `value` is strictly positive and finite.
    pub fn check_positive(name: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Self::NonPositive { name, value })
        }
    }
}

/// The actuation has no physically realizable pose.
///
/// Expected and recoverable: the caller keeps its last valid pose.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicFailure {
    #[error("actuation component {index} is not finite")]
    NonFiniteActuation { index: usize },

    #[error("segment {segment}: tendon displacement {displacement:.4} m exceeds segment length {length:.4} m")]
    TendonOverrun {
        segment: usize,
        displacement: f64,
        length: f64,
    },

    #[error("segment {segment}: bending radius {radius:.4} m is below the minimum {min_radius:.4} m")]
    CurvatureExceeded {
        segment: usize,
        radius: f64,
        min_radius: f64,
    },

    #[error("tube {tube}: base translation {translation:.4} m is ahead of the robot base")]
    TubeBaseAhead { tube: usize, translation: f64 },

    #[error("tube {tube}: base must stay behind the base of the tube around it")]
    TubeBaseOrder { tube: usize },

    #[error("tube {tube}: distal end must extend past the tube around it")]
    TubeEndOrder { tube: usize },

    #[error("tube {tube} is fully retracted")]
    TubeRetracted { tube: usize },
}

/// Everything `forward_kinematics` can return besides a solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Infeasible(#[from] KinematicFailure),
}

impl KinematicError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, KinematicError::Contract(_))
    }
}
