//! Bending laws mapping tendon displacement to segment curvature.

use std::fmt::Debug;

use nalgebra::Vector2;

use crate::segment::SegmentGeometry;

/// Curvature of one segment as a pure function of its geometry and its
/// decoupled tendon displacement.
pub trait BendingLaw: Debug {
    /// `displacement` is the tendon shortening (m) on the +x and +y sides.
    /// Returns the curvature vector (1/m) in the segment's base frame.
    fn curvature(&self, segment: &SegmentGeometry, displacement: Vector2<f64>) -> Vector2<f64>;
}

/// Constant curvature: a tendon at pitch radius `r` shortened by `d` bends
/// the segment through `θ = d / r`, spread evenly over its length.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantCurvatureLaw;

impl BendingLaw for ConstantCurvatureLaw {
    fn curvature(&self, segment: &SegmentGeometry, displacement: Vector2<f64>) -> Vector2<f64> {
        displacement / (segment.pitch_radius * segment.length)
    }
}
