//! Constant-curvature arc primitive
//!
//! An arc is described by a curvature vector `u = (u_x, u_y)` (1/m) in the
//! local xy-plane. The backbone tangent is the local z-axis and bending turns
//! it toward the direction of `u`. Arcs carry no torsion about z.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector2, Vector3};
use simcore::Pose;

/// Curvature magnitudes below this are treated as a straight section (1/m).
pub const CURVATURE_EPSILON: f64 = 1e-9;

/// Bending angles below this use the Taylor series of the arc ratios.
const SERIES_THRESHOLD: f64 = 1e-4;

/// sin(x) / x
fn sinc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// (1 - cos(x)) / x
fn versinc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        x / 2.0 - x * x * x / 24.0
    } else {
        (1.0 - x.cos()) / x
    }
}

/// Transform from the start of an arc of length `ds` to its end.
pub fn arc_step(curvature: Vector2<f64>, ds: f64) -> Pose {
    let kappa = curvature.norm();
    if kappa < CURVATURE_EPSILON {
        return Isometry3::translation(0.0, 0.0, ds);
    }

    let theta = kappa * ds;
    let direction = curvature / kappa;

    // In-plane offset is ds * (1 - cos θ) / θ, axial advance ds * sin θ / θ
    let lateral = ds * versinc(theta);
    let translation = Translation3::new(
        lateral * direction.x,
        lateral * direction.y,
        ds * sinc(theta),
    );

    // Rotation about z × u turns the tangent toward u
    let rotation =
        UnitQuaternion::from_scaled_axis(Vector3::new(-curvature.y, curvature.x, 0.0) * ds);

    Isometry3::from_parts(translation, rotation)
}

/// `disk_count` poses evenly spaced over `length`, the first one at `base`.
///
/// Every pose is composed from the previous one with the same arc step.
pub fn discretize(
    base: &Pose,
    curvature: Vector2<f64>,
    length: f64,
    disk_count: usize,
) -> Vec<Pose> {
    let intervals = disk_count.saturating_sub(1).max(1);
    let step = arc_step(curvature, length / intervals as f64);

    let mut poses = Vec::with_capacity(disk_count);
    let mut frame = *base;
    poses.push(frame);
    for _ in 1..disk_count {
        frame = frame * step;
        poses.push(frame);
    }
    poses
}
