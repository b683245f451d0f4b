//! Tendon-driven continuum robot (TDCR)
//!
//! Forward kinematics for one or two serially stacked segments. Each segment
//! is bent by tendons routed through spacer disks at its pitch radius. The
//! tendons of a distal segment pass through every proximal segment, so the
//! displacement measured at the actuator contains the proximal bending; the
//! model removes that share before applying the bending law.

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use simcore::{
    ActuationVector, BackbonePoses, BasePose, ContractViolation, KinematicError,
    KinematicFailure, KinematicModel, KinematicSolution, Pose, SkeletonGeometry,
};

use crate::arc::discretize;
use crate::law::{BendingLaw, ConstantCurvatureLaw};
use crate::segment::{SegmentGeometry, TendonLayout};

pub const MIN_SEGMENTS: usize = 1;
pub const MAX_SEGMENTS: usize = 2;

/// Configuration for a tendon-driven robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TdcrConfig {
    /// Segments from proximal to distal
    pub segments: Vec<SegmentGeometry>,
    /// Tendon routing, shared by all segments
    pub layout: TendonLayout,
    /// Placement of the proximal end
    pub base_pose: BasePose,
    /// Smallest bending radius the backbone tolerates (m)
    pub min_bending_radius: f64,
    /// Tendon displacement per key press (m)
    pub actuation_step: f64,
    /// Spacer disk radius (m), for drawing only
    pub disk_radius: f64,
    /// Spacer disk thickness (m), for drawing only
    pub disk_height: f64,
    /// Backbone rod radius (m), for drawing only
    pub backbone_radius: f64,
}

impl Default for TdcrConfig {
    fn default() -> Self {
        TdcrConfig {
            segments: vec![
                SegmentGeometry::new(0.1, 8, 0.006),
                SegmentGeometry::new(0.1, 8, 0.005),
            ],
            layout: TendonLayout::Planar,
            base_pose: BasePose::identity(),
            min_bending_radius: 0.02,
            actuation_step: 0.0005,
            disk_radius: 0.007,
            disk_height: 0.003,
            backbone_radius: 0.001,
        }
    }
}

impl TdcrConfig {
    /// A single segment with default drawing parameters
    pub fn single_segment(length: f64, disk_count: usize, pitch_radius: f64) -> Self {
        Self::default().with_segments(vec![SegmentGeometry::new(length, disk_count, pitch_radius)])
    }

    pub fn with_segments(mut self, segments: Vec<SegmentGeometry>) -> Self {
        self.segments = segments;
        self
    }

    pub fn with_layout(mut self, layout: TendonLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_base_pose(mut self, base_pose: BasePose) -> Self {
        self.base_pose = base_pose;
        self
    }

    pub fn with_min_bending_radius(mut self, radius: f64) -> Self {
        self.min_bending_radius = radius;
        self
    }

    /// Number of actuation components the configuration implies
    pub fn dof(&self) -> usize {
        self.segments.len() * self.layout.inputs_per_segment()
    }
}

/// Tendon-driven robot model. Immutable once built.
#[derive(Debug, Clone)]
pub struct TendonDrivenModel<L: BendingLaw = ConstantCurvatureLaw> {
    segments: Vec<SegmentGeometry>,
    layout: TendonLayout,
    base: Pose,
    min_bending_radius: f64,
    actuation_step: f64,
    skeleton: SkeletonGeometry,
    law: L,
}

impl TendonDrivenModel {
    /// Build a model with the constant-curvature law
    pub fn new(config: TdcrConfig) -> Result<Self, ContractViolation> {
        Self::with_law(config, ConstantCurvatureLaw)
    }
}

impl<L: BendingLaw> TendonDrivenModel<L> {
    /// Build a model with a custom bending law
    pub fn with_law(config: TdcrConfig, law: L) -> Result<Self, ContractViolation> {
        let count = config.segments.len();
        if !(MIN_SEGMENTS..=MAX_SEGMENTS).contains(&count) {
            return Err(ContractViolation::SegmentCount {
                min: MIN_SEGMENTS,
                max: MAX_SEGMENTS,
                actual: count,
            });
        }
        for (i, segment) in config.segments.iter().enumerate() {
            segment.validate(i)?;
        }
        ContractViolation::check_positive("minimum bending radius", config.min_bending_radius)?;
        ContractViolation::check_positive("actuation step", config.actuation_step)?;
        let base = config.base_pose.to_isometry()?;

        let skeleton = SkeletonGeometry {
            disk_count: config.segments.iter().map(|s| s.disk_count).max().unwrap_or(0),
            pitch_radii: config.segments.iter().map(|s| s.pitch_radius).collect(),
            disk_radius: config.disk_radius,
            outer_radius: config.backbone_radius,
            disk_height: config.disk_height,
        };

        debug!(
            "built tendon-driven model: {} segment(s), {:?} layout, {} inputs",
            count,
            config.layout,
            config.dof()
        );

        Ok(Self {
            segments: config.segments,
            layout: config.layout,
            base,
            min_bending_radius: config.min_bending_radius,
            actuation_step: config.actuation_step,
            skeleton,
            law,
        })
    }

    pub fn segments(&self) -> &[SegmentGeometry] {
        &self.segments
    }

    pub fn base(&self) -> &Pose {
        &self.base
    }

    /// Tendon displacement of segment `k` as measured at the actuator.
    fn actuator_displacement(&self, actuation: &ActuationVector, k: usize) -> Vector2<f64> {
        match self.layout {
            TendonLayout::Planar => Vector2::new(actuation[k], 0.0),
            TendonLayout::Spatial => Vector2::new(actuation[2 * k], actuation[2 * k + 1]),
        }
    }
}

impl<L: BendingLaw> KinematicModel for TendonDrivenModel<L> {
    fn name(&self) -> &str {
        "tendon-driven continuum robot"
    }

    fn dof(&self) -> usize {
        self.segments.len() * self.layout.inputs_per_segment()
    }

    fn actuation_step(&self, _index: usize) -> f64 {
        self.actuation_step
    }

    fn skeleton(&self) -> SkeletonGeometry {
        self.skeleton.clone()
    }

    fn forward_kinematics(
        &self,
        actuation: &ActuationVector,
    ) -> Result<KinematicSolution, KinematicError> {
        if actuation.len() != self.dof() {
            return Err(ContractViolation::ActuationLength {
                expected: self.dof(),
                actual: actuation.len(),
            }
            .into());
        }
        if let Some(index) = actuation.iter().position(|q| !q.is_finite()) {
            return Err(KinematicFailure::NonFiniteActuation { index }.into());
        }

        // Bending angle accumulated by the proximal segments, per tendon direction
        let mut proximal_bend = Vector2::zeros();
        let mut frame = self.base;
        let mut poses = Vec::with_capacity(self.segments.len());

        for (k, segment) in self.segments.iter().enumerate() {
            let measured = self.actuator_displacement(actuation, k);
            if measured.norm() > segment.length {
                return Err(KinematicFailure::TendonOverrun {
                    segment: k,
                    displacement: measured.norm(),
                    length: segment.length,
                }
                .into());
            }

            let local = measured - proximal_bend * segment.pitch_radius;
            let curvature = self.law.curvature(segment, local);
            let kappa = curvature.norm();
            if kappa * self.min_bending_radius > 1.0 {
                return Err(KinematicFailure::CurvatureExceeded {
                    segment: k,
                    radius: 1.0 / kappa,
                    min_radius: self.min_bending_radius,
                }
                .into());
            }
            proximal_bend += curvature * segment.length;

            let disks = discretize(&frame, curvature, segment.length, segment.disk_count);
            frame = disks[disks.len() - 1];
            poses.push(disks);
        }

        Ok(KinematicSolution::from(BackbonePoses::new(poses)?))
    }
}
