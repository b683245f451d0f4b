//! Concentric tube continuum robot (CTCR)
//!
//! Torsionally rigid, piecewise constant curvature model. Tubes are nested
//! with the outermost first; each is translated (`β ≤ 0`) and rotated (`α`)
//! at its base. Wherever several tubes overlap, the backbone takes the
//! stiffness-weighted mean of their precurvatures.
//!
//! Actuation layout: `[β_0, …, β_{n-1}, α_0, …, α_{n-1}]`.

use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use simcore::{
    ActuationVector, BackbonePoses, BasePose, ContractViolation, KinematicError,
    KinematicFailure, KinematicModel, KinematicSolution, Pose, SkeletonGeometry,
};

use crate::arc::arc_step;
use crate::segment::unset;

/// Breakpoints closer than this are merged, and a tube must reach at least
/// this far past the base (m)
const BREAKPOINT_TOLERANCE: f64 = 1e-12;

/// One precurved tube. Fields missing from a config file deserialize as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TubeGeometry {
    /// Straight proximal section (m)
    #[serde(default = "unset")]
    pub straight_length: f64,
    /// Precurved distal section (m)
    #[serde(default = "unset")]
    pub curved_length: f64,
    /// Precurvature of the distal section (1/m), bending toward local +x
    #[serde(default = "unset")]
    pub curvature: f64,
    /// Bending stiffness E·I, only ratios between tubes matter
    #[serde(default = "unset")]
    pub bending_stiffness: f64,
    /// Outer radius (m), for drawing only
    #[serde(default = "unset")]
    pub outer_radius: f64,
}

impl TubeGeometry {
    pub fn length(&self) -> f64 {
        self.straight_length + self.curved_length
    }
}

/// Configuration for a concentric tube robot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtcrConfig {
    /// Tubes from outermost to innermost
    pub tubes: Vec<TubeGeometry>,
    /// Poses sampled along the backbone
    pub sample_count: usize,
    pub base_pose: BasePose,
    /// Translation per key press (m)
    pub translation_step: f64,
    /// Rotation per key press (rad)
    pub rotation_step: f64,
}

impl Default for CtcrConfig {
    fn default() -> Self {
        CtcrConfig {
            tubes: vec![
                TubeGeometry {
                    straight_length: 0.10,
                    curved_length: 0.05,
                    curvature: 4.0,
                    bending_stiffness: 3.0,
                    outer_radius: 0.0015,
                },
                TubeGeometry {
                    straight_length: 0.14,
                    curved_length: 0.06,
                    curvature: 8.0,
                    bending_stiffness: 1.5,
                    outer_radius: 0.0011,
                },
                TubeGeometry {
                    straight_length: 0.18,
                    curved_length: 0.07,
                    curvature: 12.0,
                    bending_stiffness: 0.6,
                    outer_radius: 0.0007,
                },
            ],
            sample_count: 30,
            base_pose: BasePose::identity(),
            translation_step: 0.002,
            rotation_step: 0.05,
        }
    }
}

impl CtcrConfig {
    pub fn with_tubes(mut self, tubes: Vec<TubeGeometry>) -> Self {
        self.tubes = tubes;
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_base_pose(mut self, base_pose: BasePose) -> Self {
        self.base_pose = base_pose;
        self
    }
}

/// A stretch of backbone with constant curvature
#[derive(Debug, Clone, Copy, PartialEq)]
struct Link {
    start: f64,
    end: f64,
    curvature: Vector2<f64>,
}

/// Concentric tube robot model. Immutable once built.
#[derive(Debug, Clone)]
pub struct ConcentricTubeModel {
    tubes: Vec<TubeGeometry>,
    sample_count: usize,
    base: Pose,
    translation_step: f64,
    rotation_step: f64,
}

impl ConcentricTubeModel {
    pub fn new(config: CtcrConfig) -> Result<Self, ContractViolation> {
        if config.tubes.is_empty() {
            return Err(ContractViolation::SegmentCount {
                min: 1,
                max: usize::MAX,
                actual: 0,
            });
        }
        for (i, tube) in config.tubes.iter().enumerate() {
            ContractViolation::check_positive("tube length", tube.length())?;
            ContractViolation::check_positive("tube bending stiffness", tube.bending_stiffness)?;
            ContractViolation::check_positive("tube outer radius", tube.outer_radius)?;
            if !(tube.straight_length >= 0.0 && tube.curved_length >= 0.0 && tube.curvature.is_finite()) {
                return Err(ContractViolation::NonPositive {
                    name: "tube section",
                    value: tube.straight_length.min(tube.curved_length),
                });
            }
            if i > 0 && tube.length() <= config.tubes[i - 1].length() {
                return Err(ContractViolation::TubeNesting { tube: i });
            }
        }
        if config.sample_count < 2 {
            return Err(ContractViolation::TooFewDisks {
                segment: 0,
                disk_count: config.sample_count,
            });
        }
        ContractViolation::check_positive("translation step", config.translation_step)?;
        ContractViolation::check_positive("rotation step", config.rotation_step)?;
        let base = config.base_pose.to_isometry()?;

        debug!(
            "built concentric tube model: {} tubes, {} samples",
            config.tubes.len(),
            config.sample_count
        );

        Ok(Self {
            tubes: config.tubes,
            sample_count: config.sample_count,
            base,
            translation_step: config.translation_step,
            rotation_step: config.rotation_step,
        })
    }

    pub fn tube_count(&self) -> usize {
        self.tubes.len()
    }

    /// Check the tube arrangement and return each tube's distal end (m from base).
    fn tube_ends(&self, translations: &[f64]) -> Result<Vec<f64>, KinematicFailure> {
        let mut ends = Vec::with_capacity(self.tubes.len());
        for (i, (tube, &beta)) in self.tubes.iter().zip(translations).enumerate() {
            if beta > 0.0 {
                return Err(KinematicFailure::TubeBaseAhead {
                    tube: i,
                    translation: beta,
                });
            }
            if i > 0 && beta > translations[i - 1] {
                return Err(KinematicFailure::TubeBaseOrder { tube: i });
            }
            let end = beta + tube.length();
            if end <= BREAKPOINT_TOLERANCE {
                return Err(KinematicFailure::TubeRetracted { tube: i });
            }
            if i > 0 && end < ends[i - 1] {
                return Err(KinematicFailure::TubeEndOrder { tube: i });
            }
            ends.push(end);
        }
        Ok(ends)
    }

    /// Split the exposed backbone into constant-curvature links.
    fn links(&self, translations: &[f64], rotations: &[f64], ends: &[f64]) -> Vec<Link> {
        let total = ends[ends.len() - 1];

        let mut breakpoints = vec![0.0, total];
        for (tube, &beta) in self.tubes.iter().zip(translations) {
            breakpoints.push(beta + tube.straight_length);
            breakpoints.push(beta + tube.length());
        }
        breakpoints.retain(|s| *s >= 0.0 && *s <= total);
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup_by(|a, b| (*a - *b).abs() < BREAKPOINT_TOLERANCE);
        // Merging may drop the distal end in favour of a close neighbour
        if let Some(last) = breakpoints.last_mut() {
            *last = total;
        }

        breakpoints
            .windows(2)
            .map(|pair| {
                let mid = 0.5 * (pair[0] + pair[1]);
                let mut moment = Vector2::zeros();
                let mut stiffness = 0.0;
                for (i, tube) in self.tubes.iter().enumerate() {
                    if mid > ends[i] {
                        continue;
                    }
                    stiffness += tube.bending_stiffness;
                    if mid > translations[i] + tube.straight_length {
                        let direction = Vector2::new(rotations[i].cos(), rotations[i].sin());
                        moment += direction * (tube.bending_stiffness * tube.curvature);
                    }
                }
                Link {
                    start: pair[0],
                    end: pair[1],
                    curvature: moment / stiffness,
                }
            })
            .collect()
    }
}

impl KinematicModel for ConcentricTubeModel {
    fn name(&self) -> &str {
        "concentric tube continuum robot"
    }

    fn dof(&self) -> usize {
        2 * self.tubes.len()
    }

    fn actuation_step(&self, index: usize) -> f64 {
        if index < self.tubes.len() {
            self.translation_step
        } else {
            self.rotation_step
        }
    }

    fn skeleton(&self) -> SkeletonGeometry {
        SkeletonGeometry {
            disk_count: self.sample_count,
            pitch_radii: self.tubes.iter().map(|t| t.outer_radius).collect(),
            disk_radius: 0.0,
            outer_radius: self.tubes[0].outer_radius,
            disk_height: 0.0,
        }
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

        let (translations, rotations) = actuation.as_slice().split_at(self.tubes.len());
        let ends = self.tube_ends(translations)?;
        let links = self.links(translations, rotations, &ends);
        let total = ends[ends.len() - 1];
        let spacing = total / (self.sample_count - 1) as f64;

        // Walk the links, stopping at every sample
        let mut poses = Vec::with_capacity(self.sample_count);
        let mut frame = self.base;
        let mut s = 0.0;
        let mut link_index = 0;
        poses.push(frame);
        for sample in 1..self.sample_count {
            let target = if sample == self.sample_count - 1 {
                total
            } else {
                spacing * sample as f64
            };
            while link_index + 1 < links.len() && target > links[link_index].end {
                let link = &links[link_index];
                frame = frame * arc_step(link.curvature, link.end - s);
                s = link.end;
                link_index += 1;
            }
            frame = frame * arc_step(links[link_index].curvature, target - s);
            s = target;
            poses.push(frame);
        }

        Ok(KinematicSolution::from(BackbonePoses::new(vec![poses])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Vector3};

    fn model() -> ConcentricTubeModel {
        ConcentricTubeModel::new(CtcrConfig::default()).unwrap()
    }

    fn q(values: &[f64]) -> ActuationVector {
        DVector::from_column_slice(values)
    }

    fn straight_tubes() -> Vec<TubeGeometry> {
        CtcrConfig::default()
            .tubes
            .into_iter()
            .map(|t| TubeGeometry { curvature: 0.0, ..t })
            .collect()
    }

    #[test]
    fn test_dof_and_steps() {
        let model = model();
        assert_eq!(model.dof(), 6);
        assert_eq!(model.actuation_step(0), 0.002);
        assert_eq!(model.actuation_step(4), 0.05);
    }

    #[test]
    fn test_rejects_bad_nesting() {
        let mut tubes = CtcrConfig::default().tubes;
        tubes.swap(0, 2);
        let err = ConcentricTubeModel::new(CtcrConfig::default().with_tubes(tubes)).unwrap_err();
        assert_eq!(err, ContractViolation::TubeNesting { tube: 1 });

        let config = CtcrConfig::default().with_sample_count(1);
        assert!(ConcentricTubeModel::new(config).is_err());
    }

    #[test]
    fn test_straight_tubes_give_straight_backbone() {
        let model = ConcentricTubeModel::new(
            CtcrConfig::default().with_tubes(straight_tubes()).with_sample_count(11),
        )
        .unwrap();
        let solution = model.forward_kinematics(&q(&[0.0; 6])).unwrap();

        assert_eq!(solution.disks.len(), 11);
        for (i, pose) in solution.disks.iter().enumerate() {
            assert_relative_eq!(
                pose.translation.vector,
                Vector3::new(0.0, 0.0, 0.025 * i as f64),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_tip_reaches_innermost_tube_end() {
        let model = ConcentricTubeModel::new(CtcrConfig::default().with_tubes(straight_tubes())).unwrap();
        let solution = model
            .forward_kinematics(&q(&[0.0, -0.01, -0.03, 0.0, 0.0, 0.0]))
            .unwrap();
        assert_relative_eq!(solution.end_effector.translation.vector.z, 0.22, epsilon = 1e-12);
    }

    #[test]
    fn test_sample_count_and_determinism() {
        let model = model();
        let actuation = q(&[-0.01, -0.02, -0.03, 0.3, -0.4, 1.2]);
        let a = model.forward_kinematics(&actuation).unwrap();
        let b = model.forward_kinematics(&actuation).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.disks.len(), 30);
    }

    #[test]
    fn test_rotation_turns_bending_plane() {
        let model = model();
        let flat = model.forward_kinematics(&q(&[0.0; 6])).unwrap().end_effector;
        assert!(flat.translation.vector.x > 0.0);
        assert_relative_eq!(flat.translation.vector.y, 0.0, epsilon = 1e-12);

        let half_pi = std::f64::consts::FRAC_PI_2;
        let turned = model
            .forward_kinematics(&q(&[0.0, 0.0, 0.0, half_pi, half_pi, half_pi]))
            .unwrap()
            .end_effector;
        assert_relative_eq!(turned.translation.vector.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(turned.translation.vector.y, flat.translation.vector.x, epsilon = 1e-12);
    }

    #[test]
    fn test_link_curvature_is_stiffness_weighted() {
        let model = model();
        let translations = [0.0, 0.0, 0.0];
        let rotations = [0.0, 0.0, 0.0];
        let ends = model.tube_ends(&translations).unwrap();
        let links = model.links(&translations, &rotations, &ends);

        // Between 0.10 and 0.14 only the outer tube is curved
        let link = links.iter().find(|l| l.start <= 0.12 && l.end >= 0.12).unwrap();
        assert_relative_eq!(link.curvature.x, 3.0 * 4.0 / (3.0 + 1.5 + 0.6), epsilon = 1e-12);

        // Past 0.20 only the inner tube remains
        let link = links.last().unwrap();
        assert_relative_eq!(link.curvature.x, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_arrangements_fail() {
        let model = model();
        let cases = [
            ([0.001, 0.0, 0.0], KinematicFailure::TubeBaseAhead { tube: 0, translation: 0.001 }),
            ([-0.02, -0.01, -0.03], KinematicFailure::TubeBaseOrder { tube: 1 }),
            ([0.0, -0.06, -0.07], KinematicFailure::TubeEndOrder { tube: 1 }),
            ([-0.2, -0.2, -0.2], KinematicFailure::TubeRetracted { tube: 0 }),
        ];
        for (translations, expected) in cases {
            let mut values = translations.to_vec();
            values.extend_from_slice(&[0.0, 0.0, 0.0]);
            let err = model.forward_kinematics(&q(&values)).unwrap_err();
            assert_eq!(err, KinematicError::Infeasible(expected));
        }
    }

    #[test]
    fn test_tubes_at_the_base_count_as_retracted() {
        let model = model();
        let actuation = q(&[-0.15 + 1e-14, -0.20 + 2e-14, -0.25 + 3e-14, 0.0, 0.0, 0.0]);
        let err = model.forward_kinematics(&actuation).unwrap_err();
        assert_eq!(err, KinematicError::Infeasible(KinematicFailure::TubeRetracted { tube: 0 }));
    }

    #[test]
    fn test_close_breakpoints_keep_distal_end() {
        // Inner tube reaches 1e-13 m past the middle tube
        let model = ConcentricTubeModel::new(CtcrConfig::default().with_tubes(straight_tubes())).unwrap();
        let translations = [0.0, 0.0, -0.05 + 1e-13];
        let ends = model.tube_ends(&translations).unwrap();
        let links = model.links(&translations, &[0.0; 3], &ends);
        assert_eq!(links.last().map(|l| l.end), Some(ends[2]));

        let mut values = translations.to_vec();
        values.extend_from_slice(&[0.0; 3]);
        let tip = model.forward_kinematics(&q(&values)).unwrap().end_effector;
        assert_relative_eq!(tip.translation.vector.z, ends[2], epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_length_is_contract_violation() {
        let err = model().forward_kinematics(&q(&[0.0; 2])).unwrap_err();
        assert!(err.is_contract_violation());
    }
}
