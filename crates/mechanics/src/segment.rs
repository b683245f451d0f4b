//! Segment geometry for tendon-driven continuum robots.

use serde::{Deserialize, Serialize};
use simcore::ContractViolation;

/// How tendons are routed through one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TendonLayout {
    /// One antagonistic tendon pair, bending in the local x-z plane
    #[default]
    Planar,
    /// Two orthogonal tendon pairs, bending in any direction
    Spatial,
}

impl TendonLayout {
    /// Actuation components per segment.
    pub fn inputs_per_segment(self) -> usize {
        match self {
            TendonLayout::Planar => 1,
            TendonLayout::Spatial => 2,
        }
    }
}

/// Immutable description of one segment.
///
/// Fields missing from a config file deserialize as unset (NaN or zero
/// disks) and fail `validate` until filled in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentGeometry {
    /// Backbone arc length (m)
    #[serde(default = "unset")]
    pub length: f64,
    /// Disks along the segment, both ends included
    #[serde(default)]
    pub disk_count: usize,
    /// Distance of the tendons from the backbone (m)
    #[serde(default = "unset")]
    pub pitch_radius: f64,
}

pub(crate) fn unset() -> f64 {
    f64::NAN
}

impl SegmentGeometry {
    pub fn new(length: f64, disk_count: usize, pitch_radius: f64) -> Self {
        SegmentGeometry {
            length,
            disk_count,
            pitch_radius,
        }
    }

    /// Arc length between neighbouring disks (m).
    pub fn disk_spacing(&self) -> f64 {
        self.length / (self.disk_count.saturating_sub(1).max(1)) as f64
    }

    pub fn validate(&self, segment: usize) -> Result<(), ContractViolation> {
        ContractViolation::check_positive("segment length", self.length)?;
        ContractViolation::check_positive("pitch radius", self.pitch_radius)?;
        if self.disk_count < 2 {
            return Err(ContractViolation::TooFewDisks {
                segment,
                disk_count: self.disk_count,
            });
        }
        Ok(())
    }
}
