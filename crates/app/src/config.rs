//! Application configuration loaded from an optional JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use control::LoopConfig;
use log::{info, warn};
use mechanics::{ConcentricTubeModel, CtcrConfig, SegmentGeometry, TdcrConfig};
use serde::{Deserialize, Serialize};
use simcore::UnknownScenario;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Scenario(#[from] UnknownScenario),
}

/// Which robot to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RobotKind {
    /// Tendon-driven continuum robot
    #[default]
    Tdcr,
    /// Concentric tube continuum robot
    Ctcr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window size in pixels
    pub window_size: [f32; 2],
    /// Seconds of end-effector history kept in the plot
    pub trace_seconds: f64,
    /// Drawing scale of the projections (px/m)
    pub scale_px_per_m: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            window_size: [1200.0, 900.0],
            trace_seconds: 10.0,
            scale_px_per_m: 1500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub robot: RobotKind,
    pub simulation: LoopConfig,
    pub tdcr: TdcrConfig,
    pub ctcr: CtcrConfig,
    pub viewer: ViewerConfig,
}

impl AppConfig {
    /// Defaults when `path` is `None`, otherwise the sanitized file contents.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(AppConfig::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("loaded config from {}", path.display());
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        Ok(config.sanitize())
    }

    /// Replace invalid values with defaults, warning for each replacement.
    pub fn sanitize(mut self) -> Self {
        let defaults = AppConfig::default();

        self.simulation.timestep_seconds = positive_or(
            "simulation.timestep_seconds",
            self.simulation.timestep_seconds,
            defaults.simulation.timestep_seconds,
        );
        self.tdcr = sanitize_tdcr(self.tdcr, &defaults.tdcr);

        self.ctcr = sanitize_ctcr(self.ctcr, &defaults.ctcr);

        let viewer = &mut self.viewer;
        if !viewer.window_size.iter().all(|v| v.is_finite() && *v >= 100.0) {
            warn!("viewer.window_size {:?} is invalid, using default", viewer.window_size);
            viewer.window_size = defaults.viewer.window_size;
        }
        viewer.trace_seconds = positive_or(
            "viewer.trace_seconds",
            viewer.trace_seconds,
            defaults.viewer.trace_seconds,
        );
        if !(viewer.scale_px_per_m.is_finite() && viewer.scale_px_per_m > 0.0) {
            warn!("viewer.scale_px_per_m {} is invalid, using default", viewer.scale_px_per_m);
            viewer.scale_px_per_m = defaults.viewer.scale_px_per_m;
        }

        self
    }
}

fn positive_or(name: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!("{} = {} must be positive, using {}", name, value, default);
        default
    }
}

fn sanitize_tdcr(mut config: TdcrConfig, defaults: &TdcrConfig) -> TdcrConfig {
    if config.segments.is_empty() || config.segments.len() > defaults.segments.len() {
        warn!(
            "tdcr: {} segments not supported, using default segments",
            config.segments.len()
        );
        config.segments = defaults.segments.clone();
    }
    for (i, segment) in config.segments.iter_mut().enumerate() {
        let fallback: SegmentGeometry = defaults.segments[i];
        segment.length = positive_or(
            &format!("tdcr.segments[{}].length", i),
            segment.length,
            fallback.length,
        );
        segment.pitch_radius = positive_or(
            &format!("tdcr.segments[{}].pitch_radius", i),
            segment.pitch_radius,
            fallback.pitch_radius,
        );
        if let Err(err) = segment.validate(i) {
            warn!("tdcr: {}, using {} disks", err, fallback.disk_count);
            segment.disk_count = fallback.disk_count;
        }
    }
    if !config.base_pose.is_finite() {
        warn!("tdcr.base_pose is not finite, using identity");
        config.base_pose = defaults.base_pose;
    }

    config.min_bending_radius = positive_or(
        "tdcr.min_bending_radius",
        config.min_bending_radius,
        defaults.min_bending_radius,
    );
    config.actuation_step =
        positive_or("tdcr.actuation_step", config.actuation_step, defaults.actuation_step);
    config.disk_radius = positive_or("tdcr.disk_radius", config.disk_radius, defaults.disk_radius);
    config.disk_height = positive_or("tdcr.disk_height", config.disk_height, defaults.disk_height);
    config.backbone_radius = positive_or(
        "tdcr.backbone_radius",
        config.backbone_radius,
        defaults.backbone_radius,
    );
    config
}

/// Fill unset or invalid tube fields from the default tube at the same
/// index, then fall back to the default robot if the tubes still do not nest.
fn sanitize_ctcr(mut config: CtcrConfig, defaults: &CtcrConfig) -> CtcrConfig {
    for (i, tube) in config.tubes.iter_mut().enumerate() {
        let Some(fallback) = defaults.tubes.get(i) else {
            continue;
        };
        tube.straight_length = non_negative_or(
            &format!("ctcr.tubes[{}].straight_length", i),
            tube.straight_length,
            fallback.straight_length,
        );
        tube.curved_length = non_negative_or(
            &format!("ctcr.tubes[{}].curved_length", i),
            tube.curved_length,
            fallback.curved_length,
        );
        if !tube.curvature.is_finite() {
            warn!(
                "ctcr.tubes[{}].curvature = {} is not finite, using {}",
                i, tube.curvature, fallback.curvature
            );
            tube.curvature = fallback.curvature;
        }
        tube.bending_stiffness = positive_or(
            &format!("ctcr.tubes[{}].bending_stiffness", i),
            tube.bending_stiffness,
            fallback.bending_stiffness,
        );
        tube.outer_radius = positive_or(
            &format!("ctcr.tubes[{}].outer_radius", i),
            tube.outer_radius,
            fallback.outer_radius,
        );
    }

    if let Err(err) = ConcentricTubeModel::new(config.clone()) {
        warn!("ctcr: {}, using default tubes", err);
        return defaults.clone();
    }
    config
}

fn non_negative_or(name: &str, value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!("{} = {} must not be negative, using {}", name, value, default);
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcore::ScenarioMode;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(AppConfig::from_json("{}").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = AppConfig::from_json(
            r#"{"robot": "ctcr", "simulation": {"scenario": "Assignment4"}, "tdcr": {"actuation_step": 0.001}}"#,
        )
        .unwrap();
        assert_eq!(config.robot, RobotKind::Ctcr);
        assert_eq!(config.simulation.scenario, ScenarioMode::Assignment4);
        assert_eq!(config.simulation.timestep_seconds, 0.01);
        assert_eq!(config.tdcr.actuation_step, 0.001);
        assert_eq!(config.tdcr.segments, TdcrConfig::default().segments);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = AppConfig::from_json(
            r#"{
                "simulation": {"timestep_seconds": -1.0},
                "tdcr": {"segments": [
                    {"length": 0.2, "disk_count": 10, "pitch_radius": 0.004},
                    {"length": 0.1, "disk_count": 1, "pitch_radius": 0.005}
                ]},
                "viewer": {"scale_px_per_m": 0.0}
            }"#,
        )
        .unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.simulation.timestep_seconds, 0.01);
        assert_eq!(config.tdcr.segments[0], SegmentGeometry::new(0.2, 10, 0.004));
        assert_eq!(config.tdcr.segments[1], defaults.tdcr.segments[1]);
        assert_eq!(config.viewer.scale_px_per_m, defaults.viewer.scale_px_per_m);
    }

    #[test]
    fn test_missing_segment_fields_use_defaults() {
        let config =
            AppConfig::from_json(r#"{"tdcr": {"segments": [{"length": 0.2, "disk_count": 10}]}}"#)
                .unwrap();
        assert_eq!(config.tdcr.segments, vec![SegmentGeometry::new(0.2, 10, 0.006)]);

        let config = AppConfig::from_json(
            r#"{"tdcr": {"segments": [{"pitch_radius": 0.004}, {"length": 0.05}]}}"#,
        )
        .unwrap();
        assert_eq!(
            config.tdcr.segments,
            vec![SegmentGeometry::new(0.1, 8, 0.004), SegmentGeometry::new(0.05, 8, 0.005)]
        );
    }

    #[test]
    fn test_missing_tube_fields_use_defaults() {
        let config = AppConfig::from_json(
            r#"{"ctcr": {"tubes": [
                {"straight_length": 0.1, "curved_length": 0.05, "curvature": 4.0, "bending_stiffness": 3.0},
                {"straight_length": 0.14, "curved_length": 0.06, "curvature": 8.0, "bending_stiffness": 1.5, "outer_radius": 0.0011},
                {"straight_length": 0.2, "curved_length": 0.07, "curvature": 12.0, "outer_radius": 0.0007}
            ]}}"#,
        )
        .unwrap();
        let defaults = CtcrConfig::default();

        assert_eq!(config.ctcr.tubes[0], defaults.tubes[0]);
        assert_eq!(config.ctcr.tubes[2].straight_length, 0.2);
        assert_eq!(config.ctcr.tubes[2].bending_stiffness, defaults.tubes[2].bending_stiffness);
        assert!(ConcentricTubeModel::new(config.ctcr).is_ok());
    }

    #[test]
    fn test_too_many_segments_fall_back() {
        let segment = r#"{"length": 0.1, "disk_count": 8, "pitch_radius": 0.005}"#;
        let json = format!(r#"{{"tdcr": {{"segments": [{s}, {s}, {s}]}}}}"#, s = segment);
        let config = AppConfig::from_json(&json).unwrap();
        assert_eq!(config.tdcr.segments.len(), 2);
    }

    #[test]
    fn test_bad_tubes_fall_back() {
        let config = AppConfig::from_json(r#"{"ctcr": {"tubes": []}}"#).unwrap();
        assert_eq!(config.ctcr, CtcrConfig::default());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(matches!(AppConfig::from_json("{"), Err(ConfigError::Json(_))));
        let missing = Path::new("/nonexistent/continuum.json");
        assert!(matches!(AppConfig::load(Some(missing)), Err(ConfigError::Io { .. })));
    }
}
