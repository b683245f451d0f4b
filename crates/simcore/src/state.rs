//! Simulation state owned by the main loop.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tendon displacements (m) or tube translations/rotations, one entry per
/// controllable degree of freedom.
pub type ActuationVector = DVector<f64>;

/// Starting actuation of the assignment 4 scenario (dual-segment TDCR).
const ASSIGNMENT4_ACTUATION: [f64; 2] = [-0.005, 0.0025];

/// Which scenario is active. Selects initial actuation and key bindings only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScenarioMode {
    #[default]
    Default,
    Assignment4,
}

impl ScenarioMode {
    pub const ALL: [ScenarioMode; 2] = [ScenarioMode::Default, ScenarioMode::Assignment4];

    /// Short selector as given on the command line.
    pub fn label(self) -> &'static str {
        match self {
            ScenarioMode::Default => "a0",
            ScenarioMode::Assignment4 => "a4",
        }
    }

    /// The scenario after this one, wrapping around.
    pub fn next(self) -> Self {
        match self {
            ScenarioMode::Default => ScenarioMode::Assignment4,
            ScenarioMode::Assignment4 => ScenarioMode::Default,
        }
    }

    /// Actuation the scenario starts from for a model with `dof` inputs.
    ///
    /// The assignment 4 preset only applies to two-input robots; other
    /// models start from rest.
    pub fn initial_actuation(self, dof: usize) -> ActuationVector {
        match self {
            ScenarioMode::Assignment4 if dof == ASSIGNMENT4_ACTUATION.len() => {
                DVector::from_column_slice(&ASSIGNMENT4_ACTUATION)
            }
            _ => DVector::zeros(dof),
        }
    }
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioMode::Default => "default",
            ScenarioMode::Assignment4 => "assignment 4",
        };
        write!(f, "{} ({})", name, self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scenario `{0}` (expected a0 or a4)")]
pub struct UnknownScenario(pub String);

impl FromStr for ScenarioMode {
    type Err = UnknownScenario;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a0" | "default" => Ok(ScenarioMode::Default),
            "a4" | "assignment4" => Ok(ScenarioMode::Assignment4),
            _ => Err(UnknownScenario(s.to_string())),
        }
    }
}

/// Run state of the main loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    #[default]
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimContext {
    pub dt: f64,
    pub t: f64,
}

/// Mutable record owned by the main loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub actuation: ActuationVector,
    pub timestep_seconds: f64,
    pub scenario: ScenarioMode,
}

impl SimulationState {
    pub fn new(scenario: ScenarioMode, dof: usize, timestep_seconds: f64) -> Self {
        SimulationState {
            actuation: scenario.initial_actuation(dof),
            timestep_seconds,
            scenario,
        }
    }

    /// Return to the active scenario's starting actuation.
    pub fn reset_actuation(&mut self) {
        self.actuation = self.scenario.initial_actuation(self.actuation.len());
    }

    /// Switch scenario and adopt its starting actuation.
    pub fn switch_scenario(&mut self, scenario: ScenarioMode) {
        self.scenario = scenario;
        self.reset_actuation();
    }
}
