//! Event-driven main loop
//!
//! Owns the simulation state, borrows the kinematic model and drives a
//! renderer. Events are handled synchronously in delivery order, so a timer
//! tick always sees every key press delivered before it.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use simcore::{
    ActuationVector, ContractViolation, EventHandler, Key, KinematicError, KinematicFailure,
    KinematicModel, LoopState, Renderer, ScenarioMode, SimContext, SimulationState,
};

use crate::keymap::{KeyCommand, KeyMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Timer period (s)
    pub timestep_seconds: f64,
    pub scenario: ScenarioMode,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            timestep_seconds: 0.01,
            scenario: ScenarioMode::Default,
        }
    }
}

impl LoopConfig {
    pub fn with_timestep(mut self, timestep_seconds: f64) -> Self {
        self.timestep_seconds = timestep_seconds;
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioMode) -> Self {
        self.scenario = scenario;
        self
    }
}

/// Counters kept over the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub renders: u64,
    pub failures: u64,
    pub ignored_keys: u64,
}

pub struct MainLoop<'m, R: Renderer> {
    model: &'m dyn KinematicModel,
    renderer: R,
    state: SimulationState,
    run_state: LoopState,
    keymap: KeyMap,
    stats: LoopStats,
    last_failure: Option<KinematicFailure>,
    /// Most recent actuation that failed, used to warn only once per input
    warned_actuation: Option<ActuationVector>,
    ctx: SimContext,
}

impl<'m, R: Renderer> MainLoop<'m, R> {
    pub fn new(
        model: &'m dyn KinematicModel,
        renderer: R,
        config: LoopConfig,
    ) -> Result<Self, ContractViolation> {
        let dt = ContractViolation::check_positive("timestep", config.timestep_seconds)?;
        let state = SimulationState::new(config.scenario, model.dof(), dt);
        let keymap = KeyMap::for_scenario(config.scenario, model);

        Ok(MainLoop {
            model,
            renderer,
            state,
            run_state: LoopState::Running,
            keymap,
            stats: LoopStats::default(),
            last_failure: None,
            warned_actuation: None,
            ctx: SimContext { dt, t: 0.0 },
        })
    }

    /// Set up the scene and draw the starting pose.
    pub fn start(&mut self) {
        info!(
            "starting {} in scenario {}, dt = {} s",
            self.model.name(),
            self.state.scenario,
            self.state.timestep_seconds
        );
        self.renderer.init_scene(self.state.scenario);
        self.renderer.draw_skeleton(&self.model.skeleton());
        self.evaluate();
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn run_state(&self) -> LoopState {
        self.run_state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Failure from the latest evaluation, cleared by the next success.
    pub fn last_failure(&self) -> Option<&KinematicFailure> {
        self.last_failure.as_ref()
    }

    pub fn context(&self) -> SimContext {
        self.ctx
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Run the model on the current actuation and forward a success to the renderer.
    fn evaluate(&mut self) {
        match self.model.forward_kinematics(&self.state.actuation) {
            Ok(solution) => {
                self.last_failure = None;
                self.renderer.update_pose(solution.disks);
                self.stats.renders += 1;
            }
            Err(KinematicError::Infeasible(failure)) => {
                self.stats.failures += 1;
                if self.warned_actuation.as_ref() != Some(&self.state.actuation) {
                    warn!("keeping last pose: {}", failure);
                    self.warned_actuation = Some(self.state.actuation.clone());
                } else {
                    debug!("still infeasible: {}", failure);
                }
                self.last_failure = Some(failure);
            }
            Err(KinematicError::Contract(violation)) => {
                error!("stopping main loop: {}", violation);
                self.run_state = LoopState::Stopped;
            }
        }
    }

    fn apply(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Adjust { index, delta } => {
                if let Some(value) = self.state.actuation.get_mut(index) {
                    *value += delta;
                    debug!("q[{}] = {:.5}", index, *value);
                } else {
                    self.stats.ignored_keys += 1;
                }
            }
            KeyCommand::TogglePause => {
                self.run_state = match self.run_state {
                    LoopState::Running => LoopState::Paused,
                    LoopState::Paused => LoopState::Running,
                    LoopState::Stopped => LoopState::Stopped,
                };
                info!("main loop {:?}", self.run_state);
            }
            KeyCommand::CycleScenario => {
                let next = self.state.scenario.next();
                self.state.switch_scenario(next);
                self.keymap = KeyMap::for_scenario(next, self.model);
                self.renderer.init_scene(next);
                self.renderer.draw_skeleton(&self.model.skeleton());
                info!("switched to scenario {}", next);
                self.evaluate();
            }
            KeyCommand::ResetActuation => {
                self.state.reset_actuation();
                debug!("actuation reset to {:?}", self.state.actuation.as_slice());
            }
            KeyCommand::Quit => self.on_shutdown(),
        }
    }
}

impl<R: Renderer> EventHandler for MainLoop<'_, R> {
    fn on_timer_tick(&mut self) {
        match self.run_state {
            LoopState::Stopped => {}
            LoopState::Paused => self.stats.ticks += 1,
            LoopState::Running => {
                self.stats.ticks += 1;
                self.ctx.t += self.ctx.dt;
                self.evaluate();
            }
        }
    }

    fn on_key_press(&mut self, key: &Key) {
        if self.run_state == LoopState::Stopped {
            return;
        }
        match self.keymap.lookup(key) {
            Some(command) => self.apply(command),
            None => self.stats.ignored_keys += 1,
        }
    }

    fn on_shutdown(&mut self) {
        if self.run_state == LoopState::Stopped {
            return;
        }
        self.run_state = LoopState::Stopped;
        info!(
            "main loop stopped after {} ticks ({} renders, {} failures)",
            self.stats.ticks, self.stats.renders, self.stats.failures
        );
    }

    fn is_stopped(&self) -> bool {
        self.run_state == LoopState::Stopped
    }
}
