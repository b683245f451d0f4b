//! Scenario-specific key bindings

use std::collections::HashMap;

use simcore::{Key, KinematicModel, ScenarioMode};

/// Digit keys increment actuator `i`, the letter below decrements it.
const INCREMENT_KEYS: &str = "123456789";
const DECREMENT_KEYS: &str = "qwertyuio";

/// What a key press asks the main loop to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCommand {
    Adjust { index: usize, delta: f64 },
    TogglePause,
    CycleScenario,
    ResetActuation,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<Key, KeyCommand>,
}

impl KeyMap {
    /// Bindings for `mode`, sized to the model's actuators.
    pub fn for_scenario(mode: ScenarioMode, model: &dyn KinematicModel) -> Self {
        let mut map = KeyMap::default();
        let dof = model.dof();

        match mode {
            ScenarioMode::Default => {
                for (index, (up, down)) in INCREMENT_KEYS
                    .chars()
                    .zip(DECREMENT_KEYS.chars())
                    .take(dof)
                    .enumerate()
                {
                    let step = model.actuation_step(index);
                    map.bind(Key::Char(up), KeyCommand::Adjust { index, delta: step });
                    map.bind(Key::Char(down), KeyCommand::Adjust { index, delta: -step });
                }
            }
            ScenarioMode::Assignment4 => {
                let axes = [(Key::Up, Key::Down), (Key::Right, Key::Left)];
                for (index, (up, down)) in axes.into_iter().take(dof).enumerate() {
                    let step = model.actuation_step(index);
                    map.bind(up, KeyCommand::Adjust { index, delta: step });
                    map.bind(down, KeyCommand::Adjust { index, delta: -step });
                }
            }
        }

        map.bind(Key::Space, KeyCommand::TogglePause);
        map.bind(Key::Char('m'), KeyCommand::CycleScenario);
        map.bind(Key::Backspace, KeyCommand::ResetActuation);
        map.bind(Key::Char('0'), KeyCommand::ResetActuation);
        map.bind(Key::Escape, KeyCommand::Quit);
        map
    }

    pub fn bind(&mut self, key: Key, command: KeyCommand) {
        self.bindings.insert(key, command);
    }

    /// `None` for keys with no binding.
    pub fn lookup(&self, key: &Key) -> Option<KeyCommand> {
        self.bindings.get(key).copied()
    }

    /// Bindings as `(key, command)` pairs, sorted by key name for display.
    pub fn describe(&self) -> Vec<(String, KeyCommand)> {
        let mut entries: Vec<_> = self
            .bindings
            .iter()
            .map(|(key, command)| (key.to_string(), *command))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
