use std::fmt;

use crate::error::KinematicError;
use crate::pose::{BackbonePoses, KinematicSolution};
use crate::state::{ActuationVector, ScenarioMode};

// Kinematic Traits

/// Static geometry the renderer needs to build the robot once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkeletonGeometry {
    /// Poses drawn per segment
    pub disk_count: usize,
    /// Tendon pitch radius per segment (m). Tube radii for concentric tubes.
    pub pitch_radii: Vec<f64>,
    /// Spacer disk radius (m), zero when the robot has no disks
    pub disk_radius: f64,
    /// Backbone radius (m)
    pub outer_radius: f64,
    /// Spacer disk thickness (m)
    pub disk_height: f64,
}

/// Maps an actuation vector to a backbone shape.
///
/// Implementations are immutable after construction and must be pure:
/// identical inputs give bit-identical poses.
pub trait KinematicModel {
    fn name(&self) -> &str;

    /// Number of actuation components expected by `forward_kinematics`.
    fn dof(&self) -> usize;

    /// Increment applied to actuation component `index` by one key press.
    fn actuation_step(&self, index: usize) -> f64;

    fn skeleton(&self) -> SkeletonGeometry;

    fn forward_kinematics(
        &self,
        actuation: &ActuationVector,
    ) -> Result<KinematicSolution, KinematicError>;
}

// Rendering Traits

/// Identifies the drawing surface an event source attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub title: String,
    /// Width and height in pixels
    pub size: [u32; 2],
}

pub trait Renderer {
    fn init_scene(&mut self, mode: ScenarioMode);
    fn draw_skeleton(&mut self, skeleton: &SkeletonGeometry);
    fn update_pose(&mut self, disks: BackbonePoses);
    fn surface_handle(&self) -> SurfaceHandle;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn init_scene(&mut self, mode: ScenarioMode) {
        (**self).init_scene(mode)
    }

    fn draw_skeleton(&mut self, skeleton: &SkeletonGeometry) {
        (**self).draw_skeleton(skeleton)
    }

    fn update_pose(&mut self, disks: BackbonePoses) {
        (**self).update_pose(disks)
    }

    fn surface_handle(&self) -> SurfaceHandle {
        (**self).surface_handle()
    }
}

// Event Traits

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
    Backspace,
    /// Anything the host delivered that has no dedicated variant
    Other(String),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "up" | "arrowup" => Key::Up,
            "down" | "arrowdown" => Key::Down,
            "left" | "arrowleft" => Key::Left,
            "right" | "arrowright" => Key::Right,
            "space" => Key::Space,
            "esc" | "escape" => Key::Escape,
            "backspace" => Key::Backspace,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Other(name.trim().to_string()),
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Space => write!(f, "Space"),
            Key::Escape => write!(f, "Escape"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    TimerTick,
    KeyPress(Key),
    Shutdown,
}

/// Receiver of events delivered by an event source.
///
/// Handlers run synchronously on the source's thread and must return
/// promptly.
pub trait EventHandler {
    fn on_timer_tick(&mut self);
    fn on_key_press(&mut self, key: &Key);
    fn on_shutdown(&mut self);
    fn is_stopped(&self) -> bool;

    fn handle(&mut self, event: &LoopEvent) {
        match event {
            LoopEvent::TimerTick => self.on_timer_tick(),
            LoopEvent::KeyPress(key) => self.on_key_press(key),
            LoopEvent::Shutdown => self.on_shutdown(),
        }
    }
}
