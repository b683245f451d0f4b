//! Interactive control of a kinematic model
//!
//! This crate provides:
//! - Scenario-specific key bindings
//! - The event-driven main loop
//! - A fixed-period tick clock and an ordered event queue

pub mod event_source;
pub mod keymap;
pub mod main_loop;

pub use event_source::*;
pub use keymap::*;
pub use main_loop::*;
