//! Shared types for the continuum robot simulator
//!
//! This crate provides:
//! - Poses and backbone pose sequences
//! - Simulation state, scenario modes and loop states
//! - The model, renderer and event handler interfaces
//! - Error types shared across crates

pub mod error;
pub mod pose;
pub mod state;
pub mod traits;

pub use error::*;
pub use pose::*;
pub use state::*;
pub use traits::*;
