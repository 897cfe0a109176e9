//! `thermo-piston` library crate.
//!
//! The binary (`piston`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the physics and fitting core stays free of terminal/IO concerns
//! - code stays easy to navigate as the project grows

pub mod animation;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod physics;
pub mod plot;
pub mod report;
pub mod tui;
