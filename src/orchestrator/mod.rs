//! Application-level orchestration.
//!
//! This module owns the submission lifecycle (start/cancel) and background work
//! such as health checks and saving results. UI layers send commands here and keep
//! all view state to themselves.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
