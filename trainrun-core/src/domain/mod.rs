//! Core domain types
//!
//! This module contains the structures shared between the loader (which
//! builds them from config files) and the runner (which executes them).

pub mod job;
pub mod tally;
