//! Trainrun Core
//!
//! Core types and abstractions for the trainrun job runner.
//!
//! This crate contains:
//! - Domain types: job definitions, job outcomes and the run tally
//! - Loader: resolution of config references into job definitions

pub mod domain;
pub mod error;
pub mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;
