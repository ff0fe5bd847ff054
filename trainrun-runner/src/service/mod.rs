//! Service layer
//!
//! Services contain the job abstraction used by the driver: resolving a
//! config reference into a runnable job and running it through the
//! external trainer program.
//!
//! All services are trait-based to enable testing and dependency injection.

mod job;
mod trainer;

// Re-export traits
pub use job::{Job, JobResolver};

// Re-export implementations
pub use trainer::{TrainerCommand, TrainerResolver};
