//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, CommandRunner, etc.)
//! but are themselves concrete structs, not traits.

mod runtime;
mod setup;
mod stack;

pub use runtime::RuntimeService;
pub use setup::{SetupOptions, SetupOutcome, SetupService};
pub use stack::{LogOptions, StackService};
