//! Step definitions, per-scenario world, and the cucumber runner.
//!
//! Each scenario gets its own [`LoginWorld`] and its own browser portal.
//! Steps run in order under a per-step timeout; a failed step skips the
//! rest, an undefined step fails the run, and a failed scenario leaves a
//! screenshot behind.

mod runner;
mod steps;
mod world;

pub use runner::{RunContext, RunnerOptions, ScenarioRunner};
pub use steps::user_lookup_query;
pub use world::LoginWorld;
