//! Batches of mixtures evaluated under a retention hypothesis, with their
//! run configuration and output sinks.

pub mod config;
pub mod hypothesis;
pub mod runner;

pub use config::{Composition, ConfigError, OutputConfig, RunConfig};
pub use hypothesis::{
    DEFAULT_MUTATIONAL_OPPORTUNITY_SWITCH, Hypothesis, INDEPENDENCE_COMPOSITION,
    PUBLISHED_COMPOSITIONS, REFERENCE_COMPOSITION, Scenario, ScenarioSet,
};
pub use runner::{
    FileSink, MemorySink, NoopScenarioProgress, ScenarioError, ScenarioOutcome, ScenarioProgress,
    ScenarioRunner, ScenarioSink,
};
