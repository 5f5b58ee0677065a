use skirmish_sim::SimError;
use thiserror::Error;

mod autopilot;
pub(crate) mod bootstrap;
mod config;
pub(crate) mod loop_runner;
mod metrics;
mod surface;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("simulation failed: {0}")]
    Sim(#[from] SimError),
}
