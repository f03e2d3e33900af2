pub mod agent;
pub mod config;
pub mod data;
pub mod env;
pub mod error;
pub mod memory;
pub mod networks;
pub mod training;

pub use agent::DqnAgent;
pub use config::{AgentConfig, DqnConfig, EnvConfig, TrainingConfig, NUM_ACTIONS, N_FEATURES};
pub use data::{load_dataset, Dataset, FeatureRow, FeatureTable, TickerData};
pub use env::{Action, MarketEnvironment, StepResult};
pub use error::{Result, TraderError};
pub use memory::{ReplayBuffer, Transition};
pub use networks::{QNetwork, QNetworkConfig};
pub use training::{
    evaluate_agent, train_agent, Checkpointer, EpisodeResult, EvaluationSummary,
};
