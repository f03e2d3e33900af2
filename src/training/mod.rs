//! Training Orchestration
//!
//! Episode-driven training across the ticker basket, greedy evaluation on
//! held-out data, and model checkpointing.

pub mod checkpointing;
pub mod trainer;

pub use checkpointing::{timestamped_name, Checkpointer};
pub use trainer::{
    evaluate_agent, summarize_results, train_agent, EpisodeResult, EvaluationSummary,
    TickerEvaluation, TrainingSummary,
};
