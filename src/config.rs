//! Trainer Configuration
//!
//! Hyperparameter structs for the environment, agent, and training loop.
//! Every field carries a default; overrides come from the CLI / environment
//! at the entry point only.

use serde::{Deserialize, Serialize};

/// Number of feature columns in an observation (position column excluded)
pub const N_FEATURES: usize = 10;

/// Size of the discrete action space (Hold / Buy / Sell)
pub const NUM_ACTIONS: usize = 3;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DqnConfig {
    /// Market environment configuration
    pub env: EnvConfig,
    /// Agent hyperparameters
    pub agent: AgentConfig,
    /// Training loop configuration
    pub training: TrainingConfig,
}

/// Market environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Lookback window length (rows per observation)
    pub window_size: usize,
    /// Starting cash per episode
    pub start_cash: f64,
    /// Proportional transaction cost charged on both legs
    pub transaction_cost: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            start_cash: 10_000.0,
            transaction_cost: 0.001,
        }
    }
}

impl EnvConfig {
    /// Flattened observation length: window rows of features plus the
    /// broadcast position column.
    pub fn observation_dim(&self) -> usize {
        self.window_size * (N_FEATURES + 1)
    }
}

/// DQN agent hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Discount factor (gamma)
    pub gamma: f64,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Training batch size
    pub batch_size: usize,
    /// Replay buffer capacity
    pub buffer_capacity: usize,
    /// Hard target-network sync interval, in action steps
    pub target_update_freq: usize,
    /// Initial exploration rate
    pub eps_start: f64,
    /// Asymptotic exploration rate
    pub eps_end: f64,
    /// Exploration decay time constant, in action steps
    pub eps_decay: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            learning_rate: 1e-4,
            batch_size: 64,
            buffer_capacity: 100_000,
            target_update_freq: 1_000,
            eps_start: 1.0,
            eps_end: 0.05,
            eps_decay: 20_000.0,
        }
    }
}

impl AgentConfig {
    /// Exploration rate after `t` action steps: exponential decay from
    /// `eps_start` toward `eps_end`.
    pub fn epsilon(&self, t: usize) -> f64 {
        self.eps_end + (self.eps_start - self.eps_end) * (-(t as f64) / self.eps_decay).exp()
    }
}

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Number of training episodes
    pub max_episodes: usize,
    /// Step cap per episode
    pub max_steps_per_episode: usize,
    /// Chronological train fraction; the remainder is held out
    pub train_ratio: f64,
    /// Directory for model checkpoints
    pub checkpoint_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_episodes: 150,
            max_steps_per_episode: 1_000,
            train_ratio: 0.7,
            checkpoint_dir: "./checkpoints".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_starts_at_eps_start() {
        let config = AgentConfig::default();
        assert!((config.epsilon(0) - config.eps_start).abs() < 1e-9);
    }

    #[test]
    fn epsilon_is_monotone_non_increasing() {
        let config = AgentConfig::default();
        let mut prev = config.epsilon(0);
        for t in (0..200_000).step_by(1_000) {
            let eps = config.epsilon(t);
            assert!(eps <= prev + 1e-12, "epsilon increased at t={}", t);
            prev = eps;
        }
    }

    #[test]
    fn epsilon_approaches_eps_end() {
        let config = AgentConfig::default();
        assert!((config.epsilon(10_000_000) - config.eps_end).abs() < 1e-6);
    }

    #[test]
    fn observation_dim_includes_position_column() {
        let env = EnvConfig::default();
        assert_eq!(env.observation_dim(), 30 * 11);
    }
}
