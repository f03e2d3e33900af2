//! Training and Evaluation Loops
//!
//! Training runs episodes over uniformly random tickers from the basket,
//! interleaving action selection, environment steps, buffer inserts, and
//! gradient updates. Evaluation replays the held-out split greedily and
//! reports terminal net worth.

use burn::tensor::backend::AutodiffBackend;
use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::info;

use crate::agent::DqnAgent;
use crate::config::DqnConfig;
use crate::data::Dataset;
use crate::env::MarketEnvironment;
use crate::error::{Result, TraderError};
use crate::memory::Transition;

/// Outcome of one training episode
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    pub episode: usize,
    pub ticker: String,
    /// Sum of per-step dollar rewards
    pub total_reward: f64,
    /// Steps taken before done or the step cap
    pub length: usize,
    /// Exploration rate at episode end
    pub epsilon: f64,
}

/// Aggregate statistics over a training run
#[derive(Debug, Clone, Default)]
pub struct TrainingSummary {
    pub num_episodes: usize,
    pub avg_reward: f64,
    pub avg_length: f64,
    pub best_reward: f64,
}

/// Final net worth for one ticker's held-out run
#[derive(Debug, Clone)]
pub struct TickerEvaluation {
    pub ticker: String,
    pub net_worth: f64,
}

/// Evaluation across the whole basket
#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub per_ticker: Vec<TickerEvaluation>,
    pub avg_net_worth: f64,
}

/// Run the training loop: `max_episodes` episodes, each on a uniformly
/// random ticker's training split.
pub fn train_agent<B: AutodiffBackend>(
    agent: &mut DqnAgent<B>,
    dataset: &Dataset,
    config: &DqnConfig,
) -> Result<Vec<EpisodeResult>> {
    if dataset.is_empty() {
        return Err(TraderError::Data("dataset has no tickers".to_string()));
    }

    let max_episodes = config.training.max_episodes;
    let mut rng = thread_rng();
    let mut results = Vec::with_capacity(max_episodes);

    for episode in 0..max_episodes {
        let ticker = dataset
            .choose(&mut rng)
            .ok_or_else(|| TraderError::Data("dataset has no tickers".to_string()))?;
        let mut env = MarketEnvironment::new(ticker.train.clone(), config.env.clone())?;

        let mut state = env.reset();
        let mut total_reward = 0.0;
        let mut length = 0;

        for _ in 0..config.training.max_steps_per_episode {
            let action = agent.act(&state);
            let outcome = env.step(action);

            agent.push(Transition::new(
                state.clone(),
                action,
                outcome.reward as f32,
                outcome.observation.clone(),
                outcome.done,
            ));
            agent.train_step()?;

            total_reward += outcome.reward;
            length += 1;

            if let Some(next_state) = outcome.observation {
                state = next_state;
            }
            if outcome.done {
                break;
            }
        }

        let epsilon = agent.config().epsilon(agent.steps());
        info!(
            "Episode {}/{} | {} | reward {:.2} | steps {} | eps {:.3}",
            episode + 1,
            max_episodes,
            ticker.ticker,
            total_reward,
            length,
            epsilon
        );

        results.push(EpisodeResult {
            episode,
            ticker: ticker.ticker.clone(),
            total_reward,
            length,
            epsilon,
        });
    }

    Ok(results)
}

/// Greedy rollout over each ticker's held-out split; reports final net
/// worth per ticker and the basket average.
pub fn evaluate_agent<B: AutodiffBackend>(
    agent: &DqnAgent<B>,
    dataset: &Dataset,
    config: &DqnConfig,
) -> Result<EvaluationSummary> {
    if dataset.is_empty() {
        return Err(TraderError::Data("dataset has no tickers".to_string()));
    }

    let mut per_ticker = Vec::with_capacity(dataset.len());
    for ticker in dataset {
        let mut env = MarketEnvironment::new(ticker.test.clone(), config.env.clone())?;
        let mut state = env.reset();

        loop {
            let action = agent.greedy_action(&state);
            let outcome = env.step(action);
            if outcome.done {
                break;
            }
            if let Some(next_state) = outcome.observation {
                state = next_state;
            }
        }

        info!(
            "Test result - {}: final net worth = {:.2}",
            ticker.ticker,
            env.net_worth()
        );
        per_ticker.push(TickerEvaluation {
            ticker: ticker.ticker.clone(),
            net_worth: env.net_worth(),
        });
    }

    let avg_net_worth =
        per_ticker.iter().map(|t| t.net_worth).sum::<f64>() / per_ticker.len() as f64;
    info!(
        "Average net worth across {} tickers: {:.2}",
        per_ticker.len(),
        avg_net_worth
    );

    Ok(EvaluationSummary {
        per_ticker,
        avg_net_worth,
    })
}

/// Summarize a training run.
pub fn summarize_results(results: &[EpisodeResult]) -> TrainingSummary {
    if results.is_empty() {
        return TrainingSummary::default();
    }

    let n = results.len() as f64;
    TrainingSummary {
        num_episodes: results.len(),
        avg_reward: results.iter().map(|r| r.total_reward).sum::<f64>() / n,
        avg_length: results.iter().map(|r| r.length as f64).sum::<f64>() / n,
        best_reward: results
            .iter()
            .map(|r| r.total_reward)
            .fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(reward: f64, length: usize) -> EpisodeResult {
        EpisodeResult {
            episode: 0,
            ticker: "TEST".to_string(),
            total_reward: reward,
            length,
            epsilon: 0.5,
        }
    }

    #[test]
    fn summary_of_empty_run_is_default() {
        let summary = summarize_results(&[]);
        assert_eq!(summary.num_episodes, 0);
        assert_eq!(summary.avg_reward, 0.0);
    }

    #[test]
    fn summary_averages_rewards_and_lengths() {
        let results = vec![result(10.0, 100), result(-4.0, 50)];
        let summary = summarize_results(&results);

        assert_eq!(summary.num_episodes, 2);
        assert!((summary.avg_reward - 3.0).abs() < 1e-12);
        assert!((summary.avg_length - 75.0).abs() < 1e-12);
        assert_eq!(summary.best_reward, 10.0);
    }
}
