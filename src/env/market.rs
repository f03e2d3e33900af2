//! Market Environment
//!
//! Gym-like reset/step simulation over one ticker's daily history. The
//! observation is a lookback window of per-column z-scored features plus a
//! broadcast position column; the reward is the raw dollar change in net
//! worth, deliberately unclipped and unnormalized.

use std::sync::Arc;

use crate::config::{EnvConfig, N_FEATURES, NUM_ACTIONS};
use crate::data::FeatureTable;
use crate::error::Result;

/// Discrete trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Do nothing
    Hold,
    /// Go long with all available cash (no-op unless flat)
    Buy,
    /// Liquidate the position (no-op unless long)
    Sell,
}

impl Action {
    pub const COUNT: usize = NUM_ACTIONS;

    pub fn index(self) -> usize {
        match self {
            Action::Hold => 0,
            Action::Buy => 1,
            Action::Sell => 2,
        }
    }
}

impl From<usize> for Action {
    fn from(index: usize) -> Self {
        match index {
            1 => Action::Buy,
            2 => Action::Sell,
            // Out-of-range indices degrade to Hold
            _ => Action::Hold,
        }
    }
}

/// Result of taking a step in the environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Observation after the step; `None` exactly when `done`
    pub observation: Option<Vec<f32>>,
    /// Net-worth delta over this step, in dollars
    pub reward: f64,
    /// Whether the episode has ended
    pub done: bool,
}

/// Trading environment over a single ticker's feature table
pub struct MarketEnvironment {
    table: Arc<FeatureTable>,
    config: EnvConfig,
    current_index: usize,
    cash: f64,
    shares: u64,
    position: bool,
    net_worth: f64,
}

impl MarketEnvironment {
    /// Create a new environment. Fails when the table is too short for the
    /// lookback window.
    pub fn new(table: Arc<FeatureTable>, config: EnvConfig) -> Result<Self> {
        table.check_window(config.window_size)?;
        let start_cash = config.start_cash;
        Ok(Self {
            current_index: config.window_size,
            cash: start_cash,
            shares: 0,
            position: false,
            net_worth: start_cash,
            table,
            config,
        })
    }

    /// Reset portfolio state and return the initial observation.
    pub fn reset(&mut self) -> Vec<f32> {
        self.current_index = self.config.window_size;
        self.cash = self.config.start_cash;
        self.shares = 0;
        self.position = false;
        self.net_worth = self.config.start_cash;
        self.observation()
    }

    /// Take one step. Invalid actions (Buy while long, Sell while flat)
    /// silently degrade to Hold.
    pub fn step(&mut self, action: Action) -> StepResult {
        let price = self.table.price(self.current_index);
        let prev_net_worth = self.net_worth;

        match action {
            Action::Buy if !self.position => {
                // The share count deliberately ignores the cost
                // multiplier, so the debit below can overdraw cash by up
                // to one leg's fee.
                let shares_to_buy = (self.cash / price).floor() as u64;
                if shares_to_buy > 0 {
                    let cost =
                        shares_to_buy as f64 * price * (1.0 + self.config.transaction_cost);
                    self.cash -= cost;
                    self.shares = shares_to_buy;
                    self.position = true;
                }
            }
            Action::Sell if self.position => {
                let revenue =
                    self.shares as f64 * price * (1.0 - self.config.transaction_cost);
                self.cash += revenue;
                self.shares = 0;
                self.position = false;
            }
            _ => {}
        }

        self.net_worth = self.cash + self.shares as f64 * price;
        let reward = self.net_worth - prev_net_worth;

        self.current_index += 1;
        // The last row stays unreachable so the next price lookup is in bounds
        let done = self.current_index >= self.table.len() - 1;

        StepResult {
            observation: (!done).then(|| self.observation()),
            reward,
            done,
        }
    }

    /// Current observation: the lookback window, each feature column
    /// z-scored over the window alone, with the position broadcast as a
    /// final column. Flattened row-major to `[window, N_FEATURES + 1]`.
    fn observation(&self) -> Vec<f32> {
        let window = self.config.window_size;
        let start = self.current_index - window;
        let rows = &self.table.rows()[start..self.current_index];

        let mut means = [0.0f64; N_FEATURES];
        let mut stds = [0.0f64; N_FEATURES];
        for col in 0..N_FEATURES {
            let sum: f64 = rows.iter().map(|r| r.features()[col]).sum();
            let mean = sum / window as f64;
            let var: f64 = rows
                .iter()
                .map(|r| (r.features()[col] - mean).powi(2))
                .sum::<f64>()
                / window as f64;
            let std = var.sqrt();
            means[col] = mean;
            // Zero-variance columns normalize to zero, not NaN
            stds[col] = if std > 0.0 { std } else { 1.0 };
        }

        let position = if self.position { 1.0f32 } else { 0.0 };
        let mut obs = Vec::with_capacity(window * (N_FEATURES + 1));
        for row in rows {
            let features = row.features();
            for col in 0..N_FEATURES {
                obs.push(((features[col] - means[col]) / stds[col]) as f32);
            }
            obs.push(position);
        }
        obs
    }

    pub fn observation_dim(&self) -> usize {
        self.config.observation_dim()
    }

    pub fn net_worth(&self) -> f64 {
        self.net_worth
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn shares(&self) -> u64 {
        self.shares
    }

    pub fn is_long(&self) -> bool {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureRow;
    use chrono::NaiveDate;

    fn table_with_prices(prices: &[f64]) -> Arc<FeatureTable> {
        let rows = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| FeatureRow {
                date: NaiveDate::from_ymd_opt(2020, 1, 1)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(i as u64))
                    .unwrap(),
                open: p,
                high: p,
                low: p,
                close: p,
                adj_close: p,
                volume: 1_000.0,
                ret: 0.0,
                sma_5: p,
                sma_10: p,
                vol_5: 1_000.0,
            })
            .collect();
        Arc::new(FeatureTable::new(rows))
    }

    fn constant_env(price: f64, len: usize, window: usize) -> MarketEnvironment {
        let config = EnvConfig {
            window_size: window,
            ..Default::default()
        };
        MarketEnvironment::new(table_with_prices(&vec![price; len]), config).unwrap()
    }

    #[test]
    fn rejects_tables_shorter_than_window() {
        let config = EnvConfig {
            window_size: 30,
            ..Default::default()
        };
        let result = MarketEnvironment::new(table_with_prices(&vec![10.0; 31]), config);
        assert!(result.is_err());
    }

    #[test]
    fn constant_window_normalizes_to_zero() {
        let mut env = constant_env(100.0, 20, 5);
        let obs = env.reset();
        assert_eq!(obs.len(), 5 * 11);
        // Every feature column is constant over the window, so z-scores
        // are exactly zero; the position column is zero while flat.
        assert!(obs.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn hold_conserves_net_worth_when_flat() {
        let mut env = constant_env(100.0, 20, 5);
        env.reset();
        let result = env.step(Action::Hold);
        assert_eq!(result.reward, 0.0);
        assert_eq!(env.net_worth(), 10_000.0);
    }

    #[test]
    fn hold_reward_is_price_delta_on_held_shares() {
        let mut prices = vec![100.0; 10];
        prices.extend([100.0, 102.0, 105.0]);
        let config = EnvConfig {
            window_size: 5,
            transaction_cost: 0.0,
            ..Default::default()
        };
        let mut env = MarketEnvironment::new(table_with_prices(&prices), config).unwrap();
        env.reset();
        // Buy 100 shares at 100 while the price sits at index 5..9 = 100
        env.step(Action::Buy);
        assert_eq!(env.shares(), 100);

        // Walk forward to the 100 -> 102 move
        while env.table.price(env.current_index) == 100.0 {
            env.step(Action::Hold);
        }
        let result = env.step(Action::Hold);
        assert!((result.reward - 200.0).abs() < 1e-9);
    }

    #[test]
    fn buy_then_sell_charges_cost_on_both_legs() {
        let mut env = constant_env(100.0, 20, 5);
        env.reset();
        env.step(Action::Buy);
        env.step(Action::Sell);
        // 100 shares at 100 = 10_000 traded per leg, 0.1% each way
        let expected = 10_000.0 - 2.0 * 0.001 * 10_000.0;
        assert!((env.net_worth() - expected).abs() < 1e-9);
        assert!(!env.is_long());
        assert_eq!(env.shares(), 0);
    }

    #[test]
    fn buy_can_overdraw_cash_by_cost() {
        // Affordability ignores the cost multiplier: floor(1000/100) = 10
        // shares, debit 10 * 100 * 1.01 = 1010.
        let config = EnvConfig {
            window_size: 5,
            start_cash: 1_000.0,
            transaction_cost: 0.01,
        };
        let mut env =
            MarketEnvironment::new(table_with_prices(&vec![100.0; 20]), config).unwrap();
        env.reset();
        env.step(Action::Buy);
        assert_eq!(env.shares(), 10);
        assert!((env.cash() - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn unaffordable_buy_is_a_no_op() {
        let config = EnvConfig {
            window_size: 5,
            start_cash: 50.0,
            ..Default::default()
        };
        let mut env =
            MarketEnvironment::new(table_with_prices(&vec![100.0; 20]), config).unwrap();
        env.reset();
        let result = env.step(Action::Buy);
        assert_eq!(result.reward, 0.0);
        assert!(!env.is_long());
        assert_eq!(env.cash(), 50.0);
    }

    #[test]
    fn invalid_actions_degrade_to_hold() {
        let mut env = constant_env(100.0, 20, 5);
        env.reset();

        // Sell while flat
        let result = env.step(Action::Sell);
        assert_eq!(result.reward, 0.0);
        assert_eq!(env.cash(), 10_000.0);

        // Buy while long
        env.step(Action::Buy);
        let cash_after_buy = env.cash();
        env.step(Action::Buy);
        assert_eq!(env.cash(), cash_after_buy);
        assert_eq!(env.shares(), 100);
    }

    #[test]
    fn episode_ends_one_row_before_table_end() {
        let len = 12;
        let window = 5;
        let mut env = constant_env(100.0, len, window);
        let mut state = env.reset();

        let mut steps = 0;
        loop {
            let result = env.step(Action::Hold);
            steps += 1;
            assert_eq!(result.observation.is_none(), result.done);
            if result.done {
                break;
            }
            state = result.observation.unwrap();
        }
        assert_eq!(state.len(), env.observation_dim());
        // reset index = window; done once index reaches len - 1
        assert_eq!(steps, len - 1 - window);
    }

    #[test]
    fn out_of_range_action_index_is_hold() {
        assert_eq!(Action::from(0), Action::Hold);
        assert_eq!(Action::from(1), Action::Buy);
        assert_eq!(Action::from(2), Action::Sell);
        assert_eq!(Action::from(99), Action::Hold);
    }

    #[test]
    fn position_column_broadcasts_after_buy() {
        let mut env = constant_env(100.0, 20, 5);
        env.reset();
        let result = env.step(Action::Buy);
        let obs = result.observation.unwrap();
        // Last column of every row carries the position flag
        for row in 0..5 {
            assert_eq!(obs[row * 11 + 10], 1.0);
        }
    }
}
