//! DQN Agent
//!
//! Epsilon-greedy policy, TD training update, and target-network
//! synchronization.

pub mod dqn;

pub use dqn::DqnAgent;
