//! Experience Memory
//!
//! Replay buffer for off-policy TD learning.

pub mod replay_buffer;

pub use replay_buffer::{ReplayBuffer, Transition};
