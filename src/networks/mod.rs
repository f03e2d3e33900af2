//! Value Networks
//!
//! Function approximators mapping observations to per-action values.

pub mod q_network;

pub use q_network::{QNetwork, QNetworkConfig};
