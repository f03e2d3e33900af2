//! Q-Network
//!
//! MLP over the flattened observation window, producing one value per
//! discrete action. The rest of the crate treats this as an opaque
//! differentiable mapping; swapping in a different topology only requires
//! matching the input/output contract.

use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::config::NUM_ACTIONS;

/// First hidden layer width
pub const HIDDEN_1: usize = 512;

/// Second hidden layer width
pub const HIDDEN_2: usize = 256;

/// Q-network configuration
#[derive(Config, Debug)]
pub struct QNetworkConfig {
    /// Flattened observation length: `window_size * (n_features + 1)`
    pub input_dim: usize,
    /// First hidden layer width
    #[config(default = "HIDDEN_1")]
    pub hidden_1: usize,
    /// Second hidden layer width
    #[config(default = "HIDDEN_2")]
    pub hidden_2: usize,
    /// Number of discrete actions
    #[config(default = "NUM_ACTIONS")]
    pub num_actions: usize,
}

/// Action-value network: `obs -> [Q(s, Hold), Q(s, Buy), Q(s, Sell)]`
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    head: Linear<B>,
    activation: Relu,
}

impl QNetworkConfig {
    /// Initialize the network on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        QNetwork {
            fc1: LinearConfig::new(self.input_dim, self.hidden_1).init(device),
            fc2: LinearConfig::new(self.hidden_1, self.hidden_2).init(device),
            head: LinearConfig::new(self.hidden_2, self.num_actions).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: `[batch, input_dim] -> [batch, num_actions]`.
    pub fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fc1.forward(state);
        let x = self.activation.forward(x);
        let x = self.fc2.forward(x);
        let x = self.activation.forward(x);
        self.head.forward(x)
    }
}
