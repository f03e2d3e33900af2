//! DQN Agent
//!
//! Owns the online and target Q-networks, the Adam optimizer, and the
//! replay buffer. Exploration decays exponentially with the global action
//! counter; training bootstraps TD targets through the lagging target
//! network, which is hard-synced (full parameter copy, never a soft
//! average) every `target_update_freq` action steps.

use burn::module::AutodiffModule;
use burn::nn::loss::{HuberLossConfig, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Int, Tensor, TensorData};
use rand::{thread_rng, Rng};

use crate::config::AgentConfig;
use crate::env::Action;
use crate::error::Result;
use crate::memory::{ReplayBuffer, Transition};
use crate::networks::{QNetwork, QNetworkConfig};

/// Value-based agent with epsilon-greedy exploration and a lagging target
/// network. The online network lives on the autodiff backend; the target
/// network lives on the inner backend so its forward passes never build the
/// autodiff graph.
pub struct DqnAgent<B: AutodiffBackend> {
    policy: QNetwork<B>,
    target: QNetwork<B::InnerBackend>,
    optimizer: OptimizerAdaptor<Adam<B::InnerBackend>, QNetwork<B>, B>,
    memory: ReplayBuffer,
    config: AgentConfig,
    device: B::Device,
    /// Global action counter; drives both exploration decay and target sync
    steps: usize,
}

impl<B: AutodiffBackend> DqnAgent<B> {
    /// Create an agent for observations of `input_dim` flattened values.
    /// The target network starts as an exact copy of the online network.
    pub fn new(input_dim: usize, config: AgentConfig, device: B::Device) -> Self {
        let policy = QNetworkConfig::new(input_dim).init::<B>(&device);
        let target = policy.valid();
        let optimizer = AdamConfig::new().init();
        let memory = ReplayBuffer::new(config.buffer_capacity);

        Self {
            policy,
            target,
            optimizer,
            memory,
            config,
            device,
            steps: 0,
        }
    }

    /// Epsilon-greedy action selection. Every call advances the global
    /// step counter, whichever branch is taken.
    pub fn act(&mut self, state: &[f32]) -> Action {
        let eps = self.config.epsilon(self.steps);
        self.steps += 1;

        let mut rng = thread_rng();
        if rng.gen::<f64>() < eps {
            Action::from(rng.gen_range(0..Action::COUNT))
        } else {
            self.greedy_action(state)
        }
    }

    /// Greedy action: argmax over the online network's Q-values. Used for
    /// evaluation (epsilon forced to zero); does not advance the counter.
    pub fn greedy_action(&self, state: &[f32]) -> Action {
        let q_values = self.q_values(state);
        let best = q_values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Action::from(best)
    }

    /// Online-network Q-values for a single state, without gradient
    /// tracking.
    pub fn q_values(&self, state: &[f32]) -> Vec<f32> {
        let input = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(state.to_vec(), [1, state.len()]),
            &self.device,
        );
        let output = self.policy.valid().forward(input);
        output.into_data().iter::<f32>().collect()
    }

    /// Target-network Q-values for a single state.
    pub fn target_q_values(&self, state: &[f32]) -> Vec<f32> {
        let input = Tensor::<B::InnerBackend, 2>::from_data(
            TensorData::new(state.to_vec(), [1, state.len()]),
            &self.device,
        );
        let output = self.target.forward(input);
        output.into_data().iter::<f32>().collect()
    }

    /// Record a transition in the replay buffer.
    pub fn push(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One TD update on a sampled batch. Silently skips while the buffer
    /// holds fewer than `batch_size` transitions. Returns the Huber loss
    /// when an update ran.
    pub fn train_step(&mut self) -> Result<Option<f32>> {
        if self.memory.len() < self.config.batch_size {
            return Ok(None);
        }

        let batch = self.memory.sample(self.config.batch_size)?;
        let batch_size = batch.len();
        let obs_dim = batch[0].state.len();

        let mut states = Vec::with_capacity(batch_size * obs_dim);
        let mut actions = Vec::with_capacity(batch_size);
        for transition in &batch {
            states.extend_from_slice(&transition.state);
            actions.push(transition.action.index() as i64);
        }

        // Bootstrapped value: max_a' Q_target(s', a') for non-terminal
        // rows, exactly zero for terminal ones. An all-terminal batch is a
        // valid zero-length case.
        let mut next_values = vec![0.0f32; batch_size];
        let mut next_states = Vec::new();
        let mut next_slots = Vec::new();
        for (i, transition) in batch.iter().enumerate() {
            if let Some(next) = &transition.next_state {
                next_states.extend_from_slice(next);
                next_slots.push(i);
            }
        }
        if !next_slots.is_empty() {
            let next_tensor = Tensor::<B::InnerBackend, 2>::from_data(
                TensorData::new(next_states, [next_slots.len(), obs_dim]),
                &self.device,
            );
            let max_q = self.target.forward(next_tensor).max_dim(1);
            let values: Vec<f32> = max_q.into_data().iter::<f32>().collect();
            for (&slot, value) in next_slots.iter().zip(values) {
                next_values[slot] = value;
            }
        }

        let gamma = self.config.gamma as f32;
        let targets: Vec<f32> = batch
            .iter()
            .zip(&next_values)
            .map(|(transition, &next)| transition.reward + gamma * next)
            .collect();

        let states = Tensor::<B, 2>::from_data(
            TensorData::new(states, [batch_size, obs_dim]),
            &self.device,
        );
        let actions = Tensor::<B, 2, Int>::from_data(
            TensorData::new(actions, [batch_size, 1]),
            &self.device,
        );
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets, [batch_size, 1]),
            &self.device,
        );

        // Q(s, a) for the taken actions only
        let predicted = self.policy.forward(states).gather(1, actions);
        let loss = HuberLossConfig::new(1.0)
            .init()
            .forward(predicted, targets, Reduction::Mean);

        let grads = GradientsParams::from_grads(loss.backward(), &self.policy);
        self.policy = self
            .optimizer
            .step(self.config.learning_rate, self.policy.clone(), grads);

        // Keyed off the action counter: one sync per target_update_freq
        // action steps under the act/train lockstep loop
        if self.steps % self.config.target_update_freq == 0 {
            self.sync_target();
        }

        Ok(Some(loss.into_scalar().elem::<f32>()))
    }

    /// Hard update: copy the online parameters into the target network.
    pub fn sync_target(&mut self) {
        self.target = self.policy.valid();
    }

    /// Total `act` calls so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Transitions currently buffered.
    pub fn buffer_len(&self) -> usize {
        self.memory.len()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn network(&self) -> &QNetwork<B> {
        &self.policy
    }

    /// Replace the online network (checkpoint restore) and re-sync the
    /// target to match.
    pub fn load_network(&mut self, network: QNetwork<B>) {
        self.policy = network;
        self.sync_target();
    }
}
