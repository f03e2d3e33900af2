//! Replay Buffer
//!
//! Fixed-capacity experience store with uniform random sampling. Storage is
//! an arena `Vec` with a wrapping insertion cursor, so a full buffer evicts
//! strictly oldest-first without reallocating per push.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::env::Action;
use crate::error::{Result, TraderError};

/// A single transition in the environment.
///
/// `next_state` is `None` exactly when `done` is true; terminal transitions
/// carry no successor observation.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: Action,
    pub reward: f32,
    pub next_state: Option<Vec<f32>>,
    pub done: bool,
}

impl Transition {
    pub fn new(
        state: Vec<f32>,
        action: Action,
        reward: f32,
        next_state: Option<Vec<f32>>,
        done: bool,
    ) -> Self {
        debug_assert_eq!(next_state.is_none(), done);
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}

/// Ring buffer of transitions with uniform sampling
#[derive(Debug)]
pub struct ReplayBuffer {
    storage: Vec<Transition>,
    capacity: usize,
    cursor: usize,
}

impl ReplayBuffer {
    /// Create a buffer holding at most `capacity` transitions.
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero; a zero-capacity buffer could never
    /// serve a sample.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be non-zero");
        Self {
            storage: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Insert a transition, evicting the oldest once at capacity. O(1).
    pub fn push(&mut self, transition: Transition) {
        if self.storage.len() < self.capacity {
            self.storage.push(transition);
        } else {
            self.storage[self.cursor] = transition;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Sample `batch_size` transitions uniformly, without replacement within
    /// the batch. Callers are expected to check `len()` first; an
    /// under-filled buffer is an error, not a short batch.
    pub fn sample(&self, batch_size: usize) -> Result<Vec<Transition>> {
        if self.storage.len() < batch_size {
            return Err(TraderError::InsufficientSamples {
                requested: batch_size,
                available: self.storage.len(),
            });
        }

        let mut rng = thread_rng();
        let mut indices: Vec<usize> = (0..self.storage.len()).collect();
        indices.shuffle(&mut rng);

        Ok(indices
            .into_iter()
            .take(batch_size)
            .map(|i| self.storage[i].clone())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker_transition(reward: f32) -> Transition {
        Transition::new(vec![0.0; 4], Action::Hold, reward, Some(vec![0.0; 4]), false)
    }

    #[test]
    fn push_evicts_oldest_first() {
        let mut buffer = ReplayBuffer::new(10);
        for i in 0..15 {
            buffer.push(marker_transition(i as f32));
        }

        assert_eq!(buffer.len(), 10);
        // Exactly the most recent 10 pushes survive
        let mut rewards: Vec<f32> = buffer.storage.iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (5..15).map(|i| i as f32).collect();
        assert_eq!(rewards, expected);
    }

    #[test]
    fn sample_is_without_replacement() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..50 {
            buffer.push(marker_transition(i as f32));
        }

        let batch = buffer.sample(50).unwrap();
        let mut rewards: Vec<f32> = batch.iter().map(|t| t.reward).collect();
        rewards.sort_by(|a, b| a.partial_cmp(b).unwrap());
        rewards.dedup();
        assert_eq!(rewards.len(), 50);
    }

    #[test]
    fn sample_fails_when_underfilled() {
        let mut buffer = ReplayBuffer::new(100);
        for i in 0..5 {
            buffer.push(marker_transition(i as f32));
        }

        let err = buffer.sample(10).unwrap_err();
        assert!(matches!(
            err,
            TraderError::InsufficientSamples {
                requested: 10,
                available: 5
            }
        ));
    }

    #[test]
    #[should_panic(expected = "capacity must be non-zero")]
    fn zero_capacity_is_rejected() {
        ReplayBuffer::new(0);
    }

    #[test]
    fn cursor_wraps_at_capacity() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..7 {
            buffer.push(marker_transition(i as f32));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.capacity(), 3);
        // 7 pushes into capacity 3: slots hold 6, 4, 5 (cursor at 1)
        let rewards: Vec<f32> = buffer.storage.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![6.0, 4.0, 5.0]);
    }
}
