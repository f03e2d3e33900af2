//! Model Checkpointing
//!
//! Save and load Q-network weights for persistence across runs.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use tracing::{info, warn};

use crate::error::{Result, TraderError};
use crate::networks::{QNetwork, QNetworkConfig};

/// Checkpointer for saving and loading Q-networks
pub struct Checkpointer {
    checkpoint_dir: PathBuf,
    /// Maximum checkpoints to keep
    max_checkpoints: usize,
}

impl Checkpointer {
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Self {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();

        if !checkpoint_dir.exists() {
            if let Err(e) = fs::create_dir_all(&checkpoint_dir) {
                warn!("Failed to create checkpoint directory: {}", e);
            }
        }

        Self {
            checkpoint_dir,
            max_checkpoints,
        }
    }

    /// Path for a named checkpoint.
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_dir.join(format!("{}.mpk", name))
    }

    /// Save a network under `name`.
    pub fn save<B: Backend>(&self, network: &QNetwork<B>, name: &str) -> Result<PathBuf> {
        let path = self.checkpoint_path(name);

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        network
            .clone()
            .save_file(&path, &recorder)
            .map_err(|e| TraderError::Checkpoint(format!("save failed: {e}")))?;

        info!("Saved checkpoint to {:?}", path);
        self.cleanup_old_checkpoints();

        Ok(path)
    }

    /// Load a network saved under `name`. The config must match the saved
    /// topology.
    pub fn load<B: Backend>(
        &self,
        config: &QNetworkConfig,
        name: &str,
        device: &B::Device,
    ) -> Result<QNetwork<B>> {
        let path = self.checkpoint_path(name);
        if !path.exists() {
            return Err(TraderError::Checkpoint(format!(
                "checkpoint not found: {}",
                path.display()
            )));
        }

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        config
            .init::<B>(device)
            .load_file(path, &recorder, device)
            .map_err(|e| TraderError::Checkpoint(format!("load failed: {e}")))
    }

    /// List available checkpoint names, sorted.
    pub fn list_checkpoints(&self) -> Vec<String> {
        let mut checkpoints = Vec::new();

        if let Ok(entries) = fs::read_dir(&self.checkpoint_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stem) = name.strip_suffix(".mpk") {
                        checkpoints.push(stem.to_string());
                    }
                }
            }
        }

        checkpoints.sort();
        checkpoints
    }

    pub fn latest_checkpoint(&self) -> Option<String> {
        self.list_checkpoints().into_iter().last()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.checkpoint_path(name).exists()
    }

    fn cleanup_old_checkpoints(&self) {
        let checkpoints = self.list_checkpoints();
        if checkpoints.len() <= self.max_checkpoints {
            return;
        }

        let to_remove = checkpoints.len() - self.max_checkpoints;
        for name in checkpoints.into_iter().take(to_remove) {
            let path = self.checkpoint_path(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {}", name);
            }
        }
    }
}

impl Default for Checkpointer {
    fn default() -> Self {
        Self::new("./checkpoints", 5)
    }
}

/// Checkpoint name with a UTC timestamp suffix.
pub fn timestamped_name(prefix: &str) -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}
