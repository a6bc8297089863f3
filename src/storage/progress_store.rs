use std::path::PathBuf;

use anyhow::Result;

use super::{
    documents::{load_json, save_json},
    entities::ProgressState,
};

pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A tracker that never rolled over starts at a progress of 1.
    pub async fn load(&self) -> Result<ProgressState> {
        load_json(&self.path).await
    }

    pub async fn save(&self, state: &ProgressState) -> Result<()> {
        save_json(&self.path, state).await
    }
}
