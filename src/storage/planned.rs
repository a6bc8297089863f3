use std::{collections::BTreeSet, path::PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use super::{
    documents::{load_json, save_json},
    entities::PlannedTasksEntity,
};

/// Tasks entered today that show up in tomorrow's `planned` section.
pub struct PlannedQueue {
    path: PathBuf,
}

impl PlannedQueue {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn peek(&self) -> Result<Vec<String>> {
        Ok(load_json::<PlannedTasksEntity>(&self.path).await?.tasks)
    }

    /// Replaces the queue. Blank entries are dropped and repeated ones collapsed, the resulting
    /// order carries no meaning.
    pub async fn enqueue<S: AsRef<str>>(
        &self,
        tasks: impl IntoIterator<Item = S>,
    ) -> Result<Vec<String>> {
        let tasks = tasks
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        save_json(&self.path, &PlannedTasksEntity { tasks: tasks.clone() }).await?;
        debug!("Planned {} tasks", tasks.len());
        Ok(tasks)
    }

    /// Takes every queued task, leaving the queue empty.
    pub async fn drain(&self) -> Result<Vec<String>> {
        let tasks = self.peek().await?;
        save_json(&self.path, &PlannedTasksEntity::default()).await?;
        if !tasks.is_empty() {
            info!("Drained {} planned tasks", tasks.len());
        }
        Ok(tasks)
    }
}
