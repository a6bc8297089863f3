//! The task catalog: which tasks exist on which weekday and how each of them is presented.

use std::{collections::HashMap, path::Path};

use anyhow::Result;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::TrackerError,
    fs::operations::read_document,
    storage::entities::{Section, TaskKey},
};

/// Catalog written by `init` when the user has none yet.
pub const TEMPLATE: &str = include_str!("../assets/template.toml");

/// How a task is presented and submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Plain,
    /// Shows an extra line of text under the task.
    Note(String),
    /// Actioning it records the tasks planned for tomorrow.
    Plan,
}

impl From<&[String]> for TaskKind {
    fn from(value: &[String]) -> Self {
        match value {
            [kind, ..] if kind == "p" => TaskKind::Plan,
            [kind, text, ..] if kind == "w" => TaskKind::Note(text.clone()),
            [kind] if kind == "w" => TaskKind::Note(String::new()),
            _ => TaskKind::Plain,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WeekdayTasks {
    #[serde(default)]
    general: Vec<String>,
    #[serde(default)]
    food: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    morning: Vec<String>,
    #[serde(default)]
    evening: Vec<String>,
    #[serde(default, rename = "Special")]
    special: HashMap<String, Vec<String>>,
    /// Keyed by English weekday name.
    #[serde(flatten)]
    weekdays: HashMap<String, WeekdayTasks>,
}

impl Catalog {
    pub fn parse(text: &str) -> Result<Catalog> {
        toml::from_str(text).map_err(|e| {
            TrackerError::InvalidCatalog {
                message: e.message().to_string(),
            }
            .into()
        })
    }

    pub async fn load(path: &Path) -> Result<Catalog> {
        let Some(bytes) = read_document(path).await? else {
            return Err(TrackerError::MissingCatalog {
                path: path.display().to_string(),
            }
            .into());
        };
        let text = String::from_utf8(bytes).map_err(|e| TrackerError::InvalidCatalog {
            message: e.to_string(),
        })?;
        Catalog::parse(&text)
    }

    /// Every task defined for `weekday`, in column creation order. A weekday without its own
    /// table only gets the daily tasks.
    pub fn tasks_for(&self, weekday: &str) -> Vec<TaskKey> {
        let weekday_tasks = self.weekdays.get(weekday);
        if weekday_tasks.is_none() {
            debug!("Catalog has no tasks specific to {weekday}");
        }

        Section::CREATION_ORDER
            .into_iter()
            .flat_map(|section| {
                let names: &[String] = match (section, weekday_tasks) {
                    (Section::Morning, _) => &self.morning,
                    (Section::Evening, _) => &self.evening,
                    (Section::General, Some(tasks)) => &tasks.general,
                    (Section::Food, Some(tasks)) => &tasks.food,
                    (Section::General | Section::Food | Section::Planned, _) => &[],
                };
                names.iter().map(move |name| TaskKey::new(section, name))
            })
            .collect()
    }

    pub fn kind_of(&self, name: &str) -> TaskKind {
        self.special
            .get(name)
            .map(|v| TaskKind::from(v.as_slice()))
            .unwrap_or(TaskKind::Plain)
    }
}
