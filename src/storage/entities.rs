use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::utils::time::date_to_record_name;

/// Time-of-day group a task belongs to. Variants are declared in display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Morning,
    General,
    Food,
    Planned,
    Evening,
}

impl Section {
    /// Order in which columns are laid out when a day record is created.
    pub const CREATION_ORDER: [Section; 5] = [
        Section::Morning,
        Section::Evening,
        Section::General,
        Section::Food,
        Section::Planned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Morning => "morning",
            Section::General => "general",
            Section::Food => "food",
            Section::Planned => "planned",
            Section::Evening => "evening",
        }
    }
}

impl Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::CREATION_ORDER
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown section {s:?}"))
    }
}

/// Identity of a task inside a day record. Persisted as a `"{section}-{name}"` column name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskKey {
    pub section: Section,
    pub name: String,
}

impl TaskKey {
    pub fn new(section: Section, name: impl Into<String>) -> Self {
        Self {
            section,
            name: name.into(),
        }
    }

    pub fn column(&self) -> String {
        format!("{}-{}", self.section, self.name)
    }
}

impl Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.section, self.name)
    }
}

impl FromStr for TaskKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Section names never contain '-', task names may.
        let Some((section, name)) = s.split_once('-') else {
            bail!("Column {s:?} has no section prefix");
        };
        Ok(TaskKey::new(section.parse()?, name))
    }
}

impl TryFrom<String> for TaskKey {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskKey> for String {
    fn from(value: TaskKey) -> Self {
        value.column()
    }
}

/// Result of a task for a day. Persisted as `"None"` while unset, otherwise as -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawOutcome", into = "RawOutcome")]
pub enum Outcome {
    #[default]
    Unset,
    Actioned,
    Undoable,
    Avoided,
}

impl Outcome {
    pub const UNSET_SENTINEL: &'static str = "None";

    /// Contribution to the day's score. [Outcome::Unset] contributes nothing.
    pub fn value(self) -> Option<i64> {
        match self {
            Outcome::Unset => None,
            Outcome::Actioned => Some(1),
            Outcome::Undoable => Some(0),
            Outcome::Avoided => Some(-1),
        }
    }

    pub fn from_value(value: i64) -> Option<Outcome> {
        match value {
            1 => Some(Outcome::Actioned),
            0 => Some(Outcome::Undoable),
            -1 => Some(Outcome::Avoided),
            _ => None,
        }
    }

    pub fn is_unset(self) -> bool {
        self == Outcome::Unset
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawOutcome {
    Value(i64),
    Sentinel(String),
}

impl TryFrom<RawOutcome> for Outcome {
    type Error = anyhow::Error;

    fn try_from(value: RawOutcome) -> Result<Self, Self::Error> {
        match value {
            RawOutcome::Value(v) => {
                Outcome::from_value(v).ok_or_else(|| anyhow!("Illegal outcome value {v}"))
            }
            RawOutcome::Sentinel(s) if s == Outcome::UNSET_SENTINEL => Ok(Outcome::Unset),
            RawOutcome::Sentinel(s) => Err(anyhow!("Illegal outcome {s:?}")),
        }
    }
}

impl From<Outcome> for RawOutcome {
    fn from(value: Outcome) -> Self {
        match value.value() {
            Some(v) => RawOutcome::Value(v),
            None => RawOutcome::Sentinel(Outcome::UNSET_SENTINEL.into()),
        }
    }
}

/// One calendar day of the log: every task defined for that day and its outcome. Cells keep the
/// order in which the columns were created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub cells: Vec<(TaskKey, Outcome)>,
}

impl DayRecord {
    /// Creates a record where every task is [Outcome::Unset]. Repeated keys are collapsed.
    pub fn new(date: NaiveDate, keys: impl IntoIterator<Item = TaskKey>) -> Self {
        let mut record = Self {
            date,
            cells: Vec::new(),
        };
        for key in keys {
            record.add_key(key);
        }
        record
    }

    /// Adds an unset cell for `key`. Returns false when the key is already present.
    pub fn add_key(&mut self, key: TaskKey) -> bool {
        if self.outcome(&key).is_some() {
            return false;
        }
        self.cells.push((key, Outcome::Unset));
        true
    }

    pub fn outcome(&self, key: &TaskKey) -> Option<Outcome> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn outcome_mut(&mut self, key: &TaskKey) -> Option<&mut Outcome> {
        self.cells
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.cells.iter().map(|(k, _)| k)
    }

    pub fn record_name(&self) -> String {
        date_to_record_name(self.date)
    }
}

/// The running compounded index. Updated once per finalized day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default = "initial_progress")]
    pub progress: f64,
    #[serde(default)]
    pub delta: f64,
    /// Last day whose multiplier is already part of `progress`.
    #[serde(default, with = "record_date::option")]
    pub applied_through: Option<NaiveDate>,
}

fn initial_progress() -> f64 {
    1.
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            progress: initial_progress(),
            delta: 0.,
            applied_through: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTasksEntity {
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Serializes dates the way they appear in the log, see [date_to_record_name].
pub mod record_date {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    use crate::utils::time::{date_to_record_name, record_name_to_date};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date_to_record_name(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        record_name_to_date(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] NaiveDate);

            Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(v)| v))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DayRecord, Outcome, ProgressState, Section, TaskKey};

    #[test]
    fn test_task_key_columns() {
        let key: TaskKey = "general-check-in call".parse().unwrap();
        assert_eq!(key, TaskKey::new(Section::General, "check-in call"));
        assert_eq!(key.column(), "general-check-in call");
        assert!("lunch-salad".parse::<TaskKey>().is_err());
        assert!("stretch".parse::<TaskKey>().is_err());
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_string(&Outcome::Unset).unwrap(), "\"None\"");
        assert_eq!(serde_json::to_string(&Outcome::Avoided).unwrap(), "-1");
        assert_eq!(
            serde_json::from_str::<Vec<Option<Outcome>>>("[1, 0, null, \"None\"]").unwrap(),
            vec![
                Some(Outcome::Actioned),
                Some(Outcome::Undoable),
                None,
                Some(Outcome::Unset)
            ]
        );
        assert!(serde_json::from_str::<Outcome>("2").is_err());
        assert!(serde_json::from_str::<Outcome>("\"nan\"").is_err());
    }

    #[test]
    fn test_day_record_collapses_repeated_keys() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let record = DayRecord::new(
            date,
            [
                TaskKey::new(Section::Morning, "stretch"),
                TaskKey::new(Section::Morning, "stretch"),
                TaskKey::new(Section::Planned, "stretch"),
            ],
        );
        assert_eq!(record.cells.len(), 2);
        assert_eq!(record.record_name(), "01/01/2024");
    }

    #[test]
    fn test_progress_state_defaults() {
        let state: ProgressState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, ProgressState::default());
        assert_eq!(state.progress, 1.);

        let state = ProgressState {
            applied_through: NaiveDate::from_ymd_opt(2024, 3, 9),
            ..Default::default()
        };
        let text = serde_json::to_string(&state).unwrap();
        assert!(text.contains("\"09/03/2024\""));
        assert_eq!(serde_json::from_str::<ProgressState>(&text).unwrap(), state);
    }
}
