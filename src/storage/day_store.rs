use std::{future::Future, path::PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    error::TrackerError,
    fs::operations::{read_document, write_document},
    utils::time::date_to_record_name,
};

use super::{
    day_table::DayTable,
    entities::{DayRecord, Outcome, TaskKey},
};

/// Interface for abstracting storage of day records.
pub trait DayStore {
    /// The most recent day, `None` when nothing was ever recorded.
    fn latest(&self) -> impl Future<Output = Result<Option<DayRecord>>>;

    /// Fails with [TrackerError::NotFound] when there is no record for `date`.
    fn get(&self, date: NaiveDate) -> impl Future<Output = Result<DayRecord>>;

    /// Records strictly before `date`, oldest first.
    fn history_before(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<DayRecord>>>;

    /// Appends a freshly created day. Fails with [TrackerError::DuplicateDate] if the day exists.
    fn insert(&self, record: &DayRecord) -> impl Future<Output = Result<()>>;

    /// Fails with [TrackerError::InvalidKey] when `key` isn't a column of that day.
    fn set_outcome(
        &self,
        date: NaiveDate,
        key: &TaskKey,
        outcome: Outcome,
    ) -> impl Future<Output = Result<()>>;

    /// Replaces every unset outcome of the day with `outcome`. Returns how many were changed.
    fn set_all_unset(
        &self,
        date: NaiveDate,
        outcome: Outcome,
    ) -> impl Future<Output = Result<usize>>;

    /// Adds unset cells for keys the day doesn't have yet. Returns how many were added.
    fn add_columns(
        &self,
        date: NaiveDate,
        keys: &[TaskKey],
    ) -> impl Future<Output = Result<usize>>;
}

/// The main realization of [DayStore]: a single JSON table rewritten as a whole on every change.
pub struct JsonDayStore {
    path: PathBuf,
}

impl JsonDayStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn load(&self) -> Result<DayTable> {
        match read_document(&self.path).await? {
            Some(bytes) => DayTable::parse(&bytes),
            None => Ok(DayTable::default()),
        }
    }

    pub async fn save(&self, table: &DayTable) -> Result<()> {
        write_document(&self.path, &table.to_bytes()?).await
    }

    /// Loads the record of `date`, lets `change` mutate it and writes it back.
    async fn modify<T>(
        &self,
        date: NaiveDate,
        change: impl FnOnce(&mut DayRecord) -> Result<T>,
    ) -> Result<T> {
        let mut table = self.load().await?;
        let Some(mut record) = table.get(date) else {
            return Err(TrackerError::NotFound {
                date: date_to_record_name(date),
            }
            .into());
        };
        let result = change(&mut record)?;
        table.update(&record)?;
        self.save(&table).await?;
        Ok(result)
    }
}

impl DayStore for JsonDayStore {
    async fn latest(&self) -> Result<Option<DayRecord>> {
        Ok(self.load().await?.latest())
    }

    async fn get(&self, date: NaiveDate) -> Result<DayRecord> {
        let table = self.load().await?;
        table.get(date).ok_or_else(|| {
            TrackerError::NotFound {
                date: date_to_record_name(date),
            }
            .into()
        })
    }

    async fn history_before(&self, date: NaiveDate) -> Result<Vec<DayRecord>> {
        let table = self.load().await?;
        Ok(table.records().take_while(|v| v.date < date).collect())
    }

    async fn insert(&self, record: &DayRecord) -> Result<()> {
        let mut table = self.load().await?;
        table.append(record)?;
        self.save(&table).await?;
        info!(
            "Created record {} with {} tasks",
            record.record_name(),
            record.cells.len()
        );
        Ok(())
    }

    async fn set_outcome(&self, date: NaiveDate, key: &TaskKey, outcome: Outcome) -> Result<()> {
        self.modify(date, |record| {
            let Some(cell) = record.outcome_mut(key) else {
                return Err(TrackerError::InvalidKey {
                    date: record.record_name(),
                    key: key.column(),
                }
                .into());
            };
            *cell = outcome;
            Ok(())
        })
        .await?;
        debug!("Set {key} of {} to {outcome:?}", date_to_record_name(date));
        Ok(())
    }

    async fn set_all_unset(&self, date: NaiveDate, outcome: Outcome) -> Result<usize> {
        self.modify(date, |record| {
            let mut changed = 0;
            for (_, cell) in record.cells.iter_mut().filter(|(_, v)| v.is_unset()) {
                *cell = outcome;
                changed += 1;
            }
            Ok(changed)
        })
        .await
    }

    async fn add_columns(&self, date: NaiveDate, keys: &[TaskKey]) -> Result<usize> {
        self.modify(date, |record| {
            Ok(keys
                .iter()
                .filter(|key| record.add_key((*key).clone()))
                .count())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        error::TrackerError,
        storage::entities::{DayRecord, Outcome, Section, TaskKey},
    };

    use super::{DayStore, JsonDayStore};

    const TEST_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2024, 1, 1) {
        Some(v) => v,
        None => panic!("valid date"),
    };

    fn stretch() -> TaskKey {
        TaskKey::new(Section::Morning, "stretch")
    }

    #[tokio::test]
    async fn test_missing_table_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDayStore::new(dir.path().join("log.json"));
        assert_eq!(store.latest().await?, None);
        assert_eq!(store.history_before(TEST_DATE).await?, vec![]);
        let err = store.get(TEST_DATE).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_outcome_and_finalize() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDayStore::new(dir.path().join("log.json"));
        let read = TaskKey::new(Section::Evening, "read");
        store
            .insert(&DayRecord::new(TEST_DATE, [stretch(), read.clone()]))
            .await?;

        store
            .set_outcome(TEST_DATE, &stretch(), Outcome::Actioned)
            .await?;
        assert_eq!(store.set_all_unset(TEST_DATE, Outcome::Avoided).await?, 1);
        assert_eq!(store.set_all_unset(TEST_DATE, Outcome::Avoided).await?, 0);

        let record = store.get(TEST_DATE).await?;
        assert_eq!(record.outcome(&stretch()), Some(Outcome::Actioned));
        assert_eq!(record.outcome(&read), Some(Outcome::Avoided));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_outcome_unknown_key() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDayStore::new(dir.path().join("log.json"));
        store.insert(&DayRecord::new(TEST_DATE, [stretch()])).await?;

        let err = store
            .set_outcome(
                TEST_DATE,
                &TaskKey::new(Section::Food, "salad"),
                Outcome::Actioned,
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::InvalidKey {
                date: "01/01/2024".into(),
                key: "food-salad".into()
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_history_and_added_columns() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonDayStore::new(dir.path().join("log.json"));
        let next = TEST_DATE.succ_opt().unwrap();
        store.insert(&DayRecord::new(TEST_DATE, [stretch()])).await?;
        store.insert(&DayRecord::new(next, [stretch()])).await?;

        let run = TaskKey::new(Section::Morning, "run");
        assert_eq!(store.add_columns(next, &[stretch(), run.clone()]).await?, 1);

        let history = store.history_before(next).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome(&run), None);
        assert_eq!(
            store.latest().await?.unwrap().outcome(&run),
            Some(Outcome::Unset)
        );
        Ok(())
    }
}
