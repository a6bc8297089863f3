use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::TrackerError, utils::time::date_to_record_name};

use super::entities::{record_date, DayRecord, Outcome, TaskKey};

/// The whole log as it is stored on disk: one row per day, one column per task ever defined.
/// A `null` cell means the task didn't exist on that day, which is different from an unset
/// outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayTable {
    columns: Vec<TaskKey>,
    rows: Vec<DayRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DayRow {
    #[serde(with = "record_date")]
    date: NaiveDate,
    cells: Vec<Option<Outcome>>,
}

impl DayTable {
    /// Parses and validates a serialized table. Rows written before a column was added may be
    /// shorter than the header and are padded with missing cells.
    pub fn parse(bytes: &[u8]) -> Result<DayTable> {
        let mut table: DayTable =
            serde_json::from_slice(bytes).map_err(|e| TrackerError::InvalidTable {
                message: e.to_string(),
            })?;

        for (index, column) in table.columns.iter().enumerate() {
            if table.columns[..index].contains(column) {
                Err(TrackerError::InvalidTable {
                    message: format!("column {column} appears twice"),
                })?
            }
        }

        let width = table.columns.len();
        for row in table.rows.iter_mut() {
            if row.cells.len() > width {
                Err(TrackerError::InvalidTable {
                    message: format!(
                        "row {} has {} cells but only {width} columns exist",
                        date_to_record_name(row.date),
                        row.cells.len()
                    ),
                })?
            }
            row.cells.resize(width, None);
        }

        if let Some(pair) = table.rows.windows(2).find(|v| v[0].date >= v[1].date) {
            Err(TrackerError::InvalidTable {
                message: format!(
                    "row {} is not after {}",
                    date_to_record_name(pair[1].date),
                    date_to_record_name(pair[0].date)
                ),
            })?
        }

        Ok(table)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[TaskKey] {
        &self.columns
    }

    pub fn latest(&self) -> Option<DayRecord> {
        self.rows.last().map(|row| self.row_to_record(row))
    }

    pub fn get(&self, date: NaiveDate) -> Option<DayRecord> {
        self.find_row(date).map(|index| self.row_to_record(&self.rows[index]))
    }

    /// All records in chronological order.
    pub fn records(&self) -> impl Iterator<Item = DayRecord> + '_ {
        self.rows.iter().map(|row| self.row_to_record(row))
    }

    /// Grows the schema with every key the table doesn't have yet. Existing rows get a missing
    /// cell for each new column. Returns the number of added columns.
    pub fn add_missing_columns_as_null<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a TaskKey>,
    ) -> usize {
        let mut added = 0;
        for key in keys {
            if self.columns.contains(key) {
                continue;
            }
            debug!("Adding column {key}");
            self.columns.push(key.clone());
            for row in self.rows.iter_mut() {
                row.cells.push(None);
            }
            added += 1;
        }
        added
    }

    /// Appends a new day. The day must be after every day already in the table.
    pub fn append(&mut self, record: &DayRecord) -> Result<()> {
        if self.find_row(record.date).is_some() {
            Err(TrackerError::DuplicateDate {
                date: record.record_name(),
            })?
        }
        if let Some(last) = self.rows.last() {
            anyhow::ensure!(
                last.date < record.date,
                "Can't append {} after {}",
                record.record_name(),
                date_to_record_name(last.date)
            );
        }

        self.add_missing_columns_as_null(record.keys());
        let cells = self.cells_for(record);
        self.rows.push(DayRow {
            date: record.date,
            cells,
        });
        Ok(())
    }

    /// Overwrites the stored row of `record.date` with the cells of `record`.
    pub fn update(&mut self, record: &DayRecord) -> Result<()> {
        let Some(index) = self.find_row(record.date) else {
            return Err(TrackerError::NotFound {
                date: record.record_name(),
            }
            .into());
        };
        self.add_missing_columns_as_null(record.keys());
        self.rows[index].cells = self.cells_for(record);
        Ok(())
    }

    fn find_row(&self, date: NaiveDate) -> Option<usize> {
        self.rows.iter().position(|row| row.date == date)
    }

    fn cells_for(&self, record: &DayRecord) -> Vec<Option<Outcome>> {
        self.columns
            .iter()
            .map(|column| record.outcome(column))
            .collect()
    }

    fn row_to_record(&self, row: &DayRow) -> DayRecord {
        DayRecord {
            date: row.date,
            cells: self
                .columns
                .iter()
                .zip(row.cells.iter())
                .filter_map(|(key, cell)| cell.map(|outcome| (key.clone(), outcome)))
                .collect(),
        }
    }
}
