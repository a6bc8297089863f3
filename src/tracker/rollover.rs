use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use crate::{
    catalog::Catalog,
    storage::{
        day_store::DayStore,
        entities::{DayRecord, Outcome, Section, TaskKey},
        planned::PlannedQueue,
        progress_store::ProgressStore,
    },
    utils::time::{date_to_record_name, next_day, weekday_name},
};

use super::progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayState {
    /// Nothing was recorded before, today's record was just created.
    Initial,
    /// The latest record is today's.
    SameDay,
    /// The latest record is from an earlier day and has to be rolled over.
    DifferentDay,
}

/// What a rollover did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollover {
    pub state: DayState,
    /// Date of the record that is open for changes after the rollover.
    pub current: NaiveDate,
    /// Days that were closed, oldest first.
    pub finalized: Vec<NaiveDate>,
}

/// Keeps the log in step with the calendar. Every day between the latest record and today gets
/// closed and a record for the following day is opened, so the log never has gaps.
pub struct RolloverController<'a, S: DayStore> {
    store: &'a S,
    catalog: &'a Catalog,
    planned: &'a PlannedQueue,
    progress: &'a ProgressStore,
}

impl<'a, S: DayStore> RolloverController<'a, S> {
    pub fn new(
        store: &'a S,
        catalog: &'a Catalog,
        planned: &'a PlannedQueue,
        progress: &'a ProgressStore,
    ) -> Self {
        Self {
            store,
            catalog,
            planned,
            progress,
        }
    }

    /// Reports the state without changing anything.
    pub async fn check(&self, today: NaiveDate) -> Result<DayState> {
        Ok(match self.store.latest().await? {
            None => DayState::Initial,
            Some(latest) if latest.date < today => DayState::DifferentDay,
            Some(_) => DayState::SameDay,
        })
    }

    #[instrument(skip_all, fields(today = %date_to_record_name(today)))]
    pub async fn run(&self, today: NaiveDate) -> Result<Rollover> {
        let Some(latest) = self.store.latest().await? else {
            info!("No records yet, starting the log");
            self.create(today).await?;
            return Ok(Rollover {
                state: DayState::Initial,
                current: today,
                finalized: vec![],
            });
        };

        if latest.date >= today {
            if latest.date > today {
                warn!(
                    "Latest record {} is ahead of the clock, leaving it open",
                    latest.record_name()
                );
            }
            return Ok(Rollover {
                state: DayState::SameDay,
                current: latest.date,
                finalized: vec![],
            });
        }

        let mut finalized = vec![];
        let mut stale = latest.date;
        while stale < today {
            self.finalize(stale).await?;
            finalized.push(stale);
            let next = next_day(&Local, stale)?;
            self.create(next).await?;
            stale = next;
        }
        info!("Rolled over {} days", finalized.len());

        Ok(Rollover {
            state: DayState::DifferentDay,
            current: stale,
            finalized,
        })
    }

    /// Builds the record for `date` from the catalog and whatever was planned for it.
    pub async fn create(&self, date: NaiveDate) -> Result<DayRecord> {
        let weekday = weekday_name(date);
        let planned = self.planned.peek().await?;
        let keys = self
            .catalog
            .tasks_for(&weekday)
            .into_iter()
            .chain(planned.into_iter().map(|v| TaskKey::new(Section::Planned, v)));
        let record = DayRecord::new(date, keys);
        self.store.insert(&record).await?;
        // The queue only empties once its tasks are part of a stored record.
        self.planned.drain().await?;
        Ok(record)
    }

    /// Closes a day: unaddressed tasks count as avoided and the score goes into progress.
    async fn finalize(&self, date: NaiveDate) -> Result<()> {
        let defaulted = self.store.set_all_unset(date, Outcome::Avoided).await?;
        let record = self.store.get(date).await?;

        let mut state = self.progress.load().await?;
        // A previous run may have died between applying and creating the next day.
        if state.applied_through.is_some_and(|v| v >= date) {
            warn!("{} was already applied to progress", record.record_name());
            return Ok(());
        }
        progress::apply(&mut state, &record);
        self.progress.save(&state).await?;
        info!(
            "Finalized {} ({defaulted} tasks defaulted to avoided), progress {:.4}",
            record.record_name(),
            state.progress
        );
        Ok(())
    }
}
