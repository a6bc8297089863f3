//! Entry points used by the presentation layer. Every call works on an explicit [Session], the
//! result of rolling the log over to the current day.

pub mod progress;
pub mod rollover;
pub mod view;

use std::path::Path;

use anyhow::{bail, Result};
use chrono::{DateTime, Local, NaiveDate};
use rollover::{DayState, RolloverController};
use tracing::{info, instrument, warn};
use view::{build_view, DayView, ViewContext};

use crate::{
    catalog::{Catalog, TaskKind, TEMPLATE},
    error::TrackerError,
    fs::operations::{read_document, write_document},
    storage::{
        day_store::{DayStore, JsonDayStore},
        day_table::DayTable,
        entities::{DayRecord, Outcome, ProgressState, Section, TaskKey},
        planned::PlannedQueue,
        progress_store::ProgressStore,
    },
    utils::{
        clock::Clock,
        dir::ApplicationPaths,
        time::{date_to_record_name, weekday_name},
    },
};

/// The day the user is working on, as decided by the last rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Local date of the wall clock.
    pub today: NaiveDate,
    /// Date of the record open for changes. Equals `today` unless the clock went backwards.
    pub current: NaiveDate,
    pub state: DayState,
    pub finalized: Vec<NaiveDate>,
}

pub struct Tracker {
    paths: ApplicationPaths,
    store: JsonDayStore,
    planned: PlannedQueue,
    progress: ProgressStore,
}

impl Tracker {
    pub fn new(paths: ApplicationPaths) -> Self {
        Self {
            store: JsonDayStore::new(paths.log()),
            planned: PlannedQueue::new(paths.planned()),
            progress: ProgressStore::new(paths.progress()),
            paths,
        }
    }

    pub fn paths(&self) -> &ApplicationPaths {
        &self.paths
    }

    pub async fn catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.paths.catalog()).await
    }

    /// Writes the template catalog unless the user already has one.
    pub async fn init_catalog(&self) -> Result<bool> {
        let path = self.paths.catalog();
        if read_document(&path).await?.is_some() {
            return Ok(false);
        }
        write_document(&path, TEMPLATE.as_bytes()).await?;
        info!("Wrote template catalog to {path:?}");
        Ok(true)
    }

    /// Where the log stands relative to `today`, without changing anything.
    pub async fn check(&self, today: NaiveDate) -> Result<DayState> {
        // Checking never creates records, so no catalog is needed.
        let catalog = Catalog::default();
        RolloverController::new(&self.store, &catalog, &self.planned, &self.progress)
            .check(today)
            .await
    }

    /// Rolls the log over to the local date of `now`.
    #[instrument(skip_all)]
    pub async fn open(&self, now: DateTime<Local>) -> Result<Session> {
        let today = now.date_naive();
        let catalog = self.catalog().await?;
        let rollover = RolloverController::new(&self.store, &catalog, &self.planned, &self.progress)
            .run(today)
            .await?;
        Ok(Session {
            today,
            current: rollover.current,
            state: rollover.state,
            finalized: rollover.finalized,
        })
    }

    pub async fn render_today(&self, clock: &dyn Clock) -> Result<DayView> {
        let session = self.open(clock.now()).await?;
        self.render_day(&session, None).await
    }

    /// Renders the session's day, or an earlier day read-only when `date` is given.
    pub async fn render_day(&self, session: &Session, date: Option<NaiveDate>) -> Result<DayView> {
        let date = date.unwrap_or(session.current);
        if date > session.current {
            Err(TrackerError::NotFound {
                date: date_to_record_name(date),
            })?
        }
        let catalog = self.catalog().await?;
        let record = self.store.get(date).await?;
        let history = self.store.history_before(date).await?;
        let queued = self.planned.peek().await?;

        Ok(build_view(
            &record,
            ViewContext {
                catalog: &catalog,
                queued: &queued,
                history: &history,
                recorded: self.progress.load().await?,
                state: session.state,
                editable: date == session.current,
            },
        ))
    }

    pub async fn submit_outcome(
        &self,
        session: &Session,
        section: Section,
        task: &str,
        outcome: Outcome,
    ) -> Result<()> {
        if outcome.is_unset() {
            bail!("Use undo to clear an outcome");
        }
        let key = TaskKey::new(section, task);
        let record = self.open_record(session, &key).await?;
        if record.outcome(&key) != Some(Outcome::Unset) {
            Err(TrackerError::AlreadyRecorded { key: key.column() })?
        }
        self.store.set_outcome(record.date, &key, outcome).await?;
        info!("Recorded {key} as {outcome:?}");
        Ok(())
    }

    pub async fn undo_outcome(&self, session: &Session, section: Section, task: &str) -> Result<()> {
        let key = TaskKey::new(section, task);
        let record = self.open_record(session, &key).await?;
        if record.outcome(&key) == Some(Outcome::Unset) {
            Err(TrackerError::NotRecorded { key: key.column() })?
        }
        self.store
            .set_outcome(record.date, &key, Outcome::Unset)
            .await?;
        info!("Cleared {key}");
        Ok(())
    }

    /// Actions a plan objective and replaces tomorrow's planned tasks with `tasks`. Returns the
    /// tasks as they were stored.
    pub async fn submit_plan(
        &self,
        session: &Session,
        section: Section,
        task: &str,
        tasks: &[String],
    ) -> Result<Vec<String>> {
        let key = TaskKey::new(section, task);
        if self.catalog().await?.kind_of(task) != TaskKind::Plan {
            Err(TrackerError::NotAPlan { key: key.column() })?
        }
        self.submit_outcome(session, section, task, Outcome::Actioned)
            .await?;
        self.planned.enqueue(tasks).await
    }

    /// Stores a new catalog. Tasks the new catalog adds for the open day are added to its record,
    /// outcomes already recorded are kept. Returns the number of added tasks.
    pub async fn replace_catalog(&self, session: &Session, bytes: &[u8]) -> Result<usize> {
        let catalog = parse_catalog(bytes)?;
        write_document(&self.paths.catalog(), bytes).await?;

        match self.store.latest().await? {
            Some(latest) if latest.date == session.current => {
                let keys = catalog.tasks_for(&weekday_name(latest.date));
                let added = self.store.add_columns(latest.date, &keys).await?;
                info!("Catalog replaced, {added} new tasks for {}", latest.record_name());
                Ok(added)
            }
            _ => Ok(0),
        }
    }

    /// Stores a catalog from a backup. Without a catalog in place there is no log to extend yet,
    /// otherwise this is [Tracker::replace_catalog] on the day open at `now`.
    pub async fn import_catalog(&self, now: DateTime<Local>, bytes: &[u8]) -> Result<usize> {
        parse_catalog(bytes)?;
        if read_document(&self.paths.catalog()).await?.is_none() {
            write_document(&self.paths.catalog(), bytes).await?;
            info!("Imported the first catalog");
            return Ok(0);
        }
        let session = self.open(now).await?;
        self.replace_catalog(&session, bytes).await
    }

    pub async fn export_log(&self, target: &Path) -> Result<()> {
        let bytes = match read_document(&self.paths.log()).await? {
            Some(bytes) => bytes,
            None => DayTable::default().to_bytes()?,
        };
        tokio::fs::write(target, bytes).await?;
        info!("Exported log to {target:?}");
        Ok(())
    }

    pub async fn export_catalog(&self, target: &Path) -> Result<()> {
        let path = self.paths.catalog();
        let Some(bytes) = read_document(&path).await? else {
            return Err(TrackerError::MissingCatalog {
                path: path.display().to_string(),
            }
            .into());
        };
        tokio::fs::write(target, bytes).await?;
        info!("Exported catalog to {target:?}");
        Ok(())
    }

    /// Replaces the whole log and recomputes the stored progress from it. Every day but the
    /// latest counts as closed. Returns the number of days in the log.
    pub async fn import_log(&self, bytes: &[u8]) -> Result<usize> {
        let table = DayTable::parse(bytes)?;
        if table.is_empty() {
            warn!("Imported log has no days, the next open starts it over");
        }
        self.store.save(&table).await?;

        let records = table.records().collect::<Vec<_>>();
        let closed = records.split_last().map_or(&[][..], |(_, closed)| closed);
        let (value, delta) = progress::compound(closed);
        let state = ProgressState {
            progress: value,
            delta,
            applied_through: closed.last().map(|v| v.date),
        };
        self.progress.save(&state).await?;

        info!(
            "Imported log with {} days, progress {value:.4}",
            records.len()
        );
        Ok(records.len())
    }

    /// The record open for changes, checked to contain `key`.
    async fn open_record(&self, session: &Session, key: &TaskKey) -> Result<DayRecord> {
        let record = match self.store.latest().await? {
            Some(latest) if latest.date == session.current => latest,
            _ => Err(TrackerError::ReadOnlyDay {
                date: date_to_record_name(session.current),
            })?,
        };
        if record.outcome(key).is_none() {
            Err(TrackerError::InvalidKey {
                date: record.record_name(),
                key: key.column(),
            })?
        }
        Ok(record)
    }
}

fn parse_catalog(bytes: &[u8]) -> Result<Catalog> {
    let text = std::str::from_utf8(bytes).map_err(|e| TrackerError::InvalidCatalog {
        message: e.to_string(),
    })?;
    Catalog::parse(text)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Local, NaiveDate, TimeZone};
    use tempfile::{tempdir, TempDir};

    use crate::{
        error::TrackerError,
        storage::entities::{Outcome, Section},
        utils::{clock::MockClock, dir::ApplicationPaths, logging::TEST_LOGGING},
    };

    use super::{rollover::DayState, view::ObjectiveKind, Tracker};

    const CATALOG: &str = r#"
morning = ["stretch"]
evening = ["plan tomorrow"]

[Monday]
general = ["gym"]

[Special]
"plan tomorrow" = ["p"]
"#;

    fn local(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Local> {
        Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(year, month, day)
                    .unwrap()
                    .and_hms_opt(hour, 0, 0)
                    .unwrap(),
            )
            .earliest()
            .unwrap()
    }

    fn setup(catalog: &str) -> Result<(TempDir, Tracker)> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let tracker = Tracker::new(ApplicationPaths::new(dir.path().to_path_buf()));
        std::fs::write(tracker.paths().catalog(), catalog)?;
        Ok((dir, tracker))
    }

    fn error_of(err: &anyhow::Error) -> Option<&TrackerError> {
        err.downcast_ref::<TrackerError>()
    }

    #[tokio::test]
    async fn test_render_today_with_clock() -> Result<()> {
        let (_dir, tracker) = setup(CATALOG)?;
        let mut clock = MockClock::new();
        // 1st of January 2024 is a Monday.
        clock.expect_now().returning(|| local(2024, 1, 1, 9));

        let view = tracker.render_today(&clock).await?;
        assert_eq!(view.state, DayState::Initial);
        assert_eq!(view.weekday, "Monday");
        assert_eq!(view.sections[&Section::General][0].name, "gym");
        assert_eq!(view.score.total, 3);
        assert!(view.editable);

        let view = tracker.render_today(&clock).await?;
        assert_eq!(view.state, DayState::SameDay);
        Ok(())
    }

    #[tokio::test]
    async fn test_outcome_transitions() -> Result<()> {
        let (_dir, tracker) = setup(CATALOG)?;
        let session = tracker.open(local(2024, 1, 1, 9)).await?;

        tracker
            .submit_outcome(&session, Section::Morning, "stretch", Outcome::Actioned)
            .await?;
        let err = tracker
            .submit_outcome(&session, Section::Morning, "stretch", Outcome::Avoided)
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::AlreadyRecorded { .. })));

        tracker
            .undo_outcome(&session, Section::Morning, "stretch")
            .await?;
        let err = tracker
            .undo_outcome(&session, Section::Morning, "stretch")
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::NotRecorded { .. })));

        let err = tracker
            .submit_outcome(&session, Section::Food, "salad", Outcome::Actioned)
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::InvalidKey { .. })));

        tracker
            .submit_outcome(&session, Section::Morning, "stretch", Outcome::Undoable)
            .await?;
        let view = tracker.render_day(&session, None).await?;
        assert_eq!(view.sections[&Section::Morning][0].outcome, Outcome::Undoable);
        Ok(())
    }

    #[tokio::test]
    async fn test_plan_flows_into_tomorrow() -> Result<()> {
        let (_dir, tracker) = setup(CATALOG)?;
        let monday = tracker.open(local(2024, 1, 1, 20)).await?;

        let err = tracker
            .submit_plan(&monday, Section::Morning, "stretch", &["x".into()])
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::NotAPlan { .. })));

        let planned = tracker
            .submit_plan(
                &monday,
                Section::Evening,
                "plan tomorrow",
                &["buy milk".into(), "buy milk".into(), "call mum".into()],
            )
            .await?;
        assert_eq!(planned.len(), 2);

        let view = tracker.render_day(&monday, None).await?;
        let plan = &view.sections[&Section::Evening][0];
        assert_eq!(plan.outcome, Outcome::Actioned);
        assert!(matches!(&plan.kind, ObjectiveKind::Plan { queued } if queued.len() == 2));

        let tuesday = tracker.open(local(2024, 1, 2, 8)).await?;
        assert_eq!(tuesday.state, DayState::DifferentDay);
        let view = tracker.render_day(&tuesday, None).await?;
        let mut names = view.sections[&Section::Planned]
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["buy milk", "call mum"]);
        assert!(view.sections[&Section::General].is_empty());

        // Monday: stretch defaulted to avoided, gym avoided, plan actioned.
        let expected = 1. + 0.01 * (-1. / 3.);
        assert!((view.progress.start.0 - expected).abs() < 1e-12);
        assert!((view.progress.recorded.progress - expected).abs() < 1e-12);

        let err = tracker
            .submit_outcome(&monday, Section::Morning, "stretch", Outcome::Actioned)
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::ReadOnlyDay { .. })));

        let past = tracker
            .render_day(&tuesday, Some(monday.current))
            .await?;
        assert!(!past.editable);
        assert_eq!(past.progress.start, (1., 0.));
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_catalog_keeps_outcomes() -> Result<()> {
        let (_dir, tracker) = setup(CATALOG)?;
        let session = tracker.open(local(2024, 1, 1, 9)).await?;
        tracker
            .submit_outcome(&session, Section::Morning, "stretch", Outcome::Actioned)
            .await?;

        let added = tracker
            .replace_catalog(&session, br#"morning = ["stretch", "meditate"]"#)
            .await?;
        assert_eq!(added, 1);

        let view = tracker.render_day(&session, None).await?;
        let morning = &view.sections[&Section::Morning];
        assert_eq!(morning[0].outcome, Outcome::Actioned);
        assert_eq!(morning[1].name, "meditate");
        assert_eq!(morning[1].outcome, Outcome::Unset);
        // Tasks the new catalog dropped stay on the day they were created for.
        assert_eq!(view.score.total, 4);

        let err = tracker
            .replace_catalog(&session, b"morning = 3")
            .await
            .unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::InvalidCatalog { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_catalog() -> Result<()> {
        let dir = tempdir()?;
        let tracker = Tracker::new(ApplicationPaths::new(dir.path().to_path_buf()));
        let err = tracker.open(local(2024, 1, 1, 9)).await.unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::MissingCatalog { .. })));
        assert_eq!(tracker.check(local(2024, 1, 1, 9).date_naive()).await?, DayState::Initial);

        assert!(tracker.init_catalog().await?);
        assert!(!tracker.init_catalog().await?);
        tracker.open(local(2024, 1, 1, 9)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_import_catalog() -> Result<()> {
        let dir = tempdir()?;
        let tracker = Tracker::new(ApplicationPaths::new(dir.path().to_path_buf()));
        let monday = local(2024, 1, 1, 9);

        assert_eq!(tracker.import_catalog(monday, CATALOG.as_bytes()).await?, 0);
        let session = tracker.open(monday).await?;
        assert_eq!(tracker.render_day(&session, None).await?.score.total, 3);

        let updated = CATALOG.replace(r#"general = ["gym"]"#, r#"general = ["gym", "swim"]"#);
        assert_eq!(tracker.import_catalog(monday, updated.as_bytes()).await?, 1);

        let view = tracker.render_day(&session, None).await?;
        assert_eq!(view.sections[&Section::General][1].name, "swim");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_log_rebuilds_progress() -> Result<()> {
        let (dir, tracker) = setup(CATALOG)?;
        tracker.open(local(2024, 1, 1, 9)).await?;
        tracker.open(local(2024, 1, 3, 9)).await?;
        let backup = dir.path().join("backup.json");
        tracker.export_log(&backup).await?;
        let bytes = std::fs::read(&backup)?;
        let exported = tracker.progress.load().await?;

        // Into a fresh directory: the two closed days count, the open one doesn't yet.
        let (_other_dir, other) = setup(CATALOG)?;
        other.import_log(&bytes).await?;
        let imported = other.progress.load().await?;
        assert!((imported.progress - 0.99f64.powi(2)).abs() < 1e-12);
        assert!((imported.progress - exported.progress).abs() < 1e-12);
        assert!((imported.delta + 0.01).abs() < 1e-12);
        assert_eq!(imported.applied_through, NaiveDate::from_ymd_opt(2024, 1, 2));

        other.open(local(2024, 1, 4, 9)).await?;
        let recorded = other.progress.load().await?;
        assert!((recorded.progress - 0.99f64.powi(3)).abs() < 1e-12);

        // Over newer state: days after the backup are closed again and counted once.
        tracker.open(local(2024, 1, 6, 9)).await?;
        tracker.import_log(&bytes).await?;
        let session = tracker.open(local(2024, 1, 4, 9)).await?;
        assert_eq!(session.finalized, vec![NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()]);
        let view = tracker.render_day(&session, None).await?;
        assert!((view.progress.recorded.progress - view.progress.start.0).abs() < 1e-12);
        assert!((view.progress.start.0 - 0.99f64.powi(3)).abs() < 1e-12);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_and_import_log() -> Result<()> {
        let (dir, tracker) = setup(CATALOG)?;
        let session = tracker.open(local(2024, 1, 1, 9)).await?;
        tracker.open(local(2024, 1, 3, 9)).await?;

        let backup = dir.path().join("backup.json");
        tracker.export_log(&backup).await?;
        let bytes = std::fs::read(&backup)?;

        let (_other_dir, other) = setup(CATALOG)?;
        assert_eq!(other.import_log(&bytes).await?, 3);
        let view = other.render_day(&session, None).await?;
        assert_eq!(view.score.score, -3);

        let err = other.import_log(b"{\"rows\": 1}").await.unwrap_err();
        assert!(matches!(error_of(&err), Some(TrackerError::InvalidTable { .. })));
        Ok(())
    }
}
