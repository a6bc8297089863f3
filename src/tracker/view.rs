use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    catalog::{Catalog, TaskKind},
    storage::entities::{DayRecord, Outcome, ProgressState, Section},
    utils::time::weekday_name,
};

use super::{progress, rollover::DayState};

/// Everything the presentation layer needs to draw one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayView {
    pub date: NaiveDate,
    pub weekday: String,
    pub state: DayState,
    /// False for days that were already rolled over.
    pub editable: bool,
    /// Every section is present, sections without tasks are empty.
    pub sections: BTreeMap<Section, Vec<TaskView>>,
    pub score: ScoreInfo,
    pub progress: ProgressInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskView {
    pub name: String,
    pub outcome: Outcome,
    pub kind: ObjectiveKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectiveKind {
    Plain,
    Note(String),
    /// `queued` is what is currently planned for tomorrow.
    Plan { queued: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreInfo {
    pub score: i64,
    pub total: usize,
    pub colour: (u8, u8, u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// `(progress, delta)` compounded from every day before this one.
    pub start: (f64, f64),
    /// `(progress, delta)` if the day ended now.
    pub end_of_day: (f64, f64),
    /// What the rollovers have stored so far.
    pub recorded: ProgressState,
}

pub struct ViewContext<'a> {
    pub catalog: &'a Catalog,
    pub queued: &'a [String],
    pub history: &'a [DayRecord],
    pub recorded: ProgressState,
    pub state: DayState,
    pub editable: bool,
}

/// Reshapes a flat record into sections of objectives.
pub fn build_view(record: &DayRecord, context: ViewContext<'_>) -> DayView {
    let mut sections = Section::CREATION_ORDER
        .into_iter()
        .map(|v| (v, Vec::new()))
        .collect::<BTreeMap<_, _>>();

    for (key, outcome) in &record.cells {
        let kind = match context.catalog.kind_of(&key.name) {
            TaskKind::Plain => ObjectiveKind::Plain,
            TaskKind::Note(text) => ObjectiveKind::Note(text),
            TaskKind::Plan => ObjectiveKind::Plan {
                queued: context.queued.to_vec(),
            },
        };
        sections.entry(key.section).or_default().push(TaskView {
            name: key.name.clone(),
            outcome: *outcome,
            kind,
        });
    }

    let score = progress::score(record);
    let total = progress::total(record);
    let start = progress::compound(context.history);

    DayView {
        date: record.date,
        weekday: weekday_name(record.date),
        state: context.state,
        editable: context.editable,
        sections,
        score: ScoreInfo {
            score,
            total,
            colour: progress::score_colour(score, total),
        },
        progress: ProgressInfo {
            start,
            end_of_day: progress::end_of_day(start.0, record),
            recorded: context.recorded,
        },
    }
}
