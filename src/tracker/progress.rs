//! Turns day records into scores and the compounding progress index.
//!
//! Every finished day multiplies progress by `1 + 0.01 * score / total`, so a perfect day adds
//! 1% and a day where everything was avoided takes 1% away.

use tracing::debug;

use crate::storage::entities::{DayRecord, ProgressState};

/// Sum of all recorded outcomes. Unset tasks count for nothing.
pub fn score(record: &DayRecord) -> i64 {
    record.cells.iter().filter_map(|(_, v)| v.value()).sum()
}

/// Number of tasks that existed on that day.
pub fn total(record: &DayRecord) -> usize {
    record.cells.len()
}

/// A day without tasks neither helps nor hurts.
pub fn day_multiplier(record: &DayRecord) -> f64 {
    let total = total(record);
    if total == 0 {
        return 1.;
    }
    1. + 0.01 * (score(record) as f64 / total as f64)
}

/// Compounds `records` into `(progress, last_delta)`. `records` should be every day before the
/// one being looked at, oldest first.
pub fn compound<'a>(records: impl IntoIterator<Item = &'a DayRecord>) -> (f64, f64) {
    let multipliers = records.into_iter().map(day_multiplier).collect::<Vec<_>>();
    let Some(last) = multipliers.last() else {
        return (1., 0.);
    };
    (multipliers.iter().product(), last - 1.)
}

/// Folds a finished day into the stored progress.
pub fn apply(state: &mut ProgressState, record: &DayRecord) {
    let multiplier = day_multiplier(record);
    state.progress *= multiplier;
    state.delta = multiplier - 1.;
    state.applied_through = Some(record.date);
    debug!(
        "Applied {} with multiplier {multiplier}, progress is now {}",
        record.record_name(),
        state.progress
    );
}

/// What progress will be at the end of the day if the record stays as it is.
pub fn end_of_day(start: f64, record: &DayRecord) -> (f64, f64) {
    let multiplier = day_multiplier(record);
    (start * multiplier, multiplier - 1.)
}

/// Highlight colour for a score: green when positive, red when negative, yellow in between.
/// The further the score from 0, the purer the colour.
pub fn score_colour(score: i64, total: usize) -> (u8, u8, u8) {
    if total == 0 {
        return (255, 255, 0);
    }
    let fade = |v: i64| ((1. - v as f64 / total as f64) * 255.).ceil().clamp(0., 255.) as u8;
    match score {
        s if s > 0 => (fade(s), 255, 0),
        s if s < 0 => (255, fade(-s), 0),
        _ => (255, 255, 0),
    }
}
