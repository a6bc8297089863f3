//! Plain text rendering of the views for the terminal.

use std::fmt::Write;

use ansi_term::{Colour, Style};

use crate::{
    storage::entities::Outcome,
    tracker::{
        rollover::DayState,
        view::{DayView, ObjectiveKind, TaskView},
    },
    utils::{
        percentage::{ratio_percentage, Percentage},
        time::date_to_record_name,
    },
};

/// Progress grows without bound, past 10x a multiplier reads better than a percentage.
const MULTIPLIER_THRESHOLD: f64 = 10.;

pub fn render_view(view: &DayView) -> String {
    let mut out = String::new();
    let read_only = if view.editable { "" } else { " (read-only)" };
    let _ = writeln!(
        out,
        "{} {}{read_only}",
        Style::new().bold().paint(&view.weekday),
        date_to_record_name(view.date)
    );

    for (section, tasks) in &view.sections {
        if tasks.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{}", Style::new().underline().paint(section.as_str()));
        for task in tasks {
            out.push_str(&render_task(task));
        }
    }

    let (r, g, b) = view.score.colour;
    let _ = writeln!(
        out,
        "\n{}",
        Colour::RGB(r, g, b).paint(format!(
            "Score {}/{} ({})",
            view.score.score,
            view.score.total,
            ratio_percentage(view.score.score, view.score.total)
        ))
    );
    let (start, delta) = view.progress.start;
    let _ = writeln!(
        out,
        "Progress {} (last day {})",
        value_as_string(start),
        delta_as_string(delta)
    );
    let (end, delta) = view.progress.end_of_day;
    let _ = writeln!(
        out,
        "End of day {} ({})",
        value_as_string(end),
        delta_as_string(delta)
    );
    if let Some(through) = view.progress.recorded.applied_through {
        let _ = writeln!(
            out,
            "Saved progress {} (through {})",
            value_as_string(view.progress.recorded.progress),
            date_to_record_name(through)
        );
    }
    out
}

pub fn render_planned(planned: &[String]) -> String {
    if planned.is_empty() {
        return "Nothing planned for tomorrow\n".into();
    }
    let mut out = String::from("Planned for tomorrow:\n");
    for task in planned {
        let _ = writeln!(out, "  {task}");
    }
    out
}

pub fn state_line(state: DayState) -> &'static str {
    match state {
        DayState::Initial => "Nothing recorded yet, `show` starts the log",
        DayState::SameDay => "Today's record is open",
        DayState::DifferentDay => "A new day started, `show` rolls the log over",
    }
}

fn render_task(task: &TaskView) -> String {
    match &task.kind {
        ObjectiveKind::Plain => render_plain(task),
        ObjectiveKind::Note(text) => render_note(task, text),
        ObjectiveKind::Plan { queued } => render_plan(task, queued),
    }
}

fn render_plain(task: &TaskView) -> String {
    format!("  {} {}\n", outcome_mark(task.outcome), task.name)
}

fn render_note(task: &TaskView, text: &str) -> String {
    format!(
        "  {} {}\n      {}\n",
        outcome_mark(task.outcome),
        task.name,
        Style::new().italic().paint(text)
    )
}

fn render_plan(task: &TaskView, queued: &[String]) -> String {
    let mut out = render_plain(task);
    for item in queued {
        let _ = writeln!(out, "      > {item}");
    }
    out
}

fn outcome_mark(outcome: Outcome) -> String {
    match outcome {
        Outcome::Unset => "[ ]".to_string(),
        Outcome::Actioned => Colour::Green.paint("[+]").to_string(),
        Outcome::Undoable => Colour::Yellow.paint("[~]").to_string(),
        Outcome::Avoided => Colour::Red.paint("[-]").to_string(),
    }
}

fn value_as_string(value: f64) -> String {
    if value > MULTIPLIER_THRESHOLD {
        format!("{value:.2}x")
    } else {
        Percentage::from_fraction(value).to_string()
    }
}

fn delta_as_string(delta: f64) -> String {
    let delta = Percentage::from_fraction(delta);
    if *delta > 0. {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}
