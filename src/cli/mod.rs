pub mod output;

use std::{fmt::Display, path::PathBuf, time::Duration};

use anyhow::Result;
use chrono::Local;
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::{
    gate::PasswordGate,
    storage::entities::{Outcome, Section},
    tracker::Tracker,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir, ApplicationPaths},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "day-tracker", version, long_about = None)]
#[command(about = "Tracks daily habits and compounds them into a progress index", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        env = "DAY_TRACKER_PASSWORD",
        hide_env_values = true,
        help = "Password from secrets.toml, if one is configured"
    )]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Writes a template catalog unless one exists")]
    Init {},
    #[command(about = "Rolls the log over to today and shows the day")]
    Show {
        #[arg(
            long,
            help = "Show an earlier day read-only. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
        )]
        day: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Tells whether a rollover is pending without changing anything")]
    Status {},
    #[command(about = "Records an outcome for one of today's tasks")]
    Set {
        section: Section,
        task: String,
        outcome: Mark,
    },
    #[command(about = "Clears the outcome of one of today's tasks")]
    Undo { section: Section, task: String },
    #[command(about = "Actions a plan task and sets the tasks planned for tomorrow")]
    Plan {
        section: Section,
        task: String,
        items: Vec<String>,
    },
    #[command(about = "Copies the log or the catalog to PATH")]
    Export { document: Document, path: PathBuf },
    #[command(about = "Replaces the log or the catalog with the contents of PATH")]
    Import { document: Document, path: PathBuf },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Outcomes that can be set by hand.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mark {
    Actioned,
    Undoable,
    Avoided,
}

impl From<Mark> for Outcome {
    fn from(value: Mark) -> Self {
        match value {
            Mark::Actioned => Outcome::Actioned,
            Mark::Undoable => Outcome::Undoable,
            Mark::Avoided => Outcome::Avoided,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Document {
    Log,
    Catalog,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;

    let paths = ApplicationPaths::new(dir);
    let gate = PasswordGate::load(&paths.secrets()).await?;
    if !gate.verify(args.password.as_deref()) {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                "Wrong or missing password",
            )
            .into());
    }

    process_command(args.commands, &Tracker::new(paths), &DefaultClock).await
}

async fn process_command(commands: Commands, tracker: &Tracker, clock: &dyn Clock) -> Result<()> {
    match commands {
        Commands::Init {} => {
            let path = tracker.paths().catalog();
            if tracker.init_catalog().await? {
                println!("Wrote a template catalog to {}", path.display());
            } else {
                println!("A catalog already exists at {}", path.display());
            }
        }
        Commands::Show {
            day: None,
            date_style: _,
        } => {
            print!("{}", output::render_view(&tracker.render_today(clock).await?));
        }
        Commands::Show {
            day: Some(day),
            date_style,
        } => {
            let now = clock.now();
            let date = match parse_date_string(&day, now, date_style.into()) {
                Ok(v) => v.with_timezone(&Local).date_naive(),
                Err(e) => {
                    return Err(Args::command()
                        .error(
                            clap::error::ErrorKind::ValueValidation,
                            format!("Failed to validate day {e}"),
                        )
                        .into());
                }
            };
            let session = tracker.open(now).await?;
            print!(
                "{}",
                output::render_view(&tracker.render_day(&session, Some(date)).await?)
            );
        }
        Commands::Status {} => {
            let state = tracker.check(clock.now().date_naive()).await?;
            println!("{}", output::state_line(state));
        }
        Commands::Set {
            section,
            task,
            outcome,
        } => {
            let session = tracker.open(clock.now()).await?;
            tracker
                .submit_outcome(&session, section, &task, outcome.into())
                .await?;
            print!(
                "{}",
                output::render_view(&tracker.render_day(&session, None).await?)
            );
        }
        Commands::Undo { section, task } => {
            let session = tracker.open(clock.now()).await?;
            tracker.undo_outcome(&session, section, &task).await?;
            print!(
                "{}",
                output::render_view(&tracker.render_day(&session, None).await?)
            );
        }
        Commands::Plan {
            section,
            task,
            items,
        } => {
            let session = tracker.open(clock.now()).await?;
            let planned = tracker.submit_plan(&session, section, &task, &items).await?;
            print!("{}", output::render_planned(&planned));
        }
        Commands::Export { document, path } => {
            println!("Generating log");
            clock.sleep(Duration::from_secs(1)).await;
            match document {
                Document::Log => tracker.export_log(&path).await?,
                Document::Catalog => tracker.export_catalog(&path).await?,
            }
            println!("Saved to {}", path.display());
        }
        Commands::Import { document, path } => {
            let bytes = tokio::fs::read(&path).await?;
            match document {
                Document::Log => {
                    let days = tracker.import_log(&bytes).await?;
                    println!("Imported {days} days");
                }
                Document::Catalog => {
                    let added = tracker.import_catalog(clock.now(), &bytes).await?;
                    println!("Imported the catalog, {added} tasks added to today");
                }
            }
        }
    }
    Ok(())
}
