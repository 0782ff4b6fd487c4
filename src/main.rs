//! dayplan CLI — thin shell over the command surface.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use dayplan::commands;
use dayplan::error::PlannerError;
use dayplan::Workspace;

#[derive(Parser)]
#[command(name = "dayplan", version, about = "Local-first daily planning engine")]
struct Cli {
    /// Workspace root (contains planner/ and reflections/)
    #[arg(long, global = true, env = "PLANNER_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Scaffold a new workspace
    Init,
    /// Generate a plan using the scheduler
    Generate {
        /// Target date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the end-of-day finalization
    Finalize,
    /// List tasks with urgency scores
    Tasks,
    /// Show the analytics summary
    Analytics,
    /// Focus session management
    Focus {
        #[command(subcommand)]
        action: Option<FocusCommand>,
    },
}

#[derive(Subcommand)]
enum FocusCommand {
    /// Start a focus session
    Start {
        task_id: Option<String>,
        label: Option<String>,
        minutes: Option<u32>,
    },
    /// Stop the active focus session
    Stop {
        #[arg(long)]
        completed: bool,
    },
    /// Record an interruption on the active session
    Interrupt,
}

fn main() {
    // Our crate at info level by default; override with RUST_LOG.
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("dayplan=info,warn"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    let ws = cli
        .root
        .map(Workspace::at)
        .unwrap_or_else(Workspace::resolve);

    if let Err(e) = run(&ws, cli.command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(ws: &Workspace, command: Option<Command>) -> dayplan::Result<()> {
    if let Some(Command::Init) = command {
        commands::init_workspace(ws)?;
        println!("Workspace ready at {}", ws.root().display());
        return Ok(());
    }

    if !ws.exists() {
        return Err(PlannerError::NotFound(format!(
            "workspace not found: {} (set PLANNER_ROOT or run `dayplan init`)",
            ws.root().display()
        )));
    }

    match command {
        // handled before the workspace-exists gate
        Some(Command::Init) => {}
        Some(Command::Generate { date }) => {
            let target = match date {
                Some(raw) => Some(
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                        .map_err(|_| PlannerError::validation(format!("Invalid date: {}", raw)))?,
                ),
                None => None,
            };
            let plan_md = commands::plan::generate_plan(ws, target)?;
            println!("{}", plan_md);
        }
        Some(Command::Finalize) => {
            let report = commands::checkin::finalize_day(ws)?;
            if !report.ok {
                println!(
                    "Cannot finalize: {}",
                    report.reason.as_deref().unwrap_or("unknown")
                );
                process::exit(1);
            }
            let day = report.day.as_deref().unwrap_or("-");
            if report.already_finalized == Some(true) {
                println!("Already finalized for {}.", day);
            } else {
                println!(
                    "Finalized! Rating: {}, Streak: {}",
                    report.rating.as_deref().unwrap_or("-").to_uppercase(),
                    report.streak.unwrap_or(0)
                );
                if !report.task_updates.is_empty() {
                    println!("Task updates: {}", report.task_updates.join(", "));
                }
            }
        }
        Some(Command::Tasks) => {
            for task in commands::tasks::list_tasks(ws)? {
                println!(
                    "  [{:>8}] {:<25} {:<30} pri={} urgency={:.1}",
                    task["status"].as_str().unwrap_or("-"),
                    task["id"].as_str().unwrap_or("-"),
                    task["title"].as_str().unwrap_or("-"),
                    task["priority"].as_i64().unwrap_or(0),
                    task["urgency_score"].as_f64().unwrap_or(0.0),
                );
            }
        }
        Some(Command::Analytics) => {
            let summary = commands::insights::refresh_analytics(ws)?;
            println!("Days tracked: {}", summary.total_days_tracked);
            println!("7-day avg: {:.1}%", summary.rolling_7day_avg * 100.0);
            println!("30-day avg: {:.1}%", summary.rolling_30day_avg * 100.0);
            println!(
                "Recovery success rate: {:.1}%",
                summary.recovery_success_rate * 100.0
            );
            if !summary.completion_by_weekday.is_empty() {
                println!("\nCompletion by weekday:");
                for (day, rate) in &summary.completion_by_weekday {
                    println!("  {}: {:.1}%", day, rate * 100.0);
                }
            }
            if !summary.most_skipped_tasks.is_empty() {
                println!("\nMost skipped: {}", summary.most_skipped_tasks.join(", "));
            }
        }
        Some(Command::Focus { action }) => run_focus(ws, action)?,
        None => {
            print!("{}", commands::status::status_summary(ws)?);
        }
    }
    Ok(())
}

fn run_focus(ws: &Workspace, action: Option<FocusCommand>) -> dayplan::Result<()> {
    match action {
        None => {
            match commands::focus::focus_current(ws)? {
                Some(session) => {
                    println!(
                        "Active focus: {} (started {})",
                        session.task_label, session.started_at
                    );
                    println!(
                        "  Planned: {}min, Interruptions: {}",
                        session.planned_minutes, session.interruptions
                    );
                }
                None => println!("No active focus session."),
            }
            let stats = commands::focus::focus_stats(ws, 7)?;
            println!(
                "\n7-day stats: {} sessions, {:.0}min total",
                stats.total_sessions, stats.total_minutes
            );
        }
        Some(FocusCommand::Start {
            task_id,
            label,
            minutes,
        }) => {
            let task_id = task_id.unwrap_or_else(|| "manual".to_string());
            let label = label.unwrap_or_else(|| task_id.clone());
            let minutes = minutes.unwrap_or(25);
            commands::focus::focus_start(ws, &task_id, &label, minutes)?;
            println!("Focus started: {} ({}min)", label, minutes);
        }
        Some(FocusCommand::Stop { completed }) => {
            let session = commands::focus::focus_stop(ws, completed, "")?;
            println!("Focus stopped: {:.1}min elapsed", session.elapsed_minutes);
        }
        Some(FocusCommand::Interrupt) => match commands::focus::focus_interrupt(ws)? {
            Some(session) => println!("Interruption recorded ({} total)", session.interruptions),
            None => println!("No active session."),
        },
    }
    Ok(())
}
