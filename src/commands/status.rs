//! Read-only views: profile, state, and the one-screen status summary
//! the bare CLI invocation prints.

use std::fmt::Write;

use crate::checkbox;
use crate::error::Result;
use crate::focus;
use crate::models::{Profile, State};
use crate::storage::{plan as plan_store, profile as profile_store, state as state_store};
use crate::workspace::Workspace;

pub fn get_profile(ws: &Workspace) -> Result<Profile> {
    profile_store::load_profile(ws)
}

pub fn get_state(ws: &Workspace) -> Result<State> {
    state_store::load_state(ws)
}

/// Human-readable snapshot of today: streak, last finalization, plan
/// checkbox progress, and the active focus session.
pub fn status_summary(ws: &Workspace) -> Result<String> {
    let state = get_state(ws)?;
    let plan = plan_store::read_plan(ws)?;
    let boxes = checkbox::extract_checkboxes(&plan);
    let done = boxes.iter().filter(|b| b.checked).count();
    let active = focus::active_session(ws)?;

    let mut out = String::new();
    let _ = writeln!(out, "Today: {}", ws.today_str());
    let _ = writeln!(out, "Streak: {} day(s)", state.streak);
    if let Some(rating) = &state.last_rating {
        let _ = writeln!(
            out,
            "Last finalized: {} ({})",
            state.last_finalized_date.as_deref().unwrap_or("-"),
            rating
        );
    }
    if plan.trim().is_empty() {
        let _ = writeln!(out, "Plan: none yet (run `dayplan generate`)");
    } else {
        let _ = writeln!(out, "Plan: {}/{} checkboxes done", done, boxes.len());
    }
    match active {
        Some(session) => {
            let _ = writeln!(
                out,
                "Focus: {} (started {}, {} interruption(s))",
                session.task_label, session.started_at, session.interruptions
            );
        }
        None => {
            let _ = writeln!(out, "Focus: idle");
        }
    }
    Ok(out)
}
