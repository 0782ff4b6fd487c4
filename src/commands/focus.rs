//! Focus session operations, with lifecycle hooks around the state
//! transitions.

use serde_json::json;

use crate::error::Result;
use crate::focus;
use crate::hooks;
use crate::models::FocusSession;
use crate::workspace::Workspace;

pub fn focus_start(
    ws: &Workspace,
    task_id: &str,
    task_label: &str,
    planned_minutes: u32,
) -> Result<FocusSession> {
    let session = focus::start_session(ws, task_id, task_label, planned_minutes, ws.now())?;
    hooks::run_hooks(
        ws,
        "on_focus_start",
        &json!({
            "task_id": session.task_id,
            "task_label": session.task_label,
            "planned_minutes": session.planned_minutes,
        }),
    );
    Ok(session)
}

pub fn focus_stop(ws: &Workspace, completed: bool, notes: &str) -> Result<FocusSession> {
    let session = focus::stop_session(ws, completed, notes, ws.now())?;
    hooks::run_hooks(
        ws,
        "on_focus_stop",
        &json!({
            "task_id": session.task_id,
            "elapsed_minutes": session.elapsed_minutes,
            "completed": session.completed,
        }),
    );
    Ok(session)
}

pub fn focus_interrupt(ws: &Workspace) -> Result<Option<FocusSession>> {
    focus::record_interruption(ws)
}

pub fn focus_current(ws: &Workspace) -> Result<Option<FocusSession>> {
    focus::active_session(ws)
}

pub fn focus_stats(ws: &Workspace, days: i64) -> Result<focus::FocusStats> {
    focus::focus_stats(ws, days, ws.now())
}
