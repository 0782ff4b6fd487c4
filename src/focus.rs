//! Focus sessions: a single-active-session state machine with
//! interruption tracking and automatic task progress logging.
//!
//! Storage: `<root>/planner/latest/focus.json`.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{PlannerError, Result};
use crate::models::{round_dp, FocusSession, FocusState};
use crate::storage::{self, tasks as task_store};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FocusStats {
    pub total_sessions: u32,
    pub total_minutes: f64,
    pub avg_session_minutes: f64,
    pub total_interruptions: u32,
    pub completion_rate: f64,
}

pub fn load_focus_state(ws: &Workspace) -> Result<FocusState> {
    storage::read_json(&ws.focus_path())
}

fn save_focus_state(ws: &Workspace, state: &FocusState) -> Result<()> {
    storage::write_json_atomic(&ws.focus_path(), state)
}

/// Start a session. Fails with a conflict while one is active.
pub fn start_session(
    ws: &Workspace,
    task_id: &str,
    task_label: &str,
    planned_minutes: u32,
    now: DateTime<Tz>,
) -> Result<FocusSession> {
    let mut state = load_focus_state(ws)?;
    if state.active_session.is_some() {
        return Err(PlannerError::Conflict(
            "A focus session is already active. Stop it first.".to_string(),
        ));
    }

    let session = FocusSession {
        task_id: task_id.to_string(),
        task_label: task_label.to_string(),
        started_at: now.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        planned_minutes,
        ..FocusSession::default()
    };
    state.active_session = Some(session.clone());
    save_focus_state(ws, &state)?;
    log::info!("[focus] started: {} ({}min)", task_label, planned_minutes);
    Ok(session)
}

/// Stop the active session, push it to history, and best-effort credit
/// the elapsed minutes to the matching task.
pub fn stop_session(
    ws: &Workspace,
    completed: bool,
    notes: &str,
    now: DateTime<Tz>,
) -> Result<FocusSession> {
    let mut state = load_focus_state(ws)?;
    let mut session = state
        .active_session
        .take()
        .ok_or_else(|| PlannerError::NotFound("No active focus session to stop.".to_string()))?;

    session.ended_at = Some(now.format("%Y-%m-%dT%H:%M:%S%:z").to_string());
    session.completed = completed;
    session.notes = notes.to_string();
    session.elapsed_minutes = match DateTime::parse_from_rfc3339(&session.started_at) {
        Ok(start) => {
            let elapsed = (now.with_timezone(&Utc) - start.with_timezone(&Utc)).num_seconds()
                as f64
                / 60.0;
            round_dp(elapsed, 1)
        }
        Err(_) => 0.0,
    };

    state.history.push(session.clone());
    save_focus_state(ws, &state)?;

    // Auto-log progress; a failure here must not lose the session.
    if session.elapsed_minutes > 0.0 {
        if let Err(e) = log_session_progress(ws, &session) {
            log::warn!("[focus] progress auto-log failed: {}", e);
        }
    }

    log::info!(
        "[focus] stopped: {} ({:.1}min elapsed)",
        session.task_label,
        session.elapsed_minutes
    );
    Ok(session)
}

fn log_session_progress(ws: &Workspace, session: &FocusSession) -> Result<()> {
    let mut tasks_file = task_store::load_tasks(ws)?;
    let Some(idx) = tasks_file
        .tasks
        .iter()
        .position(|t| t.id == session.task_id)
    else {
        return Ok(());
    };
    task_store::update_task_progress(
        &mut tasks_file.tasks[idx],
        session.elapsed_minutes.round() as u32,
    );
    task_store::save_tasks(ws, &tasks_file)
}

/// Bump the interruption counter on the active session. Idle is a
/// no-op returning None.
pub fn record_interruption(ws: &Workspace) -> Result<Option<FocusSession>> {
    let mut state = load_focus_state(ws)?;
    let Some(session) = state.active_session.as_mut() else {
        return Ok(None);
    };
    session.interruptions += 1;
    let snapshot = session.clone();
    save_focus_state(ws, &state)?;
    Ok(Some(snapshot))
}

pub fn active_session(ws: &Workspace) -> Result<Option<FocusSession>> {
    Ok(load_focus_state(ws)?.active_session)
}

/// Session statistics over the last `days` days.
pub fn focus_stats(ws: &Workspace, days: i64, now: DateTime<Tz>) -> Result<FocusStats> {
    let state = load_focus_state(ws)?;
    if state.history.is_empty() {
        return Ok(FocusStats::default());
    }

    let cutoff = (now - Duration::days(days))
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string();
    let recent: Vec<&FocusSession> = state
        .history
        .iter()
        .filter(|s| s.started_at.as_str() >= cutoff.as_str())
        .collect();
    if recent.is_empty() {
        return Ok(FocusStats::default());
    }

    let total_minutes: f64 = recent.iter().map(|s| s.elapsed_minutes).sum();
    let completed = recent.iter().filter(|s| s.completed).count();

    Ok(FocusStats {
        total_sessions: recent.len() as u32,
        total_minutes: round_dp(total_minutes, 1),
        avg_session_minutes: round_dp(total_minutes / recent.len() as f64, 1),
        total_interruptions: recent.iter().map(|s| s.interruptions).sum(),
        completion_rate: round_dp(completed as f64 / recent.len() as f64, 3),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now_at(hour: u32, minute: u32) -> DateTime<Tz> {
        chrono_tz::UTC
            .with_ymd_and_hms(2026, 2, 11, hour, minute, 0)
            .unwrap()
    }

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        (tmp, ws)
    }

    #[test]
    fn start_records_active_session() {
        let (_tmp, ws) = workspace();
        let session = start_session(&ws, "task-1", "My Task", 25, now_at(10, 0)).unwrap();
        assert_eq!(session.task_id, "task-1");
        assert_eq!(session.planned_minutes, 25);

        let active = active_session(&ws).unwrap().unwrap();
        assert_eq!(active.task_id, "task-1");
        assert_eq!(active.started_at, "2026-02-11T10:00:00+00:00");
    }

    #[test]
    fn second_start_conflicts() {
        let (_tmp, ws) = workspace();
        start_session(&ws, "task-1", "Task 1", 25, now_at(10, 0)).unwrap();
        let err = start_session(&ws, "task-2", "Task 2", 25, now_at(10, 5)).unwrap_err();
        assert!(matches!(err, PlannerError::Conflict(_)));
    }

    #[test]
    fn stop_computes_elapsed_and_moves_to_history() {
        let (_tmp, ws) = workspace();
        start_session(&ws, "task-1", "Task 1", 25, now_at(10, 0)).unwrap();
        let session = stop_session(&ws, true, "Done!", now_at(10, 30)).unwrap();
        assert!(session.completed);
        assert_eq!(session.notes, "Done!");
        assert_eq!(session.elapsed_minutes, 30.0);

        let state = load_focus_state(&ws).unwrap();
        assert!(state.active_session.is_none());
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn stop_without_active_session_fails() {
        let (_tmp, ws) = workspace();
        let err = stop_session(&ws, false, "", now_at(10, 0)).unwrap_err();
        assert!(matches!(err, PlannerError::NotFound(_)));
    }

    #[test]
    fn interruptions_accumulate_and_idle_is_noop() {
        let (_tmp, ws) = workspace();
        assert!(record_interruption(&ws).unwrap().is_none());

        start_session(&ws, "task-1", "Task 1", 25, now_at(10, 0)).unwrap();
        assert_eq!(record_interruption(&ws).unwrap().unwrap().interruptions, 1);
        assert_eq!(record_interruption(&ws).unwrap().unwrap().interruptions, 2);
    }

    #[test]
    fn stop_auto_logs_task_progress() {
        let (_tmp, ws) = workspace();
        std::fs::create_dir_all(ws.planner_dir()).unwrap();
        std::fs::write(
            ws.tasks_path(),
            "\
week_start: mon
tasks:
  - id: deadline-paper
    title: Deadline paper
    type: deadline_project
    priority: 10
    remaining_hours: 10
",
        )
        .unwrap();

        start_session(&ws, "deadline-paper", "Deadline paper", 25, now_at(10, 0)).unwrap();
        let session = stop_session(&ws, true, "", now_at(10, 27)).unwrap();
        assert_eq!(session.elapsed_minutes, 27.0);

        let tasks = task_store::load_tasks(&ws).unwrap();
        let paper = task_store::find_task(&tasks, "deadline-paper").unwrap();
        assert!((paper.remaining_hours.unwrap() - (10.0 - 27.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn stop_survives_missing_task() {
        let (_tmp, ws) = workspace();
        start_session(&ws, "ghost", "Ghost", 25, now_at(10, 0)).unwrap();
        let session = stop_session(&ws, false, "", now_at(10, 10)).unwrap();
        assert_eq!(session.elapsed_minutes, 10.0);
        let state = load_focus_state(&ws).unwrap();
        assert_eq!(state.history.len(), 1);
    }

    #[test]
    fn stats_over_recent_window() {
        let (_tmp, ws) = workspace();
        assert_eq!(focus_stats(&ws, 7, now_at(12, 0)).unwrap().total_sessions, 0);

        start_session(&ws, "task-1", "Task 1", 25, now_at(9, 0)).unwrap();
        record_interruption(&ws).unwrap();
        stop_session(&ws, true, "", now_at(9, 30)).unwrap();

        start_session(&ws, "task-2", "Task 2", 25, now_at(10, 0)).unwrap();
        stop_session(&ws, false, "", now_at(10, 20)).unwrap();

        let stats = focus_stats(&ws, 7, now_at(12, 0)).unwrap();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_minutes, 50.0);
        assert_eq!(stats.avg_session_minutes, 25.0);
        assert_eq!(stats.total_interruptions, 1);
        assert_eq!(stats.completion_rate, 0.5);
    }

    #[test]
    fn stats_exclude_sessions_outside_window() {
        let (_tmp, ws) = workspace();
        let mut state = FocusState::default();
        state.history.push(FocusSession {
            task_id: "old".to_string(),
            started_at: "2026-01-01T10:00:00+00:00".to_string(),
            elapsed_minutes: 60.0,
            ..FocusSession::default()
        });
        state.history.push(FocusSession {
            task_id: "recent".to_string(),
            started_at: "2026-02-10T10:00:00+00:00".to_string(),
            elapsed_minutes: 20.0,
            completed: true,
            ..FocusSession::default()
        });
        save_focus_state(&ws, &state).unwrap();

        let stats = focus_stats(&ws, 7, now_at(12, 0)).unwrap();
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.total_minutes, 20.0);
        assert_eq!(stats.completion_rate, 1.0);
    }
}
