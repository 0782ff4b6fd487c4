//! End-of-day finalization pipeline.
//!
//! Promotes today's draft into a reflection entry, rating, streak, and
//! history, then fans out to task progress, analytics, agent context,
//! and hooks. Idempotent per day: a second run after success is a
//! no-op. Stages 1-5 are fatal on error; stages 6-9 are best-effort
//! and log failures instead of propagating them.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::json;

use crate::agent_context;
use crate::analytics;
use crate::error::Result;
use crate::hooks;
use crate::models::{CheckinMode, HistoryEntry, Rating};
use crate::rating::{compute_rating, counts_for_streak, summarize_paragraph};
use crate::storage::{
    draft as draft_store, plan as plan_store, reflections as reflections_store,
    state as state_store, tasks as task_store,
};
use crate::workspace::Workspace;

const HISTORY_KEEP_DAYS: usize = 30;

#[derive(Debug, Clone, Serialize)]
pub struct FinalizeReport {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_finalized: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub task_updates: Vec<String>,
}

impl FinalizeReport {
    fn no_draft(today: String) -> FinalizeReport {
        FinalizeReport {
            ok: false,
            day: None,
            reason: Some("no-draft-for-today".to_string()),
            today: Some(today),
            rating: None,
            streak: None,
            already_finalized: None,
            task_updates: Vec::new(),
        }
    }

    fn already_finalized(day: String) -> FinalizeReport {
        FinalizeReport {
            ok: true,
            day: Some(day),
            reason: None,
            today: None,
            rating: None,
            streak: None,
            already_finalized: Some(true),
            task_updates: Vec::new(),
        }
    }

    fn success(day: String, rating: Rating, streak: u32, task_updates: Vec<String>) -> FinalizeReport {
        FinalizeReport {
            ok: true,
            day: Some(day),
            reason: None,
            today: None,
            rating: Some(rating.to_string()),
            streak: Some(streak),
            already_finalized: None,
            task_updates,
        }
    }
}

/// Finalize today's draft. `now` is the caller's clock in the user's
/// timezone; the command layer passes workspace-local now.
pub fn finalize_day(ws: &Workspace, now: DateTime<Tz>) -> Result<FinalizeReport> {
    let today = now.date_naive().format("%Y-%m-%d").to_string();

    // 1. Load & gate: only today's draft can be finalized.
    let draft = draft_store::load_draft_raw(ws)?;
    if draft.day != today {
        return Ok(FinalizeReport::no_draft(today));
    }

    // 2. Idempotency guard.
    let mut state = state_store::load_state(ws)?;
    if state.last_finalized_date.as_deref() == Some(today.as_str()) {
        return Ok(FinalizeReport::already_finalized(today));
    }

    let mode = draft.mode;
    let reflection = draft.reflection.clone();
    let reflection_len = reflection.trim().chars().count();

    let done_items: Vec<String> = draft
        .items
        .values()
        .filter(|item| item.done)
        .map(|item| {
            if item.label.is_empty() {
                "(item)".to_string()
            } else {
                item.label.clone()
            }
        })
        .collect();
    let total_items = draft.items.len() as u32;
    let done_count = done_items.len() as u32;

    // Plan edited since the last finalization? Trimmed string equality;
    // whitespace-only edits do not count.
    let plan_cur = plan_store::read_plan(ws)?.trim().to_string();
    let plan_changed = if ws.plan_prev_path().exists() {
        plan_store::read_plan_prev(ws)?.trim() != plan_cur
    } else {
        !plan_cur.is_empty()
    };

    // 3. Rating & streak. Recovery mode promotes bad days with any
    // signal to fair, and lets a long reflection alone keep the streak.
    let mut rating = compute_rating(done_count, total_items, &reflection, false);
    if mode == CheckinMode::Recovery
        && rating == Rating::Bad
        && (done_count >= 1 || reflection_len >= 30)
    {
        rating = Rating::Fair;
    }

    let mut counts = counts_for_streak(done_count, &reflection, plan_changed);
    if mode == CheckinMode::Recovery {
        counts = counts || reflection_len >= 30;
    }

    let mut streak = state.streak;
    if counts && state.last_streak_date.as_deref() != Some(today.as_str()) {
        streak = match state
            .last_streak_date
            .as_deref()
            .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        {
            Some(last_date) => {
                let gap = (now.date_naive() - last_date).num_days();
                if gap > 1 {
                    1
                } else {
                    streak + 1
                }
            }
            None => 1,
        };
        state.last_streak_date = Some(today.clone());
    }

    let summary = summarize_paragraph(&today, rating, &done_items, 0, &reflection);

    // History: one entry per day, ascending, capped to the last 30.
    let entry = HistoryEntry {
        day: today.clone(),
        rating: rating.to_string(),
        mode: mode.to_string(),
        streak_counted: counts,
        done_count,
        total: total_items,
    };
    let mut by_day: BTreeMap<String, HistoryEntry> = state
        .history
        .drain(..)
        .map(|e| (e.day.clone(), e))
        .collect();
    by_day.insert(today.clone(), entry);
    let mut history: Vec<HistoryEntry> = by_day.into_values().collect();
    if history.len() > HISTORY_KEEP_DAYS {
        history.drain(..history.len() - HISTORY_KEEP_DAYS);
    }
    state.history = history;

    // 4. Build & prepend the reflection entry.
    let entry_md = reflections_store::build_reflection_entry(
        &today,
        &now.format("%Y-%m-%dT%H:%M%:z").to_string(),
        rating,
        mode,
        &done_items,
        &draft.items,
        &reflection,
        &summary,
    );
    reflections_store::prepend_reflection(ws, &entry_md)?;

    // 5. Update state.
    state.streak = streak;
    state.last_rating = Some(rating.to_string());
    state.last_mode = Some(mode.to_string());
    state.last_summary = Some(summary);
    state.last_finalized_date = Some(today.clone());
    state_store::save_state(ws, &state)?;

    // 6. Task progress (best-effort).
    let mut task_updates: Vec<String> = Vec::new();
    if let Err(e) = (|| -> Result<()> {
        let mut tasks_file = task_store::load_tasks(ws)?;
        let reset = task_store::reset_weekly_budgets(&mut tasks_file, &mut state, now.date_naive());
        task_updates = task_store::process_checkin_progress(&draft, &mut tasks_file);
        let archived = task_store::archive_completed_tasks(&mut tasks_file);
        if reset || !task_updates.is_empty() || !archived.is_empty() {
            task_store::save_tasks(ws, &tasks_file)?;
            // week_start_date may have moved during the reset
            state_store::save_state(ws, &state)?;
        }
        if !archived.is_empty() {
            hooks::run_hooks(
                ws,
                "on_task_complete",
                &json!({"day": today.clone(), "task_ids": archived}),
            );
        }
        Ok(())
    })() {
        log::warn!("[finalize] task processing failed: {}", e);
    }

    // 7. Refresh analytics (best-effort).
    if let Err(e) = analytics::refresh_analytics(ws) {
        log::warn!("[finalize] analytics refresh failed: {}", e);
    }

    // 8. Emit agent context (best-effort).
    if let Err(e) = agent_context::generate_agent_context(ws, now) {
        log::warn!("[finalize] agent context generation failed: {}", e);
    }

    // 9. Dispatch post_finalize hooks (best-effort by construction).
    hooks::run_hooks(
        ws,
        "post_finalize",
        &json!({
            "day": today.clone(),
            "rating": rating.to_string(),
            "streak": streak,
            "done_count": done_count,
            "total": total_items,
        }),
    );

    // 10. Clear the draft.
    draft_store::clear_draft(ws, &today, &now.format("%Y-%m-%dT%H:%M:%S%:z").to_string())?;

    log::info!(
        "[finalize] {} finalized: rating={} streak={}",
        today,
        rating,
        streak
    );
    Ok(FinalizeReport::success(today, rating, streak, task_updates))
}
