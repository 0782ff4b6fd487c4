//! Task catalog: persistence, validation, CRUD, lifecycle, progress.
//!
//! Storage: `<root>/planner/tasks.yaml`. Validation runs on the raw
//! JSON value both on create and on the merged object of an update, so
//! a patch can never commit an invalid task. All mutations are saved
//! through `save_tasks`, which writes atomically.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

use crate::checkbox::{parse_duration_from_label, parse_task_title_from_label};
use crate::error::{PlannerError, Result};
use crate::models::{
    round_dp, weekday_tag_index, CheckinDraft, State, Task, TaskStatus, TaskType, TasksFile,
};
use crate::workspace::Workspace;

// ── Persistence ───────────────────────────────────────────────

pub fn load_tasks(ws: &Workspace) -> Result<TasksFile> {
    super::read_yaml(&ws.tasks_path())
}

pub fn save_tasks(ws: &Workspace, tasks_file: &TasksFile) -> Result<()> {
    super::write_yaml_atomic(&ws.tasks_path(), tasks_file)
}

// ── Validation ────────────────────────────────────────────────

const VALID_TYPES: [&str; 4] = [
    "deadline_project",
    "weekly_budget",
    "daily_ritual",
    "open_ended",
];
const VALID_STATUSES: [&str; 3] = ["active", "paused", "complete"];

/// Validate a task's raw shape. Returns every problem found (empty when
/// valid) so the caller can surface them all at once.
pub fn validate_task(task: &Value) -> Vec<String> {
    let obj = match task.as_object() {
        Some(o) => o,
        None => return vec!["task must be a mapping".to_string()],
    };
    let mut errors = Vec::new();

    if !obj.contains_key("id") {
        errors.push("Missing required field: id".to_string());
    }
    if !obj.contains_key("title") {
        errors.push("Missing required field: title".to_string());
    }
    let task_type = obj.get("type").and_then(Value::as_str);
    match task_type {
        None => errors.push("Missing required field: type".to_string()),
        Some(t) if !VALID_TYPES.contains(&t) => {
            errors.push(format!("Invalid task type: {}", t));
        }
        _ => {}
    }

    match task_type {
        Some("deadline_project") => {
            if let Some(v) = obj.get("remaining_hours") {
                if !v.is_number() {
                    errors.push("remaining_hours must be numeric".to_string());
                }
            }
        }
        Some("weekly_budget") => {
            if let Some(v) = obj.get("target_hours_per_week") {
                if !v.is_number() {
                    errors.push("target_hours_per_week must be numeric".to_string());
                }
            }
        }
        _ => {}
    }

    if let Some(status) = obj.get("status") {
        match status.as_str() {
            Some(s) if VALID_STATUSES.contains(&s) => {}
            _ => errors.push(format!(
                "Invalid status: {}",
                status.as_str().unwrap_or_default()
            )),
        }
    }

    if let Some(priority) = obj.get("priority") {
        match priority.as_i64() {
            Some(p) if (1..=10).contains(&p) => {}
            _ => errors.push("priority must be integer 1-10".to_string()),
        }
    }

    errors
}

// ── CRUD ──────────────────────────────────────────────────────

pub fn find_task<'a>(tasks_file: &'a TasksFile, task_id: &str) -> Option<&'a Task> {
    tasks_file.tasks.iter().find(|t| t.id == task_id)
}

fn find_task_index(tasks_file: &TasksFile, task_id: &str) -> Option<usize> {
    tasks_file.tasks.iter().position(|t| t.id == task_id)
}

/// Validate and append a new task. Duplicate ids are rejected.
pub fn create_task(tasks_file: &mut TasksFile, data: Value) -> Result<Task> {
    let errors = validate_task(&data);
    if !errors.is_empty() {
        return Err(PlannerError::Validation(errors));
    }

    let task_id = data
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if find_task(tasks_file, &task_id).is_some() {
        return Err(PlannerError::Validation(vec![format!(
            "Task ID already exists: {}",
            task_id
        )]));
    }

    let task: Task =
        serde_json::from_value(data).map_err(|e| PlannerError::validation(e.to_string()))?;
    tasks_file.tasks.push(task.clone());
    Ok(task)
}

/// Merge `updates` over the stored task, validate the merged object,
/// and replace it. Unspecified fields are preserved.
pub fn update_task(tasks_file: &mut TasksFile, task_id: &str, updates: &Value) -> Result<Task> {
    let idx = find_task_index(tasks_file, task_id)
        .ok_or_else(|| PlannerError::NotFound(format!("Task not found: {}", task_id)))?;

    let mut merged = serde_json::to_value(&tasks_file.tasks[idx])
        .map_err(|e| PlannerError::validation(e.to_string()))?;
    if let (Some(base), Some(patch)) = (merged.as_object_mut(), updates.as_object()) {
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
    }

    let errors = validate_task(&merged);
    if !errors.is_empty() {
        return Err(PlannerError::Validation(errors));
    }

    let updated: Task =
        serde_json::from_value(merged).map_err(|e| PlannerError::validation(e.to_string()))?;
    tasks_file.tasks[idx] = updated.clone();
    Ok(updated)
}

/// Remove a task from the active list. With `archive`, it moves to the
/// archived list as complete; otherwise it is discarded.
pub fn delete_task(tasks_file: &mut TasksFile, task_id: &str, archive: bool) -> bool {
    match find_task_index(tasks_file, task_id) {
        Some(idx) => {
            let mut task = tasks_file.tasks.remove(idx);
            if archive {
                task.status = TaskStatus::Complete;
                tasks_file.archived.push(task);
            }
            true
        }
        None => false,
    }
}

// ── Lifecycle & progress ──────────────────────────────────────

/// Match a checkin label to an active task via its title prefix.
///
/// "Deadline paper: experiment writeup 2h" matches the task titled
/// "Deadline paper". Exact (case-insensitive) title match wins; then
/// either side may be a prefix of the other.
pub fn match_task_index(label: &str, tasks: &[Task]) -> Option<usize> {
    let title_prefix = parse_task_title_from_label(label);
    if title_prefix.is_empty() {
        return None;
    }
    let prefix_lower = title_prefix.to_lowercase();

    if let Some(idx) = tasks
        .iter()
        .position(|t| t.title.to_lowercase() == prefix_lower)
    {
        return Some(idx);
    }
    tasks.iter().position(|t| {
        let title_lower = t.title.to_lowercase();
        title_lower.starts_with(&prefix_lower) || prefix_lower.starts_with(&title_lower)
    })
}

/// Apply completed minutes to a task.
///
/// deadline_project: decrement remaining_hours, auto-complete at zero.
/// weekly_budget: accumulate hours_this_week.
/// daily_ritual / open_ended: no numeric tracking.
pub fn update_task_progress(task: &mut Task, minutes_done: u32) {
    match task.task_type {
        TaskType::DeadlineProject => {
            if let Some(remaining) = task.remaining_hours {
                let updated = (remaining - minutes_done as f64 / 60.0).max(0.0);
                task.remaining_hours = Some(updated);
                if updated <= 0.0 {
                    task.status = TaskStatus::Complete;
                }
            }
        }
        TaskType::WeeklyBudget => {
            task.hours_this_week += minutes_done as f64 / 60.0;
        }
        TaskType::DailyRitual | TaskType::OpenEnded => {}
    }
}

/// Walk the draft's done items and apply progress to matching tasks.
/// Items without a duration suffix fall back to the ritual's daily
/// estimate, or 30 minutes. Returns one description per update.
pub fn process_checkin_progress(draft: &CheckinDraft, tasks_file: &mut TasksFile) -> Vec<String> {
    let mut updates = Vec::new();
    for item in draft.items.values() {
        if !item.done {
            continue;
        }
        let Some(idx) = match_task_index(&item.label, &tasks_file.tasks) else {
            continue;
        };
        let parsed = parse_duration_from_label(&item.label);
        let minutes = if parsed > 0 {
            parsed as u32
        } else {
            let task = &tasks_file.tasks[idx];
            match (task.task_type, task.estimated_minutes_per_day) {
                (TaskType::DailyRitual, Some(est)) if est > 0 => est,
                _ => 30,
            }
        };
        let task = &mut tasks_file.tasks[idx];
        update_task_progress(task, minutes);
        updates.push(format!("{}: +{}min", task.id, minutes));
    }
    updates
}

/// Zero every weekly budget when a new accounting week begins.
///
/// The reset fires on the first run where today is the configured week
/// start day and the previous window started more than 6 days ago.
/// When tracking has never started and today is mid-week, the window
/// start is backfilled to the most recent start day.
pub fn reset_weekly_budgets(tasks_file: &mut TasksFile, state: &mut State, today: NaiveDate) -> bool {
    let week_start_day =
        weekday_tag_index(&tasks_file.week_start.to_lowercase()).unwrap_or(0);
    let current_weekday = today.weekday().num_days_from_monday();

    if let Some(last_start) = state
        .week_start_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    {
        if (today - last_start).num_days() < 7 {
            return false;
        }
    }

    if current_weekday == week_start_day {
        for task in &mut tasks_file.tasks {
            if task.task_type == TaskType::WeeklyBudget {
                task.hours_this_week = 0.0;
            }
        }
        state.week_start_date = Some(today.format("%Y-%m-%d").to_string());
        return true;
    }

    if state.week_start_date.is_none() {
        let days_since = (current_weekday + 7 - week_start_day) % 7;
        let last_start = today - Duration::days(days_since as i64);
        state.week_start_date = Some(last_start.format("%Y-%m-%d").to_string());
    }

    false
}

/// Sweep completed tasks into the archive. Returns the archived ids.
pub fn archive_completed_tasks(tasks_file: &mut TasksFile) -> Vec<String> {
    let mut archived_ids = Vec::new();
    let mut remaining = Vec::with_capacity(tasks_file.tasks.len());
    for task in std::mem::take(&mut tasks_file.tasks) {
        if task.status == TaskStatus::Complete {
            archived_ids.push(task.id.clone());
            tasks_file.archived.push(task);
        } else {
            remaining.push(task);
        }
    }
    tasks_file.tasks = remaining;
    archived_ids
}

// ── Computed fields ───────────────────────────────────────────

/// Read-only projection of the active tasks with `urgency_score` and,
/// where applicable, `days_until_deadline` / `weekly_progress_pct`.
/// Sorted by urgency, most urgent first.
pub fn tasks_with_computed_fields(tasks_file: &TasksFile, today: NaiveDate) -> Vec<Value> {
    let mut result = Vec::with_capacity(tasks_file.tasks.len());

    for task in &tasks_file.tasks {
        let mut obj = match serde_json::to_value(task) {
            Ok(Value::Object(obj)) => obj,
            _ => continue,
        };

        let mut urgency = task.priority as f64;
        match task.task_type {
            TaskType::DeadlineProject => {
                let deadline = task
                    .deadline
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
                match deadline {
                    Some(deadline_date) => {
                        let days_left = (deadline_date - today).num_days().max(1);
                        obj.insert("days_until_deadline".to_string(), Value::from(days_left));
                        if let Some(remaining) = task.remaining_hours {
                            if remaining > 0.0 {
                                urgency += remaining / days_left as f64 * 5.0;
                            }
                        }
                    }
                    None => {
                        if task.remaining_hours.unwrap_or(0.0) > 0.0 {
                            urgency += 2.0;
                        }
                    }
                }
            }
            TaskType::WeeklyBudget => {
                if let Some(target) = task.target_hours_per_week.filter(|t| *t > 0.0) {
                    let gap = (target - task.hours_this_week).max(0.0);
                    obj.insert(
                        "weekly_progress_pct".to_string(),
                        Value::from(round_dp(task.hours_this_week / target * 100.0, 1)),
                    );
                    urgency += gap / target * 3.0;
                }
            }
            TaskType::DailyRitual => {
                urgency += 1.0;
            }
            TaskType::OpenEnded => {}
        }

        obj.insert("urgency_score".to_string(), Value::from(round_dp(urgency, 2)));
        result.push(Value::Object(obj));
    }

    result.sort_by(|a, b| {
        let ua = a.get("urgency_score").and_then(Value::as_f64).unwrap_or(0.0);
        let ub = b.get("urgency_score").and_then(Value::as_f64).unwrap_or(0.0);
        ub.partial_cmp(&ua).unwrap_or(std::cmp::Ordering::Equal)
    });
    result
}
