//! Agent context artifact.
//!
//! Bundles the state snapshot, analytics highlights, urgent tasks,
//! weekly budget progress, and rule-based suggestions into
//! `planner/agent_context.json` for external consumers (agents,
//! dashboards). Regenerated after every finalization.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;

use crate::analytics;
use crate::error::Result;
use crate::models::{round_dp, weekday_tag, AnalyticsSummary, State, TaskType};
use crate::storage::{self, state as state_store, tasks as task_store};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAnalytics {
    pub streak: u32,
    pub last_rating: Option<String>,
    #[serde(rename = "rolling7dayAvg")]
    pub rolling_7day_avg: f64,
    #[serde(rename = "rolling30dayAvg")]
    pub rolling_30day_avg: f64,
    pub completion_by_weekday: BTreeMap<String, f64>,
    pub total_days_tracked: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub task_id: String,
    pub title: String,
    pub target_hours: f64,
    pub actual_hours: f64,
    pub remaining_hours: f64,
    pub progress_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub generated_at: String,
    pub analytics: ContextAnalytics,
    pub top_urgent_tasks: Vec<Value>,
    pub weekly_budget_status: Vec<BudgetStatus>,
    pub suggestions: Vec<Suggestion>,
}

fn pct(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

/// Rule-based suggestions derived from analytics, state, and the
/// urgency-ordered task projection. `today_weekday` is the weekday tag
/// in the profile timezone.
pub fn scheduling_suggestions(
    analytics: &AnalyticsSummary,
    state: &State,
    tasks_computed: &[Value],
    today_weekday: &str,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    // Low 7-day trend: suggest easing off.
    let avg_7 = analytics.rolling_7day_avg;
    if avg_7 > 0.0 && avg_7 < 0.5 {
        suggestions.push(Suggestion {
            kind: "difficulty_adjustment".to_string(),
            message: format!(
                "7-day completion average is low ({}). Consider a lighter plan or recovery mode.",
                pct(avg_7)
            ),
            priority: "high".to_string(),
        });
    }

    // Route the top task to the best-performing days.
    if !analytics.best_time_blocks.is_empty() {
        if let Some(top_task) = tasks_computed.first() {
            let title = top_task.get("title").and_then(Value::as_str).unwrap_or("");
            let days: Vec<&str> = analytics
                .best_time_blocks
                .iter()
                .take(2)
                .map(String::as_str)
                .collect();
            suggestions.push(Suggestion {
                kind: "scheduling".to_string(),
                message: format!(
                    "Schedule '{}' during your best day(s): {}.",
                    title,
                    days.join(", ")
                ),
                priority: "medium".to_string(),
            });
        }
    }

    // Chronically skipped tasks.
    for task_name in analytics.most_skipped_tasks.iter().take(3) {
        suggestions.push(Suggestion {
            kind: "skip_warning".to_string(),
            message: format!(
                "'{}' is frequently skipped. Consider breaking it into smaller chunks or re-prioritizing.",
                task_name
            ),
            priority: "medium".to_string(),
        });
    }

    // Historically weak weekday.
    if let Some(today_rate) = analytics.completion_by_weekday.get(today_weekday) {
        if *today_rate < 0.4 {
            suggestions.push(Suggestion {
                kind: "weekday_warning".to_string(),
                message: format!(
                    "Historically, {} has a low completion rate ({}). Plan conservatively.",
                    title_word(today_weekday),
                    pct(*today_rate)
                ),
                priority: "medium".to_string(),
            });
        }
    }

    // Recovery mode has a good track record after a bad day.
    if state.last_rating.as_deref() == Some("bad") && analytics.recovery_success_rate > 0.6 {
        suggestions.push(Suggestion {
            kind: "recovery_suggestion".to_string(),
            message: format!(
                "Recovery mode has worked well ({} success rate). Consider using it today.",
                pct(analytics.recovery_success_rate)
            ),
            priority: "high".to_string(),
        });
    }

    suggestions
}

fn title_word(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Aggregate and write `agent_context.json`, returning the context.
pub fn generate_agent_context(ws: &Workspace, now: DateTime<Tz>) -> Result<AgentContext> {
    let state = state_store::load_state(ws)?;
    let analytics = analytics::load_analytics(ws)?.unwrap_or_default();
    let tasks_file = task_store::load_tasks(ws)?;

    let today = now.date_naive();
    let tasks_computed = task_store::tasks_with_computed_fields(&tasks_file, today);
    let top_tasks: Vec<Value> = tasks_computed.iter().take(5).cloned().collect();

    let mut budget_status = Vec::new();
    for task in &tasks_file.tasks {
        if task.task_type == TaskType::WeeklyBudget {
            if let Some(target) = task.target_hours_per_week.filter(|t| *t > 0.0) {
                budget_status.push(BudgetStatus {
                    task_id: task.id.clone(),
                    title: task.title.clone(),
                    target_hours: target,
                    actual_hours: round_dp(task.hours_this_week, 1),
                    remaining_hours: round_dp((target - task.hours_this_week).max(0.0), 1),
                    progress_pct: round_dp(task.hours_this_week / target * 100.0, 1),
                });
            }
        }
    }

    let suggestions = scheduling_suggestions(
        &analytics,
        &state,
        &tasks_computed,
        weekday_tag(today.weekday()),
    );

    let context = AgentContext {
        generated_at: now.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        analytics: ContextAnalytics {
            streak: state.streak,
            last_rating: state.last_rating.clone(),
            rolling_7day_avg: analytics.rolling_7day_avg,
            rolling_30day_avg: analytics.rolling_30day_avg,
            completion_by_weekday: analytics.completion_by_weekday.clone(),
            total_days_tracked: analytics.total_days_tracked,
        },
        top_urgent_tasks: top_tasks,
        weekly_budget_status: budget_status,
        suggestions,
    };

    storage::write_json_atomic(&ws.agent_context_path(), &context)?;
    log::debug!(
        "[agent_context] wrote {} suggestions",
        context.suggestions.len()
    );
    Ok(context)
}
