//! Plan operations: read, save with revision preservation, generate
//! via the scheduler, and expose the parsed checkboxes.

use chrono::NaiveDate;
use serde_json::json;

use crate::checkbox;
use crate::error::Result;
use crate::hooks;
use crate::models::PlanCheckbox;
use crate::scheduler;
use crate::storage::plan as plan_store;
use crate::workspace::Workspace;

pub fn get_plan(ws: &Workspace) -> Result<String> {
    plan_store::read_plan(ws)
}

/// Save plan text; the current plan.md is kept as plan_prev.md.
pub fn save_plan(ws: &Workspace, text: &str) -> Result<()> {
    plan_store::save_plan(ws, text)
}

/// Checkboxes of the current plan, keyed by line.
pub fn get_plan_checkboxes(ws: &Workspace) -> Result<Vec<PlanCheckbox>> {
    Ok(checkbox::extract_checkboxes(&plan_store::read_plan(ws)?))
}

/// Generate a plan for `target_date` (today when None) and write it to
/// plan.md. Plan-generation hooks fire around the scheduler run.
pub fn generate_plan(ws: &Workspace, target_date: Option<NaiveDate>) -> Result<String> {
    let date = target_date.unwrap_or_else(|| ws.today());
    let date_str = date.format("%Y-%m-%d").to_string();

    hooks::run_hooks(ws, "pre_plan_generate", &json!({"date": date_str}));
    let plan_md = scheduler::generate_plan(ws, Some(date))?;
    hooks::run_hooks(ws, "post_plan_generate", &json!({"date": date_str}));
    Ok(plan_md)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_reparse_checkboxes() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());

        save_plan(&ws, "# Plan\n\n- [ ] One 1h\n- [x] Two 30m").unwrap();
        let boxes = get_plan_checkboxes(&ws).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].label, "One 1h");
        assert!(boxes[1].checked);
    }

    #[test]
    fn generate_plan_writes_plan_md() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        std::fs::create_dir_all(ws.planner_dir()).unwrap();
        std::fs::write(
            ws.profile_path(),
            "timezone: UTC\nwork_blocks:\n  - \"09:00-12:00\"\n",
        )
        .unwrap();
        std::fs::write(
            ws.tasks_path(),
            "week_start: mon\ntasks:\n  - id: a\n    title: A\n    type: open_ended\n",
        )
        .unwrap();

        let date = chrono::NaiveDate::from_ymd_opt(2026, 2, 11).unwrap();
        let md = generate_plan(&ws, Some(date)).unwrap();
        assert!(md.contains("# Plan \u{2014} 2026-02-11"));
        assert_eq!(get_plan(&ws).unwrap(), md);
    }
}
