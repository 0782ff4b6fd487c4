//! Task operations: list with computed urgency, create, update,
//! delete/archive.

use serde_json::Value;

use crate::error::{PlannerError, Result};
use crate::models::Task;
use crate::storage::tasks as task_store;
use crate::workspace::Workspace;

/// Active tasks with computed fields (`urgency_score`,
/// `days_until_deadline`, `weekly_progress_pct`), most urgent first.
pub fn list_tasks(ws: &Workspace) -> Result<Vec<Value>> {
    let tasks_file = task_store::load_tasks(ws)?;
    Ok(task_store::tasks_with_computed_fields(
        &tasks_file,
        ws.today(),
    ))
}

pub fn create_task(ws: &Workspace, data: Value) -> Result<Task> {
    let mut tasks_file = task_store::load_tasks(ws)?;
    let task = task_store::create_task(&mut tasks_file, data)?;
    task_store::save_tasks(ws, &tasks_file)?;
    log::info!("[tasks] created {}", task.id);
    Ok(task)
}

pub fn update_task(ws: &Workspace, task_id: &str, patch: &Value) -> Result<Task> {
    let mut tasks_file = task_store::load_tasks(ws)?;
    let task = task_store::update_task(&mut tasks_file, task_id, patch)?;
    task_store::save_tasks(ws, &tasks_file)?;
    log::info!("[tasks] updated {}", task.id);
    Ok(task)
}

pub fn delete_task(ws: &Workspace, task_id: &str, archive: bool) -> Result<()> {
    let mut tasks_file = task_store::load_tasks(ws)?;
    if !task_store::delete_task(&mut tasks_file, task_id, archive) {
        return Err(PlannerError::NotFound(format!(
            "Task not found: {}",
            task_id
        )));
    }
    task_store::save_tasks(ws, &tasks_file)?;
    log::info!(
        "[tasks] {} {}",
        if archive { "archived" } else { "deleted" },
        task_id
    );
    Ok(())
}
