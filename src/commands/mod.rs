//! Public operation surface.
//!
//! Small value-in / value-out functions over a `Workspace`, one module
//! per area. A transport (CLI today, HTTP or TUI tomorrow) maps its
//! requests onto these; nothing here knows about argument parsing or
//! rendering. Each operation resolves the clock once from the
//! workspace and passes it down.

pub mod checkin;
pub mod focus;
pub mod insights;
pub mod plan;
pub mod status;
pub mod tasks;

use crate::error::Result;
use crate::storage;
use crate::workspace::Workspace;

const STARTER_PROFILE: &str = "\
# Daily planning profile. Times are HH:MM in the configured timezone.
timezone: UTC
wake_time: \"08:00\"
daily_plan_delivery_time: \"08:30\"
work_blocks:
  - \"09:00-12:00\"
  - \"13:00-17:00\"
fixed_routines:
  lunch:
    window: \"12:00-13:00\"
commute:
  typical_one_way_min: 0
weekly_fixed_events: []
";

const STARTER_TASKS: &str = "\
week_start: mon
tasks: []
";

/// Scaffold a fresh workspace: directory tree, a starter profile and
/// tasks file, and the reflections header. Existing files are left
/// untouched, so re-running on a live workspace is safe.
pub fn init_workspace(ws: &Workspace) -> Result<()> {
    std::fs::create_dir_all(ws.latest_dir())?;
    if let Some(parent) = ws.reflections_path().parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !ws.profile_path().exists() {
        storage::write_text_atomic(&ws.profile_path(), STARTER_PROFILE)?;
    }
    if !ws.tasks_path().exists() {
        storage::write_text_atomic(&ws.tasks_path(), STARTER_TASKS)?;
    }
    if !ws.reflections_path().exists() {
        storage::write_text_atomic(
            &ws.reflections_path(),
            storage::reflections::REFLECTIONS_HEADER,
        )?;
    }

    log::info!("[init] workspace ready at {}", ws.root().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_scaffolds_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path().join("planner-root"));
        init_workspace(&ws).unwrap();

        assert!(ws.latest_dir().is_dir());
        assert!(ws.profile_path().exists());
        assert!(ws.tasks_path().exists());
        let text = storage::read_text(&ws.reflections_path()).unwrap();
        assert!(text.starts_with("# Reflections (rolling)"));

        // The starter files parse with the real loaders.
        let profile = storage::profile::load_profile(&ws).unwrap();
        assert_eq!(profile.work_blocks.len(), 2);
        let tasks = storage::tasks::load_tasks(&ws).unwrap();
        assert!(tasks.tasks.is_empty());
    }

    #[test]
    fn init_preserves_existing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        init_workspace(&ws).unwrap();
        std::fs::write(ws.profile_path(), "timezone: Europe/Berlin\n").unwrap();

        init_workspace(&ws).unwrap();
        let profile = storage::profile::load_profile(&ws).unwrap();
        assert_eq!(profile.timezone, "Europe/Berlin");
    }
}
