//! Plan file persistence.
//!
//! Storage: `<root>/planner/latest/plan.md`, with the previous revision
//! kept in `plan_prev.md`. Whoever overwrites plan.md first copies the
//! current content aside; the finalizer diffs the two to detect that
//! the plan was edited during the day.

use crate::error::Result;
use crate::workspace::Workspace;

pub fn read_plan(ws: &Workspace) -> Result<String> {
    super::read_text(&ws.plan_path())
}

pub fn read_plan_prev(ws: &Workspace) -> Result<String> {
    super::read_text(&ws.plan_prev_path())
}

/// Save plan text, preserving the current plan.md (when one exists) as
/// plan_prev.md. Trailing whitespace is normalized to a single newline.
pub fn save_plan(ws: &Workspace, text: &str) -> Result<()> {
    if ws.plan_path().exists() {
        let current = read_plan(ws)?;
        super::write_text_atomic(&ws.plan_prev_path(), &current)?;
    }
    super::write_text_atomic(&ws.plan_path(), &format!("{}\n", text.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_save_leaves_no_prev() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        save_plan(&ws, "# Plan v1").unwrap();
        assert_eq!(read_plan(&ws).unwrap(), "# Plan v1\n");
        assert!(!ws.plan_prev_path().exists());
    }

    #[test]
    fn second_save_preserves_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        save_plan(&ws, "# Plan v1").unwrap();
        save_plan(&ws, "# Plan v2").unwrap();
        assert_eq!(read_plan(&ws).unwrap(), "# Plan v2\n");
        assert_eq!(read_plan_prev(&ws).unwrap(), "# Plan v1\n");
    }
}
