//! Check-in draft persistence.
//!
//! Storage: `<root>/planner/latest/checkin_draft.json`. A draft is only
//! meaningful for the current day: loading a draft whose `day` differs
//! from today yields a fresh empty draft for today.

use crate::error::Result;
use crate::models::CheckinDraft;
use crate::workspace::Workspace;

/// Load today's draft. A stale draft (different `day`) reads as empty.
pub fn load_draft(ws: &Workspace, today: &str) -> Result<CheckinDraft> {
    let draft: CheckinDraft = super::read_json(&ws.draft_path())?;
    if draft.day != today {
        return Ok(CheckinDraft::empty(today));
    }
    Ok(draft)
}

/// Load the draft exactly as stored, stale or not. The finalize gate
/// needs the raw `day` to decide whether today has a draft at all.
pub fn load_draft_raw(ws: &Workspace) -> Result<CheckinDraft> {
    super::read_json(&ws.draft_path())
}

pub fn save_draft(ws: &Workspace, draft: &CheckinDraft) -> Result<()> {
    super::write_json_atomic(&ws.draft_path(), draft)
}

/// Overwrite with the cleared shape for `day` (finalization stage 10).
pub fn clear_draft(ws: &Workspace, day: &str, updated_at: &str) -> Result<()> {
    let mut cleared = CheckinDraft::empty(day);
    cleared.updated_at = updated_at.to_string();
    save_draft(ws, &cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckinItem;

    #[test]
    fn stale_draft_reads_as_empty_for_today() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());

        let mut old = CheckinDraft::empty("2026-02-10");
        old.items.insert(
            "line-3".to_string(),
            CheckinItem {
                label: "Old item".to_string(),
                done: true,
                comment: String::new(),
            },
        );
        save_draft(&ws, &old).unwrap();

        let loaded = load_draft(&ws, "2026-02-11").unwrap();
        assert_eq!(loaded.day, "2026-02-11");
        assert!(loaded.items.is_empty());

        // The raw loader still sees the stored day.
        let raw = load_draft_raw(&ws).unwrap();
        assert_eq!(raw.day, "2026-02-10");
    }

    #[test]
    fn clear_draft_writes_empty_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());

        let mut draft = CheckinDraft::empty("2026-02-11");
        draft.reflection = "some text".to_string();
        save_draft(&ws, &draft).unwrap();

        clear_draft(&ws, "2026-02-11", "2026-02-11T21:30:00+00:00").unwrap();
        let loaded = load_draft(&ws, "2026-02-11").unwrap();
        assert!(loaded.items.is_empty());
        assert!(loaded.reflection.is_empty());
        assert_eq!(loaded.updated_at, "2026-02-11T21:30:00+00:00");
    }
}
