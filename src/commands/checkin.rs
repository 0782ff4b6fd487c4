//! Draft auto-save and the end-of-day finalization entry point.

use serde::Deserialize;
use serde_json::json;

use crate::error::{PlannerError, Result};
use crate::finalize::{self, FinalizeReport};
use crate::hooks;
use crate::models::{CheckinDraft, CheckinItem, CheckinMode};
use crate::storage::draft as draft_store;
use crate::workspace::Workspace;

/// One checkin row as submitted by a front-end.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftItemInput {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub comment: String,
}

/// Today's draft; a stale stored draft reads as empty.
pub fn get_checkin_draft(ws: &Workspace) -> Result<CheckinDraft> {
    draft_store::load_draft(ws, &ws.today_str())
}

/// Persist the draft. Only today may be written: a mismatched `day` is
/// rejected instead of silently overwritten.
pub fn save_checkin_draft(
    ws: &Workspace,
    day: &str,
    mode: CheckinMode,
    items: Vec<DraftItemInput>,
    reflection: &str,
) -> Result<CheckinDraft> {
    let today = ws.today_str();
    if day != today {
        return Err(PlannerError::validation(format!(
            "draft day {} is not today ({})",
            day, today
        )));
    }

    let mut draft = CheckinDraft::empty(&today);
    draft.updated_at = ws.now().format("%Y-%m-%dT%H:%M:%S%:z").to_string();
    draft.mode = mode;
    draft.reflection = reflection.to_string();
    for item in items {
        if item.key.is_empty() {
            continue;
        }
        draft.items.insert(
            item.key,
            CheckinItem {
                label: item.label,
                done: item.done,
                comment: item.comment,
            },
        );
    }

    draft_store::save_draft(ws, &draft)?;
    log::debug!("[checkin] draft saved ({} items)", draft.items.len());
    Ok(draft)
}

/// Run the finalization pipeline for today.
pub fn finalize_day(ws: &Workspace) -> Result<FinalizeReport> {
    let now = ws.now();
    hooks::run_hooks(
        ws,
        "pre_finalize",
        &json!({"day": now.date_naive().format("%Y-%m-%d").to_string()}),
    );
    finalize::finalize_day(ws, now)
}
