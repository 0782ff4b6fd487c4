//! Rolling reflection journal.
//!
//! Storage: `<root>/reflections/reflections.md`. Newest entries sit at
//! the top, inserted after the first `---` separator. The entry layout
//! is a stable contract: the analytics parser reads exactly what this
//! writer produces.

use indexmap::IndexMap;

use crate::error::Result;
use crate::models::{CheckinItem, CheckinMode, Rating};
use crate::workspace::Workspace;

pub const REFLECTIONS_HEADER: &str =
    "# Reflections (rolling)\n\nAppend newest entries at the top.\n\n---\n\n";

const ENTRY_MARKER: &str = "---\n\n";

pub fn read_reflections(ws: &Workspace) -> Result<String> {
    super::read_text(&ws.reflections_path())
}

/// Insert `entry_md` at the top of the entry list: right after the
/// first `---` separator, or prepended to the whole file if no marker
/// exists. An empty file gets the standard header first.
pub fn prepend_reflection(ws: &Workspace, entry_md: &str) -> Result<()> {
    let mut existing = read_reflections(ws)?;
    if existing.trim().is_empty() {
        existing = REFLECTIONS_HEADER.to_string();
    }
    let new = match existing.find(ENTRY_MARKER) {
        Some(idx) => {
            let split = idx + ENTRY_MARKER.len();
            let (head, tail) = existing.split_at(split);
            format!("{}\n{}\n\n{}", head, entry_md.trim(), tail.trim_start())
        }
        None => format!("{}\n\n{}", entry_md.trim(), existing),
    };
    super::write_text_atomic(&ws.reflections_path(), &new)
}

/// Render one journal entry. `items` provides the per-item comments for
/// the Notes section; `done_items` the labels completed today.
pub fn build_reflection_entry(
    today: &str,
    now_iso: &str,
    rating: Rating,
    mode: CheckinMode,
    done_items: &[String],
    items: &IndexMap<String, CheckinItem>,
    reflection: &str,
    summary: &str,
) -> String {
    let mut lines: Vec<String> = vec![
        format!("## {}", today),
        format!("- Time: {}", now_iso),
        String::new(),
        format!("**Rating:** {}", rating.as_str().to_uppercase()),
        String::new(),
        format!("**Mode:** {}", mode.as_str().to_uppercase()),
        String::new(),
        "**Done**".to_string(),
    ];
    if done_items.is_empty() {
        lines.push("- (none)".to_string());
    } else {
        for item in done_items {
            lines.push(format!("- {}", item));
        }
    }

    lines.push(String::new());
    lines.push("**Notes**".to_string());
    let mut notes_added = false;
    for item in items.values() {
        let comment = item.comment.trim();
        if !comment.is_empty() {
            notes_added = true;
            let label = if item.label.is_empty() {
                "(item)"
            } else {
                item.label.as_str()
            };
            lines.push(format!("- {}: {}", label, comment));
        }
    }
    if !notes_added {
        lines.push("- (none)".to_string());
    }

    let reflection = reflection.trim();
    lines.push(String::new());
    lines.push("**Reflection**".to_string());
    lines.push(if reflection.is_empty() {
        "- (none)".to_string()
    } else {
        reflection.to_string()
    });
    lines.push(String::new());
    lines.push("**Auto-summary**".to_string());
    lines.push(format!("- {}", summary));

    lines.join("\n")
}
