//! Checkbox and duration parsing for plan.md text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::PlanCheckbox;

static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*]\s*\[([ xX])\]\s+(.*)$").expect("checkbox regex"));
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([hm])\s*$").expect("duration regex"));
static TRAILING_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+\d+(?:\.\d+)?\s*[hm]\s*$").expect("trailing duration regex"));

/// Extract markdown checkboxes from plan text.
///
/// Recognizes `- [ ]`, `- [x]`, `- [X]` (also with `*` bullets). Keys
/// are `line-<i>` by zero-based line index, so duplicate labels stay
/// addressable.
pub fn extract_checkboxes(plan_md: &str) -> Vec<PlanCheckbox> {
    let mut out = Vec::new();
    for (i, line) in plan_md.lines().enumerate() {
        let Some(caps) = CHECKBOX_RE.captures(line) else {
            continue;
        };
        let checked = caps[1].trim().eq_ignore_ascii_case("x");
        out.push(PlanCheckbox {
            key: format!("line-{}", i),
            label: caps[2].trim().to_string(),
            checked,
        });
    }
    out
}

/// Duration in minutes from a trailing `2h` / `90m` / `1.5h` suffix.
/// Returns 0 when no suffix is present.
pub fn parse_duration_from_label(label: &str) -> i64 {
    let Some(caps) = DURATION_RE.captures(label) else {
        return 0;
    };
    let value: f64 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };
    if caps[2].eq_ignore_ascii_case("h") {
        (value * 60.0) as i64
    } else {
        value as i64
    }
}

/// Task-title prefix of a checkin label: the trailing duration is
/// stripped, then anything after a colon is dropped.
///
/// "Deadline paper: experiment writeup 2h" -> "Deadline paper"
/// "Daily maintenance 20m" -> "Daily maintenance"
pub fn parse_task_title_from_label(label: &str) -> String {
    let cleaned = TRAILING_DURATION_RE.replace(label, "");
    let cleaned = cleaned.trim();
    match cleaned.split_once(':') {
        Some((title, _)) => title.trim().to_string(),
        None => cleaned.to_string(),
    }
}
