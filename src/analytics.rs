//! Pattern analytics over the reflection log.
//!
//! Parses reflections.md back into structured day records (the writer
//! in `storage::reflections` is the contract), then derives completion
//! rates, weekday patterns, skip lists, and streak runs. Results are
//! cached in analytics.json.

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::models::{
    round_dp, weekday_tag, AnalyticsSummary, DayRecord, State, StreakRun,
};
use crate::storage::{self, reflections as reflections_store, state as state_store};
use crate::workspace::Workspace;

static SECTION_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^## (\d{4}-\d{2}-\d{2})").expect("section header regex"));
static RATING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Rating:\*\*\s*(\w+)").expect("rating regex"));
static MODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Mode:\*\*\s*(\w+)").expect("mode regex"));
static DONE_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\*\*Done\*\*\s*\n(.*?)(?:\n\*\*|\z)").expect("done regex"));
static NOTES_SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\*\*Notes\*\*\s*\n(.*?)(?:\n\*\*|\z)").expect("notes regex"));
static REFLECTION_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\*\*Reflection\*\*\s*\n(.*?)(?:\n\*\*|\z)").expect("reflection regex")
});
static TIMED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\s*[hm]").expect("timed item regex"));
static ITEM_DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d+(?:\.\d+)?\s*[hm]\s*$").expect("item duration regex"));

const NONE_MARKER: &str = "- (none)";

// ── Reflection parsing ────────────────────────────────────────

/// Split reflections.md into day records, one per `## YYYY-MM-DD`
/// section. `- (none)` placeholders read as empty.
pub fn parse_reflections(md_text: &str) -> Vec<DayRecord> {
    let starts: Vec<(usize, String)> = SECTION_HEADER_RE
        .captures_iter(md_text)
        .filter_map(|caps| caps.get(0).map(|m| (m.start(), caps[1].to_string())))
        .collect();

    let mut records = Vec::new();
    for (i, (start, date)) in starts.iter().enumerate() {
        let end = starts
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(md_text.len());
        let section = md_text[*start..end].trim();

        let mut record = DayRecord {
            date: date.clone(),
            ..DayRecord::default()
        };

        if let Some(caps) = RATING_RE.captures(section) {
            record.rating = caps[1].to_lowercase();
        }
        if let Some(caps) = MODE_RE.captures(section) {
            record.mode = caps[1].to_lowercase();
        }

        if let Some(caps) = DONE_SECTION_RE.captures(section) {
            for line in caps[1].trim().lines() {
                let line = line.trim();
                if line.starts_with("- ") && line != NONE_MARKER {
                    let item = line[2..].trim().to_string();
                    record.done_items.push(item.clone());
                    record.all_items.push(item);
                }
            }
        }

        if let Some(caps) = NOTES_SECTION_RE.captures(section) {
            let done_stems: Vec<String> = record
                .done_items
                .iter()
                .map(|d| item_stem_before_colon(d))
                .collect();
            for line in caps[1].trim().lines() {
                let line = line.trim();
                if line.starts_with("- ") && line != NONE_MARKER {
                    let note = line[2..].trim().to_string();
                    record.notes.push(note.clone());
                    let item_name = item_stem_before_colon(&note);
                    if !done_stems.contains(&item_name) {
                        record.all_items.push(item_name);
                    }
                }
            }
        }

        if let Some(caps) = REFLECTION_SECTION_RE.captures(section) {
            let text = caps[1].trim();
            if text != NONE_MARKER {
                record.reflection_text = text.to_string();
            }
        }

        records.push(record);
    }
    records
}

fn item_stem_before_colon(item: &str) -> String {
    item.split(':').next().unwrap_or("").trim().to_string()
}

/// Task-name stem used for skip tracking: trailing duration stripped,
/// then anything after a colon dropped.
fn item_task_name(item: &str) -> String {
    let stripped = ITEM_DURATION_RE.replace(item, "");
    item_stem_before_colon(stripped.trim())
}

// ── Analytics computation ─────────────────────────────────────

pub fn compute_analytics(records: &[DayRecord], state: Option<&State>) -> AnalyticsSummary {
    let mut summary = AnalyticsSummary {
        total_days_tracked: records.len() as u32,
        ..AnalyticsSummary::default()
    };
    if records.is_empty() {
        return summary;
    }

    // Completion by weekday.
    let mut weekday_rates: IndexMap<&'static str, Vec<f64>> = IndexMap::new();
    for rec in records {
        if let Ok(d) = NaiveDate::parse_from_str(&rec.date, "%Y-%m-%d") {
            weekday_rates
                .entry(weekday_tag(d.weekday()))
                .or_default()
                .push(rec.completion_rate());
        }
    }
    for (day, rates) in &weekday_rates {
        summary.completion_by_weekday.insert(
            day.to_string(),
            round_dp(rates.iter().sum::<f64>() / rates.len() as f64, 3),
        );
    }

    // Completion by inferred task type.
    let mut type_counts: IndexMap<&'static str, (u32, u32)> = IndexMap::new(); // (done, total)
    for rec in records {
        for item in &rec.all_items {
            let item_lower = item.to_lowercase();
            let ttype = if TIMED_ITEM_RE.is_match(item) {
                "timed_task"
            } else if item_lower.contains("maintenance") || item_lower.contains("ritual") {
                "daily_ritual"
            } else {
                "other"
            };
            let entry = type_counts.entry(ttype).or_default();
            entry.1 += 1;
            if rec.done_items.contains(item) {
                entry.0 += 1;
            }
        }
    }
    for (ttype, (done, total)) in &type_counts {
        if *total > 0 {
            summary
                .completion_by_task_type
                .insert(ttype.to_string(), round_dp(*done as f64 / *total as f64, 3));
        }
    }

    // Best time blocks: top-3 weekdays by completion rate.
    if !summary.completion_by_weekday.is_empty() {
        let mut ranked: Vec<(&String, &f64)> = summary.completion_by_weekday.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        summary.best_time_blocks = ranked.iter().take(3).map(|(d, _)| (*d).clone()).collect();
    }

    // Most skipped tasks: appear often, rarely done.
    let mut task_counts: IndexMap<String, (u32, u32)> = IndexMap::new(); // (appear, done)
    for rec in records {
        for item in &rec.all_items {
            let name = item_task_name(item);
            let entry = task_counts.entry(name).or_default();
            entry.0 += 1;
            if rec.done_items.contains(item) {
                entry.1 += 1;
            }
        }
    }
    let mut skipped: Vec<(String, f64)> = Vec::new();
    for (name, (appearances, done)) in &task_counts {
        if *appearances >= 3 {
            let skip_rate = 1.0 - *done as f64 / *appearances as f64;
            if skip_rate >= 0.5 {
                skipped.push((name.clone(), skip_rate));
            }
        }
    }
    skipped.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    summary.most_skipped_tasks = skipped.into_iter().take(5).map(|(n, _)| n).collect();

    // Streak runs from state history.
    if let Some(state) = state {
        let mut sorted_hist = state.history.clone();
        sorted_hist.sort_by(|a, b| a.day.cmp(&b.day));

        let mut runs: Vec<StreakRun> = Vec::new();
        let mut run_start: Option<String> = None;
        let mut run_len: u32 = 0;
        for entry in &sorted_hist {
            if entry.streak_counted {
                if run_start.is_none() {
                    run_start = Some(entry.day.clone());
                }
                run_len += 1;
            } else {
                if run_len > 0 {
                    runs.push(StreakRun {
                        start: run_start.take().unwrap_or_default(),
                        end: entry.day.clone(),
                        length: run_len,
                    });
                }
                run_len = 0;
                run_start = None;
            }
        }
        if run_len > 0 {
            runs.push(StreakRun {
                start: run_start.unwrap_or_default(),
                end: sorted_hist.last().map(|e| e.day.clone()).unwrap_or_default(),
                length: run_len,
            });
        }
        summary.streak_history = runs;
    }

    // Rolling averages over the most recent records.
    let mut sorted_records: Vec<&DayRecord> = records.iter().collect();
    sorted_records.sort_by(|a, b| b.date.cmp(&a.date));
    summary.rolling_7day_avg = round_dp(mean_rate(&sorted_records, 7), 3);
    summary.rolling_30day_avg = round_dp(mean_rate(&sorted_records, 30), 3);

    // Recovery success rate.
    let recovery_days: Vec<&&DayRecord> = sorted_records
        .iter()
        .filter(|r| r.mode == "recovery")
        .collect();
    if !recovery_days.is_empty() {
        let good = recovery_days
            .iter()
            .filter(|r| r.rating == "good" || r.rating == "fair")
            .count();
        summary.recovery_success_rate =
            round_dp(good as f64 / recovery_days.len() as f64, 3);
    }

    summary
}

/// Mean completion rate over the newest `n` records, falling back to
/// all available when there are fewer.
fn mean_rate(sorted_desc: &[&DayRecord], n: usize) -> f64 {
    if sorted_desc.is_empty() {
        return 0.0;
    }
    let window: Vec<f64> = sorted_desc
        .iter()
        .take(n.min(sorted_desc.len()))
        .map(|r| r.completion_rate())
        .collect();
    window.iter().sum::<f64>() / window.len() as f64
}

// ── Storage & refresh ─────────────────────────────────────────

/// Recompute analytics from reflections.md + state history and write
/// the result to analytics.json.
pub fn refresh_analytics(ws: &Workspace) -> Result<AnalyticsSummary> {
    let text = reflections_store::read_reflections(ws)?;
    let records = parse_reflections(&text);
    let state = state_store::load_state(ws)?;
    let summary = compute_analytics(&records, Some(&state));
    storage::write_json_atomic(&ws.analytics_path(), &summary)?;
    log::debug!(
        "[analytics] refreshed: {} days tracked",
        summary.total_days_tracked
    );
    Ok(summary)
}

/// Load cached analytics, or None when nothing has been computed yet.
pub fn load_analytics(ws: &Workspace) -> Result<Option<AnalyticsSummary>> {
    let path = ws.analytics_path();
    let text = storage::read_text(&path)?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let summary = storage::read_json(&path)?;
    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryEntry;

    const SAMPLE: &str = "\
# Reflections (rolling)

Append newest entries at the top.

---

## 2026-02-10
- Time: 2026-02-10T21:30

**Rating:** GOOD

**Mode:** COMMIT

**Done**
- Deadline paper: experiment writeup 2h
- Important project: code review 90m
- Daily maintenance 20m

**Notes**
- (none)

**Reflection**
Good productive day.

**Auto-summary**
- [Good] 2026-02-10: done 3 items.

---

## 2026-02-09
- Time: 2026-02-09T22:00

**Rating:** FAIR

**Mode:** RECOVERY

**Done**
- Important project: API refactor 2h

**Notes**
- Deadline paper: skipped due to low energy

**Reflection**
Fair day. Got the API refactor done.

**Auto-summary**
- [Fair] 2026-02-09: done 1 item.

---
";

    #[test]
    fn parses_sections_and_items() {
        let records = parse_reflections(SAMPLE);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2026-02-10");
        assert_eq!(records[0].rating, "good");
        assert_eq!(records[0].mode, "commit");
        assert_eq!(records[0].done_items.len(), 3);
        assert_eq!(records[0].all_items.len(), 3);
        assert_eq!(records[0].reflection_text, "Good productive day.");

        assert_eq!(records[1].date, "2026-02-09");
        assert_eq!(records[1].rating, "fair");
        assert_eq!(records[1].mode, "recovery");
        assert_eq!(records[1].done_items.len(), 1);
        // Skipped "Deadline paper" note joins all_items by its stem.
        assert_eq!(records[1].all_items.len(), 2);
        assert!(records[1].all_items.contains(&"Deadline paper".to_string()));
    }

    #[test]
    fn parses_empty_text() {
        assert!(parse_reflections("").is_empty());
        assert!(parse_reflections("# Reflections\n\nno entries yet\n").is_empty());
    }

    #[test]
    fn round_trips_the_writers_output() {
        use crate::models::{CheckinMode, Rating};
        use crate::storage::reflections::build_reflection_entry;
        use indexmap::IndexMap;

        let entry = build_reflection_entry(
            "2026-02-11",
            "2026-02-11T21:30+00:00",
            Rating::Fair,
            CheckinMode::Recovery,
            &["Deep work 2h".to_string()],
            &IndexMap::new(),
            "Managed one block.",
            "[Fair] 2026-02-11: done: Deep work 2h.",
        );
        let records = parse_reflections(&entry);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "2026-02-11");
        assert_eq!(records[0].rating, "fair");
        assert_eq!(records[0].mode, "recovery");
        assert_eq!(records[0].done_items, vec!["Deep work 2h"]);
        assert_eq!(records[0].reflection_text, "Managed one block.");
    }

    #[test]
    fn computes_rates_and_recovery() {
        let records = parse_reflections(SAMPLE);
        let state = State {
            history: vec![
                HistoryEntry {
                    day: "2026-02-09".to_string(),
                    streak_counted: true,
                    ..HistoryEntry::default()
                },
                HistoryEntry {
                    day: "2026-02-10".to_string(),
                    streak_counted: true,
                    ..HistoryEntry::default()
                },
            ],
            ..State::default()
        };
        let summary = compute_analytics(&records, Some(&state));
        assert_eq!(summary.total_days_tracked, 2);
        // 2026-02-10 is a Tuesday, fully done; 2026-02-09 Monday at 1/2.
        assert_eq!(summary.completion_by_weekday["tue"], 1.0);
        assert_eq!(summary.completion_by_weekday["mon"], 0.5);
        // (1.0 + 0.5) / 2
        assert_eq!(summary.rolling_7day_avg, 0.75);
        // the single recovery day rated fair
        assert_eq!(summary.recovery_success_rate, 1.0);
        // one unbroken run across both days
        assert_eq!(summary.streak_history.len(), 1);
        assert_eq!(summary.streak_history[0].length, 2);
        assert_eq!(summary.streak_history[0].start, "2026-02-09");
    }

    #[test]
    fn classifies_item_types() {
        let records = parse_reflections(SAMPLE);
        let summary = compute_analytics(&records, None);
        // every sampled item carries a duration suffix -> timed_task
        assert!(summary.completion_by_task_type.contains_key("timed_task"));
    }

    #[test]
    fn empty_records_yield_zero_summary() {
        let summary = compute_analytics(&[], None);
        assert_eq!(summary.total_days_tracked, 0);
        assert_eq!(summary.rolling_7day_avg, 0.0);
        assert!(summary.completion_by_weekday.is_empty());
    }

    #[test]
    fn streak_runs_split_on_uncounted_days() {
        let state = State {
            history: vec![
                HistoryEntry {
                    day: "2026-02-01".to_string(),
                    streak_counted: true,
                    ..HistoryEntry::default()
                },
                HistoryEntry {
                    day: "2026-02-02".to_string(),
                    streak_counted: false,
                    ..HistoryEntry::default()
                },
                HistoryEntry {
                    day: "2026-02-03".to_string(),
                    streak_counted: true,
                    ..HistoryEntry::default()
                },
                HistoryEntry {
                    day: "2026-02-04".to_string(),
                    streak_counted: true,
                    ..HistoryEntry::default()
                },
            ],
            ..State::default()
        };
        let records = vec![DayRecord {
            date: "2026-02-04".to_string(),
            ..DayRecord::default()
        }];
        let summary = compute_analytics(&records, Some(&state));
        assert_eq!(summary.streak_history.len(), 2);
        assert_eq!(summary.streak_history[0].length, 1);
        assert_eq!(summary.streak_history[0].end, "2026-02-02");
        assert_eq!(summary.streak_history[1].length, 2);
        assert_eq!(summary.streak_history[1].end, "2026-02-04");
    }

    #[test]
    fn skipped_tasks_need_three_appearances_and_half_skips() {
        let mut records = Vec::new();
        for day in ["2026-02-01", "2026-02-02", "2026-02-03", "2026-02-04"] {
            records.push(DayRecord {
                date: day.to_string(),
                all_items: vec!["Stretching 10m".to_string(), "Writing 1h".to_string()],
                done_items: vec!["Writing 1h".to_string()],
                ..DayRecord::default()
            });
        }
        let summary = compute_analytics(&records, None);
        assert_eq!(summary.most_skipped_tasks, vec!["Stretching"]);
    }

    #[test]
    fn refresh_writes_analytics_json() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        std::fs::create_dir_all(ws.reflections_path().parent().unwrap()).unwrap();
        std::fs::write(ws.reflections_path(), SAMPLE).unwrap();

        let summary = refresh_analytics(&ws).unwrap();
        assert_eq!(summary.total_days_tracked, 2);

        let loaded = load_analytics(&ws).unwrap().unwrap();
        assert_eq!(loaded.total_days_tracked, 2);
        assert_eq!(loaded.rolling_7day_avg, summary.rolling_7day_avg);
    }

    #[test]
    fn load_analytics_none_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        assert!(load_analytics(&ws).unwrap().is_none());
    }
}
