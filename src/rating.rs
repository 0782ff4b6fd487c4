//! Day rating, streak eligibility, and the auto-summary sentence.
//!
//! All three are pure and deterministic in their inputs; the finalizer
//! layers the recovery-mode adjustments on top.

use crate::models::Rating;

/// Rate the day.
///
/// Good: meaningful progress (at least half the items, or 2+, or a
/// timed item done). Fair: some progress or a solid reflection
/// (>= 30 chars trimmed). Bad: nothing notable.
pub fn compute_rating(done_count: u32, total_items: u32, reflection: &str, any_timed: bool) -> Rating {
    let reflection_len = reflection.trim().chars().count();
    if done_count >= std::cmp::max(1, total_items / 2)
        || done_count >= 2
        || (any_timed && done_count >= 1)
    {
        return Rating::Good;
    }
    if done_count >= 1 || reflection_len >= 30 {
        return Rating::Fair;
    }
    Rating::Bad
}

/// A day counts toward the streak when at least one item was done, the
/// reflection is meaningful, or the plan was actively edited.
pub fn counts_for_streak(done_count: u32, reflection: &str, plan_changed: bool) -> bool {
    done_count >= 1 || reflection.trim().chars().count() >= 30 || plan_changed
}

/// One-sentence auto-summary recorded in the reflection entry.
pub fn summarize_paragraph(
    day: &str,
    rating: Rating,
    done_items: &[String],
    minutes_total: u32,
    reflection: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !done_items.is_empty() {
        let top: Vec<&str> = done_items.iter().take(3).map(String::as_str).collect();
        let more = if done_items.len() <= 3 {
            String::new()
        } else {
            format!(" (+{} more)", done_items.len() - 3)
        };
        parts.push(format!("done: {}{}", top.join(", "), more));
    }
    if minutes_total > 0 {
        parts.push(format!("logged ~{} min", minutes_total));
    }
    if !reflection.trim().is_empty() {
        parts.push("reflection recorded".to_string());
    }
    let body = if parts.is_empty() {
        "no notable progress logged".to_string()
    } else {
        parts.join("; ")
    };
    let advice = match rating {
        Rating::Good => "Keep the momentum; protect one deep block early tomorrow.",
        Rating::Fair => "Aim for one deeper block next; reduce context switching.",
        Rating::Bad => "Reset: pick one small win + one deep block tomorrow.",
    };
    format!("[{}] {}: {}. {}", rating.lead(), day, body, advice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_good_paths() {
        // at least half of the items
        assert_eq!(compute_rating(2, 4, "", false), Rating::Good);
        // two or more regardless of total
        assert_eq!(compute_rating(2, 10, "", false), Rating::Good);
        // a single timed item
        assert_eq!(compute_rating(1, 10, "", true), Rating::Good);
        // zero total: max(1, 0) gate still needs one done
        assert_eq!(compute_rating(1, 0, "", false), Rating::Good);
    }

    #[test]
    fn rating_fair_paths() {
        assert_eq!(compute_rating(1, 10, "", false), Rating::Fair);
        let long_reflection = "x".repeat(35);
        assert_eq!(compute_rating(0, 4, &long_reflection, false), Rating::Fair);
    }

    #[test]
    fn rating_bad_when_nothing_notable() {
        assert_eq!(compute_rating(0, 4, "", false), Rating::Bad);
        assert_eq!(compute_rating(0, 4, "short note", false), Rating::Bad);
        // whitespace does not count toward the 30-char threshold
        let padded = format!("{}hi", " ".repeat(40));
        assert_eq!(compute_rating(0, 4, &padded, false), Rating::Bad);
    }

    #[test]
    fn streak_counting_rules() {
        assert!(counts_for_streak(1, "", false));
        assert!(counts_for_streak(0, &"x".repeat(30), false));
        assert!(counts_for_streak(0, "", true));
        assert!(!counts_for_streak(0, "brief", false));
    }

    #[test]
    fn summary_lists_top_three_and_overflow() {
        let done: Vec<String> = ["A", "B", "C", "D", "E"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let s = summarize_paragraph("2026-02-11", Rating::Good, &done, 0, "");
        assert!(s.starts_with("[Good] 2026-02-11: done: A, B, C (+2 more)."));
        assert!(s.ends_with("Keep the momentum; protect one deep block early tomorrow."));
    }

    #[test]
    fn summary_mentions_minutes_and_reflection() {
        let s = summarize_paragraph("2026-02-11", Rating::Fair, &[], 45, "thoughts");
        assert!(s.contains("logged ~45 min"));
        assert!(s.contains("reflection recorded"));
    }

    #[test]
    fn summary_empty_day() {
        let s = summarize_paragraph("2026-02-11", Rating::Bad, &[], 0, " ");
        assert_eq!(
            s,
            "[Bad] 2026-02-11: no notable progress logged. \
             Reset: pick one small win + one deep block tomorrow."
        );
    }
}
