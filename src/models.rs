//! Typed entities for the planning workspace.
//!
//! Persisted JSON uses camelCase keys; YAML (profile, tasks) uses
//! snake_case. Unknown keys are ignored on read; missing keys take
//! defaults so hand-edited files stay loadable. Fields holding their
//! default value are elided on write.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveTime;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Primitives ────────────────────────────────────────────────

/// A start-end time range within a single day, serialized as
/// `"HH:MM-HH:MM"`. Parsing accepts `-`, `–`, or `—` as separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> TimeRange {
        TimeRange { start, end }
    }

    pub fn parse(s: &str) -> Result<TimeRange, String> {
        let normalized = s.replace('\u{2013}', "-").replace('\u{2014}', "-");
        let parts: Vec<&str> = normalized.split('-').collect();
        if parts.len() != 2 {
            return Err(format!("invalid time range: {:?}", s));
        }
        Ok(TimeRange {
            start: parse_hhmm(parts[0].trim()).ok_or_else(|| format!("invalid time: {:?}", parts[0]))?,
            end: parse_hhmm(parts[1].trim()).ok_or_else(|| format!("invalid time: {:?}", parts[1]))?,
        })
    }

    pub fn duration_minutes(&self) -> i64 {
        (minutes_of(self.end) - minutes_of(self.start)).max(0)
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Remaining pieces of `self` after removing `other` (0, 1, or 2).
    pub fn subtract(&self, other: &TimeRange) -> Vec<TimeRange> {
        if !self.overlaps(other) {
            return vec![*self];
        }
        let mut result = Vec::new();
        if self.start < other.start {
            result.push(TimeRange::new(self.start, other.start));
        }
        if other.end < self.end {
            result.push(TimeRange::new(other.end, self.end));
        }
        result
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

impl std::str::FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::parse(s)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TimeRange::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse "HH:MM" (also accepts "HH:MM:SS").
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

pub fn minutes_of(t: NaiveTime) -> i64 {
    use chrono::Timelike;
    t.hour() as i64 * 60 + t.minute() as i64
}

fn hhmm<S: Serializer>(t: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&t.format("%H:%M").to_string())
}

/// Weekday tags as used by profiles, tasks files, and analytics.
pub const DAY_NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

pub fn weekday_tag(day: chrono::Weekday) -> &'static str {
    DAY_NAMES[day.num_days_from_monday() as usize]
}

/// Index of a weekday tag (mon=0 .. sun=6).
pub fn weekday_tag_index(tag: &str) -> Option<u32> {
    DAY_NAMES
        .iter()
        .position(|d| *d == tag)
        .map(|i| i as u32)
}

pub(crate) fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

// ── Profile ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRoutine {
    pub window: TimeRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyEvent {
    pub name: String,
    /// Weekday tag: mon, tue, wed, thu, fri, sat, sun.
    pub day: String,
    pub time: TimeRange,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub commute_min_each_way: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Commute {
    #[serde(default)]
    pub typical_one_way_min: u32,
}

/// User constraints. Read-only to the engine; re-read on every
/// operation so live edits take effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub timezone: String,
    pub wake_time: String,
    pub daily_plan_delivery_time: String,
    pub work_blocks: Vec<TimeRange>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fixed_routines: BTreeMap<String, FixedRoutine>,
    #[serde(skip_serializing_if = "commute_is_zero")]
    pub commute: Commute,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weekly_fixed_events: Vec<WeeklyEvent>,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile {
            timezone: "UTC".to_string(),
            wake_time: "08:00".to_string(),
            daily_plan_delivery_time: "08:30".to_string(),
            work_blocks: Vec::new(),
            fixed_routines: BTreeMap::new(),
            commute: Commute::default(),
            weekly_fixed_events: Vec::new(),
        }
    }
}

fn commute_is_zero(c: &Commute) -> bool {
    c.typical_one_way_min == 0
}

// ── Tasks ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DeadlineProject,
    WeeklyBudget,
    DailyRitual,
    OpenEnded,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::DeadlineProject => write!(f, "deadline_project"),
            TaskType::WeeklyBudget => write!(f, "weekly_budget"),
            TaskType::DailyRitual => write!(f, "daily_ritual"),
            TaskType::OpenEnded => write!(f, "open_ended"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Active,
    Paused,
    Complete,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Active => write!(f, "active"),
            TaskStatus::Paused => write!(f, "paused"),
            TaskStatus::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub status: TaskStatus,
    // deadline_project fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    // weekly_budget fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_hours_per_week: Option<f64>,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub hours_this_week: f64,
    // daily_ritual fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes_per_day: Option<u32>,
    // scheduling hints
    #[serde(default = "default_min_chunk", skip_serializing_if = "is_default_min_chunk")]
    pub min_chunk_minutes: u32,
    #[serde(default = "default_max_chunk", skip_serializing_if = "is_default_max_chunk")]
    pub max_chunk_minutes: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

pub const DEFAULT_MIN_CHUNK_MINUTES: u32 = 25;
pub const DEFAULT_MAX_CHUNK_MINUTES: u32 = 180;

fn default_priority() -> i64 {
    5
}

fn default_min_chunk() -> u32 {
    DEFAULT_MIN_CHUNK_MINUTES
}

fn default_max_chunk() -> u32 {
    DEFAULT_MAX_CHUNK_MINUTES
}

fn is_default_min_chunk(v: &u32) -> bool {
    *v == DEFAULT_MIN_CHUNK_MINUTES
}

fn is_default_max_chunk(v: &u32) -> bool {
    *v == DEFAULT_MAX_CHUNK_MINUTES
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksFile {
    /// Weekday tag on which the weekly-budget window restarts.
    pub week_start: String,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub archived: Vec<Task>,
}

impl Default for TasksFile {
    fn default() -> TasksFile {
        TasksFile {
            week_start: "mon".to_string(),
            tasks: Vec::new(),
            archived: Vec::new(),
        }
    }
}

// ── Check-in ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckinMode {
    #[default]
    Commit,
    Recovery,
}

impl CheckinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckinMode::Commit => "commit",
            CheckinMode::Recovery => "recovery",
        }
    }
}

impl fmt::Display for CheckinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CheckinMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Unknown or oddly-cased values normalize to commit rather than failing
// the whole draft load.
impl<'de> Deserialize<'de> for CheckinMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.trim().to_lowercase().as_str() {
            "recovery" => CheckinMode::Recovery,
            _ => CheckinMode::Commit,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinItem {
    pub label: String,
    pub done: bool,
    pub comment: String,
}

/// Today's in-progress checkin, auto-saved continuously. Keys in
/// `items` are plan-line keys (`line-<i>`); insertion order is kept so
/// entries render in plan order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinDraft {
    pub day: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    pub mode: CheckinMode,
    pub items: IndexMap<String, CheckinItem>,
    pub reflection: String,
}

impl CheckinDraft {
    /// An empty draft for the given day.
    pub fn empty(day: &str) -> CheckinDraft {
        CheckinDraft {
            day: day.to_string(),
            ..CheckinDraft::default()
        }
    }
}

// ── State ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEntry {
    pub day: String,
    pub rating: String,
    pub mode: String,
    pub streak_counted: bool,
    pub done_count: u32,
    pub total: u32,
}

/// Process-wide aggregate persisted in state.json. `history` holds at
/// most one entry per day, capped at the most recent 30.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct State {
    pub streak: u32,
    pub last_streak_date: Option<String>,
    pub last_rating: Option<String>,
    pub last_mode: Option<String>,
    pub last_summary: Option<String>,
    pub last_finalized_date: Option<String>,
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub weekly_budget_tracking: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_start_date: Option<String>,
}

// ── Rating ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Fair,
    Bad,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Good => "good",
            Rating::Fair => "fair",
            Rating::Bad => "bad",
        }
    }

    /// Capitalized form used by the auto-summary prefix.
    pub fn lead(&self) -> &'static str {
        match self {
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Bad => "Bad",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Plan checkbox ─────────────────────────────────────────────

/// Derived from plan.md, never persisted. `key` is `line-<i>` by
/// zero-based line position, so duplicate labels stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanCheckbox {
    pub key: String,
    pub label: String,
    pub checked: bool,
}

// ── Focus session ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusSession {
    #[serde(alias = "task_id")]
    pub task_id: String,
    #[serde(alias = "task_label")]
    pub task_label: String,
    #[serde(alias = "started_at")]
    pub started_at: String,
    #[serde(alias = "planned_minutes")]
    pub planned_minutes: u32,
    #[serde(alias = "ended_at")]
    pub ended_at: Option<String>,
    #[serde(alias = "elapsed_minutes")]
    pub elapsed_minutes: f64,
    pub completed: bool,
    pub interruptions: u32,
    pub notes: String,
}

impl Default for FocusSession {
    fn default() -> FocusSession {
        FocusSession {
            task_id: String::new(),
            task_label: String::new(),
            started_at: String::new(),
            planned_minutes: 25,
            ended_at: None,
            elapsed_minutes: 0.0,
            completed: false,
            interruptions: 0,
            notes: String::new(),
        }
    }
}

/// At most one session is active at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusState {
    #[serde(alias = "active_session")]
    pub active_session: Option<FocusSession>,
    pub history: Vec<FocusSession>,
}

// ── Scheduler output ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Task,
    Routine,
    Event,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    #[serde(serialize_with = "hhmm")]
    pub start: NaiveTime,
    #[serde(serialize_with = "hhmm")]
    pub end: NaiveTime,
    pub task_id: String,
    pub task_title: String,
    pub duration_minutes: i64,
    pub block_type: BlockType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: String,
    pub blocks: Vec<ScheduledBlock>,
    pub unscheduled_tasks: Vec<String>,
    pub total_work_minutes: i64,
    /// Task minutes over total slot minutes, rounded to 0.1.
    pub utilization_pct: f64,
}

// ── Analytics ─────────────────────────────────────────────────

/// One parsed reflection entry. Internal to the analytics engine.
#[derive(Debug, Clone, Default)]
pub struct DayRecord {
    pub date: String,
    pub rating: String,
    pub mode: String,
    pub done_items: Vec<String>,
    pub all_items: Vec<String>,
    pub reflection_text: String,
    pub notes: Vec<String>,
}

impl DayRecord {
    pub fn completion_rate(&self) -> f64 {
        if self.all_items.is_empty() {
            return 0.0;
        }
        self.done_items.len() as f64 / self.all_items.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakRun {
    pub start: String,
    pub end: String,
    pub length: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSummary {
    pub completion_by_weekday: BTreeMap<String, f64>,
    pub completion_by_task_type: BTreeMap<String, f64>,
    pub best_time_blocks: Vec<String>,
    pub most_skipped_tasks: Vec<String>,
    pub streak_history: Vec<StreakRun>,
    #[serde(rename = "rolling7dayAvg")]
    pub rolling_7day_avg: f64,
    #[serde(rename = "rolling30dayAvg")]
    pub rolling_30day_avg: f64,
    pub recovery_success_rate: f64,
    pub total_days_tracked: u32,
}
