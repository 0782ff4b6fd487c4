//! Constraint-based schedule generation.
//!
//! Builds a time-blocked day plan from the profile's work blocks, the
//! task catalog, and the target date: subtract routines and weekly
//! events from the work blocks, score tasks, then greedily place
//! chunks into the remaining slots with 5-minute buffers.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::Result;
use crate::models::{
    minutes_of, round_dp, weekday_tag, BlockType, DaySchedule, Profile, ScheduledBlock, Task,
    TaskType, TasksFile, TimeRange,
};
use crate::storage::{self, plan as plan_store, profile as profile_store, tasks as task_store};
use crate::workspace::Workspace;

const BUFFER_MINUTES: i64 = 5;

/// Slots shorter than this are not worth scheduling into.
const MIN_SLOT_MINUTES: i64 = 10;

// ── Slot computation ──────────────────────────────────────────

/// Add minutes to a time of day, clamping to [00:00, 23:59].
fn time_add_minutes(t: NaiveTime, minutes: i64) -> NaiveTime {
    let total = (minutes_of(t) + minutes).clamp(0, 23 * 60 + 59);
    NaiveTime::from_hms_opt((total / 60) as u32, (total % 60) as u32, 0)
        .unwrap_or(t)
}

/// Free work slots for `target_date`: the profile's work blocks minus
/// every fixed routine and minus this weekday's events padded with
/// commute time on each side. Slots under 10 minutes are dropped.
pub fn compute_available_slots(profile: &Profile, target_date: NaiveDate) -> Vec<TimeRange> {
    let weekday = weekday_tag(target_date.weekday());

    let mut slots: Vec<TimeRange> = profile.work_blocks.clone();

    let mut blocked: Vec<TimeRange> = Vec::new();
    for routine in profile.fixed_routines.values() {
        blocked.push(routine.window);
    }
    for event in &profile.weekly_fixed_events {
        if event.day.to_lowercase() == weekday {
            let commute = event.commute_min_each_way as i64;
            blocked.push(TimeRange::new(
                time_add_minutes(event.time.start, -commute),
                time_add_minutes(event.time.end, commute),
            ));
        }
    }

    for block in &blocked {
        let mut remaining = Vec::new();
        for slot in &slots {
            remaining.extend(slot.subtract(block));
        }
        slots = remaining;
    }

    slots.retain(|s| s.duration_minutes() >= MIN_SLOT_MINUTES);
    slots.sort_by_key(|s| s.start);
    slots
}

// ── Priority scoring ──────────────────────────────────────────

/// Composite scheduling score: base priority plus deadline urgency,
/// weekly budget gap, or the small ritual boost.
pub fn compute_task_priority_score(task: &Task, today: NaiveDate) -> f64 {
    let mut score = task.priority as f64;

    match task.task_type {
        TaskType::DeadlineProject => {
            match task.deadline.as_deref().filter(|d| !d.is_empty()) {
                Some(deadline) => {
                    if let Ok(deadline_date) = NaiveDate::parse_from_str(deadline, "%Y-%m-%d") {
                        let days_left = (deadline_date - today).num_days().max(1);
                        if let Some(remaining) = task.remaining_hours.filter(|r| *r > 0.0) {
                            score += remaining / days_left as f64 * 5.0;
                        }
                    }
                }
                None => {
                    if task.remaining_hours.unwrap_or(0.0) > 0.0 {
                        score += 2.0;
                    }
                }
            }
        }
        TaskType::WeeklyBudget => {
            if let Some(target) = task.target_hours_per_week.filter(|t| *t > 0.0) {
                let gap = (target - task.hours_this_week).max(0.0);
                score += gap / target * 3.0;
            }
        }
        TaskType::DailyRitual => score += 1.0,
        TaskType::OpenEnded => {}
    }

    score
}

/// Minutes a task wants today. Rituals take their daily estimate,
/// deadline projects one big chunk, weekly budgets roughly a third of
/// the remaining budget clamped to the chunk bounds.
fn daily_demand_minutes(task: &Task) -> i64 {
    match task.task_type {
        TaskType::DailyRitual => task
            .estimated_minutes_per_day
            .filter(|m| *m > 0)
            .unwrap_or(15) as i64,
        TaskType::DeadlineProject => task.max_chunk_minutes as i64,
        TaskType::WeeklyBudget => match task.target_hours_per_week {
            Some(target) if target > 0.0 => {
                let remaining_hours = (target - task.hours_this_week).max(0.0);
                let needed = (task.max_chunk_minutes as i64).min((remaining_hours * 60.0 / 3.0) as i64);
                needed.max(task.min_chunk_minutes as i64)
            }
            _ => task.min_chunk_minutes as i64,
        },
        TaskType::OpenEnded => task.min_chunk_minutes as i64,
    }
}

// ── Schedule generation ───────────────────────────────────────

/// Greedy allocation: tasks in score order, slots in time order, one
/// cursor per slot, 5-minute buffer after each placed chunk. A chunk is
/// never created below the task's min_chunk. Tasks that get nothing
/// land in `unscheduled_tasks`.
pub fn generate_schedule(
    profile: &Profile,
    tasks_file: &TasksFile,
    target_date: NaiveDate,
) -> DaySchedule {
    let slots = compute_available_slots(profile, target_date);
    let total_available: i64 = slots.iter().map(|s| s.duration_minutes()).sum();

    let mut scored: Vec<(f64, &Task)> = tasks_file
        .tasks
        .iter()
        .filter(|t| t.status == crate::models::TaskStatus::Active)
        .map(|t| (compute_task_priority_score(t, target_date), t))
        .collect();
    // Stable sort: equal scores keep catalog order.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut slot_cursors: Vec<(NaiveTime, NaiveTime)> =
        slots.iter().map(|s| (s.start, s.end)).collect();
    let mut blocks: Vec<ScheduledBlock> = Vec::new();
    let mut unscheduled: Vec<String> = Vec::new();

    for (_score, task) in scored {
        let mut remaining = daily_demand_minutes(task);
        if remaining <= 0 {
            continue;
        }
        let mut allocated = false;

        for cursor in slot_cursors.iter_mut() {
            if remaining <= 0 {
                break;
            }
            let (cursor_start, slot_end) = *cursor;
            let available = minutes_of(slot_end) - minutes_of(cursor_start);
            if available < task.min_chunk_minutes as i64 {
                continue;
            }

            let chunk = remaining.min(available).min(task.max_chunk_minutes as i64);
            if chunk < task.min_chunk_minutes as i64 {
                continue;
            }

            let block_end = time_add_minutes(cursor_start, chunk);
            blocks.push(ScheduledBlock {
                start: cursor_start,
                end: block_end,
                task_id: task.id.clone(),
                task_title: task.title.clone(),
                duration_minutes: chunk,
                block_type: BlockType::Task,
            });

            *cursor = (time_add_minutes(block_end, BUFFER_MINUTES), slot_end);
            remaining -= chunk;
            allocated = true;
        }

        if !allocated {
            unscheduled.push(task.id.clone());
        }
    }

    // Routines and this weekday's events as informational blocks.
    let mut info_blocks: Vec<ScheduledBlock> = Vec::new();
    for (name, routine) in &profile.fixed_routines {
        info_blocks.push(ScheduledBlock {
            start: routine.window.start,
            end: routine.window.end,
            task_id: name.clone(),
            task_title: title_case(&name.replace('_', " ")),
            duration_minutes: routine.window.duration_minutes(),
            block_type: BlockType::Routine,
        });
    }
    let weekday = weekday_tag(target_date.weekday());
    for event in &profile.weekly_fixed_events {
        if event.day.to_lowercase() == weekday {
            info_blocks.push(ScheduledBlock {
                start: event.time.start,
                end: event.time.end,
                task_id: event.name.to_lowercase().replace(' ', "-"),
                task_title: event.name.clone(),
                duration_minutes: event.time.duration_minutes(),
                block_type: BlockType::Event,
            });
        }
    }

    let total_work: i64 = blocks.iter().map(|b| b.duration_minutes).sum();

    let mut all_blocks = blocks;
    all_blocks.extend(info_blocks);
    all_blocks.sort_by_key(|b| b.start);

    DaySchedule {
        date: target_date.format("%Y-%m-%d").to_string(),
        blocks: all_blocks,
        unscheduled_tasks: unscheduled,
        total_work_minutes: total_work,
        utilization_pct: if total_available > 0 {
            round_dp(total_work as f64 / total_available as f64 * 100.0, 1)
        } else {
            0.0
        },
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ── plan.md rendering ─────────────────────────────────────────

/// " 2h" / " 1h30m" / " 45m", with the leading space built in.
fn format_duration(minutes: i64) -> String {
    if minutes >= 60 {
        let h = minutes / 60;
        let m = minutes % 60;
        if m == 0 {
            format!(" {}h", h)
        } else {
            format!(" {}h{:02}m", h, m)
        }
    } else {
        format!(" {}m", minutes)
    }
}

/// Render a schedule into the plan.md contract: header, top
/// priorities, schedule lines, minimum-viable-day checkboxes, and the
/// carryover list.
pub fn schedule_to_plan_md(schedule: &DaySchedule, tasks_file: &TasksFile) -> String {
    let mut lines: Vec<String> = vec![format!("# Plan \u{2014} {}", schedule.date), String::new()];

    let task_blocks: Vec<&ScheduledBlock> = schedule
        .blocks
        .iter()
        .filter(|b| b.block_type == BlockType::Task)
        .collect();

    // Top priorities: first occurrence per task, at most five.
    let mut seen_tasks: Vec<&str> = Vec::new();
    let mut priorities: Vec<&ScheduledBlock> = Vec::new();
    for &block in &task_blocks {
        if !seen_tasks.contains(&block.task_id.as_str()) {
            seen_tasks.push(&block.task_id);
            priorities.push(block);
        }
    }
    if !priorities.is_empty() {
        lines.push("## Top priorities".to_string());
        for (i, block) in priorities.iter().take(5).enumerate() {
            lines.push(format!("{}) {}", i + 1, block.task_title));
        }
        lines.push(String::new());
    }

    lines.push("## Schedule".to_string());
    for block in &schedule.blocks {
        let dur = if block.block_type == BlockType::Task {
            format_duration(block.duration_minutes)
        } else {
            String::new()
        };
        lines.push(format!(
            "- {}\u{2013}{} {}{}",
            block.start.format("%H:%M"),
            block.end.format("%H:%M"),
            block.task_title,
            dur
        ));
    }
    lines.push(String::new());

    lines.push("## Minimum viable day".to_string());
    let mut seen_labels: Vec<String> = Vec::new();
    for block in &task_blocks {
        let label = format!("{}{}", block.task_title, format_duration(block.duration_minutes));
        if !seen_labels.contains(&label) {
            lines.push(format!("- [ ] {}", label));
            seen_labels.push(label);
        }
    }
    lines.push(String::new());

    if !schedule.unscheduled_tasks.is_empty() {
        lines.push("## Carryover".to_string());
        for task_id in &schedule.unscheduled_tasks {
            let title = task_store::find_task(tasks_file, task_id)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| task_id.clone());
            lines.push(format!(
                "- {} (deferred \u{2014} insufficient time slots)",
                title
            ));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

// ── High-level entry ──────────────────────────────────────────

/// Load workspace data, generate the schedule for `target_date`
/// (today when None), write plan.md preserving the previous revision,
/// and return the rendered text.
pub fn generate_plan(ws: &Workspace, target_date: Option<NaiveDate>) -> Result<String> {
    let profile = profile_store::load_profile(ws)?;
    let tasks_file = task_store::load_tasks(ws)?;
    let target_date = target_date.unwrap_or_else(|| ws.today());

    let schedule = generate_schedule(&profile, &tasks_file, target_date);
    let plan_md = schedule_to_plan_md(&schedule, &tasks_file);

    let existing = plan_store::read_plan(ws)?;
    if !existing.trim().is_empty() {
        storage::write_text_atomic(&ws.plan_prev_path(), &existing)?;
    }
    storage::write_text_atomic(&ws.plan_path(), &plan_md)?;

    log::info!(
        "[scheduler] generated plan for {} ({} blocks, {} unscheduled)",
        schedule.date,
        schedule.blocks.len(),
        schedule.unscheduled_tasks.len()
    );
    Ok(plan_md)
}
