//! Workspace root resolution, derived paths, and the user clock.
//!
//! The workspace is a directory tree containing `planner/` and
//! `reflections/`. Its location comes from `PLANNER_ROOT`, falling back
//! to `<home>/planner`. A `Workspace` is resolved once per entry point
//! (CLI command or embedding caller) and passed down; nothing below this
//! layer consults the environment.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::models::Profile;
use crate::storage;

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Resolve from `PLANNER_ROOT`, defaulting to `<home>/planner`.
    pub fn resolve() -> Workspace {
        let root = std::env::var("PLANNER_ROOT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_root());
        Workspace { root }
    }

    /// Use an explicit root (tests, embedders).
    pub fn at(root: impl Into<PathBuf>) -> Workspace {
        Workspace { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    // ── Derived paths ──

    pub fn planner_dir(&self) -> PathBuf {
        self.root.join("planner")
    }

    pub fn latest_dir(&self) -> PathBuf {
        self.planner_dir().join("latest")
    }

    pub fn profile_path(&self) -> PathBuf {
        self.planner_dir().join("profile.yaml")
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.planner_dir().join("tasks.yaml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.planner_dir().join("state.json")
    }

    pub fn analytics_path(&self) -> PathBuf {
        self.planner_dir().join("analytics.json")
    }

    pub fn agent_context_path(&self) -> PathBuf {
        self.planner_dir().join("agent_context.json")
    }

    pub fn hooks_config_path(&self) -> PathBuf {
        self.planner_dir().join("hooks.yaml")
    }

    pub fn plan_path(&self) -> PathBuf {
        self.latest_dir().join("plan.md")
    }

    pub fn plan_prev_path(&self) -> PathBuf {
        self.latest_dir().join("plan_prev.md")
    }

    pub fn draft_path(&self) -> PathBuf {
        self.latest_dir().join("checkin_draft.json")
    }

    pub fn focus_path(&self) -> PathBuf {
        self.latest_dir().join("focus.json")
    }

    pub fn reflections_path(&self) -> PathBuf {
        self.root.join("reflections").join("reflections.md")
    }

    // ── Clock ──

    /// Timezone from profile.yaml, read on every call. The profile is
    /// user-editable config; the scheduler must reflect live edits.
    /// Missing or invalid values fall back to UTC.
    pub fn timezone(&self) -> Tz {
        match storage::read_yaml::<Profile>(&self.profile_path()) {
            Ok(profile) => profile.timezone.parse().unwrap_or(Tz::UTC),
            Err(e) => {
                log::warn!("[workspace] unreadable profile, using UTC: {}", e);
                Tz::UTC
            }
        }
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone())
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Today's date string (YYYY-MM-DD) in the user's timezone.
    pub fn today_str(&self) -> String {
        self.today().format("%Y-%m-%d").to_string()
    }
}

fn default_root() -> PathBuf {
    match home_dir() {
        Some(home) => PathBuf::from(home).join("planner"),
        None => PathBuf::from("planner"),
    }
}

/// Resolve the user's home directory reliably.
/// Primary: `getpwuid()` system call (works even when `$HOME` is unset).
/// Fallback: `$HOME` (Unix) or `$USERPROFILE` (Windows).
pub fn home_dir() -> Option<String> {
    #[cfg(unix)]
    {
        let pwd_home = unsafe {
            let uid = libc::getuid();
            let pw = libc::getpwuid(uid);
            if !pw.is_null() {
                let dir = (*pw).pw_dir;
                if !dir.is_null() {
                    Some(
                        std::ffi::CStr::from_ptr(dir)
                            .to_string_lossy()
                            .into_owned(),
                    )
                } else {
                    None
                }
            } else {
                None
            }
        };
        if pwd_home.is_some() {
            return pwd_home;
        }
        std::env::var("HOME").ok()
    }
    #[cfg(not(unix))]
    {
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_hang_off_root() {
        let ws = Workspace::at("/tmp/ws");
        assert_eq!(ws.tasks_path(), Path::new("/tmp/ws/planner/tasks.yaml"));
        assert_eq!(ws.plan_path(), Path::new("/tmp/ws/planner/latest/plan.md"));
        assert_eq!(
            ws.reflections_path(),
            Path::new("/tmp/ws/reflections/reflections.md")
        );
    }

    #[test]
    fn timezone_defaults_to_utc_without_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        assert_eq!(ws.timezone(), Tz::UTC);
    }

    #[test]
    fn timezone_reads_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        std::fs::create_dir_all(ws.planner_dir()).unwrap();
        std::fs::write(ws.profile_path(), "timezone: America/New_York\n").unwrap();
        assert_eq!(ws.timezone(), chrono_tz::America::New_York);
    }
}
