//! Lifecycle hook dispatcher.
//!
//! Hooks are shell commands configured in `planner/hooks.yaml`, keyed
//! by lifecycle point. Each hook receives the context dictionary as
//! JSON on stdin and runs with the workspace root as working
//! directory. Output is captured and truncated; timeouts and spawn
//! failures are reported as results, never as errors to the caller.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::storage;
use crate::workspace::Workspace;

pub const HOOK_POINTS: [&str; 7] = [
    "pre_finalize",
    "post_finalize",
    "pre_plan_generate",
    "post_plan_generate",
    "on_focus_start",
    "on_focus_stop",
    "on_task_complete",
];

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const OUTPUT_CAP_BYTES: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A hook entry is either a bare command string or a mapping with an
/// explicit timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HookEntry {
    Command(String),
    Detailed {
        command: String,
        #[serde(default = "default_timeout")]
        timeout: u64,
    },
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl HookEntry {
    fn command(&self) -> &str {
        match self {
            HookEntry::Command(c) => c,
            HookEntry::Detailed { command, .. } => command,
        }
    }

    fn timeout_secs(&self) -> u64 {
        match self {
            HookEntry::Command(_) => DEFAULT_TIMEOUT_SECS,
            HookEntry::Detailed { timeout, .. } => *timeout,
        }
    }
}

pub type HooksConfig = BTreeMap<String, Vec<HookEntry>>;

#[derive(Debug, Clone, Serialize)]
pub struct HookResult {
    pub command: String,
    pub hook_point: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn load_hooks_config(ws: &Workspace) -> HooksConfig {
    let path = ws.hooks_config_path();
    if !path.exists() {
        return HooksConfig::new();
    }
    match storage::read_yaml::<HooksConfig>(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("[hooks] unreadable hooks.yaml, skipping hooks: {}", e);
            HooksConfig::new()
        }
    }
}

/// Run every hook registered for `hook_point`. Unknown points and
/// missing config yield an empty result list.
pub fn run_hooks(ws: &Workspace, hook_point: &str, context: &serde_json::Value) -> Vec<HookResult> {
    if !HOOK_POINTS.contains(&hook_point) {
        return Vec::new();
    }

    let config = load_hooks_config(ws);
    let Some(entries) = config.get(hook_point) else {
        return Vec::new();
    };

    let context_json = context.to_string();
    let mut results = Vec::new();
    for entry in entries {
        let command = entry.command();
        if command.is_empty() {
            continue;
        }
        log::debug!("[hooks] {} -> {}", hook_point, command);
        results.push(run_one(ws, hook_point, command, entry.timeout_secs(), &context_json));
    }
    results
}

fn run_one(
    ws: &Workspace,
    hook_point: &str,
    command: &str,
    timeout_secs: u64,
    context_json: &str,
) -> HookResult {
    let mut result = HookResult {
        command: command.to_string(),
        hook_point: hook_point.to_string(),
        exit_code: -1,
        stdout: None,
        stderr: None,
        error: None,
    };

    let spawned = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(ws.root())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    // Feed the context and close stdin so the child sees EOF.
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(context_json.as_bytes());
    }

    // Drain output on threads; a child writing more than the pipe
    // buffer must not deadlock the wait loop.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + Duration::from_secs(timeout_secs);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                result.error = Some(e.to_string());
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    let stdout = stdout_reader.map(join_reader).unwrap_or_default();
    let stderr = stderr_reader.map(join_reader).unwrap_or_default();

    match status {
        Some(status) => {
            result.exit_code = status.code().unwrap_or(-1);
            result.stdout = Some(truncate_output(stdout));
            result.stderr = Some(truncate_output(stderr));
        }
        None => {
            if result.error.is_none() {
                result.error = Some(format!("Hook timed out after {}s", timeout_secs));
            }
        }
    }
    result
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = source.read_to_string(&mut buf);
        buf
    })
}

fn join_reader(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn truncate_output(mut s: String) -> String {
    if s.len() > OUTPUT_CAP_BYTES {
        let mut cut = OUTPUT_CAP_BYTES;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace_with_hooks(root: &std::path::Path, yaml: &str) -> Workspace {
        let ws = Workspace::at(root);
        std::fs::create_dir_all(ws.planner_dir()).unwrap();
        std::fs::write(ws.hooks_config_path(), yaml).unwrap();
        ws
    }

    #[test]
    fn no_config_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        let results = run_hooks(&ws, "post_finalize", &json!({"day": "2026-02-11"}));
        assert!(results.is_empty());
    }

    #[test]
    fn invalid_hook_point_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace_with_hooks(tmp.path(), "post_finalize:\n  - cat\n");
        assert!(run_hooks(&ws, "invalid_point", &json!({})).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn hook_receives_context_on_stdin() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace_with_hooks(tmp.path(), "post_finalize:\n  - cat\n");

        let results = run_hooks(&ws, "post_finalize", &json!({"day": "2026-02-11"}));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, 0);
        let echoed: serde_json::Value =
            serde_json::from_str(results[0].stdout.as_deref().unwrap()).unwrap();
        assert_eq!(echoed["day"], "2026-02-11");
    }

    #[cfg(unix)]
    #[test]
    fn hook_runs_in_workspace_root() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace_with_hooks(tmp.path(), "post_finalize:\n  - pwd\n");
        let results = run_hooks(&ws, "post_finalize", &json!({}));
        let cwd = results[0].stdout.as_deref().unwrap().trim().to_string();
        assert_eq!(
            std::fs::canonicalize(cwd).unwrap(),
            std::fs::canonicalize(ws.root()).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn timed_out_hook_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace_with_hooks(
            tmp.path(),
            "post_finalize:\n  - command: sleep 10\n    timeout: 1\n",
        );

        let results = run_hooks(&ws, "post_finalize", &json!({"day": "2026-02-11"}));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, -1);
        assert!(results[0]
            .error
            .as_deref()
            .unwrap()
            .to_lowercase()
            .contains("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = workspace_with_hooks(tmp.path(), "post_finalize:\n  - \"exit 3\"\n");
        let results = run_hooks(&ws, "post_finalize", &json!({}));
        assert_eq!(results[0].exit_code, 3);
    }

    #[test]
    fn output_truncation_respects_char_boundaries() {
        let long = "é".repeat(OUTPUT_CAP_BYTES); // 2 bytes each
        let truncated = truncate_output(long);
        assert!(truncated.len() <= OUTPUT_CAP_BYTES);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
