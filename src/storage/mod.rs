//! Crash-safe file I/O for the workspace.
//!
//! Every non-trivial write goes through `atomic_write`: write to a
//! sibling temp file under an exclusive advisory lock, flush, fsync,
//! then rename over the destination. Readers see either the old or the
//! new content, never a mix; the most recent successful rename wins.
//! Reads are plain and treat missing files as empty/defaults.

pub mod draft;
pub mod plan;
pub mod profile;
pub mod reflections;
pub mod state;
pub mod tasks;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PlannerError, Result};

/// Read a text file, returning an empty string if missing.
pub fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

/// Read a JSON file into `T`, returning `T::default()` when the file is
/// missing or empty. Malformed content is a `Parse` error.
pub fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&text).map_err(|e| PlannerError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read a YAML file into `T`, returning `T::default()` when the file is
/// missing or empty. Malformed content is a `Parse` error.
pub fn read_yaml<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let text = read_text(path)?;
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(&text).map_err(|e| PlannerError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| PlannerError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    atomic_write(path, &format!("{}\n", json))
}

pub fn write_yaml_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(|e| PlannerError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    atomic_write(path, &yaml)
}

/// Write to `.{name}.tmp` (exclusive flock, write, flush, fsync), then
/// rename over `path`. The temp file is removed on any failure.
fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| PlannerError::validation(format!("path has no parent: {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .ok_or_else(|| PlannerError::validation(format!("path has no file name: {}", path.display())))?
        .to_string_lossy()
        .into_owned();
    let tmp = parent.join(format!(".{}.tmp", name));

    let result = (|| -> Result<()> {
        let mut file = OpenOptions::new().write(true).create(true).open(&tmp)?;
        file.lock_exclusive()?;
        let written = (|| -> std::io::Result<()> {
            file.set_len(0)?;
            file.write_all(content.as_bytes())?;
            file.flush()?;
            file.sync_all()
        })();
        let _ = FileExt::unlock(&file);
        written?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
        }

        drop(file);
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if result.is_err() && tmp.exists() {
        let _ = fs::remove_file(&tmp);
    }
    result
}
