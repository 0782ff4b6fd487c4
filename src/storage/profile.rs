//! Profile loading.
//!
//! Storage: `<root>/planner/profile.yaml`. The profile is user-owned
//! config: the engine only ever reads it, and re-reads on every
//! operation so edits between sessions take effect immediately.

use crate::error::Result;
use crate::models::Profile;
use crate::workspace::Workspace;

pub fn load_profile(ws: &Workspace) -> Result<Profile> {
    super::read_yaml(&ws.profile_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_loads_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        let profile = load_profile(&ws).unwrap();
        assert_eq!(profile.timezone, "UTC");
    }

    #[test]
    fn malformed_profile_surfaces_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());
        std::fs::create_dir_all(ws.planner_dir()).unwrap();
        std::fs::write(ws.profile_path(), "work_blocks: [not-a-range]\n").unwrap();
        assert!(load_profile(&ws).is_err());
    }
}
