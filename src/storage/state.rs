//! State persistence.
//!
//! Storage: `<root>/planner/state.json`. Owned by the finalizer; other
//! components read it. Missing file loads as the zero state.

use crate::error::Result;
use crate::models::State;
use crate::workspace::Workspace;

pub fn load_state(ws: &Workspace) -> Result<State> {
    super::read_json(&ws.state_path())
}

pub fn save_state(ws: &Workspace, state: &State) -> Result<()> {
    super::write_json_atomic(&ws.state_path(), state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::at(tmp.path());

        let mut state = State::default();
        state.streak = 4;
        state.last_finalized_date = Some("2026-02-11".to_string());
        save_state(&ws, &state).unwrap();

        let loaded = load_state(&ws).unwrap();
        assert_eq!(loaded.streak, 4);
        assert_eq!(loaded.last_finalized_date.as_deref(), Some("2026-02-11"));
    }
}
