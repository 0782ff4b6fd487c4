//! Analytics, reflections, and the agent-context artifact.

use serde::Serialize;

use crate::agent_context::{self, AgentContext};
use crate::analytics;
use crate::error::Result;
use crate::models::AnalyticsSummary;
use crate::storage::reflections as reflections_store;
use crate::workspace::Workspace;

/// Cached analytics, computing them on first access.
pub fn get_analytics(ws: &Workspace) -> Result<AnalyticsSummary> {
    match analytics::load_analytics(ws)? {
        Some(summary) => Ok(summary),
        None => analytics::refresh_analytics(ws),
    }
}

pub fn refresh_analytics(ws: &Workspace) -> Result<AnalyticsSummary> {
    analytics::refresh_analytics(ws)
}

/// A parsed reflection entry in API shape.
#[derive(Debug, Clone, Serialize)]
pub struct ReflectionRecord {
    pub date: String,
    pub rating: String,
    pub mode: String,
    pub done_items: Vec<String>,
    pub completion_rate: f64,
    pub reflection: String,
}

/// The newest `n` reflection entries (the journal keeps newest first).
pub fn get_recent_reflections(ws: &Workspace, n: usize) -> Result<Vec<ReflectionRecord>> {
    let text = reflections_store::read_reflections(ws)?;
    let records = analytics::parse_reflections(&text);
    Ok(records
        .into_iter()
        .take(n)
        .map(|r| ReflectionRecord {
            date: r.date.clone(),
            rating: r.rating.clone(),
            mode: r.mode.clone(),
            completion_rate: r.completion_rate(),
            done_items: r.done_items,
            reflection: r.reflection_text,
        })
        .collect())
}

/// Regenerate and return the agent-context artifact.
pub fn get_agent_context(ws: &Workspace) -> Result<AgentContext> {
    agent_context::generate_agent_context(ws, ws.now())
}
