use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Identifier for one pipeline run. Events of independent runs sharing a
/// sink carry different ids.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string()[..8].to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of a task execution an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    End,
}

/// One transcript entry. Immutable once appended to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub run_id: RunId,
    pub agent_display_name: String,
    pub phase: Phase,
    /// Task input for `Start`, produced output for `End`.
    pub payload: String,
    pub at: DateTime<Utc>,
}

impl Event {
    pub fn start(run_id: &RunId, agent: &str, input: &str) -> Self {
        Self::new(run_id, agent, Phase::Start, input)
    }

    pub fn end(run_id: &RunId, agent: &str, output: &str) -> Self {
        Self::new(run_id, agent, Phase::End, output)
    }

    fn new(run_id: &RunId, agent: &str, phase: Phase, payload: &str) -> Self {
        Self {
            run_id: run_id.clone(),
            agent_display_name: agent.to_string(),
            phase,
            payload: payload.to_string(),
            at: Utc::now(),
        }
    }
}

/// Markdown transcript entry.
impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase {
            Phase::Start => write!(f, "## {} (input):\n{}", self.agent_display_name, self.payload),
            Phase::End => write!(f, "## {}:\n{}", self.agent_display_name, self.payload),
        }
    }
}
