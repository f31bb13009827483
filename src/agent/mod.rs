pub mod profiles;

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::ai::{CompletionRequest, ModelClient};
use crate::protocol::{Event, RunId};
use crate::sink::EventSink;
use crate::task::{StageOutput, TaskSpec};

/// Persona of one agent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub role: String,
    pub backstory: String,
    pub goal: String,
    pub allow_delegation: bool,
    pub display_name: String,
}

impl AgentProfile {
    /// System message sent with every completion for this agent.
    pub fn system_prompt(&self) -> String {
        let mut prompt = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if !self.allow_delegation {
            prompt.push_str("\nComplete the task yourself; do not delegate it to anyone else.");
        }
        prompt
    }
}

/// Receives the start and end of every unit of work an agent performs.
pub trait TaskObserver: Send + Sync {
    fn on_start(&self, run: &RunId, agent: &str, input: &str);
    fn on_end(&self, run: &RunId, agent: &str, output: &str);
}

impl TaskObserver for EventSink {
    fn on_start(&self, run: &RunId, agent: &str, input: &str) {
        self.append(Event::start(run, agent, input));
    }

    fn on_end(&self, run: &RunId, agent: &str, output: &str) {
        self.append(Event::end(run, agent, output));
    }
}

/// A profile bound to the shared model client and an injected observer.
/// Reports exactly one start before calling the model and one end after a
/// successful reply; a failed call reports no end.
pub struct InstrumentedAgent {
    profile: Arc<AgentProfile>,
    client: Arc<dyn ModelClient>,
    observer: Arc<dyn TaskObserver>,
}

impl InstrumentedAgent {
    pub fn new(
        profile: AgentProfile,
        client: Arc<dyn ModelClient>,
        observer: Arc<dyn TaskObserver>,
    ) -> Self {
        Self {
            profile: Arc::new(profile),
            client,
            observer,
        }
    }

    pub fn profile(&self) -> &Arc<AgentProfile> {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.display_name
    }

    pub async fn execute(
        &self,
        run: &RunId,
        task: &TaskSpec,
        context: &[StageOutput],
    ) -> Result<String> {
        if !Arc::ptr_eq(&task.assigned_agent, &self.profile) {
            bail!(
                "Task assigned to {} was handed to {}",
                task.assigned_agent.display_name,
                self.profile.display_name
            );
        }

        let request = CompletionRequest {
            system: self.profile.system_prompt(),
            prompt: task.render_prompt(context),
        };

        info!("[{run}] {} started ({})", self.name(), self.client.model());
        self.observer.on_start(run, self.name(), &request.prompt);

        let output = self.client.complete(&request).await?;

        debug!("[{run}] {} produced {} bytes", self.name(), output.len());
        self.observer.on_end(run, self.name(), &output);
        Ok(output)
    }
}
