use std::fmt;
use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::agent::{profiles, InstrumentedAgent, TaskObserver};
use crate::ai::{build_client, ModelClient};
use crate::config::AppConfig;
use crate::error::CrewError;
use crate::health;
use crate::protocol::RunId;
use crate::sink::EventSink;
use crate::task::{self, StageOutput, TaskSpec, ARTICLE_WORD_LIMIT};

/// The two stages of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Research,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Research => write!(f, "research"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Init,
    ResearchRunning,
    ResearchDone,
    WriteRunning,
    WriteDone,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::WriteDone | Self::Failed)
    }

    fn next(self) -> Self {
        match self {
            Self::Init => Self::ResearchRunning,
            Self::ResearchRunning => Self::ResearchDone,
            Self::ResearchDone => Self::WriteRunning,
            Self::WriteRunning => Self::WriteDone,
            Self::WriteDone => Self::WriteDone,
            Self::Failed => Self::Failed,
        }
    }
}

/// Per-run state: where the run is and what earlier stages produced.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: RunId,
    stage: PipelineStage,
    outputs: Vec<StageOutput>,
}

impl RunContext {
    fn new() -> Self {
        Self {
            run_id: RunId::new(),
            stage: PipelineStage::Init,
            outputs: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[StageOutput] {
        &self.outputs
    }

    fn advance(&mut self) {
        self.stage = self.stage.next();
        debug!("[{}] Run is now {:?}", self.run_id, self.stage);
    }

    /// Record a finished stage; only valid while that stage is running.
    fn complete(&mut self, agent: &str, text: String) {
        debug_assert!(matches!(
            self.stage,
            PipelineStage::ResearchRunning | PipelineStage::WriteRunning
        ));
        self.outputs.push(StageOutput {
            agent: agent.to_string(),
            text,
        });
        self.advance();
    }

    fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = PipelineStage::Failed;
        }
    }
}

/// Final output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub run_id: RunId,
    pub text: String,
}

impl Artifact {
    pub fn word_count(&self) -> usize {
        task::word_count(&self.text)
    }
}

/// Researcher and writer sharing one model client and one transcript.
pub struct Crew {
    researcher: InstrumentedAgent,
    writer: InstrumentedAgent,
    sink: EventSink,
}

impl Crew {
    pub fn new(client: Arc<dyn ModelClient>, sink: EventSink) -> Self {
        let observer: Arc<dyn TaskObserver> = Arc::new(sink.clone());
        Self {
            researcher: InstrumentedAgent::new(
                profiles::researcher(),
                client.clone(),
                observer.clone(),
            ),
            writer: InstrumentedAgent::new(profiles::writer(), client, observer),
            sink,
        }
    }

    /// Probe the backend, then build the client and agents. If the probe
    /// fails nothing is constructed.
    pub async fn bootstrap(config: &AppConfig, sink: EventSink) -> Result<Self, CrewError> {
        let http = Client::new();
        let handle = config.backend_handle();

        if !health::is_available(&http, &handle.endpoint_url, config.probe_timeout()).await {
            error!("Model backend is not accessible at {}", handle.endpoint_url);
            return Err(CrewError::BackendUnavailable {
                base_url: handle.endpoint_url,
            });
        }

        info!(
            "Using model {} at {}",
            handle.model_identifier, handle.endpoint_url
        );
        Ok(Self::new(build_client(http, handle), sink))
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Run research then write for `topic`. Returns only once the run is
    /// in a terminal state; stage errors come back as `StageFailed`.
    pub async fn run(&self, topic: &str) -> Result<Artifact, CrewError> {
        let mut ctx = RunContext::new();
        info!("[{}] Crew run started: {topic}", ctx.run_id);

        let research = task::research_task(topic, self.researcher.profile());
        self.run_stage(&mut ctx, Stage::Research, &self.researcher, &research)
            .await?;

        let write = task::write_task(topic, self.writer.profile());
        let text = self
            .run_stage(&mut ctx, Stage::Write, &self.writer, &write)
            .await?;

        let artifact = Artifact {
            run_id: ctx.run_id.clone(),
            text,
        };
        let words = artifact.word_count();
        if words > ARTICLE_WORD_LIMIT {
            warn!(
                "[{}] Article has {words} words, above the requested {ARTICLE_WORD_LIMIT}",
                ctx.run_id
            );
        }
        info!("[{}] Crew run completed ({words} words)", ctx.run_id);
        Ok(artifact)
    }

    async fn run_stage(
        &self,
        ctx: &mut RunContext,
        stage: Stage,
        agent: &InstrumentedAgent,
        spec: &TaskSpec,
    ) -> Result<String, CrewError> {
        ctx.advance();
        let result = agent.execute(&ctx.run_id, spec, ctx.outputs()).await;
        match result {
            Ok(text) => {
                ctx.complete(agent.name(), text.clone());
                Ok(text)
            }
            Err(e) => {
                ctx.fail();
                error!("[{}] Error during {stage} stage: {e:#}", ctx.run_id);
                Err(CrewError::StageFailed { stage, cause: e })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedClient;
    use crate::protocol::{Event, Phase};
    use httpmock::{Method::GET, Method::POST, MockServer};

    fn crew(replies: Vec<Result<&str, &str>>) -> (Crew, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(replies));
        (Crew::new(client.clone(), EventSink::new()), client)
    }

    fn trace(events: &[Event]) -> Vec<(String, Phase)> {
        events
            .iter()
            .map(|e| (e.agent_display_name.clone(), e.phase))
            .collect()
    }

    fn sequence(pairs: &[(&str, Phase)]) -> Vec<(String, Phase)> {
        pairs.iter().map(|(a, p)| (a.to_string(), *p)).collect()
    }

    #[test]
    fn pipeline_stages_advance_in_fixed_order() {
        let mut ctx = RunContext::new();
        let mut seen = vec![ctx.stage];
        while !ctx.stage.is_terminal() {
            ctx.advance();
            seen.push(ctx.stage);
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Init,
                PipelineStage::ResearchRunning,
                PipelineStage::ResearchDone,
                PipelineStage::WriteRunning,
                PipelineStage::WriteDone,
            ]
        );
    }

    #[test]
    fn failed_is_sticky_and_terminal_states_stay_put() {
        let mut ctx = RunContext::new();
        ctx.advance();
        ctx.fail();
        assert_eq!(ctx.stage, PipelineStage::Failed);
        ctx.advance();
        assert_eq!(ctx.stage, PipelineStage::Failed);
    }

    #[tokio::test]
    async fn successful_run_emits_both_stages_in_order() {
        let (crew, _client) = crew(vec![
            Ok("keywords: latency, locality"),
            Ok("Edge computing brings compute to the data."),
        ]);

        let artifact = crew.run("edge computing").await.expect("run should succeed");

        assert_eq!(artifact.text, "Edge computing brings compute to the data.");
        assert_eq!(
            trace(&crew.sink().snapshot()),
            sequence(&[
                ("Researcher", Phase::Start),
                ("Researcher", Phase::End),
                ("Writer", Phase::Start),
                ("Writer", Phase::End),
            ])
        );
        assert!(crew
            .sink()
            .snapshot()
            .iter()
            .all(|e| e.run_id == artifact.run_id));
    }

    #[tokio::test]
    async fn writer_receives_research_output_as_context() {
        let (crew, client) = crew(vec![Ok("TREND: serverless at the edge"), Ok("post")]);

        crew.run("edge computing").await.unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].prompt.contains("TREND"));
        assert!(requests[1].prompt.contains("[Researcher]\nTREND: serverless at the edge"));
        assert!(requests[1].system.contains("Tech Writer"));
    }

    #[tokio::test]
    async fn research_failure_stops_before_writer() {
        let (crew, client) = crew(vec![Err("backend went away"), Ok("never used")]);

        let err = crew.run("edge computing").await.unwrap_err();

        assert!(matches!(err, CrewError::StageFailed { stage: Stage::Research, .. }));
        assert!(err.to_string().contains("backend went away"));
        assert_eq!(client.calls(), 1);
        assert_eq!(
            trace(&crew.sink().snapshot()),
            sequence(&[("Researcher", Phase::Start)])
        );
    }

    #[tokio::test]
    async fn write_failure_keeps_research_transcript() {
        let (crew, _client) = crew(vec![Ok("notes"), Err("timeout talking to model")]);

        let err = crew.run("edge computing").await.unwrap_err();

        assert!(matches!(err, CrewError::StageFailed { stage: Stage::Write, .. }));
        assert_eq!(
            trace(&crew.sink().snapshot()),
            sequence(&[
                ("Researcher", Phase::Start),
                ("Researcher", Phase::End),
                ("Writer", Phase::Start),
            ])
        );
    }

    #[tokio::test]
    async fn empty_artifact_is_still_a_success() {
        let (crew, _client) = crew(vec![Ok("notes"), Ok("")]);

        let artifact = crew.run("minimalism").await.unwrap();

        assert_eq!(artifact.text, "");
        assert_eq!(crew.sink().len(), 4);
    }

    #[tokio::test]
    async fn oversized_article_is_returned_unchanged() {
        let long = "word ".repeat(400);
        let (crew, _client) = crew(vec![Ok("notes"), Ok(long.as_str())]);

        let artifact = crew.run("verbosity").await.unwrap();

        assert_eq!(artifact.word_count(), 400);
        assert_eq!(artifact.text, long);
    }

    #[tokio::test]
    async fn repeated_runs_append_independent_sequences() {
        let (crew, _client) = crew(vec![Ok("r1"), Ok("w1"), Ok("r2"), Ok("w2")]);

        let first = crew.run("edge computing").await.unwrap();
        let second = crew.run("edge computing").await.unwrap();

        let events = crew.sink().snapshot();
        assert_eq!(events.len(), 8);
        assert_ne!(first.run_id, second.run_id);
        assert!(events[..4].iter().all(|e| e.run_id == first.run_id));
        assert!(events[4..].iter().all(|e| e.run_id == second.run_id));
        assert_eq!(events[1].payload, "r1");
        assert_eq!(events[7].payload, "w2");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn bootstrap_fails_without_backend_and_builds_nothing() {
        let server = MockServer::start();
        let models = server.mock(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(500);
        });
        let chat = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200);
        });

        let mut config = AppConfig::default();
        config.backend.base_url = server.url("/v1");
        let sink = EventSink::new();

        let result = Crew::bootstrap(&config, sink.clone()).await;

        assert!(matches!(result, Err(CrewError::BackendUnavailable { .. })));
        models.assert();
        chat.assert_hits(0);
        assert_eq!(sink.len(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn bootstrapped_crew_runs_against_backend() {
        let server = MockServer::start();
        let _models = server.mock(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(200).json_body(serde_json::json!({ "data": [] }));
        });
        let research = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("List keywords, key points, and trends for the following topic");
            then.status(200).json_body(serde_json::json!({
                "choices": [ { "message": { "content": "latency, locality, 5G" } } ]
            }));
        });
        let write = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("write a blog post on the topic");
            then.status(200).json_body(serde_json::json!({
                "choices": [ { "message": { "content": "Edge computing is here." } } ]
            }));
        });

        let mut config = AppConfig::default();
        config.backend.base_url = server.url("/v1");
        let crew = Crew::bootstrap(&config, EventSink::new())
            .await
            .expect("backend is available");

        let artifact = crew.run("edge computing").await.unwrap();

        research.assert();
        write.assert();
        assert_eq!(artifact.text, "Edge computing is here.");
        assert_eq!(crew.sink().len(), 4);
    }
}
