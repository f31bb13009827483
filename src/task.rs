use std::sync::Arc;

use crate::agent::AgentProfile;

pub const RESEARCH_EXPECTED_OUTPUT: &str = "keywords, key points, and trends.";
pub const WRITE_EXPECTED_OUTPUT: &str = "an article no longer than 250 words.";

/// Soft bound the writer is asked to respect.
pub const ARTICLE_WORD_LIMIT: usize = 250;

/// One unit of work for one agent. Built fresh for every run.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub description: String,
    pub assigned_agent: Arc<AgentProfile>,
    pub expected_output: String,
}

/// Output of a finished stage, passed as context to later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub agent: String,
    pub text: String,
}

pub fn research_task(topic: &str, researcher: &Arc<AgentProfile>) -> TaskSpec {
    TaskSpec {
        description: format!(
            "List keywords, key points, and trends for the following topic: {topic}."
        ),
        assigned_agent: researcher.clone(),
        expected_output: RESEARCH_EXPECTED_OUTPUT.to_string(),
    }
}

pub fn write_task(topic: &str, writer: &Arc<AgentProfile>) -> TaskSpec {
    TaskSpec {
        description: format!(
            "Based on the given research outcomes, write a blog post on the topic: {topic}."
        ),
        assigned_agent: writer.clone(),
        expected_output: WRITE_EXPECTED_OUTPUT.to_string(),
    }
}

impl TaskSpec {
    /// Full user-facing prompt: description, expected output, and the
    /// outputs of earlier stages in run order.
    pub fn render_prompt(&self, context: &[StageOutput]) -> String {
        let mut prompt = format!(
            "{}\n\nThis is the expected criteria for your final answer: {}",
            self.description, self.expected_output
        );
        if !context.is_empty() {
            prompt.push_str("\n\nThis is the context you're working with:");
            for stage in context {
                prompt.push_str(&format!("\n\n[{}]\n{}", stage.agent, stage.text));
            }
        }
        prompt
    }
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
