use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::TryRecvError;

use crate::crew::{Artifact, Crew};
use crate::error::CrewError;
use crate::protocol::{Event, Phase};

pub struct CliFrontend {
    /// If Some, run once for this topic.
    pub topic: Option<String>,
    /// Print agent inputs as well as outputs.
    pub show_inputs: bool,
}

impl CliFrontend {
    pub async fn run(self, crew: Arc<Crew>) -> Result<()> {
        if let Some(topic) = &self.topic {
            run_oneshot(&crew, topic, self.show_inputs).await
        } else {
            run_interactive(&crew, self.show_inputs).await
        }
    }
}

async fn run_oneshot(crew: &Crew, topic: &str, show_inputs: bool) -> Result<()> {
    match run_with_transcript(crew, topic, show_inputs).await {
        Ok(artifact) => {
            print_artifact(&artifact);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("No article produced: {e}")),
    }
}

async fn run_interactive(crew: &Crew, show_inputs: bool) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    eprintln!("blogcrew interactive mode (type 'exit' to quit)");
    eprintln!("Enter a topic to research and write about, or 'transcript' to replay this session.");
    eprintln!();

    loop {
        eprint!("topic> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let topic = line.trim();
        if topic.is_empty() {
            continue;
        }
        if topic == "exit" || topic == "quit" {
            break;
        }
        if topic == "transcript" {
            print_transcript(crew);
            continue;
        }

        match run_with_transcript(crew, topic, show_inputs).await {
            Ok(artifact) => print_artifact(&artifact),
            Err(e) => eprintln!("\nNo article produced: {e}"),
        }
        println!();
    }

    Ok(())
}

/// Drive one run while printing sink events as they are appended.
async fn run_with_transcript(
    crew: &Crew,
    topic: &str,
    show_inputs: bool,
) -> Result<Artifact, CrewError> {
    let mut rx = crew.sink().subscribe();
    let run = crew.run(topic);
    tokio::pin!(run);

    println!("# Crew execution: {topic}\n");
    let result = loop {
        tokio::select! {
            biased;
            Ok(event) = rx.recv() => render(&event, show_inputs),
            result = &mut run => break result,
        }
    };

    // Events appended in the same poll that finished the run.
    loop {
        match rx.try_recv() {
            Ok(event) => render(&event, show_inputs),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    result
}

fn render(event: &Event, show_inputs: bool) {
    match event.phase {
        Phase::Start if !show_inputs => println!("## {} is working...\n", event.agent_display_name),
        _ => println!("{event}\n"),
    }
}

fn print_transcript(crew: &Crew) {
    let events = crew.sink().snapshot();
    println!("# Session transcript ({} events)\n", events.len());
    for event in &events {
        println!("[{} {}] {event}\n", event.run_id, event.at.format("%H:%M:%S"));
    }
}

fn print_artifact(artifact: &Artifact) {
    println!("--- Article ({} words) ---", artifact.word_count());
    println!("{}", artifact.text);
}
