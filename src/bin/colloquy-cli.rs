//! Colloquy CLI - Command-line interface for the dialogue engine
//!
//! Provides subcommands for validating process description files and for
//! running a small interactive echo process on stdin.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;

use colloquy::engine::{
    Activity, ActivityId, ActivityKind, CallbackRegistry, Context, Engine, KnowledgeBase, Process,
    Response, noop_save_hook,
};
use colloquy::nlu::NoNlu;
use colloquy::store::load_process;

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Process-driven dialogue engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a process description file
    Validate {
        /// Path to the process description JSON
        process: PathBuf,
    },

    /// Run an interactive echo process on stdin
    Demo,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { process } => {
            let process = load_process(&process)?;
            println!(
                "Process is valid: {} activities, first is '{}' ({})",
                process.activities().len(),
                process.first().id,
                process.first().kind.name()
            );
        }

        Commands::Demo => run_demo()?,
    }

    Ok(())
}

fn demo_process() -> Result<Process> {
    let activities = vec![
        Activity::new("start", Some(ActivityId::new("echo")), ActivityKind::Start)?,
        Activity::new("echo", Some(ActivityId::new("end")), ActivityKind::Task)?,
        Activity::new("end", None, ActivityKind::End)?,
    ];
    Ok(Process::new(activities, ActivityId::new("start"))?)
}

fn demo_callbacks() -> CallbackRegistry {
    CallbackRegistry::new()
        .with("start", |_data, kb, ctx| {
            Response::new(kb, ctx, true).with_utterance("Ready")
        })
        .with("echo", |data, kb, ctx| {
            match data.get("echo").and_then(|value| value.as_str()) {
                Some(text) if !text.is_empty() => {
                    let mut payload = serde_json::Map::new();
                    payload.insert("echo".to_string(), json!(text));
                    Response::new(kb, ctx, true)
                        .with_utterance(format!("You said: {text}"))
                        .with_payload(payload)
                }
                _ => Response::new(kb, ctx, false).with_utterance("Say something to echo it back."),
            }
        })
}

fn run_demo() -> Result<()> {
    let mut kb = KnowledgeBase::new();
    kb.insert("echo".to_string(), json!("Type a line and I will echo it."));
    kb.insert("end".to_string(), json!("Done, goodbye."));

    let mut engine = Engine::new(
        demo_process()?,
        kb,
        Context::new(),
        demo_callbacks(),
        NoNlu::new(vec!["echo".to_string()]),
        noop_save_hook(),
    )?;

    // Seed the conversation: the start callback always completes.
    let reply = engine.handle_text_input("")?;
    println!("{}", reply.utterance);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let reply = engine.handle_text_input(&line)?;
        println!("{}", reply.utterance);

        if matches!(engine.current_activity().kind, ActivityKind::End) {
            break;
        }
        io::stdout().flush()?;
    }

    Ok(())
}
