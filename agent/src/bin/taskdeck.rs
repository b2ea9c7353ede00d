//! Interactive task assistant demo.
//!
//! Simple REPL: type natural language and watch the engine classify,
//! decide, execute, and respond. Tasks live in memory for the lifetime
//! of the process.
//!
//! Try:
//!   cargo run --bin taskdeck -- --user demo
//!   > remind me to buy groceries
//!   > what are my tasks?
//!   > delete the groceries task
//!   > yes
//!
//! Pass `--show-decisions` to print the decision variant and audit
//! summary after each turn.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskdeck_agent::{
    AgentConfig, DecisionContext, DecisionEngine, InMemoryPendingStore, InMemoryTaskStore,
    Message, PatternClassifier, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "taskdeck", about = "Task assistant decision engine demo")]
struct Args {
    /// User id the session acts as
    #[arg(long, default_value = "demo")]
    user: String,

    /// Conversation id (one pending confirmation slot per conversation)
    #[arg(long, default_value = "local")]
    conversation: String,

    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the decision variant and tool-call audit after each turn
    #[arg(long, default_value_t = false)]
    show_decisions: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };

    let engine = DecisionEngine::new(
        Arc::new(PatternClassifier::new()),
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(InMemoryPendingStore::new()),
        Arc::new(SystemClock),
        config,
    );

    println!("taskdeck - type a message, or 'quit' to exit");
    let stdin = io::stdin();
    let mut history: Vec<Message> = Vec::new();

    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let mut context = DecisionContext::new(&args.user, line, &args.conversation);
        context.history = history.clone();
        let output = engine.process(&context).await;

        println!("{}", output.response_text);
        if args.show_decisions {
            println!("  [decision: {}]", output.decision.tag());
            for record in &output.records {
                println!(
                    "  [tool: {} success={} {}ms]",
                    record.tool_name, record.success, record.duration_ms
                );
            }
        }

        history.push(Message::user(line, Utc::now()));
        history.push(Message::assistant(&output.response_text, Utc::now()));
    }

    Ok(())
}
