//! patisserie: dessert-shop assistant CLI.
//!
//! Classify a message, chat with an assistant, or benchmark the backends
//! against a labeled test set.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use patisserie::app::{Backend, Registry};
use patisserie::config::{Config, Secrets};
use patisserie::evaluate::comparison_table;
use patisserie::store::ExampleStore;
use patisserie::{ConversationTurn, EvaluationReport};

/// Dessert-shop intent classifier and chat assistant.
#[derive(Parser)]
#[command(name = "patisserie")]
#[command(version = patisserie::PKG_VERSION)]
#[command(about = "Dessert-shop intent classifier and chat assistant")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "PATISSERIE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Predict the intent of a message
    Predict {
        /// Message (or omit to read from stdin)
        text: Option<String>,
        /// Backend to use
        #[arg(short, long, default_value = "groq")]
        backend: Backend,
    },

    /// Chat interactively; one message per line, Ctrl-D to quit
    Chat {
        /// Backend to use
        #[arg(short, long, default_value = "groq")]
        backend: Backend,
    },

    /// Evaluate one backend, or compare all of them, on the test set
    Evaluate {
        /// Backend to evaluate (default: all)
        #[arg(short, long)]
        backend: Option<Backend>,
        /// Test set (overrides `[data] test_path`)
        #[arg(long)]
        test: Option<PathBuf>,
        /// Write the reports as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    info!(version = patisserie::version_string(), "patisserie starting");
    let registry = Arc::new(Registry::from_config(&config, &secrets).await?);

    match args.command {
        Command::Predict { text, backend } => {
            let text = resolve_text(text, "predict")?;
            let result = registry.get(backend).classify(&text).await;
            println!("intent: {}", result.predicted_intent);
            println!("raw: {}", result.raw_model_output);
            if let Some(kind) = result.failure {
                println!("failure: {}", kind.as_str());
            }
        }

        Command::Chat { backend } => {
            chat_loop(&registry, backend).await?;
        }

        Command::Evaluate {
            backend,
            test,
            output,
        } => {
            let path = test.unwrap_or_else(|| config.data.test_path.clone());
            let test_set = ExampleStore::from_json_path(&path)?;

            let reports: Vec<EvaluationReport> = match backend {
                Some(backend) => vec![registry.get(backend).evaluate(test_set.as_slice()).await],
                None => registry.compare(test_set.as_slice()).await,
            };

            for report in &reports {
                println!("== {} ==", report.classifier);
                println!("{}", report.per_class_report);
                println!("{}", report.confusion_matrix.render());
            }
            if reports.len() > 1 {
                println!("{}", comparison_table(&reports));
            }

            if let Some(output) = output {
                std::fs::write(&output, serde_json::to_string_pretty(&reports)?)?;
                println!("saved to {}", output.display());
            }
        }
    }

    Ok(())
}

async fn chat_loop(registry: &Registry, backend: Backend) -> Result<(), Box<dyn std::error::Error>> {
    let assistant = registry.get(backend);
    let mut history: Vec<ConversationTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let reply = assistant.chat(message, &history).await;
        let out = format!("[{}] {}\n", reply.intent, reply.reply);
        stdout.write_all(out.as_bytes()).await?;

        history.push(ConversationTurn::user(message));
        history.push(ConversationTurn::assistant(reply.reply));
    }

    Ok(())
}

/// Take text from the argument, stdin, or both.
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_is_pipe = !io::stdin().is_terminal();
    let stdin_text = if stdin_is_pipe {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    } else {
        None
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
