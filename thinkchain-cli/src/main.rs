//! # thinkchain CLI
//!
//! Runs a question through the analyze → reason → verify chain.
//!
//! Usage:
//!   thinkchain ask [OPTIONS] <QUESTION>...
//!   thinkchain serve [--bind <ADDR>]
//!   thinkchain models
//!
//! Examples:
//!   THINKCHAIN_API_KEY=... thinkchain ask "Why do leaves change color?"
//!   thinkchain ask --model glm-4-flash --temperature 0.7 "Plan a 3-day trip to Kyoto"
//!   thinkchain --config thinkchain.toml serve --bind 0.0.0.0:7860

mod config;
mod html;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Settings;
use std::path::PathBuf;
use thinkchain_agent::{run_with, ChainOutput, FailurePolicy, StepStatus, ROLES};
use thinkchain_gateway::params::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};
use thinkchain_gateway::{Model, SessionParams};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "thinkchain")]
#[command(author, version, about = "thinkchain - chain-of-thought over a chat-completion API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with base_url, timeout_secs, bind, failure_policy and [headers]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Chat-completion base URL (without /chat/completions)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Overall HTTP timeout in seconds (default: none)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// What to do after a failed step: halt or pass-through
    #[arg(long, global = true)]
    policy: Option<FailurePolicy>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one question through the chain and print the three outputs
    Ask {
        /// The question
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,

        /// API key for the chat-completion service
        #[arg(long, env = "THINKCHAIN_API_KEY", hide_env_values = true)]
        api_key: String,

        #[arg(short, long, default_value_t = Model::default())]
        model: Model,

        #[arg(long, default_value_t = DEFAULT_TOP_P)]
        top_p: f32,

        #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f32,

        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        /// Only print the three outputs
        #[arg(short, long)]
        quiet: bool,
    },
    /// Serve the web form
    Serve {
        /// Address to listen on (default: 127.0.0.1:7860)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// List the selectable models
    Models,
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    /// Settings from the config file (if any) overridden by flags
    fn settings(&self, bind: Option<String>) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => Settings::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Settings::default(),
        };

        let flags = Settings {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout,
            bind,
            failure_policy: self.policy,
            headers: Default::default(),
        };

        Ok(file.merge(&flags))
    }
}

fn print_output(output: &ChainOutput, quiet: bool) {
    let sections = [
        ("Analysis", &output.analysis),
        ("Reasoning", &output.reasoning),
        ("Verification", &output.verification),
    ];
    for (title, text) in sections {
        if !quiet {
            println!("\n--- {} ---\n", title);
        }
        println!("{}", text);
    }

    if quiet {
        return;
    }

    println!("\n--- Steps ---");
    for (i, step) in output.steps.iter().enumerate() {
        let status = match step.status {
            StepStatus::Ok => "ok",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        let note = if step.truncated { " (cut off by max_tokens)" } else { "" };
        println!(
            "  {}. {:<22} {:<8} {} -> {} chars{}",
            i + 1,
            step.role,
            status,
            step.input_chars,
            step.output_chars,
            note
        );
    }
    let usage = &output.usage;
    println!(
        "  {} calls, {} tokens ({} prompt + {} completion)",
        usage.total_calls,
        usage.total_tokens(),
        usage.total_prompt_tokens,
        usage.total_completion_tokens
    );
}

fn list_models() {
    for model in Model::ALL {
        let marker = if model == Model::default() { " (default)" } else { "" };
        println!("{}{}", model, marker);
    }
    println!();
    println!("Roles, in order:");
    for role in ROLES {
        println!("  - {}", role.name);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    debug!(config = ?cli.config, base_url = ?cli.base_url, "starting thinkchain");

    match &cli.command {
        Commands::Models => {
            list_models();
        }
        Commands::Serve { bind } => {
            let settings = cli.settings(bind.clone())?;
            let addr = settings.bind_addr()?;
            let state = server::AppState::new(settings.provider_config(), settings.policy());
            server::serve(state, addr).await?;
        }
        Commands::Ask {
            question,
            api_key,
            model,
            top_p,
            temperature,
            max_tokens,
            quiet,
        } => {
            let settings = cli.settings(None)?;
            let params = SessionParams::new(api_key.clone())
                .with_model(*model)
                .with_top_p(*top_p)
                .with_temperature(*temperature)
                .with_max_tokens(*max_tokens);

            let output = run_with(
                settings.provider_config(),
                params,
                &question.join(" "),
                settings.policy(),
            )
            .await
            .context("Failed to start the chain")?;

            print_output(&output, *quiet);
            if !output.succeeded() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
