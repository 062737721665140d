//! thinker - self-steering reasoning chains on xAI Grok

mod commands;
mod config;
mod session;
mod utils;

use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use thinker_ai::models;
use thinker_ai::providers::openai::{self, OpenAICompatProvider};
use thinker_chain::{
    Chain, ChainEvent, ConversationState, DEFAULT_SYSTEM_PROMPT, TurnFailure, clamp_turns,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::EnvFilter;

use session::{Session, SessionError, SessionStore};

/// thinker - multi-turn reasoning chains that rewrite their own instructions
#[derive(Parser, Debug)]
#[command(name = "thinker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (grok-3-mini, grok-3, grok-4)
    #[arg(short, long)]
    model: Option<String>,

    /// Reasoning turns per message (clamped to 1-10)
    #[arg(short = 'n', long, allow_hyphen_values = true)]
    turns: Option<i64>,

    /// Add the wit instruction to every turn
    #[arg(long)]
    wit: bool,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Replace the session's system prompt (clears its history)
    #[arg(short, long)]
    system: Option<String>,

    /// Resume a previous session by ID
    #[arg(long)]
    resume: Option<String>,

    /// List saved sessions
    #[arg(long)]
    sessions: bool,

    /// Delete a saved session by ID
    #[arg(long, value_name = "ID")]
    delete: Option<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("thinker=debug,thinker_ai=debug,thinker_chain=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let store = SessionStore::new(SessionStore::sessions_dir());

    // List sessions and exit
    if args.sessions {
        return list_sessions(&store);
    }

    // Delete a session and exit
    if let Some(ref id) = args.delete {
        if let Err(e) = store.delete(id) {
            eprintln!("Error deleting session: {}", e);
            std::process::exit(1);
        }
        println!("Deleted session {}", id);
        return Ok(());
    }

    // Load config file
    let cfg = config::Config::load();

    // Check for API key (config or env)
    let Some(api_key) = cfg.get_api_key() else {
        eprintln!("Error: No xAI API key found");
        eprintln!();
        eprintln!("Set your API key with: export {}=your-key", openai::API_KEY_ENV_VAR);
        eprintln!("Or add it to config file: thinker --init-config");
        std::process::exit(1);
    };

    // Resume or start a session
    let mut session = match args.resume {
        Some(ref id) => match store.load(id) {
            Ok(session) => {
                println!(
                    "Resuming session {} ({} messages)",
                    session.id,
                    session.state.history().len()
                );
                session
            }
            Err(e) => {
                eprintln!("Error loading session: {}", e);
                std::process::exit(1);
            }
        },
        None => store.create(new_state(&cfg))?,
    };

    // CLI overrides are state changes like any other and get saved
    let mut changed = false;
    if let Some(ref query) = args.model {
        let id = models::find_model(query)
            .map(|m| m.id.to_string())
            .unwrap_or_else(|| query.clone());
        session.state.select_model(&id)?;
        changed = true;
    }
    if args.wit {
        session.state.set_max_wit(true);
        changed = true;
    }
    if let Some(ref prompt) = args.system {
        session.state.replace_system_prompt(prompt)?;
        changed = true;
    }
    if changed {
        persist(&store, &mut session)?;
    }

    let provider = Arc::new(OpenAICompatProvider::new(api_key, cfg.provider_config())?);
    let chain = Chain::new(cfg.chain_config(), provider);

    let turns = args
        .turns
        .or(cfg.default_turns.map(i64::from))
        .map(clamp_turns)
        .unwrap_or(1);

    // Ctrl-C aborts a running chain, or exits when idle
    let handle = chain.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_running() {
                eprintln!("\n[Aborting...]");
                handle.abort();
            } else {
                std::process::exit(130);
            }
        }
    });

    // Non-interactive mode
    if let Some(command) = args.command {
        println!("thinker> {}", command);
        println!();
        return run_message(&chain, &store, &mut session, &command, turns).await;
    }

    run_interactive(&chain, &store, &mut session, turns).await
}

/// State for a brand new session, from config
fn new_state(cfg: &config::Config) -> ConversationState {
    let prompt = cfg
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let model = cfg
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(models::DEFAULT_MODEL);

    let mut state = ConversationState::new(prompt, model);
    state.set_max_wit(cfg.max_wit.unwrap_or(false));
    state
}

/// Save the session. If another process saved it first, the on-disk copy
/// wins and is loaded in place of ours.
fn persist(store: &SessionStore, session: &mut Session) -> anyhow::Result<()> {
    match store.save(session) {
        Ok(()) => Ok(()),
        Err(SessionError::TokenMismatch) => {
            eprintln!("Session was changed by another thinker process; reloading it.");
            eprintln!("The last change was not saved.");
            *session = store.load(&session.id)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Submit one message as a chain, printing turns as they complete
async fn run_message(
    chain: &Chain,
    store: &SessionStore,
    session: &mut Session,
    input: &str,
    turns: u32,
) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_events(chain.subscribe()));

    match chain.submit(&mut session.state, input, i64::from(turns)).await {
        Ok(outcome) => {
            // The printer stops at ChainEnd, which has already been sent
            let _ = printer.await;
            tracing::debug!(
                turns_completed = outcome.turns_completed,
                aborted = outcome.is_aborted(),
                "chain finished"
            );
            persist(store, session)?;
        }
        Err(e) => {
            printer.abort();
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

async fn print_events(mut receiver: broadcast::Receiver<ChainEvent>) {
    let is_tty = std::io::IsTerminal::is_terminal(&io::stdout());

    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };

        match event {
            ChainEvent::ChainStart { total_turns } => {
                if total_turns > 1 && is_tty {
                    println!("[Reasoning over {} turns]\n", total_turns);
                }
            }
            ChainEvent::TurnStart { turn, .. } => {
                if is_tty {
                    print!("[Turn {}...]", turn);
                    io::stdout().flush().ok();
                }
            }
            ChainEvent::TurnEnd { turn, response } => {
                if is_tty {
                    print!("\r");
                }
                println!("Turn {}: {}", turn, response);
            }
            ChainEvent::DirectiveApplied {
                prompt, source, ..
            } => {
                if is_tty {
                    let preview = utils::truncate_chars(&prompt, 80).replace('\n', " ");
                    println!(
                        "[Next instructions, {}: {}]\n",
                        utils::directive_source_str(source),
                        preview
                    );
                }
            }
            ChainEvent::TurnFailed { turn, reason } => {
                if is_tty {
                    println!();
                }
                eprintln!("{}", TurnFailure { turn, reason });
            }
            ChainEvent::ChainEnd { .. } => break,
        }
    }
}

async fn run_interactive(
    chain: &Chain,
    store: &SessionStore,
    session: &mut Session,
    mut turns: u32,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        let short_id = session.id.get(..8).unwrap_or(&session.id);
        eprintln!(
            "thinker ({}, {} turn{}) session: {}",
            session.state.selected_model,
            turns,
            if turns == 1 { "" } else { "s" },
            short_id
        );
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(result) = commands::execute_command(input, &session.state, turns, &session.id)
        {
            use commands::CommandResult;

            match result {
                CommandResult::Clear => {
                    session.state.clear_history();
                    persist(store, session)?;
                    println!("Cleared conversation.");
                }
                CommandResult::ChangeModel(id) => {
                    session.state.select_model(&id)?;
                    persist(store, session)?;
                    println!("Switched to: {}", id);
                }
                CommandResult::ReplaceSystemPrompt(prompt) => {
                    match session.state.replace_system_prompt(&prompt) {
                        Ok(()) => {
                            persist(store, session)?;
                            println!("System prompt replaced. History cleared.");
                        }
                        Err(e) => println!("{}", e),
                    }
                }
                CommandResult::SetWit(value) => {
                    let enabled = match value {
                        Some(enabled) => {
                            session.state.set_max_wit(enabled);
                            enabled
                        }
                        None => session.state.toggle_wit(),
                    };
                    persist(store, session)?;
                    println!("Wit: {}", if enabled { "on" } else { "off" });
                }
                CommandResult::SetTurns(n) => {
                    turns = n;
                    println!("Turns per message set to: {}", n);
                }
                CommandResult::ShowHistory => {
                    println!("{}", utils::format_history(session.state.history(), 60));
                }
                CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                CommandResult::Exit => {
                    break;
                }
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        println!();
        run_message(chain, store, session, input, turns).await?;
        println!();
    }

    Ok(())
}

fn list_sessions(store: &SessionStore) -> anyhow::Result<()> {
    match store.list() {
        Ok(sessions) => {
            if sessions.is_empty() {
                println!("No saved sessions found.");
                println!(
                    "Sessions are stored in: {}",
                    SessionStore::sessions_dir().display()
                );
            } else {
                println!("Saved sessions:\n");
                println!("{:<38} {:<18} {:<8} Model", "ID", "Updated", "Msgs");
                println!("{}", "-".repeat(78));
                for s in sessions {
                    println!(
                        "{:<38} {:<18} {:<8} {}",
                        s.id,
                        s.updated_at_display(),
                        s.message_count,
                        s.model
                    );
                }
                println!("\nResume with: thinker --resume <session-id>");
            }
        }
        Err(e) => {
            eprintln!("Error listing sessions: {}", e);
        }
    }
    Ok(())
}
