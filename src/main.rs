// lucien - a command-line wizard that answers, remembers and replays
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use lucien_lib::{
    chat::Provider,
    config::Config,
    core::session::FAREWELL,
    logging, LucienError, Outcome, Result, Session,
};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::env;
use std::io::IsTerminal;
use tracing::warn;

const PROMPT: &str = "You >>> ";

/// Completion and inline hints over the registered command names.
struct LineHelper {
    commands: Vec<String>,
}

impl LineHelper {
    fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    fn matching<'a>(&'a self, typed: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.commands
            .iter()
            .filter(move |cmd| !typed.is_empty() && cmd.starts_with(typed))
    }
}

impl Helper for LineHelper {}

impl Completer for LineHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let candidates = self
            .matching(typed)
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: cmd.clone(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for LineHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        // Only hint at the end of the line
        if pos < line.len() {
            return None;
        }
        self.matching(line)
            .find(|cmd| cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for LineHelper {}

impl Validator for LineHelper {}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    // Grab whatever the user typed
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        return run_repl().await;
    }

    let command = &args[1];

    match command.as_str() {
        "exec" => handle_exec(&args[2..]).await,
        "version" | "-v" | "--version" => {
            println!("lucien v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    }
}

async fn run_repl() -> Result<()> {
    let config = Config::from_env()?;
    let history = config.history_file();
    let key_missing = config.groq_api_key.is_none();
    let mut session = Session::open(config)?;

    if key_missing && session.provider() == Provider::Primary {
        warn_missing_key();
    }

    print_banner();

    // Piped input: no line editor, prompt and follow-up reads share the console
    if !std::io::stdin().is_terminal() {
        session.run_console(PROMPT, interrupted).await;
        return Ok(());
    }

    let mut rl: Editor<LineHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(LineHelper::new(session.command_names())));
    if let Some(path) = &history {
        // No history yet on first run
        let _ = rl.load_history(path);
    }

    let result = loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if session.dispatch_or_interrupt(trimmed, interrupted()).await == Outcome::Exit {
                    break Ok(());
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                session.say(format!("\n{}", FAREWELL));
                session.close();
                break Ok(());
            }
            Err(e) => {
                session.close();
                break Err(LucienError::from(e));
            }
        }
    };

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            warn!(error = %e, "could not save history");
        }
    }

    result
}

/// Dispatch one line and exit.
async fn handle_exec(args: &[String]) -> Result<()> {
    if args.is_empty() {
        println!("Usage: lucien exec <line...>");
        return Ok(());
    }

    let config = Config::from_env()?;
    let mut session = Session::open(config)?;

    // An exit word or Ctrl-C already closed the session
    if session.dispatch_or_interrupt(&args.join(" "), interrupted()).await == Outcome::Continue {
        session.close();
    }
    Ok(())
}

/// Resolves on Ctrl-C. Never resolves if the handler can't be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn warn_missing_key() {
    println!("[ERROR] Warning: GROQ_API_KEY not found in environment variables.");
    println!("Please create a .env file with your API key or set it as an environment variable.");
    println!("Type 'internet off' to use a local Ollama model instead.");
}

fn print_banner() {
    println!(
        r#"
+======================================+
|         L U C I E N   A I            |
|     Wizard of the ArcSyn Order       |
+======================================+
"#
    );
    println!("*** Lucien stands ready. Type your command or 'quit' to exit. ***");
    println!("Type 'help' for available commands.");
}

fn print_usage() {
    println!(
        r#"lucien v{} - a wizard for your terminal

USAGE:
    lucien                 Start the interactive prompt
    lucien <COMMAND> [ARGS]

COMMANDS:
    exec <line...>         Run one line as if typed at the prompt
    version                Show version
    help                   Show this help

EXAMPLES:
    lucien
    lucien exec remember buy milk
    lucien exec cast spell morning
    lucien exec list spells

Inside the prompt, type 'help' for the full command list.

ENVIRONMENT:
    GROQ_API_KEY           Key for the hosted chat provider
    USE_INTERNET           true (hosted) or false (local Ollama)
    MEMORY_FILE            Notes document (default: lucien_memory.json)
    SPELLS_FILE            Spell book (default: .lucien/spells.json)
    RUST_LOG               Diagnostic log filter (default: warn)
"#,
        env!("CARGO_PKG_VERSION")
    );
}
