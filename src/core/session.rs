/// Interactive session and the line dispatcher
///
/// A session owns everything that lives for the whole run: the command
/// registry, the spell recorder, the spell book, the memory document, the
/// chat client and the console. `dispatch` takes one typed line and either
/// runs a registered command or hands the line to the chat model.
///
/// Nothing a command does can end the session. Handler failures are
/// printed at this boundary and the loop carries on; only an exit word
/// typed at the prompt returns [`Outcome::Exit`].

use crate::chat::{conversation, ChatClient, HttpChatClient, Provider};
use crate::config::Config;
use crate::console::Console;
use crate::core::commands::{default_registry, Command};
use crate::core::recorder::{Capture, Recorder};
use crate::core::registry::Registry;
use crate::error::{LucienError, Result};
use crate::store::{Memory, SpellBook};
use crate::tools::PythonRunner;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Words that end the session, matched case-insensitively
pub const EXIT_WORDS: &[&str] = &["quit", "exit", "bye"];

/// Temperature for free-form chat
pub const CHAT_TEMPERATURE: f32 = 0.5;

pub const FAREWELL: &str = "Farewell, brave wizard.";

/// What the prompt loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Exit,
}

pub struct Session {
    pub(super) registry: Registry<Command>,
    pub(super) recorder: Recorder,
    pub(super) spells: SpellBook,
    pub(super) memory: Memory,
    pub(super) chat: Box<dyn ChatClient>,
    pub(super) provider: Provider,
    pub(super) console: Console,
    pub(super) config: Config,
    pub(super) python: PythonRunner,
    pub(super) workdir: PathBuf,
    /// Spells currently being cast, outermost first
    pub(super) casting: Vec<String>,
}

impl Session {
    pub fn new(
        config: Config,
        spells: SpellBook,
        memory: Memory,
        chat: Box<dyn ChatClient>,
        console: Console,
    ) -> Result<Self> {
        let registry = default_registry().map_err(|e| LucienError::Config(e.to_string()))?;

        // A saved choice beats the environment default
        let online = memory.internet().unwrap_or(config.use_internet);
        let python = PythonRunner::new(&config.python, config.command_timeout());

        info!(commands = registry.len(), provider = %Provider::for_internet(online), "session ready");

        Ok(Self {
            registry,
            recorder: Recorder::new(),
            spells,
            memory,
            chat,
            provider: Provider::for_internet(online),
            console,
            config,
            python,
            workdir: PathBuf::from("."),
            casting: Vec::new(),
        })
    }

    /// Session over the configured files, the HTTP chat client and stdio.
    pub fn open(config: Config) -> Result<Self> {
        let chat = HttpChatClient::new(&config)?;
        let spells = SpellBook::open(&config.spells_file);
        let memory = Memory::open(&config.memory_file);
        Self::new(config, spells, memory, Box::new(chat), Console::stdio())
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Registered command names, for completion.
    pub fn command_names(&self) -> Vec<String> {
        self.registry.names().map(str::to_string).collect()
    }

    pub fn say(&mut self, msg: impl std::fmt::Display) {
        self.console.say(msg);
    }

    /// Route one line.
    pub async fn dispatch(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        if line.is_empty() {
            return Outcome::Continue;
        }

        // Provider toggle is a control directive: never recorded, never routed
        if let Some(online) = internet_directive(line) {
            self.set_internet(online);
            return Outcome::Continue;
        }

        // Only lines typed at the prompt go into a recording
        if self.casting.is_empty() {
            if let Capture::Captured { sensitive: true } = self.recorder.capture(line) {
                self.console.say(
                    "⚠ This line looks like it contains a secret. It will be stored in plain text in the spell file.",
                );
            }
        }

        if is_exit_word(line) {
            if !self.casting.is_empty() {
                self.console.say("(exit ignored while a spell is being cast)");
                return Outcome::Continue;
            }
            self.console.say(FAREWELL);
            self.close();
            return Outcome::Exit;
        }

        match self.registry.lookup(line) {
            Some((command, args)) => {
                debug!(?command, depth = self.casting.len(), "dispatching");
                if let Err(e) = self.run(command, &args).await {
                    debug!(?command, error = %e, "command failed");
                    self.console.say(e.user_message());
                }
            }
            None => self.chat_fallback(line).await,
        }

        Outcome::Continue
    }

    /// Route one line, abandoning it if `interrupt` resolves first.
    ///
    /// An interrupt ends the session: the farewell is printed and state is
    /// flushed the same way an exit word would.
    pub async fn dispatch_or_interrupt<F>(&mut self, line: &str, interrupt: F) -> Outcome
    where
        F: Future<Output = ()>,
    {
        let finished = tokio::select! {
            outcome = self.dispatch(line) => Some(outcome),
            _ = interrupt => None,
        };

        match finished {
            Some(outcome) => outcome,
            None => {
                warn!(line, "interrupted while running");
                // The dropped dispatch never unwound its casts
                self.casting.clear();
                self.console.say(format!("\n{}", FAREWELL));
                self.close();
                Outcome::Exit
            }
        }
    }

    /// Read prompt lines from the console and dispatch them until an exit
    /// word, an interrupt or end of input.
    ///
    /// Prompt lines and follow-up input share one reader, so a handler that
    /// asks for more input consumes exactly the lines it needs.
    pub async fn run_console<I, F>(&mut self, prompt: &str, mut interrupt: I) -> Outcome
    where
        I: FnMut() -> F,
        F: Future<Output = ()>,
    {
        loop {
            let Some(line) = self.console.ask(prompt) else {
                self.console.say(format!("\n{}", FAREWELL));
                self.close();
                return Outcome::Exit;
            };
            if self.dispatch_or_interrupt(&line, interrupt()).await == Outcome::Exit {
                return Outcome::Exit;
            }
        }
    }

    /// Flush session state before the process ends.
    ///
    /// An unfinished recording is dropped. Call once per session.
    pub fn close(&mut self) {
        if let Some(name) = self.recorder.abandon() {
            warn!(spell = %name, "session ended while recording; spell not saved");
            self.console
                .say(format!("⚠ Recording of spell '{}' was not saved.", name));
        }

        if let Err(e) = self.memory.flush() {
            warn!(error = %e, "failed to save memory on exit");
            self.console.say(e.user_message());
        }
    }

    fn set_internet(&mut self, online: bool) {
        self.provider = Provider::for_internet(online);
        self.memory.set_internet(online);
        info!(provider = %self.provider, "provider switched");
        self.console.say(if online {
            "[OK] Internet mode ON."
        } else {
            "[OK] Internet mode OFF."
        });
    }

    async fn chat_fallback(&mut self, line: &str) {
        debug!(provider = %self.provider, "chat fallback");
        let messages = conversation(line);
        match self
            .chat
            .complete(self.provider, &messages, CHAT_TEMPERATURE)
            .await
        {
            Ok(reply) => self.console.say(reply),
            Err(e @ LucienError::Chat(_)) => self.console.say(e.user_message()),
            Err(e) => self.console.say(format!("[ERROR] {}", e)),
        }
    }
}

fn is_exit_word(line: &str) -> bool {
    EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w))
}

/// `internet on` / `internet off`, any case.
fn internet_directive(line: &str) -> Option<bool> {
    let lower = line.to_lowercase();
    match lower.as_str() {
        "internet on" => Some(true),
        "internet off" => Some(false),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::harness::Harness;
    use super::*;
    use crate::chat::ScriptedChat;
    use crate::store::document::InMemoryStore;
    use crate::store::{Spell, SpellMap};

    fn spells_with(entries: &[(&str, &[&str])]) -> InMemoryStore<SpellMap> {
        let mut map = SpellMap::new();
        for (name, lines) in entries {
            let commands = lines.iter().map(|l| l.to_string()).collect();
            map.insert(name.to_string(), Spell::new(commands));
        }
        InMemoryStore::with(map)
    }

    #[tokio::test]
    async fn test_exit_words_flush_once() {
        for word in ["quit", "EXIT", "Bye", "  exit  "] {
            let mut h = Harness::new();
            assert_eq!(h.session.dispatch(word).await, Outcome::Exit);
            assert_eq!(h.memory.saves(), 1, "word: {}", word);
            assert!(h.out.text().contains(FAREWELL));
        }
    }

    #[tokio::test]
    async fn test_blank_line_does_nothing() {
        let mut h = Harness::new();
        assert_eq!(h.session.dispatch("   ").await, Outcome::Continue);
        assert_eq!(h.out.text(), "");
        assert!(h.chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remember_then_show_memory() {
        let mut h = Harness::new();
        h.type_lines(&["remember buy milk"]).await;
        assert_eq!(h.notes(), vec!["buy milk"]);
        assert_eq!(h.memory.snapshot().notes, vec!["buy milk"]);

        h.out.clear();
        h.type_lines(&["show memory"]).await;
        assert!(h.out.text().contains("buy milk"));
    }

    #[tokio::test]
    async fn test_bare_command_gets_empty_argument() {
        let mut h = Harness::new();
        h.type_lines(&["remember"]).await;
        assert_eq!(h.out.text(), "Usage: remember <text>\n");
        assert!(h.notes().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_line_goes_to_chat() {
        let mut h = Harness::new();
        assert_eq!(h.session.dispatch("tell me a joke").await, Outcome::Continue);

        assert_eq!(h.out.text(), "Sure, here is one.\n");
        assert_eq!(h.memory.saves(), 0);
        assert_eq!(h.spells.saves(), 0);

        let calls = h.chat.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Provider::Primary);
        assert_eq!(calls[0].1[1].content, "tell me a joke");
        assert_eq!(calls[0].2, CHAT_TEMPERATURE);
    }

    #[tokio::test]
    async fn test_chat_failure_is_printed() {
        let mut h = Harness::new();
        h.session.chat = Box::new(ScriptedChat::failing("connection refused"));

        assert_eq!(h.session.dispatch("hello there").await, Outcome::Continue);
        assert_eq!(h.out.text(), "[ERROR] connection refused\n");
    }

    #[tokio::test]
    async fn test_internet_toggle() {
        let mut h = Harness::new();
        h.type_lines(&["record spell net", "Internet OFF", "hello"]).await;

        assert_eq!(h.session.provider(), Provider::Local);
        assert_eq!(h.chat.calls()[0].0, Provider::Local);
        assert_eq!(h.session.recorder.captured(), ["hello".to_string()]);

        h.session.close();
        assert_eq!(h.memory.snapshot().internet, Some(false));
    }

    #[tokio::test]
    async fn test_record_then_cast_replays_in_order() {
        let mut h = Harness::new();
        h.type_lines(&["record spell pair", "remember a", "show memory", "stop recording"])
            .await;

        let spell = h.spells.snapshot()["pair"].clone();
        assert_eq!(spell.commands, vec!["remember a", "show memory"]);
        assert_eq!(spell.count, 2);

        // Typed directly into a fresh session
        let mut direct = Harness::new();
        direct.type_lines(&["remember a", "show memory"]).await;

        // Cast in another fresh session sharing the spell book
        let mut cast = Harness::with_spells(h.spells.clone());
        cast.type_lines(&["cast spell pair"]).await;

        let replayed: Vec<String> = cast
            .out
            .text()
            .lines()
            .filter(|l| {
                !l.is_empty()
                    && !l.contains("Casting spell")
                    && !l.contains("Executing:")
                    && *l != "-".repeat(40)
                    && !l.contains("completed!")
            })
            .map(str::to_string)
            .collect();
        let typed: Vec<String> = direct.out.text().lines().map(str::to_string).collect();

        assert_eq!(replayed, typed);
        assert!(cast.out.text().contains("[1/2] Executing: remember a"));
        assert!(cast.out.text().contains("[2/2] Executing: show memory"));
    }

    #[tokio::test]
    async fn test_morning_spell_remembers_twice() {
        let mut h = Harness::new();
        h.type_lines(&[
            "record spell morning",
            "remember buy milk",
            "stop recording",
            "cast spell morning",
        ])
        .await;

        assert_eq!(h.notes(), vec!["buy milk", "buy milk"]);
        assert!(h.out.text().contains("✓ Spell 'morning' completed!"));
    }

    #[tokio::test]
    async fn test_empty_recording_writes_nothing() {
        let mut h = Harness::new();
        h.type_lines(&["record spell idle", "stop recording"]).await;

        assert_eq!(h.spells.saves(), 0);
        assert!(h.spells.snapshot().is_empty());
        assert!(h.out.text().contains("No commands recorded"));
        assert_eq!(h.session.recorder.active(), None);
    }

    #[tokio::test]
    async fn test_record_existing_name_fails() {
        let spells = spells_with(&[("morning", &["help"])]);
        let before = spells.snapshot();
        let mut h = Harness::with_spells(spells);

        h.type_lines(&["record spell morning"]).await;

        assert!(h.out.text().contains("already exists"));
        assert_eq!(h.session.recorder.active(), None);
        assert_eq!(h.spells.saves(), 0);
        assert_eq!(h.spells.snapshot(), before);
    }

    #[tokio::test]
    async fn test_second_record_keeps_active_capture() {
        let mut h = Harness::new();
        h.type_lines(&["record spell first", "remember a", "record spell second"])
            .await;

        assert!(h.out.text().contains("Already recording spell 'first'"));
        assert_eq!(h.session.recorder.active(), Some("first"));
        assert_eq!(h.session.recorder.captured()[0], "remember a");
    }

    #[tokio::test]
    async fn test_delete_missing_spell_leaves_store() {
        let spells = spells_with(&[("keep", &["help"])]);
        let before = spells.snapshot();
        let mut h = Harness::with_spells(spells);

        h.type_lines(&["delete spell ghost"]).await;

        assert!(h.out.text().contains("'ghost' not found"));
        assert_eq!(h.spells.saves(), 0);
        assert_eq!(h.spells.snapshot(), before);
    }

    #[tokio::test]
    async fn test_exit_inside_spell_is_ignored() {
        let spells = spells_with(&[("leave", &["remember x", "exit", "remember y"])]);
        let mut h = Harness::with_spells(spells);

        assert_eq!(h.session.dispatch("cast spell leave").await, Outcome::Continue);

        assert_eq!(h.notes(), vec!["x", "y"]);
        // One save per remember, none for the suppressed exit
        assert_eq!(h.memory.saves(), 2);
        assert!(h.out.text().contains("exit ignored"));
        assert!(!h.out.text().contains(FAREWELL));
    }

    #[tokio::test]
    async fn test_cast_while_recording_captures_only_the_cast() {
        let spells = spells_with(&[("inner", &["remember a", "remember b"])]);
        let mut h = Harness::with_spells(spells);

        h.type_lines(&["record spell outer", "cast spell inner", "stop recording"])
            .await;

        assert_eq!(h.notes(), vec!["a", "b"]);
        assert_eq!(
            h.spells.snapshot()["outer"].commands,
            vec!["cast spell inner"]
        );
    }

    #[tokio::test]
    async fn test_self_casting_spell_is_refused() {
        let spells = spells_with(&[("loop", &["remember tick", "cast spell loop"])]);
        let mut h = Harness::with_spells(spells);

        h.type_lines(&["cast spell loop"]).await;

        assert_eq!(h.notes(), vec!["tick"]);
        assert!(h.out.text().contains("already being cast"));
        assert!(h.session.casting.is_empty());
    }

    #[tokio::test]
    async fn test_cast_missing_spell() {
        let mut h = Harness::new();
        h.type_lines(&["cast spell nope"]).await;
        assert_eq!(h.out.text(), "✗ Spell 'nope' not found\n");
    }

    #[tokio::test]
    async fn test_sensitive_line_warns_but_records() {
        let mut h = Harness::new();
        h.type_lines(&["record spell deploy", "remember token=abc123"]).await;

        assert!(h.out.text().contains("plain text"));
        assert_eq!(h.session.recorder.captured(), ["remember token=abc123".to_string()]);
    }

    #[tokio::test]
    async fn test_exit_while_recording_drops_recording() {
        let mut h = Harness::new();
        h.type_lines(&["record spell lost", "remember a"]).await;

        assert_eq!(h.session.dispatch("quit").await, Outcome::Exit);
        assert!(h.out.text().contains("'lost' was not saved"));
        assert_eq!(h.spells.saves(), 0);
        assert_eq!(h.memory.saves(), 2);
    }

    #[tokio::test]
    async fn test_handler_error_does_not_end_session() {
        let mut h = Harness::new();
        assert_eq!(
            h.session.dispatch("read file ../secret").await,
            Outcome::Continue
        );
        assert!(h.out.text().contains("Invalid path"));
    }

    #[tokio::test]
    async fn test_prompt_and_follow_up_share_input() {
        let dir = tempfile::tempdir().unwrap();
        let doomed = dir.path().join("doomed.txt");
        std::fs::write(&doomed, "bye").unwrap();

        let input = format!(
            "delete file {}\ny\nremember marker\nshow memory\nquit\nremember never\n",
            doomed.display()
        );
        let mut h = Harness::with_input(&input);

        let outcome = h.session.run_console("> ", std::future::pending).await;

        assert_eq!(outcome, Outcome::Exit);
        assert!(!doomed.exists());
        assert_eq!(h.notes(), vec!["marker"]);
        assert!(h.out.text().contains("1. marker"));
        assert!(h.out.text().contains(FAREWELL));
        assert_eq!(h.memory.snapshot().notes, vec!["marker"]);
    }

    #[tokio::test]
    async fn test_end_of_input_flushes() {
        let mut h = Harness::with_input("internet off\n");

        let outcome = h.session.run_console("> ", std::future::pending).await;

        assert_eq!(outcome, Outcome::Exit);
        assert_eq!(h.memory.saves(), 1);
        assert_eq!(h.memory.snapshot().internet, Some(false));
        assert!(h.out.text().ends_with(&format!("\n{}\n", FAREWELL)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_mid_command_flushes() {
        let mut h = Harness::new();
        h.type_lines(&["internet off", "record spell half", "remember a"])
            .await;

        let started = std::time::Instant::now();
        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(100));
        let outcome = h
            .session
            .dispatch_or_interrupt("run shell sleep 5", interrupt)
            .await;

        assert_eq!(outcome, Outcome::Exit);
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
        assert!(h.out.text().contains(FAREWELL));
        assert!(h.out.text().contains("'half' was not saved"));
        assert_eq!(h.memory.snapshot().internet, Some(false));
        assert_eq!(h.memory.snapshot().notes, vec!["a"]);
        assert_eq!(h.spells.saves(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupt_during_cast_resets_casting() {
        let spells = spells_with(&[("slow", &["run shell sleep 5"])]);
        let mut h = Harness::with_spells(spells);

        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(100));
        let outcome = h
            .session
            .dispatch_or_interrupt("cast spell slow", interrupt)
            .await;

        assert_eq!(outcome, Outcome::Exit);
        assert!(h.session.casting.is_empty());
        assert_eq!(h.memory.saves(), 1);
    }

    #[tokio::test]
    async fn test_finished_line_ignores_interrupt() {
        let mut h = Harness::new();
        let outcome = h
            .session
            .dispatch_or_interrupt("remember kept", std::future::pending())
            .await;

        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(h.notes(), vec!["kept"]);
        assert!(!h.out.text().contains(FAREWELL));
    }

    #[tokio::test]
    async fn test_saved_provider_choice_wins() {
        let mut h = Harness::new();
        h.type_lines(&["internet off"]).await;
        h.session.close();

        let (console, _) = crate::console::Console::captured("");
        let session = Session::new(
            Config::default(),
            SpellBook::new(Box::new(InMemoryStore::<SpellMap>::default())),
            Memory::new(Box::new(h.memory.clone())),
            Box::new(ScriptedChat::replying("")),
            console,
        )
        .unwrap();
        assert_eq!(session.provider(), Provider::Local);
    }
}
