/// Built-in commands
///
/// `default_registry` lists every command in the order `help` shows them.
/// `Session::run` is the one place that knows what each command does;
/// the heavy lifting lives in `crate::tools` and `crate::store`.

use crate::chat::{ChatMessage, Provider};
use crate::core::recorder::Stopped;
use crate::core::registry::{DuplicateCommand, Registry};
use crate::core::session::{Session, CHAT_TEMPERATURE};
use crate::error::{LucienError, Result};
use crate::tools::{files, git, system};

const DEFAULT_PASSWORD_LEN: usize = 16;
const SEARCH_LIMIT: usize = 10;
const GIT_LOG_LIMIT: usize = 10;
const COMMIT_TEMPERATURE: f32 = 0.3;
const COMMIT_DIFF_CHARS: usize = 1000;

const COMMIT_PROMPT: &str = "Generate a concise, conventional commit message based on the git diff. \
Use format: type(scope): description. Keep it under 50 characters.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Remember,
    ShowMemory,
    ClearMemory,
    SearchMemory,
    ListFiles,
    ReadFile,
    WriteFile,
    AppendFile,
    DeleteFile,
    RenameFile,
    CopyFile,
    MoveFile,
    FileSize,
    CountLines,
    FindLarge,
    DiskSpace,
    CpuUsage,
    RunShell,
    GeneratePassword,
    OpenUrl,
    OpenFile,
    RunPython,
    Ai,
    Help,
    GitStatus,
    GitAdd,
    GitCommit,
    GitPush,
    GitPull,
    GitLog,
    RecordSpell,
    StopRecording,
    CastSpell,
    ListSpells,
    DeleteSpell,
}

const COMMANDS: &[(&str, Command)] = &[
    ("remember", Command::Remember),
    ("show memory", Command::ShowMemory),
    ("clear memory", Command::ClearMemory),
    ("search memory", Command::SearchMemory),
    ("list files", Command::ListFiles),
    ("read file", Command::ReadFile),
    ("write file", Command::WriteFile),
    ("append file", Command::AppendFile),
    ("delete file", Command::DeleteFile),
    ("rename file", Command::RenameFile),
    ("copy file", Command::CopyFile),
    ("move file", Command::MoveFile),
    ("file size", Command::FileSize),
    ("count lines", Command::CountLines),
    ("find large", Command::FindLarge),
    ("disk space", Command::DiskSpace),
    ("cpu usage", Command::CpuUsage),
    ("run shell", Command::RunShell),
    ("generate password", Command::GeneratePassword),
    ("open url", Command::OpenUrl),
    ("open file", Command::OpenFile),
    ("run python", Command::RunPython),
    ("ai", Command::Ai),
    ("help", Command::Help),
    ("git status", Command::GitStatus),
    ("git add", Command::GitAdd),
    ("git commit", Command::GitCommit),
    ("git push", Command::GitPush),
    ("git pull", Command::GitPull),
    ("git log", Command::GitLog),
    ("record spell", Command::RecordSpell),
    ("stop recording", Command::StopRecording),
    ("cast spell", Command::CastSpell),
    ("list spells", Command::ListSpells),
    ("delete spell", Command::DeleteSpell),
];

pub fn default_registry() -> std::result::Result<Registry<Command>, DuplicateCommand> {
    let mut registry = Registry::new();
    for (name, command) in COMMANDS {
        registry.register(name, *command)?;
    }
    Ok(registry)
}

const HELP: &str = "Available commands:
  Memory:
    remember <text>          - Save a memory note
    show memory              - Display all saved memories
    clear memory             - Clear all memories
    search memory <query>    - Fuzzy-search saved memories
  Files:
    list files [path]        - List files in directory
    read file <path>         - Read file contents
    write file <path>        - Write content to file
    append file <path>       - Append content to file
    delete file <path>       - Delete a file
    rename file <from> <to>  - Rename a file
    copy file <from> <to>    - Copy a file
    move file <from> <to>    - Move a file
    file size <path>         - Show file size in bytes
    count lines <path>       - Count lines in a file
    find large <dir> <bytes> - Find files larger than a size
  Git:
    git status               - Show repository status
    git add <files>          - Stage files for commit
    git commit               - Commit with AI-generated message
    git push                 - Push to remote repository
    git pull                 - Pull latest changes
    git log                  - Show recent commit history
  Spells:
    record spell <name>      - Start recording a workflow
    stop recording           - Stop recording current spell
    cast spell <name>        - Execute a recorded workflow
    list spells              - Show all available spells
    delete spell <name>      - Remove a spell
  System:
    disk space               - Show disk usage
    cpu usage                - Show CPU usage
    run shell <cmd>          - Execute shell command
    generate password [len]  - Generate random password
    open url <url>           - Open URL in browser
    open file <path>         - Open file in VS Code
    run python               - Execute Python code
  AI:
    ai <provider> <prompt>   - Chat with specific AI provider
    (any other text)         - Chat with default AI
  Control:
    internet on/off          - Toggle internet mode
    quit/exit/bye            - Exit Lucien
    help                     - Show this help";

/// `<a> <b>`, exactly two whitespace-separated words.
fn two_args<'a>(args: &'a str, usage: &str) -> Result<(&'a str, &'a str)> {
    let mut parts = args.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(LucienError::usage(usage)),
    }
}

fn required<'a>(args: &'a str, usage: &str) -> Result<&'a str> {
    if args.is_empty() {
        Err(LucienError::usage(usage))
    } else {
        Ok(args)
    }
}

impl Session {
    pub(super) async fn run(&mut self, command: Command, args: &str) -> Result<()> {
        match command {
            Command::Remember => {
                let text = required(args, "remember <text>")?;
                self.memory.remember(text)?;
                self.say("[OK] Memory saved.");
            }
            Command::ShowMemory => {
                if self.memory.notes().is_empty() {
                    self.say("No memories saved yet.");
                } else {
                    let listing: Vec<String> = self
                        .memory
                        .notes()
                        .iter()
                        .enumerate()
                        .map(|(i, note)| format!("{}. {}", i + 1, note))
                        .collect();
                    self.say(listing.join("\n"));
                }
            }
            Command::ClearMemory => {
                self.memory.clear()?;
                self.say("[OK] Memory cleared.");
            }
            Command::SearchMemory => {
                let query = required(args, "search memory <query>")?;
                let matches = self.memory.search(query, SEARCH_LIMIT);
                if matches.is_empty() {
                    self.say(format!("No memories match '{}'.", query));
                } else {
                    let listing: Vec<String> = matches
                        .iter()
                        .map(|m| format!("{}. {}", m.index, m.note))
                        .collect();
                    self.say(listing.join("\n"));
                }
            }

            Command::ListFiles => {
                let dir = if args.is_empty() { "." } else { args };
                self.say(files::list_files(dir)?);
            }
            Command::ReadFile => {
                let path = required(args, "read file <path>")?;
                self.say(files::read_file(path)?);
            }
            Command::WriteFile => {
                let path = required(args, "write file <path>")?;
                self.say("Enter text. Empty line to finish.");
                let text = self.console.read_block();
                self.say(files::write_file(path, &text)?);
            }
            Command::AppendFile => {
                let path = required(args, "append file <path>")?;
                self.say("Enter text to append. Empty line to finish.");
                let text = self.console.read_block();
                self.say(files::append_file(path, &text)?);
            }
            Command::DeleteFile => {
                let path = required(args, "delete file <path>")?;
                let answer = self
                    .console
                    .ask(&format!("Are you sure you want to delete {}? (y/n): ", path));
                if answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")) {
                    self.say(files::delete_file(path)?);
                } else {
                    self.say("Cancelled.");
                }
            }
            Command::RenameFile => {
                let (from, to) = two_args(args, "rename file <from> <to>")?;
                self.say(files::rename_file(from, to)?);
            }
            Command::CopyFile => {
                let (from, to) = two_args(args, "copy file <from> <to>")?;
                self.say(files::copy_file(from, to)?);
            }
            Command::MoveFile => {
                let (from, to) = two_args(args, "move file <from> <to>")?;
                self.say(files::move_file(from, to)?);
            }
            Command::FileSize => {
                let path = required(args, "file size <path>")?;
                self.say(files::file_size(path)?);
            }
            Command::CountLines => {
                let path = required(args, "count lines <path>")?;
                self.say(format!("{} lines", files::count_lines(path)?));
            }
            Command::FindLarge => {
                let usage = "find large <folder> <min_bytes>";
                let (folder, min) = two_args(args, usage)?;
                let min: u64 = min.parse().map_err(|_| LucienError::usage(usage))?;
                self.say(files::find_large(folder, min)?);
            }

            Command::DiskSpace => {
                let report = system::disk_space(&self.workdir, self.config.command_timeout()).await?;
                self.say(report);
            }
            Command::CpuUsage => {
                let report = system::cpu_usage().await?;
                self.say(report);
            }
            Command::RunShell => {
                let line = required(args, "run shell <command>")?;
                let out = system::run_shell(line, self.config.command_timeout()).await?;
                self.say(out);
            }
            Command::GeneratePassword => {
                let length = if args.is_empty() {
                    DEFAULT_PASSWORD_LEN
                } else {
                    args.parse().map_err(|_| {
                        LucienError::usage("generate password [length] (length must be a number)")
                    })?
                };
                self.say(system::generate_password(length)?);
            }
            Command::OpenUrl => {
                let url = required(args, "open url <url>")?;
                self.say(system::open_url(url)?);
            }
            Command::OpenFile => {
                let path = required(args, "open file <path>")?;
                self.say(system::open_in_editor(path)?);
            }
            Command::RunPython => {
                self.say("Enter Python code. Blank line to execute.");
                let code = self.console.read_block();
                let out = self.python.run(&code).await?;
                if !out.stdout.trim().is_empty() {
                    self.say(out.stdout.trim_end());
                }
                if !out.stderr.trim().is_empty() {
                    self.say(out.stderr.trim_end());
                }
            }

            Command::Ai => {
                let usage = "ai <groq|ollama> <prompt>";
                let (name, prompt) = args
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| LucienError::usage(usage))?;
                let provider = Provider::parse(name).ok_or_else(|| {
                    LucienError::usage("ai <groq|ollama> <prompt> (provider must be 'groq' or 'ollama')")
                })?;
                let prompt = required(prompt.trim(), usage)?;

                let messages = crate::chat::conversation(prompt);
                let reply = self.chat.complete(provider, &messages, CHAT_TEMPERATURE).await?;
                self.say(reply);
            }
            Command::Help => self.say(HELP),

            Command::GitStatus => {
                let report = git::status(&self.workdir)?;
                self.say(report);
            }
            Command::GitAdd => {
                let files = required(args, "git add <files>")?;
                let pathspecs: Vec<&str> = files.split_whitespace().collect();
                let report = git::add(&self.workdir, &pathspecs)?;
                self.say(report);
            }
            Command::GitCommit => self.git_commit().await?,
            Command::GitPush => {
                let report = git::push(&self.workdir, self.config.command_timeout()).await?;
                self.say(report);
            }
            Command::GitPull => {
                let report = git::pull(&self.workdir, self.config.command_timeout()).await?;
                self.say(report);
            }
            Command::GitLog => {
                let report = git::log(&self.workdir, GIT_LOG_LIMIT)?;
                self.say(report);
            }

            Command::RecordSpell => {
                self.recorder.start(args, &self.spells)?;
                self.say(format!(
                    "🎬 Recording spell '{}'. Type 'stop recording' when done.",
                    args
                ));
            }
            Command::StopRecording => match self.recorder.stop(&self.spells)? {
                Stopped::Empty { .. } => self.say("✗ No commands recorded"),
                Stopped::Saved { name, count } => {
                    self.say(format!("✓ Spell '{}' saved with {} commands", name, count))
                }
            },
            Command::CastSpell => self.cast(args).await?,
            Command::ListSpells => self.list_spells(),
            Command::DeleteSpell => {
                let name = required(args, "delete spell <name>")?;
                self.spells.remove(name)?;
                self.say(format!("✓ Spell '{}' deleted", name));
            }
        }
        Ok(())
    }

    fn list_spells(&mut self) {
        let spells = self.spells.all();
        if spells.is_empty() {
            self.say("No spells recorded yet.");
            return;
        }

        let mut lines = vec!["Available spells:".to_string()];
        for (name, spell) in &spells {
            lines.push(format!("  📜 {} - {}", name, spell.description));
            lines.push(format!(
                "      Commands: {}, Created: {}",
                spell.count,
                spell.created_date()
            ));
        }
        self.say(lines.join("\n"));
    }

    /// Commit staged changes with a subject written by the chat model.
    async fn git_commit(&mut self) -> Result<()> {
        let diff = git::staged_diff(&self.workdir)?
            .ok_or_else(|| LucienError::Process("No staged changes to commit".to_string()))?;
        let excerpt: String = diff.chars().take(COMMIT_DIFF_CHARS).collect();

        let messages = [
            ChatMessage::system(COMMIT_PROMPT),
            ChatMessage::user(format!(
                "Generate commit message for these changes:\n{}",
                excerpt
            )),
        ];

        let raw = match self
            .chat
            .complete(self.provider, &messages, COMMIT_TEMPERATURE)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                self.say(format!("✗ Error generating commit message: {}", e));
                self.say("Please commit manually with: git commit -m 'your message'");
                return Ok(());
            }
        };

        let subject = git::clean_commit_message(&raw);
        if subject.is_empty() {
            return Err(LucienError::Chat("model returned an empty commit message".to_string()));
        }
        git::commit(&self.workdir, &subject)?;
        self.say(format!("✓ Committed: {}", subject));
        Ok(())
    }
}
