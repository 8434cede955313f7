/// Version-control shortcuts
///
/// Local operations go through libgit2. Push and pull shell out to the
/// `git` binary so the user's credential helpers and SSH setup apply.

use crate::error::{LucienError, Result};
use crate::tools::process::run_with_timeout;
use git2::{DiffFormat, IndexAddOption, Repository, Sort, Status, StatusOptions};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Longest commit subject we accept from the chat model
pub const MAX_SUBJECT_LEN: usize = 50;

/// Changed files, one `XY path` line each, or a clean notice.
pub fn status(workdir: &Path) -> Result<String> {
    let repo = Repository::discover(workdir)?;

    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;

    let lines: Vec<String> = statuses
        .iter()
        .filter_map(|entry| {
            let path = entry.path()?.to_string();
            Some(format!("  {} {}", porcelain_code(entry.status()), path))
        })
        .collect();

    if lines.is_empty() {
        return Ok("✓ Working directory clean".to_string());
    }
    Ok(format!("Modified files:\n{}", lines.join("\n")))
}

/// Two-letter short-status code (index column, worktree column).
fn porcelain_code(status: Status) -> String {
    if status.contains(Status::WT_NEW) && !status.intersects(index_flags()) {
        return "??".to_string();
    }

    let index = if status.contains(Status::INDEX_NEW) {
        'A'
    } else if status.contains(Status::INDEX_MODIFIED) {
        'M'
    } else if status.contains(Status::INDEX_DELETED) {
        'D'
    } else if status.contains(Status::INDEX_RENAMED) {
        'R'
    } else if status.contains(Status::INDEX_TYPECHANGE) {
        'T'
    } else {
        ' '
    };

    let worktree = if status.contains(Status::WT_MODIFIED) {
        'M'
    } else if status.contains(Status::WT_DELETED) {
        'D'
    } else if status.contains(Status::WT_RENAMED) {
        'R'
    } else if status.contains(Status::WT_TYPECHANGE) {
        'T'
    } else {
        ' '
    };

    format!("{}{}", index, worktree)
}

fn index_flags() -> Status {
    Status::INDEX_NEW
        | Status::INDEX_MODIFIED
        | Status::INDEX_DELETED
        | Status::INDEX_RENAMED
        | Status::INDEX_TYPECHANGE
}

/// Stage the given pathspecs.
pub fn add(workdir: &Path, pathspecs: &[&str]) -> Result<String> {
    let repo = Repository::discover(workdir)?;
    let mut index = repo.index()?;
    index.add_all(pathspecs.iter().copied(), IndexAddOption::DEFAULT, None)?;
    index.write()?;
    Ok(format!("✓ Staged {} file(s)", pathspecs.len()))
}

/// Most recent commits, newest first, as `short-id subject`.
pub fn log(workdir: &Path, limit: usize) -> Result<String> {
    let repo = Repository::discover(workdir)?;
    if repo.head().is_err() {
        return Ok("No commits found".to_string());
    }

    let mut walk = repo.revwalk()?;
    walk.push_head()?;
    walk.set_sorting(Sort::TIME)?;

    let mut lines = Vec::new();
    for oid in walk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        let short = commit.as_object().short_id()?;
        lines.push(format!(
            "  {} {}",
            short.as_str().unwrap_or_default(),
            commit.summary().unwrap_or_default()
        ));
    }

    if lines.is_empty() {
        return Ok("No commits found".to_string());
    }
    Ok(format!("Recent commits:\n{}", lines.join("\n")))
}

/// Patch text of what is staged, or `None` when nothing is.
pub fn staged_diff(workdir: &Path) -> Result<Option<String>> {
    let repo = Repository::discover(workdir)?;
    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree()?),
        Err(_) => None,
    };

    let diff = repo.diff_tree_to_index(head_tree.as_ref(), None, None)?;
    if diff.deltas().len() == 0 {
        return Ok(None);
    }

    let mut patch = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            patch.push(line.origin());
        }
        patch.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(Some(patch))
}

/// Commit the index with the repository's configured identity.
pub fn commit(workdir: &Path, message: &str) -> Result<String> {
    let repo = Repository::discover(workdir)?;
    let signature = repo.signature()?;

    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
    Ok(oid.to_string())
}

/// Trim quotes and whitespace from a model-written subject and cap its length.
pub fn clean_commit_message(raw: &str) -> String {
    let msg = raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim();
    let msg = msg.lines().next().unwrap_or_default();
    if msg.chars().count() > MAX_SUBJECT_LEN {
        let head: String = msg.chars().take(MAX_SUBJECT_LEN - 3).collect();
        format!("{}...", head)
    } else {
        msg.to_string()
    }
}

pub async fn push(workdir: &Path, timeout: Duration) -> Result<String> {
    run_git(workdir, &["push"], timeout).await?;
    Ok("✓ Successfully pushed to remote".to_string())
}

pub async fn pull(workdir: &Path, timeout: Duration) -> Result<String> {
    run_git(workdir, &["pull"], timeout).await?;
    Ok("✓ Successfully pulled latest changes".to_string())
}

async fn run_git(workdir: &Path, args: &[&str], timeout: Duration) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(workdir);

    let what = format!("git {}", args.join(" "));
    let out = run_with_timeout(cmd, timeout, &what).await?;
    if !out.success() {
        return Err(LucienError::Process(format!(
            "{} failed: {}",
            what,
            out.stderr.trim()
        )));
    }
    Ok(out.stdout)
}
