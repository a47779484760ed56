use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command as GitCommand;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Marker git writes above the diff in verbose commit templates.
const SCISSORS: &str = "# ------------------------ >8 ------------------------";

/// One line of `git log`, as shown by the `history` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub hash: String,
    pub author: String,
    pub relative_date: String,
    pub subject: String,
}

impl HistoryEntry {
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(7);
        &self.hash[..end]
    }
}

/// Run a git command and capture stdout as String.
pub fn git_output(args: &[&str]) -> Result<String> {
    let output = GitCommand::new("git")
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {:?}", args))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "git {:?} exited with status {:?}: {}",
            args,
            output.status.code(),
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Whether `rev` names a commit, without printing anything on failure.
fn rev_exists(rev: &str) -> bool {
    if rev.starts_with('-') {
        return false;
    }
    let target = format!("{rev}^{{commit}}");
    GitCommand::new("git")
        .args(["rev-parse", "--verify", "--quiet", &target])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Get the path to the Git directory (e.g. .git)
pub fn git_dir() -> Result<PathBuf> {
    let dir = git_output(&["rev-parse", "--git-dir"])?.trim().to_string();
    Ok(PathBuf::from(dir))
}

/// Write the commit message into .git/COMMIT_EDITMSG so the next `git commit`
/// will use it as the default message in the editor.
pub fn write_commit_editmsg(message: &str) -> Result<PathBuf> {
    let path = git_dir()?.join("COMMIT_EDITMSG");
    fs::write(&path, format!("{message}\n"))
        .with_context(|| format!("failed to write commit message to {:?}", path))?;
    Ok(path)
}

/// Read the pending commit message from .git/COMMIT_EDITMSG, without comments.
///
/// Git leaves the last message in that file after every commit, so a message
/// that already belongs to HEAD counts as no message at all.
pub fn read_commit_editmsg() -> Result<Option<String>> {
    let path = git_dir()?.join("COMMIT_EDITMSG");
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read commit message from {:?}", path));
        }
    };

    let message = strip_comment_lines(&text);
    if message.is_empty() {
        return Ok(None);
    }

    let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok();
    if already_committed(&message, modified, head_commit()?.as_ref()) {
        debug!("{} still holds the message of the last commit; ignoring it", path.display());
        return Ok(None);
    }
    Ok(Some(message))
}

struct HeadCommit {
    message: String,
    committed_at: SystemTime,
}

fn head_commit() -> Result<Option<HeadCommit>> {
    if !rev_exists("HEAD") {
        return Ok(None);
    }
    let output = git_output(&["log", "-1", "--format=%ct%n%B", "HEAD"])?;
    Ok(Some(parse_head_commit(&output)?))
}

fn parse_head_commit(output: &str) -> Result<HeadCommit> {
    let (time, message) = output.split_once('\n').unwrap_or((output, ""));
    let secs: u64 = time
        .trim()
        .parse()
        .with_context(|| format!("unexpected commit time {time:?} from git log"))?;
    Ok(HeadCommit {
        message: strip_comment_lines(message),
        committed_at: UNIX_EPOCH + Duration::from_secs(secs),
    })
}

/// Whether COMMIT_EDITMSG is what git left behind when HEAD was committed.
fn already_committed(message: &str, modified: Option<SystemTime>, head: Option<&HeadCommit>) -> bool {
    let Some(head) = head else {
        return false;
    };
    if message == head.message {
        return true;
    }
    matches!(modified, Some(modified) if modified < head.committed_at)
}

fn strip_comment_lines(text: &str) -> String {
    text.lines()
        .take_while(|line| !line.starts_with(SCISSORS))
        .filter(|line| !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Diff to describe: staged changes if there are any, otherwise unstaged ones.
/// `None` when the working tree is clean.
pub fn working_diff(context_lines: u32) -> Result<Option<String>> {
    let unified = format!("-U{context_lines}");

    let staged = git_output(&["diff", "--staged", "--name-only"])?;
    if !staged.trim().is_empty() {
        debug!("Using {} staged file(s)", staged.lines().count());
        let diff = git_output(&["diff", "--staged", &unified])?;
        return Ok(Some(diff));
    }

    let unstaged = git_output(&["diff", "--name-only"])?;
    if !unstaged.trim().is_empty() {
        debug!("Nothing staged; using {} unstaged file(s)", unstaged.lines().count());
        let diff = git_output(&["diff", &unified])?;
        return Ok(Some(diff));
    }

    Ok(None)
}

/// Subjects of the commits on this branch since `base`, newest first.
///
/// Falls back to the last `count` commits when `base` is unknown or has no
/// commits ahead of it. Empty when the repository has no commits yet.
pub fn recent_commit_subjects(count: u32, base: &str) -> Result<Vec<String>> {
    if !rev_exists("HEAD") {
        return Ok(Vec::new());
    }

    let limit = format!("-{count}");
    let recent = || -> Result<String> {
        match git_output(&["log", &limit, "--pretty=format:%s", "--no-merges"]) {
            Ok(out) => Ok(out),
            Err(e) => {
                debug!("git log --no-merges failed ({e}); retrying without it");
                git_output(&["log", &limit, "--pretty=format:%s"])
            }
        }
    };

    let output = if rev_exists(base) {
        let range = format!("{base}..HEAD");
        let ahead = git_output(&["log", &range, "--pretty=format:%s", "--no-merges"])?;
        if ahead.trim().is_empty() {
            debug!("No commits between {base} and HEAD; using the last {count}");
            recent()?
        } else {
            ahead
        }
    } else {
        debug!("Base branch {base:?} not found; using the last {count} commits");
        recent()?
    };

    Ok(parse_subjects(&output, count as usize))
}

fn parse_subjects(output: &str, count: usize) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(count)
        .map(str::to_string)
        .collect()
}

/// The last `limit` commits on the current branch.
pub fn recent_history(limit: usize) -> Result<Vec<HistoryEntry>> {
    if !rev_exists("HEAD") {
        return Ok(Vec::new());
    }
    let limit = format!("-{limit}");
    let output = git_output(&["log", &limit, "--format=%H|%an|%ar|%s"])?;
    Ok(parse_history(&output))
}

fn parse_history(output: &str) -> Vec<HistoryEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(4, '|');
            let hash = parts.next()?.trim();
            if hash.is_empty() {
                return None;
            }
            Some(HistoryEntry {
                hash: hash.to_string(),
                author: parts.next()?.to_string(),
                relative_date: parts.next()?.to_string(),
                subject: parts.next().unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Full `git show` output for one commit.
pub fn show_commit(hash: &str) -> Result<String> {
    if hash.starts_with('-') {
        bail!("{hash:?} is not a commit");
    }
    git_output(&["show", hash])
}
