/// System helpers: disk, CPU, shell, passwords, opening things

use crate::error::{LucienError, Result};
use crate::tools::process::{run_with_timeout, shell_command};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;
use std::time::Duration;

const KIB_PER_GIB: u64 = 1 << 20;

/// Largest password `generate password` will produce
pub const MAX_PASSWORD_LEN: usize = 4096;

/// Disk usage of the filesystem holding `path`, as reported by `df`.
#[cfg(unix)]
pub async fn disk_space(path: &Path, timeout: Duration) -> Result<String> {
    let mut cmd = tokio::process::Command::new("df");
    cmd.arg("-Pk").arg(path);

    let out = run_with_timeout(cmd, timeout, "df").await?;
    if !out.success() {
        return Err(LucienError::Process(format!("df failed: {}", out.stderr.trim())));
    }
    let (total, free) = parse_df(&out.stdout)
        .ok_or_else(|| LucienError::Process("unexpected df output".to_string()))?;
    Ok(format_disk(total, free))
}

#[cfg(not(unix))]
pub async fn disk_space(_path: &Path, _timeout: Duration) -> Result<String> {
    Err(LucienError::Unsupported(
        "disk space needs a POSIX df".to_string(),
    ))
}

/// (total, available) KiB from `df -Pk` output
#[cfg_attr(not(unix), allow(dead_code))]
fn parse_df(output: &str) -> Option<(u64, u64)> {
    let fields: Vec<&str> = output.lines().nth(1)?.split_whitespace().collect();
    // Filesystem, 1024-blocks, Used, Available, Capacity, Mounted on
    let total = fields.get(1)?.parse().ok()?;
    let free = fields.get(3)?.parse().ok()?;
    Some((total, free))
}

#[cfg_attr(not(unix), allow(dead_code))]
fn format_disk(total_kib: u64, free_kib: u64) -> String {
    let used_pct = if total_kib == 0 {
        0.0
    } else {
        total_kib.saturating_sub(free_kib) as f64 / total_kib as f64 * 100.0
    };
    format!(
        "Total {} GB, Free {} GB, Used {:.1}%",
        total_kib / KIB_PER_GIB,
        free_kib / KIB_PER_GIB,
        used_pct
    )
}

/// CPU busy percentage sampled over one second.
pub async fn cpu_usage() -> Result<String> {
    let pct = sample_cpu(Duration::from_secs(1)).await?;
    Ok(format!("CPU Usage: {:.1}%", pct))
}

#[cfg(target_os = "linux")]
async fn sample_cpu(window: Duration) -> Result<f64> {
    let before = read_cpu_times()?;
    tokio::time::sleep(window).await;
    let after = read_cpu_times()?;
    Ok(busy_percent(before, after))
}

#[cfg(not(target_os = "linux"))]
async fn sample_cpu(_window: Duration) -> Result<f64> {
    Err(LucienError::Unsupported(
        "cpu usage is only available on Linux".to_string(),
    ))
}

/// (idle, total) jiffies from the aggregate `cpu` line of /proc/stat
#[cfg(target_os = "linux")]
fn read_cpu_times() -> Result<(u64, u64)> {
    let stat = std::fs::read_to_string("/proc/stat")?;
    parse_cpu_line(&stat)
        .ok_or_else(|| LucienError::Unsupported("unexpected /proc/stat format".to_string()))
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cpu_line(stat: &str) -> Option<(u64, u64)> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total = fields.iter().sum();
    Some((idle, total))
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn busy_percent(before: (u64, u64), after: (u64, u64)) -> f64 {
    let idle = after.0.saturating_sub(before.0);
    let total = after.1.saturating_sub(before.1);
    if total == 0 {
        return 0.0;
    }
    (total - idle.min(total)) as f64 / total as f64 * 100.0
}

/// Run `line` in the platform shell and show both streams.
pub async fn run_shell(line: &str, timeout: Duration) -> Result<String> {
    let out = run_with_timeout(shell_command(line), timeout, "shell command").await?;
    Ok(format!("STDOUT:\n{}\nSTDERR:\n{}", out.stdout, out.stderr))
}

/// Random alphanumeric password.
pub fn generate_password(length: usize) -> Result<String> {
    if length == 0 || length > MAX_PASSWORD_LEN {
        return Err(LucienError::usage(
            "generate password [length] (length must be between 1 and 4096)",
        ));
    }
    Ok(rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect())
}

/// Open a URL with the desktop's default handler.
pub fn open_url(url: &str) -> Result<String> {
    spawn_detached(opener(url))?;
    Ok(format!("✓ Opened URL: {}", url))
}

/// Open a file in VS Code.
pub fn open_in_editor(path: &str) -> Result<String> {
    let mut cmd = std::process::Command::new("code");
    cmd.arg(path);
    spawn_detached(cmd)?;
    Ok(format!("✓ Opened in VS Code: {}", path))
}

fn opener(target: &str) -> std::process::Command {
    #[cfg(target_os = "macos")]
    let mut cmd = std::process::Command::new("open");
    #[cfg(windows)]
    let mut cmd = {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut cmd = std::process::Command::new("xdg-open");

    cmd.arg(target);
    cmd
}

fn spawn_detached(mut cmd: std::process::Command) -> Result<()> {
    use std::process::Stdio;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match cmd.spawn() {
        Ok(_) => Ok(()),
        Err(e) => Err(LucienError::Process(format!(
            "could not launch {}: {}",
            cmd.get_program().to_string_lossy(),
            e
        ))),
    }
}
