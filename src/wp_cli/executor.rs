//! Runs WP-CLI subcommands as child processes of a resolved PHP interpreter.

use super::ToolSource;
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// WP-CLI environment variables forwarded to the child when set upstream.
/// Unset variables are omitted, never passed as empty strings.
const ENV_ALLOW_LIST: [&str; 3] = [
    "WP_CLI_CACHE_DIR",
    "WP_CLI_DISABLE_AUTO_CHECK",
    "WP_CLI_STRICT_ARGS_MODE",
];

/// Subprocess execution is attempt-once with an explicit deadline; a hung
/// child is killed rather than hanging the whole run.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(600);
const WAIT_POLL: Duration = Duration::from_millis(50);

/// Captured result of one tool subcommand.
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Locate the PHP interpreter on PATH. Failure here is fatal for the whole
/// run; tool-dependent steps would otherwise fail later with a worse error.
pub fn resolve_interpreter() -> Result<PathBuf> {
    which::which("php").map_err(|err| anyhow!("php interpreter not found on PATH: {err}"))
}

/// Executes arbitrary WP-CLI subcommands against one tool source.
pub struct WpCliExecutor {
    php: PathBuf,
    source: ToolSource,
    cwd: PathBuf,
    env: BTreeMap<String, String>,
}

impl WpCliExecutor {
    pub fn new(php: PathBuf, source: ToolSource, cwd: PathBuf) -> Self {
        Self {
            php,
            source,
            cwd,
            env: child_env_from(|key| std::env::var(key).ok()),
        }
    }

    /// Environment passed to children, after allow-list filtering/defaulting.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Split a configured command line and run it through the interpreter.
    /// A leading `wp` token is accepted and stripped.
    pub fn execute(&self, command: &str) -> Result<CommandOutput> {
        let mut args = shell_words::split(command)
            .with_context(|| format!("parse WP-CLI command {command:?}"))?;
        if args.first().map(String::as_str) == Some("wp") {
            args.remove(0);
        }
        if args.is_empty() {
            return Err(anyhow!("empty WP-CLI command"));
        }

        let mut cmd = Command::new(&self.php);
        cmd.arg(self.source.launch_path());
        cmd.args(&args);
        cmd.current_dir(&self.cwd);
        // The child inherits the parent environment; strip every allow-listed
        // variable first so the filtered map is authoritative for them.
        for key in ENV_ALLOW_LIST {
            cmd.env_remove(key);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn {}", self.php.display()))?;
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let deadline = Instant::now() + COMMAND_TIMEOUT;
        let status = loop {
            if let Some(status) = child.try_wait().context("wait for WP-CLI child")? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!(
                    "WP-CLI command timed out after {}s: {command}",
                    COMMAND_TIMEOUT.as_secs()
                ));
            }
            std::thread::sleep(WAIT_POLL);
        };

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }
}

/// Build the child environment from an upstream lookup: allow-listed
/// variables pass through when set, auto-update checks are disabled by
/// default, and the cache directory is pinned when the platform has one.
fn child_env_from<F: Fn(&str) -> Option<String>>(lookup: F) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    for key in ENV_ALLOW_LIST {
        if let Some(value) = lookup(key) {
            if !value.is_empty() {
                env.insert(key.to_string(), value);
            }
        }
    }
    env.entry("WP_CLI_DISABLE_AUTO_CHECK".to_string())
        .or_insert_with(|| "1".to_string());
    if !env.contains_key("WP_CLI_CACHE_DIR") {
        if let Some(cache) = dirs::cache_dir() {
            env.insert(
                "WP_CLI_CACHE_DIR".to_string(),
                cache.join("wp-cli").display().to_string(),
            );
        }
    }
    env
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}
