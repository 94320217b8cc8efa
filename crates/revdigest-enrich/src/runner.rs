//! External process execution for command analyzers.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use revdigest_core::DigestError;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one analyzer process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout followed by stderr, with a newline between them when stdout
    /// does not already end in one.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Run `program` with `args` in `cwd` and capture its output.
///
/// The child is killed if the returned future is dropped, so wrapping this in
/// `tokio::time::timeout` does not leak processes. Stdin is closed.
///
/// # Errors
///
/// Returns [`DigestError::Analyzer`] if the process cannot be spawned or
/// waited on. A non-zero exit is not an error here; callers decide which
/// codes they accept.
pub async fn run_command(
    program: &Path,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput, DigestError> {
    debug!(program = %program.display(), ?args, "spawning analyzer");

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            DigestError::Analyzer(format!("failed to spawn {}: {e}", program.display()))
        })?;

    let output = child.wait_with_output().await.map_err(|e| {
        DigestError::Analyzer(format!("failed to wait for {}: {e}", program.display()))
    })?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Resolve `program` the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// searched on `PATH`. Returns `None` when nothing executable is found.
pub fn find_program(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    let mut out = vec![dir.join(program)];
    for ext in ["exe", "cmd", "bat"] {
        out.push(dir.join(format!("{program}.{ext}")));
    }
    out
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
