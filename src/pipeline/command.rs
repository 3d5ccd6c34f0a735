//! Process-execution seam for the external OCR tools.
//!
//! The recognition fallback only needs three things from the OS: find a
//! program on `PATH`, run it with an argument vector, and read back its exit
//! status and captured output. [`CommandRunner`] is exactly that surface, so
//! tests can script the rasterizer and OCR engine without real binaries.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Captured result of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Locates and runs external programs.
pub trait CommandRunner: Send + Sync {
    /// Resolve `program` to an executable path, or `None` if it is not installed.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Run `program` with `args` to completion, capturing stdout and stderr.
    ///
    /// `Err` means the process could not be started at all.
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
    ) -> impl Future<Output = std::io::Result<CommandOutput>> + Send;
}

/// Runs real processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_executable(program, std::env::var_os("PATH"))
    }

    async fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
        debug!("exec {} {:?}", program.display(), args);
        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Search `path_var` for `program`. Names containing a separator are
/// checked as given.
fn find_executable(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path_var = path_var?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let full = dir.join(program);
        if is_executable(&full) {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = full.with_extension("exe");
            if is_executable(&exe) {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
