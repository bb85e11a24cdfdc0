//! External command execution utilities.
//!
//! Provides a Builder-based API for running commands with captured output.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::from_slice(&["./reindex.sh", "jammy"])
//!     .cwd(root)
//!     .envs([("DEBREPO_DIST", "jammy")])
//!     .run()?;
//! ```

use crate::debug;
use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
};

/// Command builder for external process execution.
#[derive(Debug, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["reprepro", "export"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        Self::new(program).args(iter)
    }

    /// Add a single argument, passed through as-is (empty ones included).
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        args.into_iter().fold(self, Self::arg)
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Execute the command, failing on spawn errors or a non-zero exit.
    pub fn run(self) -> Result<Output> {
        let name = self.program_name();
        if name.is_empty() {
            bail!("empty command");
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().cloned())
            .stdin(Stdio::null());
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !output.status.success() {
            bail!(format_error(&name, &output));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            debug!("update"; "{}: {}", name, stderr);
        }
        Ok(output)
    }
}

/// Format error message for failed command.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);
    for stream in [stderr.trim(), stdout.trim()] {
        if !stream.is_empty() {
            msg.push('\n');
            msg.push_str(stream);
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_builder() {
        let cmd = Cmd::from_slice(&["echo", "hello"])
            .args(["world", "!"])
            .cwd("/tmp");

        assert_eq!(cmd.program, OsString::from("echo"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_empty_args_kept() {
        let cmd = Cmd::new("echo").arg("").args(["a", "", "b"]);
        assert_eq!(cmd.args, ["", "a", "", "b"].map(OsString::from));
    }

    #[cfg(unix)]
    #[test]
    fn test_argv_reaches_child_unchanged() {
        Cmd::from_slice(&[
            "sh",
            "-c",
            "[ \"$#\" = 2 ] && [ -z \"$1\" ] && [ \"$2\" = x ]",
            "sh",
            "",
            "x",
        ])
        .run()
        .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_env_passed_to_child() {
        let output = Cmd::from_slice(&["sh", "-c", "printf %s \"$DEBREPO_DIST\""])
            .envs([("DEBREPO_DIST", "jammy")])
            .run()
            .unwrap();
        assert_eq!(output.stdout, b"jammy");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_error() {
        let err = Cmd::from_slice(&["sh", "-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_empty_command_is_error() {
        assert!(Cmd::from_slice::<&str>(&[]).run().is_err());
    }
}
