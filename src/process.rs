//! External command execution.
//!
//! Every tool this crate drives (`openstack`, `ubuntu-device-flash`,
//! `qemu-img`, `mktemp`, `snap`) is invoked through [`Cmd`]. The core
//! components never touch [`Cmd`] directly; they go through the
//! [`CliCommander`] seam so tests can substitute a recording fake.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No program was given.
    #[error("empty command line")]
    Empty,

    /// The program could not be started at all.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and reported failure.
    #[error("'{command}' failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl ExecError {
    /// The command line that failed, if one was run.
    pub fn command(&self) -> Option<&str> {
        match self {
            ExecError::Empty => None,
            ExecError::Spawn { command, .. } | ExecError::Failed { command, .. } => Some(command),
        }
    }
}

/// Builder for a single external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The command line as it would be typed in a shell (unquoted).
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and return stdout.
    ///
    /// A non-zero exit status is an error carrying stderr.
    pub fn run(&self) -> Result<String, ExecError> {
        let command = self.command_line();
        debug!(%command, "running");

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| ExecError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Executes an external program and returns its standard output.
///
/// `args[0]` is the program. The output is only meaningful on success.
pub trait CliCommander {
    fn exec_command(&self, args: &[String]) -> Result<String, ExecError>;
}

/// [`CliCommander`] backed by real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommander;

impl CliCommander for ShellCommander {
    fn exec_command(&self, args: &[String]) -> Result<String, ExecError> {
        let (program, rest) = args.split_first().ok_or(ExecError::Empty)?;
        Cmd::new(program.as_str())
            .args(rest.iter().map(String::as_str))
            .run()
    }
}

/// Convert a literal argument list into owned strings.
pub(crate) fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_args() {
        let cmd = Cmd::new("qemu-img")
            .args(["convert", "-O", "qcow2"])
            .args(["/tmp/x/raw.img"]);
        assert_eq!(cmd.command_line(), "qemu-img convert -O qcow2 /tmp/x/raw.img");
    }

    #[test]
    fn test_shell_commander_captures_stdout() {
        let out = ShellCommander
            .exec_command(&argv(&["echo", "hello"]))
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_shell_commander_reports_failure() {
        let err = ShellCommander.exec_command(&argv(&["false"])).unwrap_err();
        assert!(matches!(err, ExecError::Failed { .. }));
        assert_eq!(err.command(), Some("false"));
    }

    #[test]
    fn test_shell_commander_reports_missing_program() {
        let err = ShellCommander
            .exec_command(&argv(&["no-such-snappy-tool"]))
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_empty_command_line() {
        assert!(matches!(
            ShellCommander.exec_command(&[]),
            Err(ExecError::Empty)
        ));
    }
}
