//! Process-spawning seam.
//!
//! Transports go through [`CommandRunner`] instead of `std::process`
//! directly so their argument building can be tested without spawning
//! anything.

use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Outcome of one spawned process.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// Spawns local processes. Arguments are owned strings so the mock can
/// match them structurally.
#[cfg_attr(test, automock)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture the result.
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;

    /// Run `program` with `args`, feeding `stdin` to the child before
    /// collecting the result.
    fn run_with_stdin(&self, program: &str, args: &[String], stdin: &str) -> Result<CommandOutput>;
}

/// Runner backed by `std::process`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to run {}", program))?;
        Ok(into_command_output(output))
    }

    fn run_with_stdin(&self, program: &str, args: &[String], stdin: &str) -> Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", program))?;

        // The pipe must be closed before waiting or the child never
        // sees end of input.
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes())
                .with_context(|| format!("failed to write stdin of {}", program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for {}", program))?;
        Ok(into_command_output(output))
    }
}

fn into_command_output(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        code: output.status.code(),
    }
}
