//! SSH transport, driving the system `ssh` client.
//!
//! Authentication is whatever the local ssh configuration provides
//! (agent, keys, ProxyJump and friends), so hostsmith never handles
//! credentials itself.

use crate::node::Node;
use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

pub struct SshNode {
    name: String,
    target: String,
    port: u16,
    runner: Box<dyn CommandRunner>,
}

impl SshNode {
    pub fn new(name: &str, hostname: &str, user: &str, port: u16) -> Self {
        Self::with_runner(name, hostname, user, port, Box::new(SystemRunner))
    }

    pub fn with_runner(
        name: &str,
        hostname: &str,
        user: &str,
        port: u16,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            name: name.to_string(),
            target: format!("{}@{}", user, hostname),
            port,
            runner,
        }
    }

    /// Argument vector for one remote command. BatchMode keeps a broken
    /// host from hanging the whole run on a password prompt.
    fn ssh_args(&self, command: &str) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            self.target.clone(),
            command.to_string(),
        ]
    }
}

#[async_trait]
impl Node for SshNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        self.runner
            .run("ssh", &self.ssh_args(command))
            .with_context(|| format!("ssh to {} failed", self.target))
    }

    async fn write_file(&self, path: &str, content: &str, executable: bool) -> Result<()> {
        let mode = if executable { "0755" } else { "0644" };
        let command = format!("cat > {0} && chmod {1} {0}", path, mode);
        let output = self
            .runner
            .run_with_stdin("ssh", &self.ssh_args(&command), content)
            .with_context(|| format!("ssh to {} failed", self.target))?;
        if !output.success {
            bail!("writing {} on {} failed: {}", path, self.name, output.stderr.trim());
        }
        Ok(())
    }

    async fn set_permissions(&self, path: &str, mode: u32) -> Result<()> {
        let output = self.execute(&format!("chmod {:o} {}", mode, path)).await?;
        if !output.success {
            bail!("chmod {:o} {} on {} failed: {}", mode, path, self.name, output.stderr.trim());
        }
        Ok(())
    }
}
