//! Local transport: the machine hostsmith itself runs on.

use crate::node::Node;
use crate::runner::{CommandOutput, CommandRunner, SystemRunner};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// The local host, driven through `sh -c` so local and remote deploys
/// share shell semantics (`~user` expansion included).
pub struct LocalNode {
    name: String,
    runner: Box<dyn CommandRunner>,
}

impl LocalNode {
    pub fn new(name: &str) -> Self {
        Self::with_runner(name, Box::new(SystemRunner))
    }

    pub fn with_runner(name: &str, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            name: name.to_string(),
            runner,
        }
    }

    fn sh_args(command: &str) -> Vec<String> {
        vec!["-c".to_string(), command.to_string()]
    }
}

#[async_trait]
impl Node for LocalNode {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, command: &str) -> Result<CommandOutput> {
        self.runner
            .run("sh", &Self::sh_args(command))
            .with_context(|| format!("running a command on {} failed", self.name))
    }

    async fn write_file(&self, path: &str, content: &str, executable: bool) -> Result<()> {
        let mode = if executable { "0755" } else { "0644" };
        let command = format!("cat > {0} && chmod {1} {0}", path, mode);
        let output = self
            .runner
            .run_with_stdin("sh", &Self::sh_args(&command), content)
            .with_context(|| format!("writing {} on {} failed", path, self.name))?;
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
