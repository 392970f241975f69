//! Execution channel to managed hosts.
//!
//! [`Node`] is the seam every recipe drives: run a command, write a
//! file, adjust permissions. OS classification, package installation
//! and service control are derived from `execute`, so transports stay
//! small.

pub mod local;
pub mod ssh;

pub use local::LocalNode;
pub use ssh::SshNode;

use crate::config::NodeSpec;
use crate::error::HostsmithError;
use crate::runner::CommandOutput;
use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

/// Host OS classification, detected once per node. A closed set:
/// everything the deployer knows how to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Debian,
    Gentoo,
    RedHat,
}

impl OsFamily {
    /// Release file whose presence identifies the family.
    fn release_file(self) -> &'static str {
        match self {
            OsFamily::Debian => "/etc/debian_version",
            OsFamily::Gentoo => "/etc/gentoo-release",
            OsFamily::RedHat => "/etc/redhat-release",
        }
    }

    /// Human label for logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            OsFamily::Debian => "debian-like",
            OsFamily::Gentoo => "gentoo-like",
            OsFamily::RedHat => "redhat-like",
        }
    }

    /// Package-manager invocation for this family.
    fn install_command(self, package: &str) -> String {
        match self {
            OsFamily::Debian => format!("apt-get -y install {}", package),
            OsFamily::Gentoo => format!("emerge {}", package),
            OsFamily::RedHat => format!("yum -y install {}", package),
        }
    }
}

impl std::str::FromStr for OsFamily {
    type Err = HostsmithError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "debian" => Ok(OsFamily::Debian),
            "gentoo" => Ok(OsFamily::Gentoo),
            "redhat" | "centos" => Ok(OsFamily::RedHat),
            _ => Err(HostsmithError::Config(format!(
                "unknown os family '{}' (expected debian, gentoo or redhat)",
                name
            ))),
        }
    }
}

/// A managed host. Implementations provide the three transport
/// primitives; the provided methods build on `execute`.
///
/// Paths and commands are trusted configuration, passed to the remote
/// shell as-is so `~user` expansion keeps working.
#[async_trait]
pub trait Node: Send + Sync {
    /// Display name used in reports and logs.
    fn name(&self) -> &str;

    /// Run a shell command on the node.
    async fn execute(&self, command: &str) -> Result<CommandOutput>;

    /// Write `content` to `path`, creating or truncating the file. The
    /// executable flag picks the initial mode before any explicit chmod.
    async fn write_file(&self, path: &str, content: &str, executable: bool) -> Result<()>;

    /// chmod `path` to `mode`.
    async fn set_permissions(&self, path: &str, mode: u32) -> Result<()>;

    /// Classify the host OS by probing release files.
    async fn detect_os_family(&self) -> Result<OsFamily> {
        for family in [OsFamily::Debian, OsFamily::Gentoo, OsFamily::RedHat] {
            let probe = format!("test -e {}", family.release_file());
            if self.execute(&probe).await?.success {
                debug!("{}: classified as {}", self.name(), family.label());
                return Ok(family);
            }
        }
        Err(HostsmithError::UnsupportedPlatform(self.name().to_string()).into())
    }

    /// Install a package with the family's package manager. Returns
    /// whether the install command succeeded.
    async fn install_package(&self, package: &str) -> Result<bool> {
        let family = self.detect_os_family().await?;
        let command = family.install_command(package);
        debug!("{}: {}", self.name(), command);
        Ok(self.execute(&command).await?.success)
    }

    /// Restart a service through its init script.
    async fn restart_service(&self, service: &str) -> Result<()> {
        let output = self.execute(&format!("/etc/init.d/{} restart", service)).await?;
        if !output.success {
            bail!("restarting {} failed: {}", service, output.stderr.trim());
        }
        Ok(())
    }

    /// Persist a service's runtime state through its init script, the
    /// Gentoo way of keeping firewall rules across reboots.
    async fn save_service_state(&self, service: &str) -> Result<()> {
        let output = self.execute(&format!("/etc/init.d/{} save", service)).await?;
        if !output.success {
            bail!("saving {} state failed: {}", service, output.stderr.trim());
        }
        Ok(())
    }
}

/// Build the transport for a configured node.
pub fn create_node(spec: &NodeSpec) -> Box<dyn Node> {
    if spec.local {
        Box::new(LocalNode::new(&spec.name))
    } else {
        Box::new(SshNode::new(&spec.name, spec.target(), &spec.user, spec.port))
    }
}

/// Whether the current process runs with effective uid 0.
pub fn running_as_root() -> bool {
    // SAFETY: geteuid() reads the effective user ID. It has no
    // preconditions, never fails, and doesn't modify any state.
    unsafe { libc::geteuid() == 0 }
}
