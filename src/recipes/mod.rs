//! Deployable units and their registry.

pub mod firewall;
pub mod ssh_keys;

use crate::error::HostsmithError;
use crate::node::{Node, OsFamily};
use anyhow::Result;
use async_trait::async_trait;
use serde_yaml::Value;

/// Everything a recipe needs besides its own configuration.
pub struct DeployContext {
    /// OS family detected once when the node was first reached.
    pub os: OsFamily,
    /// Whether to activate what was written (execute scripts, restart
    /// services) or only stage files.
    pub apply: bool,
}

/// A named unit of configuration applied to one node.
#[async_trait]
pub trait Recipe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deploy against `node`. Step-level failures are reported inline;
    /// an Err means the recipe could not run at all.
    async fn deploy(&self, node: &dyn Node, ctx: &DeployContext) -> Result<()>;
}

/// Recipe identifiers with a registered constructor.
pub const KNOWN_RECIPES: &[&str] = &["firewall", "ssh_authorized_keys"];

/// Construct a recipe from its configured name. Configuration problems
/// surface here, before any node is touched.
pub fn create_recipe(name: &str, config: &Value) -> Result<Box<dyn Recipe>> {
    match name {
        "firewall" => Ok(Box::new(firewall::FirewallRecipe::from_config(config)?)),
        "ssh_authorized_keys" => Ok(Box::new(ssh_keys::SshKeysRecipe::from_config(config)?)),
        _ => Err(HostsmithError::UnknownRecipe {
            name: name.to_string(),
            known: KNOWN_RECIPES.join(", "),
        }
        .into()),
    }
}
