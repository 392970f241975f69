//! SSH key distribution: builds authorized_keys files from a user
//! table and per-account grants.

use crate::node::Node;
use crate::recipes::{DeployContext, Recipe};
use crate::report;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use tracing::warn;

/// One person who may be granted access.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyUser {
    /// Display name, recorded as the key comment.
    pub name: Option<String>,
    pub email: Option<String>,
    /// Public key lines, verbatim.
    #[serde(default)]
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SshKeysConfig {
    /// User id to identity and keys.
    #[serde(default)]
    users: HashMap<String, KeyUser>,
    /// Remote account to user ids allowed to log in, declaration order
    /// preserved.
    #[serde(default)]
    authorize: Mapping,
}

pub struct SshKeysRecipe {
    users: HashMap<String, KeyUser>,
    grants: Vec<(String, Vec<String>)>,
}

impl SshKeysRecipe {
    /// Parse and validate the configuration. Account names and granted
    /// user ids are checked against the login-name pattern before they
    /// ever reach a shell command, and every granted user id must exist
    /// in the user table.
    pub fn from_config(config: &Value) -> Result<Self> {
        let parsed: SshKeysConfig = serde_yaml::from_value(config.clone())
            .context("invalid ssh_authorized_keys configuration")?;

        let mut grants = Vec::with_capacity(parsed.authorize.len());
        for (account, users) in &parsed.authorize {
            let account = account
                .as_str()
                .filter(|name| is_valid_username(name))
                .with_context(|| format!("invalid remote account name: {:?}", account))?
                .to_string();
            let user_ids: Vec<String> = serde_yaml::from_value(users.clone())
                .with_context(|| format!("authorize entry for '{}' must list user ids", account))?;
            for id in &user_ids {
                if !is_valid_username(id) {
                    bail!("authorize entry for '{}' has invalid user id '{}'", account, id);
                }
                if !parsed.users.contains_key(id) {
                    bail!("authorize entry for '{}' references unknown user '{}'", account, id);
                }
            }
            grants.push((account, user_ids));
        }

        Ok(Self {
            users: parsed.users,
            grants,
        })
    }

    /// Render one authorized_keys file: every granted user's keys, each
    /// with the owner's identity as trailing comment.
    fn authorized_keys_text(&self, user_ids: &[String]) -> String {
        let mut text = String::new();
        for id in user_ids {
            if let Some(user) = self.users.get(id) {
                for key in &user.keys {
                    text.push_str(key.trim_end());
                    if let Some(name) = &user.name {
                        text.push(' ');
                        text.push_str(name);
                    }
                    if let Some(email) = &user.email {
                        text.push_str(&format!(" <{}>", email));
                    }
                    text.push('\n');
                }
            }
        }
        text
    }
}

/// Conservative login-name check before a name reaches any shell
/// command.
pub fn is_valid_username(name: &str) -> bool {
    if name.is_empty() || name.len() > 32 {
        return false;
    }
    let mut chars = name.chars();
    matches!(chars.next(), Some('a'..='z') | Some('_'))
        && chars.all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
}

#[async_trait]
impl Recipe for SshKeysRecipe {
    fn name(&self) -> &'static str {
        "ssh_authorized_keys"
    }

    async fn deploy(&self, node: &dyn Node, _ctx: &DeployContext) -> Result<()> {
        for (account, user_ids) in &self.grants {
            let text = self.authorized_keys_text(user_ids);
            let dir = format!("~{}/.ssh", account);
            let path = format!("{}/authorized_keys", dir);

            let ready = match node.execute(&format!("mkdir -p {}", dir)).await {
                Ok(run) => run.success,
                Err(err) => {
                    warn!("{}: {:#}", node.name(), err);
                    false
                }
            };
            if !report::step(&format!("creating {}", dir), ready) {
                continue;
            }

            let written = match node.write_file(&path, &text, false).await {
                Ok(()) => true,
                Err(err) => {
                    warn!("{}: {:#}", node.name(), err);
                    false
                }
            };
            if !report::step(&format!("authorizing keys for {}", account), written) {
                continue;
            }

            let owned = match node.execute(&format!("chown -R {0}:{0} {1}", account, dir)).await {
                Ok(run) => run.success,
                Err(err) => {
                    warn!("{}: {:#}", node.name(), err);
                    false
                }
            };
            report::step(&format!("granting {} ownership of {}", account, dir), owned);

            let restricted = match node.set_permissions(&path, 0o644).await {
                Ok(()) => true,
                Err(err) => {
                    warn!("{}: {:#}", node.name(), err);
                    false
                }
            };
            report::step(&format!("setting mode 644 on {}", path), restricted);
        }
        Ok(())
    }
}
