//! Firewall recipe: compiles the declarative rule set and deploys one
//! script per protocol family.

use crate::firewall::{assemble, normalize_rule, CompiledScript, IpFamily, RuleSet};
use crate::node::{Node, OsFamily};
use crate::recipes::{DeployContext, Recipe};
use crate::report;
use anyhow::Result;
use async_trait::async_trait;
use serde_yaml::Value;
use tracing::{debug, warn};

pub struct FirewallRecipe {
    rules: RuleSet,
}

impl FirewallRecipe {
    /// Parse and validate the rule set. Field problems surface here so
    /// a broken configuration never reaches a node.
    pub fn from_config(config: &Value) -> Result<Self> {
        let rules = RuleSet::from_value(config)?;
        for chain in &rules.chains {
            for rule in &chain.rules {
                normalize_rule(rule)?;
            }
        }
        Ok(Self { rules })
    }

    /// Package carrying the packet-filter tools on this family.
    fn package(os: OsFamily) -> &'static str {
        match os {
            OsFamily::Debian | OsFamily::Gentoo => "iptables",
            OsFamily::RedHat => "iptables-ipv6",
        }
    }

    async fn deploy_family(
        &self,
        node: &dyn Node,
        ctx: &DeployContext,
        family: IpFamily,
    ) -> Result<()> {
        let script = assemble(&self.rules, family, ctx.os)?;
        debug!("{}: {} script:\n{}", node.name(), family.label(), script.content);

        let wrote = outcome(
            node,
            node.write_file(&script.path, &script.content, script.executable).await,
        );
        if !report::step(&format!("writing {} rules to {}", family.label(), script.path), wrote) {
            return Ok(());
        }

        let restricted = outcome(node, node.set_permissions(&script.path, script.mode).await);
        report::step(&format!("setting mode {:o} on {}", script.mode, script.path), restricted);

        if ctx.apply {
            let applied = apply_script(node, ctx.os, family, &script).await;
            report::step(&format!("applying {} rules", family.label()), applied);

            if ctx.os == OsFamily::Gentoo {
                let saved = outcome(node, node.save_service_state(family.command()).await);
                report::step(&format!("saving {} rules", family.label()), saved);
            }
        }
        Ok(())
    }
}

/// Activate freshly written rules. RedHat loads the ruleset file by
/// restarting the init script; the script platforms execute the script
/// itself, where success means a silent run: any output while loading
/// points at a broken rule even when the exit code is zero.
async fn apply_script(
    node: &dyn Node,
    os: OsFamily,
    family: IpFamily,
    script: &CompiledScript,
) -> bool {
    match os {
        OsFamily::Debian | OsFamily::Gentoo => match node.execute(&script.path).await {
            Ok(run) => run.success && run.stdout.is_empty() && run.stderr.is_empty(),
            Err(err) => {
                warn!("{}: {:#}", node.name(), err);
                false
            }
        },
        OsFamily::RedHat => outcome(node, node.restart_service(family.command()).await),
    }
}

/// Log the error behind a failed step and reduce it to a flag.
fn outcome(node: &dyn Node, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("{}: {:#}", node.name(), err);
            false
        }
    }
}

#[async_trait]
impl Recipe for FirewallRecipe {
    fn name(&self) -> &'static str {
        "firewall"
    }

    async fn deploy(&self, node: &dyn Node, ctx: &DeployContext) -> Result<()> {
        let package = Self::package(ctx.os);
        let installed = match node.install_package(package).await {
            Ok(done) => done,
            Err(err) => {
                warn!("{}: {:#}", node.name(), err);
                false
            }
        };
        report::step(&format!("installing {}", package), installed);

        for family in IpFamily::ALL {
            if let Err(err) = self.deploy_family(node, ctx, family).await {
                report::failed(&format!("deploying {} rules: {:#}", family.label(), err));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::mock::MockNode;

    fn firewall_recipe(yaml: &str) -> FirewallRecipe {
        FirewallRecipe::from_config(&serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn ctx(os: OsFamily, apply: bool) -> DeployContext {
        DeployContext { os, apply }
    }

    #[tokio::test]
    async fn test_writes_both_family_scripts_on_debian() {
        let node = MockNode::new(OsFamily::Debian);
        firewall_recipe("{input: [{dport: 22}]}")
            .deploy(&node, &ctx(OsFamily::Debian, false))
            .await
            .unwrap();

        let written = node.written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].0, "/etc/network/if-pre-up.d/iptables");
        assert!(written[0].2);
        assert!(written[0].1.contains("iptables -A INPUT --dport 22 --jump ACCEPT --protocol tcp"));
        assert_eq!(written[1].0, "/etc/network/if-pre-up.d/ip6tables");

        let modes = node.modes.lock().unwrap();
        assert_eq!(modes.len(), 2);
        assert!(modes.iter().all(|(_, mode)| *mode == 0o700));
    }

    #[tokio::test]
    async fn test_redhat_targets_sysconfig_without_exec_bit() {
        let node = MockNode::new(OsFamily::RedHat);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::RedHat, false)).await.unwrap();

        let written = node.written.lock().unwrap();
        assert_eq!(written[0].0, "/etc/sysconfig/iptables");
        assert!(!written[0].2);

        let modes = node.modes.lock().unwrap();
        assert!(modes.iter().all(|(_, mode)| *mode == 0o600));
    }

    #[tokio::test]
    async fn test_installs_the_family_package_first() {
        let node = MockNode::new(OsFamily::RedHat);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::RedHat, false)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(executed.iter().any(|c| c.as_str() == "yum -y install iptables-ipv6"));
    }

    #[tokio::test]
    async fn test_nothing_is_activated_without_apply() {
        let node = MockNode::new(OsFamily::RedHat);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::RedHat, false)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(!executed.iter().any(|c| c.contains("restart")));
    }

    #[tokio::test]
    async fn test_apply_restarts_the_init_scripts_on_redhat() {
        let node = MockNode::new(OsFamily::RedHat);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::RedHat, true)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(executed.iter().any(|c| c.as_str() == "/etc/init.d/iptables restart"));
        assert!(executed.iter().any(|c| c.as_str() == "/etc/init.d/ip6tables restart"));
    }

    #[tokio::test]
    async fn test_apply_executes_the_scripts_on_debian() {
        let node = MockNode::new(OsFamily::Debian);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::Debian, true)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(executed.iter().any(|c| c.as_str() == "/etc/network/if-pre-up.d/iptables"));
        assert!(executed.iter().any(|c| c.as_str() == "/etc/network/if-pre-up.d/ip6tables"));
        assert!(!executed.iter().any(|c| c.contains(" save")));
    }

    #[tokio::test]
    async fn test_gentoo_saves_rules_only_when_applying() {
        let node = MockNode::new(OsFamily::Gentoo);
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::Gentoo, true)).await.unwrap();
        {
            let executed = node.executed.lock().unwrap();
            assert!(executed.iter().any(|c| c.as_str() == "/etc/init.d/iptables save"));
            assert!(executed.iter().any(|c| c.as_str() == "/etc/init.d/ip6tables save"));
        }

        let staged = MockNode::new(OsFamily::Gentoo);
        firewall_recipe("{}").deploy(&staged, &ctx(OsFamily::Gentoo, false)).await.unwrap();
        let executed = staged.executed.lock().unwrap();
        assert!(!executed.iter().any(|c| c.contains(" save")));
    }

    #[tokio::test]
    async fn test_failed_v4_apply_does_not_block_v6() {
        let node = MockNode::new(OsFamily::Debian).fail_on("if-pre-up.d/iptables");
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::Debian, true)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(executed.iter().any(|c| c.as_str() == "/etc/network/if-pre-up.d/ip6tables"));
    }

    #[tokio::test]
    async fn test_failed_write_skips_apply_for_that_family() {
        let mut node = MockNode::new(OsFamily::Debian);
        node.write_fails = true;
        firewall_recipe("{}").deploy(&node, &ctx(OsFamily::Debian, true)).await.unwrap();

        let executed = node.executed.lock().unwrap();
        assert!(!executed.iter().any(|c| c.contains("if-pre-up.d")));
    }

    #[tokio::test]
    async fn test_script_apply_requires_a_silent_run() {
        let recipe = firewall_recipe("{}");
        let node = MockNode::new(OsFamily::Debian).noisy_on("if-pre-up.d");
        let script = assemble(&recipe.rules, IpFamily::V4, OsFamily::Debian).unwrap();
        assert!(!apply_script(&node, OsFamily::Debian, IpFamily::V4, &script).await);

        let quiet = MockNode::new(OsFamily::Debian);
        assert!(apply_script(&quiet, OsFamily::Debian, IpFamily::V4, &script).await);
    }

    #[test]
    fn test_malformed_rules_are_rejected_at_construction() {
        let config: Value = serde_yaml::from_str("{input: [{dport: {port: 80}}]}").unwrap();
        assert!(FirewallRecipe::from_config(&config).is_err());

        let config: Value = serde_yaml::from_str("{input: [{ip-version: banana}]}").unwrap();
        assert!(FirewallRecipe::from_config(&config).is_err());
    }
}
