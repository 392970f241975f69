//! Deploy command implementation.

use crate::config::{self, NodeSpec};
use crate::node::{self, Node};
use crate::recipes::{self, DeployContext, Recipe};
use crate::report;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Run every configured recipe on every selected node. Failures are
/// reported per step and never abort the remaining nodes.
pub async fn run(directory: &Path, pattern: Option<&str>, apply: bool) -> Result<()> {
    let nodes = config::select_nodes(config::load_nodes(directory)?, pattern);
    if nodes.is_empty() {
        println!("no nodes matched");
        return Ok(());
    }

    for spec in &nodes {
        println!("{} ({})", spec.name, spec.target());
        if spec.local && apply && !node::running_as_root() {
            warn!("applying to the local host usually requires root");
        }
        let node = node::create_node(spec);
        if let Err(err) = deploy_node(node.as_ref(), spec, apply).await {
            report::failed(&format!("{:#}", err));
        }
        println!();
    }
    Ok(())
}

/// Deploy one node: classify its platform, then hand each configured
/// recipe its slice of the node definition.
pub async fn deploy_node(node: &dyn Node, spec: &NodeSpec, apply: bool) -> Result<()> {
    let os = node
        .detect_os_family()
        .await
        .with_context(|| format!("cannot classify {}", spec.name))?;
    info!("{} is {}", spec.name, os.label());
    let ctx = DeployContext { os, apply };

    for (name, config) in &spec.recipes {
        let name = match name.as_str() {
            Some(name) => name,
            None => {
                report::failed(&format!("recipe names must be strings, got {:?}", name));
                continue;
            }
        };
        println!("  {}:", name);
        let recipe = match recipes::create_recipe(name, config) {
            Ok(recipe) => recipe,
            Err(err) => {
                report::failed(&format!("{:#}", err));
                continue;
            }
        };
        if let Err(err) = recipe.deploy(node, &ctx).await {
            report::failed(&format!("{:#}", err));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::mock::MockNode;
    use crate::node::OsFamily;

    fn spec_from(yaml: &str) -> NodeSpec {
        let mut spec: NodeSpec = serde_yaml::from_str(yaml).unwrap();
        spec.name = "web1".to_string();
        spec
    }

    #[tokio::test]
    async fn test_deploys_every_configured_recipe() {
        let spec = spec_from(
            "recipes:
               firewall:
                 input:
                   - dport: 22
               ssh_authorized_keys: {}",
        );
        let node = MockNode::new(OsFamily::Debian);
        deploy_node(&node, &spec, false).await.unwrap();

        let written = node.written.lock().unwrap();
        let paths: Vec<&str> = written.iter().map(|(path, _, _)| path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "/etc/network/if-pre-up.d/iptables",
                "/etc/network/if-pre-up.d/ip6tables"
            ]
        );
    }

    #[tokio::test]
    async fn test_unclassifiable_platform_stops_the_node() {
        let spec = spec_from("recipes: {firewall: {}}");
        let node = MockNode::unsupported();
        let err = format!("{:#}", deploy_node(&node, &spec, false).await.unwrap_err());
        assert!(err.contains("classify"), "unexpected error: {}", err);
        assert!(node.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_recipe_does_not_block_the_rest() {
        let spec = spec_from(
            "recipes:
               bogus: {}
               firewall:
                 input:
                   - dport: 22",
        );
        let node = MockNode::new(OsFamily::RedHat);
        deploy_node(&node, &spec, false).await.unwrap();
        assert_eq!(node.written.lock().unwrap().len(), 2);
    }
}
