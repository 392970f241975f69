//! Render command implementation.

use crate::config;
use crate::firewall::{assemble, IpFamily, RuleSet};
use crate::node::OsFamily;
use anyhow::{Context, Result};
use std::path::Path;

/// Print the firewall scripts that a deploy would install, without
/// touching any node.
pub fn run(directory: &Path, pattern: Option<&str>, os: OsFamily) -> Result<()> {
    let nodes = config::select_nodes(config::load_nodes(directory)?, pattern);
    if nodes.is_empty() {
        println!("no nodes matched");
        return Ok(());
    }

    for spec in &nodes {
        let rules = match spec.recipes.get("firewall") {
            Some(rules) => rules,
            None => {
                println!("# {}: no firewall recipe", spec.name);
                continue;
            }
        };
        let rules = RuleSet::from_value(rules)
            .with_context(|| format!("invalid firewall rules on {}", spec.name))?;
        for family in IpFamily::ALL {
            let script = assemble(&rules, family, os)
                .with_context(|| format!("cannot render {} rules for {}", family.label(), spec.name))?;
            println!(
                "# {}: {} -> {} (mode {:o})",
                spec.name,
                family.label(),
                script.path,
                script.mode
            );
            print!("{}", script.content);
            println!();
        }
    }
    Ok(())
}
