//! Nodes command implementation.

use crate::config;
use anyhow::Result;
use std::path::Path;

/// List the configured nodes, their targets and their recipes.
pub fn run(directory: &Path, pattern: Option<&str>) -> Result<()> {
    let nodes = config::select_nodes(config::load_nodes(directory)?, pattern);
    if nodes.is_empty() {
        println!("no nodes configured");
        return Ok(());
    }

    for spec in &nodes {
        let recipes: Vec<&str> = spec
            .recipes
            .keys()
            .filter_map(|name| name.as_str())
            .collect();
        let target = if spec.local {
            "local".to_string()
        } else {
            format!("{}@{}:{}", spec.user, spec.target(), spec.port)
        };
        println!("{}  {}  [{}]", spec.name, target, recipes.join(", "));
    }
    Ok(())
}
