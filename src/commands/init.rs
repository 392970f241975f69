//! Init command implementation.

use crate::config;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

const EXAMPLE_NODE: &str = "\
# hostname: web1.example.com   # defaults to the file name
# user: root
# port: 22
# inherits: [base]             # roles merged in from roles/, in order
recipes:
  firewall:
    input:
      - dport: 22
      - dport: [80, 443]
";

/// Scaffold a deploy directory with one commented example node.
pub fn run(directory: &Path) -> Result<()> {
    let nodes_dir = directory.join(config::NODES_DIR);
    if nodes_dir.exists() {
        bail!("{} already contains a nodes directory", directory.display());
    }

    fs::create_dir_all(&nodes_dir)
        .with_context(|| format!("cannot create {}", nodes_dir.display()))?;
    let roles_dir = directory.join(config::ROLES_DIR);
    fs::create_dir_all(&roles_dir)
        .with_context(|| format!("cannot create {}", roles_dir.display()))?;
    let example = nodes_dir.join("example.yaml");
    fs::write(&example, EXAMPLE_NODE)
        .with_context(|| format!("cannot write {}", example.display()))?;

    println!("initialized deploy directory at {}", directory.display());
    println!("next steps:");
    println!("  edit {}", example.display());
    println!("  hostsmith nodes");
    println!("  hostsmith deploy");
    Ok(())
}
