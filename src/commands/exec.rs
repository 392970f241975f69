//! Exec command implementation.

use crate::config;
use crate::node::{self, Node};
use anyhow::Result;
use std::path::Path;

/// Run one shell command on every selected node and relay its output.
pub async fn run(directory: &Path, command: &str, pattern: Option<&str>) -> Result<()> {
    let nodes = config::select_nodes(config::load_nodes(directory)?, pattern);
    if nodes.is_empty() {
        println!("no nodes matched");
        return Ok(());
    }

    for spec in &nodes {
        println!("{} ({}):", spec.name, spec.target());
        let node = node::create_node(spec);
        match node.execute(command).await {
            Ok(run) => {
                print!("{}", run.stdout);
                eprint!("{}", run.stderr);
                if !run.success {
                    let code = run.code.map_or_else(|| "?".to_string(), |c| c.to_string());
                    println!("exit code: {}", code);
                }
            }
            Err(err) => println!("error: {:#}", err),
        }
        println!();
    }
    Ok(())
}
