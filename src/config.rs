//! Deploy-directory configuration.
//!
//! A deploy directory holds one YAML file per node under `nodes/` and
//! shared fragments under `roles/`. A node file opts into fragments
//! with `inherits`; fragments merge left to right and the node file
//! wins every conflict.

use crate::helpers::{deep_merge_into, normalize};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const NODES_DIR: &str = "nodes";
pub const ROLES_DIR: &str = "roles";

/// One node's merged configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    /// Address to connect to; defaults to the node name.
    #[serde(default)]
    pub hostname: Option<String>,

    /// SSH login user.
    #[serde(default = "default_user")]
    pub user: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deploy to the local host instead of over SSH.
    #[serde(default)]
    pub local: bool,

    /// Recipe name to recipe configuration, declaration order kept.
    #[serde(default)]
    pub recipes: Mapping,

    /// Node name, taken from the file stem.
    #[serde(skip)]
    pub name: String,
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

impl NodeSpec {
    /// The address transports should connect to.
    pub fn target(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.name)
    }
}

/// Load every node configuration in the deploy directory, sorted by
/// file name.
pub fn load_nodes(directory: &Path) -> Result<Vec<NodeSpec>> {
    let nodes_dir = directory.join(NODES_DIR);
    if !nodes_dir.is_dir() {
        bail!(
            "no {} directory in {} (run `hostsmith init` to scaffold one)",
            NODES_DIR,
            directory.display()
        );
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(&nodes_dir)
        .with_context(|| format!("failed to read {}", nodes_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "yaml" || ext == "yml"))
        .collect();
    paths.sort();

    let mut nodes = Vec::with_capacity(paths.len());
    for path in paths {
        nodes.push(load_node(directory, &path)?);
    }
    Ok(nodes)
}

/// Load one node file, resolving the roles it inherits.
pub fn load_node(directory: &Path, path: &Path) -> Result<NodeSpec> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("unusable node file name: {}", path.display()))?
        .to_string();

    let mut raw = load_mapping(path)?;

    let inherits: Vec<String> = match raw.remove("inherits") {
        Some(value) => serde_yaml::from_value(normalize(value))
            .with_context(|| format!("{}: inherits must list role names", path.display()))?,
        None => Vec::new(),
    };

    let mut merged = Mapping::new();
    for role in &inherits {
        let role_path = directory.join(ROLES_DIR).join(format!("{}.yaml", role));
        let role_mapping = load_mapping(&role_path)
            .with_context(|| format!("{}: role '{}' could not be loaded", path.display(), role))?;
        deep_merge_into(&mut merged, &role_mapping);
    }
    deep_merge_into(&mut merged, &raw);

    let mut spec: NodeSpec = serde_yaml::from_value(Value::Mapping(merged))
        .with_context(|| format!("invalid node configuration in {}", path.display()))?;
    spec.name = name;
    Ok(spec)
}

fn load_mapping(path: &Path) -> Result<Mapping> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&text)
        .with_context(|| format!("invalid YAML in {}", path.display()))?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => bail!("{} must contain a YAML mapping", path.display()),
    }
}

/// Keep only nodes whose name contains `pattern`; `None` keeps all.
pub fn select_nodes(nodes: Vec<NodeSpec>, pattern: Option<&str>) -> Vec<NodeSpec> {
    match pattern {
        Some(needle) => nodes
            .into_iter()
            .filter(|node| node.name.contains(needle))
            .collect(),
        None => nodes,
    }
}
