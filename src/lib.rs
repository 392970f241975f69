//! # hostsmith - Declarative Host Deployment
//!
//! Deploys declarative host configuration over SSH. Each managed node
//! is one YAML file; hostsmith merges the roles it inherits, hands
//! every configured recipe its settings and drives the node over a
//! generic execution channel (ssh or the local shell).
//!
//! The centerpiece is the firewall recipe: it compiles multi-valued
//! declarative rules into complete iptables/ip6tables scripts, one per
//! protocol family, with a fixed default-deny baseline and tail whose
//! ordering the tests lock down.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                      hostsmith                         │
//! ├────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                            │
//! │    └── Commands: deploy, render, exec, nodes, init     │
//! ├────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                   │
//! │    └── nodes/*.yaml + roles/*.yaml, deep-merged        │
//! ├────────────────────────────────────────────────────────┤
//! │  Recipes (Recipe trait)                                │
//! │    ├── firewall: rule compiler + script assembler      │
//! │    └── ssh_authorized_keys: key distribution           │
//! ├────────────────────────────────────────────────────────┤
//! │  Node (async trait)                                    │
//! │    ├── SshNode (system ssh client)                     │
//! │    └── LocalNode (sh -c)                               │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use hostsmith::commands::deploy;
//! use hostsmith::config;
//! use hostsmith::node::create_node;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load every node definition from the deploy directory
//!     let nodes = config::load_nodes(Path::new("/srv/deploy"))?;
//!
//!     // Stage each node's recipes without activating anything
//!     for spec in &nodes {
//!         let node = create_node(spec);
//!         deploy::deploy_node(node.as_ref(), spec, false).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`commands`] - CLI command implementations
//! - [`config`] - Deploy-directory loading and role inheritance
//! - [`firewall`] - Rule compiler and per-OS script assembler
//! - [`helpers`] - Merge, normalize and combine operators
//! - [`node`] - Execution channel to managed hosts
//! - [`recipes`] - Deployable units and their registry
//! - [`report`] - Per-step result reporting
//! - [`runner`] - Process-spawning seam

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod firewall;
pub mod helpers;
pub mod node;
pub mod recipes;
pub mod report;
pub mod runner;

pub use cli::{Cli, Commands};
pub use error::HostsmithError;
