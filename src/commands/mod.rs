//! CLI command implementations.

pub mod deploy;
pub mod exec;
pub mod init;
pub mod nodes;
pub mod render;
