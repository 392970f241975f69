//! Firewall policy compiler.
//!
//! Turns a declarative chain-to-rules mapping into complete, ordered
//! packet-filter scripts, one per protocol family. Parsing lives here,
//! rule expansion in [`compile`] and script assembly in [`script`].

pub mod compile;
pub mod script;

pub use compile::{compile_rule, normalize_rule, CompiledRule, NormalizedRule};
pub use script::{assemble, CompiledScript};

use crate::error::HostsmithError;
use serde_yaml::{Mapping, Value};

/// Protocol family. Each gets its own independent script driven by its
/// own command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Both families, in processing order.
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// The packet-filter command, also used as the script file name and
    /// the init script name.
    pub fn command(self) -> &'static str {
        match self {
            IpFamily::V4 => "iptables",
            IpFamily::V6 => "ip6tables",
        }
    }

    /// Short label for reports and logs.
    pub fn label(self) -> &'static str {
        match self {
            IpFamily::V4 => "ipv4",
            IpFamily::V6 => "ipv6",
        }
    }
}

/// One declarative rule: field name to scalar or sequence of scalars,
/// declaration order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub fields: Vec<(String, Value)>,
}

impl RuleSpec {
    /// Parse one rule mapping, keeping field declaration order.
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, HostsmithError> {
        let mut fields = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| {
                    HostsmithError::Config(format!("rule field names must be strings, got {:?}", key))
                })?
                .to_string();
            fields.push((name, value.clone()));
        }
        Ok(Self { fields })
    }

    /// Look up a declared field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.as_str() == name)
            .map(|(_, value)| value)
    }
}

/// A named chain holding its rules in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub name: String,
    pub rules: Vec<RuleSpec>,
}

/// The whole firewall description for one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    pub chains: Vec<Chain>,
}

impl RuleSet {
    /// Parse the recipe configuration: chain name to sequence of rule
    /// mappings, both levels order-preserving.
    pub fn from_value(value: &Value) -> Result<Self, HostsmithError> {
        let mapping = value.as_mapping().ok_or_else(|| {
            HostsmithError::Config("firewall configuration must map chains to rules".into())
        })?;

        let mut chains = Vec::with_capacity(mapping.len());
        for (key, rules_value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| HostsmithError::Config("chain names must be strings".into()))?
                .to_string();
            let rule_values = rules_value.as_sequence().ok_or_else(|| {
                HostsmithError::Config(format!("chain '{}' must hold a sequence of rules", name))
            })?;

            let mut rules = Vec::with_capacity(rule_values.len());
            for rule in rule_values {
                let rule_mapping = rule.as_mapping().ok_or_else(|| {
                    HostsmithError::Config(format!("rules in chain '{}' must be mappings", name))
                })?;
                rules.push(RuleSpec::from_mapping(rule_mapping)?);
            }
            chains.push(Chain { name, rules });
        }
        Ok(Self { chains })
    }
}
