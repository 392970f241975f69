//! Rule compilation: defaults, value normalization, family filtering
//! and cartesian expansion into concrete rule lines.

use crate::error::HostsmithError;
use crate::firewall::{IpFamily, RuleSpec};
use crate::helpers::{normalize, product};
use serde_yaml::Value;

const DEFAULT_JUMP: &str = "ACCEPT";
const DEFAULT_PROTOCOL: &str = "tcp";

/// A rule after defaulting and normalization: `ip-version` pulled out
/// as the family filter, every other field rendered to token values in
/// declaration order with defaults appended at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRule {
    pub families: Vec<IpFamily>,
    pub fields: Vec<(String, Vec<String>)>,
}

/// Apply field defaults and normalize every value.
///
/// Defaults fill only absent fields: `ip-version` becomes both
/// families, `jump` becomes ACCEPT, and `protocol` becomes tcp when a
/// port field is present without one. The input is left untouched.
pub fn normalize_rule(spec: &RuleSpec) -> Result<NormalizedRule, HostsmithError> {
    let mut families: Option<Vec<IpFamily>> = None;
    let mut fields = Vec::with_capacity(spec.fields.len() + 2);

    for (name, value) in &spec.fields {
        if name == "ip-version" {
            families = Some(parse_ip_versions(value)?);
        } else {
            fields.push((name.clone(), scalar_tokens(name, value)?));
        }
    }

    if spec.get("jump").is_none() {
        fields.push(("jump".to_string(), vec![DEFAULT_JUMP.to_string()]));
    }
    let has_port = spec.get("dport").is_some() || spec.get("sport").is_some();
    if has_port && spec.get("protocol").is_none() {
        fields.push(("protocol".to_string(), vec![DEFAULT_PROTOCOL.to_string()]));
    }

    Ok(NormalizedRule {
        families: families.unwrap_or_else(|| IpFamily::ALL.to_vec()),
        fields,
    })
}

/// One fully-expanded rule, rendered as `-A CHAIN` plus its option
/// tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    prefix: String,
    tokens: Vec<String>,
}

impl CompiledRule {
    /// The complete rule line.
    pub fn render(&self) -> String {
        if self.tokens.is_empty() {
            self.prefix.clone()
        } else {
            format!("{} {}", self.prefix, self.tokens.join(" "))
        }
    }
}

/// Compile one declarative rule for one protocol family.
///
/// A rule outside the family yields nothing. Inside it, every field
/// becomes a `--name value` token per value and the fields' token sets
/// are combined into their cartesian product, first-declared field
/// varying slowest. The reduction is seeded with a single empty group
/// so a rule whose fields all expand to nothing still emits one line.
pub fn compile_rule(
    chain: &str,
    spec: &RuleSpec,
    family: IpFamily,
) -> Result<Vec<CompiledRule>, HostsmithError> {
    let rule = normalize_rule(spec)?;
    if !rule.families.contains(&family) {
        return Ok(Vec::new());
    }

    // The seed is the single empty combination.
    let mut factors: Vec<Vec<Vec<String>>> = vec![vec![Vec::new()]];
    for (name, values) in &rule.fields {
        factors.push(
            values
                .iter()
                .map(|value| vec![format!("--{} {}", name, value)])
                .collect(),
        );
    }
    let combos = product(&factors);

    let prefix = format!("-A {}", chain.to_uppercase());
    Ok(combos
        .into_iter()
        .map(|tokens| CompiledRule {
            prefix: prefix.clone(),
            tokens,
        })
        .collect())
}

/// Render one field's declared value into token strings. An empty
/// sequence stays empty, which later drops out of the product as the
/// combinator identity.
fn scalar_tokens(field: &str, value: &Value) -> Result<Vec<String>, HostsmithError> {
    let values = match normalize(value.clone()) {
        Value::Sequence(seq) => seq,
        other => vec![other],
    };
    values.iter().map(|v| render_scalar(field, v)).collect()
}

fn render_scalar(field: &str, value: &Value) -> Result<String, HostsmithError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(HostsmithError::InvalidRuleValue {
            field: field.to_string(),
            reason: "expected a scalar or a sequence of scalars".to_string(),
        }),
    }
}

fn parse_ip_versions(value: &Value) -> Result<Vec<IpFamily>, HostsmithError> {
    let values = match normalize(value.clone()) {
        Value::Sequence(seq) => seq,
        other => vec![other],
    };
    values.iter().map(ip_family_from_value).collect()
}

fn ip_family_from_value(value: &Value) -> Result<IpFamily, HostsmithError> {
    match value {
        Value::Number(n) if n.as_u64() == Some(4) => Ok(IpFamily::V4),
        Value::Number(n) if n.as_u64() == Some(6) => Ok(IpFamily::V6),
        Value::String(s) if s == "4" => Ok(IpFamily::V4),
        Value::String(s) if s == "6" => Ok(IpFamily::V6),
        other => Err(HostsmithError::InvalidIpVersion(value_repr(other))),
    }
}

fn value_repr(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| "?".to_string())
}
