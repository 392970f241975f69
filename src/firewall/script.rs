//! Script assembly: fixed baseline and tail rules around the compiled
//! policy, with per-OS framing, target paths and modes.

use crate::error::HostsmithError;
use crate::firewall::compile::compile_rule;
use crate::firewall::{IpFamily, RuleSet};
use crate::node::OsFamily;

/// Marker placed at the top of every generated script.
const GENERATED_MARKER: &str = "# generated by hostsmith";

/// A ready-to-deploy script for one protocol family.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledScript {
    pub family: IpFamily,
    pub content: String,
    /// Where the script belongs on the target host.
    pub path: String,
    /// Final mode set after writing.
    pub mode: u32,
    pub executable: bool,
}

/// Assemble the complete script for one protocol family.
///
/// The layout is fixed: default-deny header, baseline rules, compiled
/// rules in declaration order, then the closing rejects. Debian and
/// Gentoo get a shell script invoking the command once per line; RedHat
/// gets a ruleset file loaded by the init script.
pub fn assemble(
    rules: &RuleSet,
    family: IpFamily,
    os: OsFamily,
) -> Result<CompiledScript, HostsmithError> {
    let mut lines: Vec<String> = Vec::new();

    match os {
        OsFamily::Debian | OsFamily::Gentoo => {
            lines.push("-P INPUT DROP".into());
            lines.push("-P OUTPUT DROP".into());
            lines.push("-P FORWARD DROP".into());
            lines.push("-F".into());
            if family == IpFamily::V4 {
                lines.push("-F -t nat".into());
            }
            lines.push("-X".into());
        }
        OsFamily::RedHat => {
            lines.push("*filter".into());
            lines.push(":INPUT DROP [0:0]".into());
            lines.push(":FORWARD DROP [0:0]".into());
            lines.push(":OUTPUT DROP [0:0]".into());
        }
    }

    lines.extend(baseline_rules(family));

    for chain in &rules.chains {
        for spec in &chain.rules {
            for compiled in compile_rule(&chain.name, spec, family)? {
                lines.push(compiled.render());
            }
        }
    }

    lines.extend(tail_rules(family));

    if os == OsFamily::RedHat {
        lines.push("COMMIT".into());
    }

    let rule_lines: Vec<String> = match os {
        OsFamily::Debian | OsFamily::Gentoo => lines
            .into_iter()
            .map(|line| format!("{} {}", family.command(), line))
            .collect(),
        OsFamily::RedHat => lines,
    };

    let mut content = String::new();
    if os != OsFamily::RedHat {
        content.push_str("#!/bin/sh\n");
    }
    content.push_str(GENERATED_MARKER);
    content.push_str("\n\n");
    for line in &rule_lines {
        content.push_str(line);
        content.push('\n');
    }

    let (path, mode, executable) = script_target(os, family);
    Ok(CompiledScript {
        family,
        content,
        path,
        mode,
        executable,
    })
}

/// The fixed opening rules. Their relative order is a correctness
/// invariant: loopback and established traffic must be accepted before
/// anything can reject it, and invalid state dropped first of all.
fn baseline_rules(family: IpFamily) -> Vec<String> {
    let mut rules: Vec<String> = vec![
        "-A INPUT -i lo -j ACCEPT".into(),
        "-A INPUT -m state --state INVALID -j DROP".into(),
        "-A INPUT -m state --state RELATED,ESTABLISHED -j ACCEPT".into(),
        "-A INPUT -p tcp --tcp-flags SYN SYN -m state --state ESTABLISHED -j DROP".into(),
    ];
    match family {
        IpFamily::V4 => {
            rules.push("-A INPUT -p icmp --icmp-type timestamp-request -j DROP".into());
            rules.push("-A INPUT -p icmp --icmp-type timestamp-reply -j DROP".into());
        }
        IpFamily::V6 => {
            rules.push("-A INPUT -p icmpv6 -j ACCEPT".into());
        }
    }
    rules.push("-A INPUT -p icmp -j ACCEPT".into());
    rules.push("-A OUTPUT -m state --state INVALID -j DROP".into());
    rules.push("-A OUTPUT -m state --state RELATED,ESTABLISHED -j ACCEPT".into());
    rules
}

/// The fixed closing rules: reject whatever nothing accepted, then let
/// all egress through.
fn tail_rules(family: IpFamily) -> Vec<String> {
    let mut rules: Vec<String> = vec!["-A INPUT -p tcp -j REJECT --reject-with tcp-reset".into()];
    if family == IpFamily::V4 {
        rules.push("-A INPUT -j REJECT --reject-with icmp-port-unreachable".into());
    }
    rules.push("-A OUTPUT -j ACCEPT".into());
    rules
}

/// File placement per OS family. Debian hooks into if-pre-up.d so the
/// rules replay on boot; Gentoo and RedHat load theirs through init
/// scripts.
fn script_target(os: OsFamily, family: IpFamily) -> (String, u32, bool) {
    let name = family.command();
    match os {
        OsFamily::Debian => (format!("/etc/network/if-pre-up.d/{}", name), 0o700, true),
        OsFamily::Gentoo => (format!("/etc/{}", name), 0o700, true),
        OsFamily::RedHat => (format!("/etc/sysconfig/{}", name), 0o600, false),
    }
}
