//! Renders datastore rules into backend ACL rules.
//!
//! A single rule may render to zero, one or many ACL rules. The backend caps
//! how many addresses and ports one ACL rule may carry, so each of the four
//! match dimensions (local addresses, remote addresses, local ports, remote
//! ports) is split into chunks and the rule is emitted once per combination
//! of chunks.

use crate::resolver::{IpSetResolver, ResolvedIpSets};
use acl_agent_core::{
    acl::PROTOCOL_ANY, AclAction, AclRule, Direction, PolicySetSource, PortRange, Protocol, Rule,
};
use ipnet::IpNet;
use std::{fmt, net::IpAddr};
use tracing::{trace, warn};

/// The only IP version the backend supports.
const IP_VERSION: u8 = 4;

/// Renders policy sets with a fixed chunk size.
#[derive(Clone, Debug)]
pub struct Compiler {
    resolver: IpSetResolver,
    chunk_size: usize,
}

/// Explains why a rule rendered no ACL rules.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("negative match criteria are not supported")]
    NegativeMatch,

    #[error("action {0:?} is not supported")]
    Action(String),

    #[error("ICMP match criteria are not supported")]
    Icmp,

    #[error("named ports are not supported")]
    NamedPorts,

    #[error("IPv{0} rules are not supported")]
    IpVersion(u8),

    #[error("none of the {0} CIDRs are IPv4")]
    NoIpv4Nets(Side),

    #[error("{side} IP set {id} not found")]
    UnknownIpSet { side: Side, id: String },

    #[error("{0} IP sets have no IPv4 members")]
    EmptyIpSets(Side),

    #[error("no {0} IP set members fall within the rule's CIDRs")]
    EmptyIntersection(Side),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

// === impl Compiler ===

impl Compiler {
    pub fn new(resolver: IpSetResolver, chunk_size: usize) -> Self {
        Self {
            resolver,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Renders both directions of a policy set, without priorities.
    ///
    /// Rules that cannot be rendered are skipped with a warning.
    pub fn compile_policy_set(
        &self,
        name: &str,
        source: &PolicySetSource,
    ) -> (Vec<AclRule>, Vec<AclRule>) {
        let Some((inbound, outbound)) = source.rules() else {
            warn!(
                policy = %name,
                kind = source.kind(),
                "Not a policy or profile; rendering no rules"
            );
            return Default::default();
        };

        let mut ipsets = ResolvedIpSets::new(&self.resolver);
        (
            self.compile_rules(name, inbound, true, &mut ipsets),
            self.compile_rules(name, outbound, false, &mut ipsets),
        )
    }

    fn compile_rules(
        &self,
        name: &str,
        rules: &[Rule],
        inbound: bool,
        ipsets: &mut ResolvedIpSets<'_>,
    ) -> Vec<AclRule> {
        let mut acls = Vec::new();
        for rule in rules {
            match compile_rule(name, rule, inbound, self.chunk_size, ipsets) {
                Ok(rendered) => {
                    trace!(policy = %name, rule = %rule.rule_id, acls = rendered.len(), "Rendered rule");
                    acls.extend(rendered);
                }
                Err(reason) => {
                    warn!(policy = %name, rule = %rule.rule_id, %reason, "Skipping rule");
                }
            }
        }
        acls
    }

    /// Renders a single rule using this compiler's resolver and chunk size.
    pub fn compile_rule(
        &self,
        name: &str,
        rule: &Rule,
        inbound: bool,
    ) -> Result<Vec<AclRule>, SkipReason> {
        let mut ipsets = ResolvedIpSets::new(&self.resolver);
        compile_rule(name, rule, inbound, self.chunk_size, &mut ipsets)
    }
}

pub(crate) fn compile_rule(
    name: &str,
    rule: &Rule,
    inbound: bool,
    chunk_size: usize,
    ipsets: &mut ResolvedIpSets<'_>,
) -> Result<Vec<AclRule>, SkipReason> {
    if rule.has_negative_matches() {
        return Err(SkipReason::NegativeMatch);
    }

    let action = match rule.action.to_ascii_lowercase().as_str() {
        "" | "allow" => AclAction::Allow,
        "deny" => AclAction::Block,
        _ => return Err(SkipReason::Action(rule.action.clone())),
    };

    if rule.icmp.is_some() {
        return Err(SkipReason::Icmp);
    }

    if rule.has_named_ports() {
        return Err(SkipReason::NamedPorts);
    }

    match rule.ip_version {
        0 | IP_VERSION => {}
        v => return Err(SkipReason::IpVersion(v)),
    }

    let protocol = rule
        .protocol
        .as_ref()
        .map(protocol_number)
        .unwrap_or(PROTOCOL_ANY);

    let src = resolve_addresses(
        Side::Source,
        &rule.src_net,
        rule.src_ip_set_ids.iter(),
        ipsets,
    )?;
    let dst = resolve_addresses(
        Side::Destination,
        &rule.dst_net,
        rule.dst_ip_set_ids
            .iter()
            .chain(&rule.dst_domain_ip_set_ids),
        ipsets,
    )?;

    let (local_addrs, remote_addrs, local_ports, remote_ports) = if inbound {
        (dst, src, &rule.dst_ports, &rule.src_ports)
    } else {
        (src, dst, &rule.src_ports, &rule.dst_ports)
    };

    let local_addrs = address_chunks(&local_addrs, chunk_size);
    let remote_addrs = address_chunks(&remote_addrs, chunk_size);
    let local_ports = port_chunks(local_ports, chunk_size);
    let remote_ports = port_chunks(remote_ports, chunk_size);

    let direction = Direction::from_inbound(inbound);
    let mut acls = Vec::with_capacity(
        local_ports.len() * local_addrs.len() * remote_addrs.len() * remote_ports.len(),
    );
    for local_ports in &local_ports {
        for local_addrs in &local_addrs {
            for remote_addrs in &remote_addrs {
                for remote_ports in &remote_ports {
                    let seq = acls.len();
                    acls.push(
                        AclRule {
                            protocol,
                            local_addresses: local_addrs.clone(),
                            remote_addresses: remote_addrs.clone(),
                            local_ports: local_ports.clone(),
                            remote_ports: remote_ports.clone(),
                            ..AclRule::new(direction, action)
                        }
                        .with_id(format!("{name}-{}-{seq}", rule.rule_id)),
                    );
                }
            }
        }
    }
    Ok(acls)
}

/// Maps a protocol to the number the backend expects.
///
/// Names outside the backend's table (e.g. `gre`) map to "any protocol".
pub fn protocol_number(protocol: &Protocol) -> u16 {
    match protocol {
        Protocol::Number(n) => *n,
        Protocol::Name(name) => protocol_name_to_number(name),
    }
}

pub fn protocol_name_to_number(name: &str) -> u16 {
    match name.to_ascii_lowercase().as_str() {
        "tcp" => 6,
        "udp" => 17,
        "icmp" => 1,
        "icmpv6" => 58,
        "sctp" => 132,
        "udplite" => 136,
        _ => PROTOCOL_ANY,
    }
}

/// Computes the working address lists for one side of a rule.
///
/// An empty inner list leaves the side unrestricted. When the rule names both
/// CIDRs and IP sets, one list is produced per CIDR holding the IP set
/// members that fall within it.
fn resolve_addresses<'a>(
    side: Side,
    nets: &[String],
    ip_set_ids: impl Iterator<Item = &'a String>,
    ipsets: &mut ResolvedIpSets<'_>,
) -> Result<Vec<Vec<String>>, SkipReason> {
    // A side whose CIDRs were all filtered out must not widen to "any".
    let filtered = filter_nets(nets, IP_VERSION);
    if filtered.is_empty() && !nets.is_empty() {
        return Err(SkipReason::NoIpv4Nets(side));
    }
    let nets = filtered;

    let mut ids = ip_set_ids.peekable();
    if ids.peek().is_none() {
        return Ok(vec![nets]);
    }

    let mut members = Vec::new();
    for id in ids {
        let resolved = ipsets.members(id).ok_or_else(|| SkipReason::UnknownIpSet {
            side,
            id: id.clone(),
        })?;
        members.extend(
            resolved
                .iter()
                .filter(|m| matches_ip_version(m, IP_VERSION))
                .cloned(),
        );
    }
    if members.is_empty() {
        return Err(SkipReason::EmptyIpSets(side));
    }

    if nets.is_empty() {
        return Ok(vec![members]);
    }

    let lists = nets
        .iter()
        .filter_map(|net| {
            let within = members
                .iter()
                .filter_map(|member| intersect(net, member))
                .collect::<Vec<_>>();
            (!within.is_empty()).then_some(within)
        })
        .collect::<Vec<_>>();
    if lists.is_empty() {
        return Err(SkipReason::EmptyIntersection(side));
    }
    Ok(lists)
}

/// Returns the CIDRs of the given IP version. Unparseable entries are dropped.
pub fn filter_nets(nets: &[String], ip_version: u8) -> Vec<String> {
    nets.iter()
        .filter(|net| matches_ip_version(net, ip_version))
        .cloned()
        .collect()
}

fn matches_ip_version(net: &str, ip_version: u8) -> bool {
    match parse_net(net) {
        Some(IpNet::V4(_)) => ip_version == 4,
        Some(IpNet::V6(_)) => ip_version == 6,
        None => {
            warn!(%net, "Ignoring invalid CIDR");
            false
        }
    }
}

/// Parses a CIDR or a bare IP address.
pub(crate) fn parse_net(s: &str) -> Option<IpNet> {
    s.parse::<IpNet>()
        .ok()
        .or_else(|| s.parse::<IpAddr>().ok().map(IpNet::from))
}

/// Returns the overlap of a rule CIDR and an IP set member, if any, in the
/// textual form of whichever is narrower.
fn intersect(net: &str, member: &str) -> Option<String> {
    let (n, m) = (parse_net(net)?, parse_net(member)?);
    if n.contains(&m) {
        Some(member.to_string())
    } else if m.contains(&n) {
        Some(net.to_string())
    } else {
        None
    }
}

/// Splits an address list into chunks of at most `chunk_size` entries.
///
/// An empty list yields a single empty chunk.
pub fn split_ip_list(ips: &[String], chunk_size: usize) -> Vec<Vec<String>> {
    split(ips, chunk_size)
}

/// Splits a port list into chunks of at most `chunk_size` entries.
///
/// An empty list yields a single empty chunk.
pub fn split_port_list(ports: &[PortRange], chunk_size: usize) -> Vec<Vec<PortRange>> {
    split(ports, chunk_size)
}

fn split<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return vec![vec![]];
    }
    items.chunks(chunk_size.max(1)).map(<[T]>::to_vec).collect()
}

fn address_chunks(lists: &[Vec<String>], chunk_size: usize) -> Vec<String> {
    lists
        .iter()
        .flat_map(|list| split_ip_list(list, chunk_size))
        .map(|chunk| chunk.join(","))
        .collect()
}

fn port_chunks(ports: &[PortRange], chunk_size: usize) -> Vec<String> {
    split_port_list(ports, chunk_size)
        .iter()
        .map(|chunk| join_ports(chunk))
        .collect()
}

/// Renders ports in the backend's list syntax, e.g. `1234,22-24`.
pub fn join_ports(ports: &[PortRange]) -> String {
    ports
        .iter()
        .map(PortRange::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// === impl Side ===

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Destination => f.write_str("destination"),
        }
    }
}
