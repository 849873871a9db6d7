use std::fmt;

/// A single directionless match/action rule as delivered by the datastore.
///
/// Every match field is a conjunction: a packet must satisfy all of the
/// non-empty fields for the rule's action to apply. The `not_*` fields,
/// ICMP matches and named-port IP sets are carried so that rules using them
/// can be recognised and skipped; the ACL backend cannot express them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    /// `Allow`, `Deny`, or any other (unsupported) action. Matched
    /// case-insensitively; the empty string is the datastore's default and
    /// means `Allow`.
    pub action: String,

    /// 0 is treated as IPv4.
    pub ip_version: u8,

    pub protocol: Option<Protocol>,

    pub src_net: Vec<String>,
    pub src_ports: Vec<PortRange>,
    pub src_ip_set_ids: Vec<String>,
    pub src_named_port_ip_set_ids: Vec<String>,

    pub dst_net: Vec<String>,
    pub dst_ports: Vec<PortRange>,
    pub dst_ip_set_ids: Vec<String>,
    pub dst_named_port_ip_set_ids: Vec<String>,

    /// IP sets populated from DNS names; resolved like `dst_ip_set_ids`.
    pub dst_domain_ip_set_ids: Vec<String>,

    pub icmp: Option<IcmpMatch>,

    pub not_protocol: Option<Protocol>,
    pub not_src_net: Vec<String>,
    pub not_src_ports: Vec<PortRange>,
    pub not_src_ip_set_ids: Vec<String>,
    pub not_src_named_port_ip_set_ids: Vec<String>,
    pub not_dst_net: Vec<String>,
    pub not_dst_ports: Vec<PortRange>,
    pub not_dst_ip_set_ids: Vec<String>,
    pub not_dst_named_port_ip_set_ids: Vec<String>,
    pub not_icmp: Option<IcmpMatch>,

    /// Stable identifier used to build rendered rule ids.
    pub rule_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Number(u16),
    Name(String),
}

/// An inclusive port range. A single port has `first == last`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortRange {
    pub first: u16,
    pub last: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IcmpMatch {
    Type(u8),
    TypeCode { icmp_type: u8, code: u8 },
}

// === impl Rule ===

impl Rule {
    /// Indicates whether the rule uses any negated match criteria.
    pub fn has_negative_matches(&self) -> bool {
        self.not_protocol.is_some()
            || self.not_icmp.is_some()
            || !self.not_src_net.is_empty()
            || !self.not_src_ports.is_empty()
            || !self.not_src_ip_set_ids.is_empty()
            || !self.not_src_named_port_ip_set_ids.is_empty()
            || !self.not_dst_net.is_empty()
            || !self.not_dst_ports.is_empty()
            || !self.not_dst_ip_set_ids.is_empty()
            || !self.not_dst_named_port_ip_set_ids.is_empty()
    }

    pub fn has_named_ports(&self) -> bool {
        !self.src_named_port_ip_set_ids.is_empty() || !self.dst_named_port_ip_set_ids.is_empty()
    }

    /// Returns every IP set id the rule resolves at render time.
    pub fn ip_set_ids(&self) -> impl Iterator<Item = &str> {
        self.src_ip_set_ids
            .iter()
            .chain(&self.dst_ip_set_ids)
            .chain(&self.dst_domain_ip_set_ids)
            .map(String::as_str)
    }
}

// === impl PortRange ===

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            first: port,
            last: port,
        }
    }

    pub fn new(first: u16, last: u16) -> Self {
        Self { first, last }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}-{}", self.first, self.last)
        }
    }
}

// === impl Protocol ===

impl From<u16> for Protocol {
    fn from(n: u16) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Protocol {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}
