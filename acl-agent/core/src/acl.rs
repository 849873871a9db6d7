use serde::{Deserialize, Serialize};

/// The protocol number the backend interprets as "any protocol".
pub const PROTOCOL_ANY: u16 = 256;

/// A concrete access-control rule, in the shape the host firewall accepts.
///
/// Address and port fields are comma-joined lists; an empty string leaves
/// that dimension unrestricted. When deserialized, omitted fields take the
/// same defaults as [`AclRule::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AclRule {
    #[serde(rename = "Type", default)]
    pub kind: AclType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default = "any_protocol")]
    pub protocol: u16,
    pub action: AclAction,
    pub direction: Direction,

    #[serde(default)]
    pub rule_type: RuleType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub local_addresses: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_addresses: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub local_ports: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_ports: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclType {
    #[default]
    #[serde(rename = "ACL")]
    Acl,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AclAction {
    Allow,
    Block,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

/// Where the backend evaluates a rule.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    /// Evaluated on the virtual switch port; used for all policy rules.
    #[default]
    Switch,

    /// Evaluated in the host's own filter; used for node management traffic.
    Host,
}

/// ACL capabilities reported by the backend.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AclFeatures {
    /// The backend accepts an `Id` on each rule.
    pub rule_id: bool,

    /// The backend orders host rules itself, so they carry no priority.
    pub no_host_rule_priority: bool,
}

// === impl AclRule ===

impl AclRule {
    /// Returns an unrestricted switch rule matching any protocol.
    pub fn new(direction: Direction, action: AclAction) -> Self {
        Self {
            kind: AclType::Acl,
            id: None,
            protocol: PROTOCOL_ANY,
            action,
            direction,
            rule_type: RuleType::Switch,
            priority: None,
            local_addresses: String::new(),
            remote_addresses: String::new(),
            local_ports: String::new(),
            remote_ports: String::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }
}

fn any_protocol() -> u16 {
    PROTOCOL_ANY
}

// === impl Direction ===

impl Direction {
    pub fn from_inbound(inbound: bool) -> Self {
        if inbound {
            Self::In
        } else {
            Self::Out
        }
    }
}
