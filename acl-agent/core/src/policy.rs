use crate::rule::Rule;

/// Prefix applied to policy names in the policy set namespace.
pub const POLICY_NAME_PREFIX: &str = "policy-";

/// Prefix applied to profile names in the policy set namespace.
pub const PROFILE_NAME_PREFIX: &str = "profile-";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyId {
    pub tier: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileId {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    pub inbound_rules: Vec<Rule>,
    pub outbound_rules: Vec<Rule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub inbound_rules: Vec<Rule>,
    pub outbound_rules: Vec<Rule>,
}

/// The definition stored under a policy set name.
///
/// Policies and profiles render identically. Any other datastore message
/// handed to the store is kept as `Unsupported` and renders no rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicySetSource {
    Policy(Policy),
    Profile(Profile),
    Unsupported(&'static str),
}

// === impl PolicyId ===

impl PolicyId {
    pub fn new(tier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            name: name.into(),
        }
    }

    pub fn policy_set_name(&self) -> String {
        policy_set_name(&self.name)
    }
}

pub fn policy_set_name(policy: &str) -> String {
    format!("{POLICY_NAME_PREFIX}{policy}")
}

// === impl ProfileId ===

impl ProfileId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn policy_set_name(&self) -> String {
        profile_set_name(&self.name)
    }
}

pub fn profile_set_name(profile: &str) -> String {
    format!("{PROFILE_NAME_PREFIX}{profile}")
}

// === impl PolicySetSource ===

impl PolicySetSource {
    /// Returns the inbound and outbound rules, or `None` when the source is
    /// not a rule container.
    pub fn rules(&self) -> Option<(&[Rule], &[Rule])> {
        match self {
            Self::Policy(Policy {
                inbound_rules,
                outbound_rules,
            })
            | Self::Profile(Profile {
                inbound_rules,
                outbound_rules,
            }) => Some((inbound_rules, outbound_rules)),
            Self::Unsupported(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Policy(_) => "Policy",
            Self::Profile(_) => "Profile",
            Self::Unsupported(kind) => *kind,
        }
    }
}

impl From<Policy> for PolicySetSource {
    fn from(policy: Policy) -> Self {
        Self::Policy(policy)
    }
}

impl From<Profile> for PolicySetSource {
    fn from(profile: Profile) -> Self {
        Self::Profile(profile)
    }
}

/// A profile reference is not a rule container.
impl From<ProfileId> for PolicySetSource {
    fn from(_: ProfileId) -> Self {
        Self::Unsupported("ProfileID")
    }
}
