use crate::{
    endpoint::{WorkloadEndpoint, WorkloadEndpointId},
    policy::{Policy, PolicyId, Profile, ProfileId},
};

/// A change event from the datastore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    WorkloadEndpointUpdate {
        id: WorkloadEndpointId,
        endpoint: WorkloadEndpoint,
    },
    WorkloadEndpointRemove {
        id: WorkloadEndpointId,
    },

    ActivePolicyUpdate {
        id: PolicyId,
        policy: Policy,
    },
    ActivePolicyRemove {
        id: PolicyId,
    },

    ActiveProfileUpdate {
        id: ProfileId,
        profile: Profile,
    },
    ActiveProfileRemove {
        id: ProfileId,
    },

    /// Replaces the full membership of an IP set.
    IpSetUpdate {
        id: String,
        members: Vec<String>,
    },
    IpSetDeltaUpdate {
        id: String,
        added: Vec<String>,
        removed: Vec<String>,
    },
    IpSetRemove {
        id: String,
    },
}

// === impl Update ===

impl Update {
    /// A short name for the kind of update, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkloadEndpointUpdate { .. } => "WorkloadEndpointUpdate",
            Self::WorkloadEndpointRemove { .. } => "WorkloadEndpointRemove",
            Self::ActivePolicyUpdate { .. } => "ActivePolicyUpdate",
            Self::ActivePolicyRemove { .. } => "ActivePolicyRemove",
            Self::ActiveProfileUpdate { .. } => "ActiveProfileUpdate",
            Self::ActiveProfileRemove { .. } => "ActiveProfileRemove",
            Self::IpSetUpdate { .. } => "IPSetUpdate",
            Self::IpSetDeltaUpdate { .. } => "IPSetDeltaUpdate",
            Self::IpSetRemove { .. } => "IPSetRemove",
        }
    }
}
