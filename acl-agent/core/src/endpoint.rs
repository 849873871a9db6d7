use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkloadEndpointId {
    pub orchestrator_id: String,
    pub workload_id: String,
    pub endpoint_id: String,
}

/// A workload endpoint as seen by the dataplane.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkloadEndpoint {
    pub name: String,

    /// Local IPv4 addresses in CIDR form, e.g. `10.0.0.1/32`.
    pub ipv4_nets: Vec<String>,

    /// Policy tiers in evaluation order. Only the first is rendered.
    pub tiers: Vec<TierInfo>,

    pub profile_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierInfo {
    pub name: String,
    pub ingress_policies: Vec<String>,
    pub egress_policies: Vec<String>,
}

// === impl WorkloadEndpointId ===

impl WorkloadEndpointId {
    pub fn new(
        orchestrator_id: impl Into<String>,
        workload_id: impl Into<String>,
        endpoint_id: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator_id: orchestrator_id.into(),
            workload_id: workload_id.into(),
            endpoint_id: endpoint_id.into(),
        }
    }
}

impl fmt::Display for WorkloadEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.orchestrator_id, self.workload_id, self.endpoint_id
        )
    }
}

// === impl WorkloadEndpoint ===

impl WorkloadEndpoint {
    pub fn first_tier(&self) -> Option<&TierInfo> {
        self.tiers.first()
    }
}
