use crate::acl::{AclFeatures, AclRule};
use anyhow::Result;
use std::net::IpAddr;

/// An endpoint as reported by the host firewall backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendEndpoint {
    pub id: String,

    /// Remote endpoints live on other hosts and cannot carry local rules.
    pub is_remote_endpoint: bool,

    pub virtual_network_name: String,

    pub ip_address: Option<IpAddr>,
}

/// Models the host firewall backend.
///
/// Calls may block on the host; implementations are expected to impose
/// their own timeouts. Failures are treated as retryable by callers.
#[async_trait::async_trait]
pub trait Backend {
    /// Replaces every ACL rule attached to the given backend endpoint.
    async fn apply_rules(&self, endpoint_id: &str, rules: Vec<AclRule>) -> Result<()>;

    async fn list_endpoints(&self) -> Result<Vec<BackendEndpoint>>;

    fn acl_features(&self) -> AclFeatures;
}
