use crate::{EndpointIdCache, Error};
use acl_agent_core::{
    policy::{policy_set_name, profile_set_name},
    AclAction, AclRule, Backend, Direction, IpNet, Update, WorkloadEndpoint, WorkloadEndpointId,
};
use acl_agent_policysets::{sequence::HOST_RULE_PRIORITY, PolicySets};
use ahash::AHashMap as HashMap;
use anyhow::Context;
use regex::Regex;
use std::{collections::BTreeMap, net::IpAddr};
use tracing::{debug, info, instrument, warn};

/// Id of the rule admitting traffic from the node to its endpoints.
pub const NODE_ALLOW_ID: &str = "allow-host-to-endpoint";

#[derive(Clone, Debug)]
pub struct EndpointConfig {
    /// Selects the backend networks whose endpoints are managed.
    pub network_pattern: Regex,

    /// When set, every endpoint admits inbound traffic from this address.
    pub node_ip: Option<IpAddr>,
}

/// Coordinates endpoint, policy and IP set changes with the backend.
///
/// Endpoints move from pending to active once their rules are applied. A
/// pending `None` is a removal that has not been processed yet.
#[derive(Debug)]
pub struct EndpointManager<B> {
    backend: B,
    policy_sets: PolicySets,
    endpoint_ids: EndpointIdCache,
    node_ip: Option<IpAddr>,

    pending: BTreeMap<WorkloadEndpointId, Option<WorkloadEndpoint>>,
    active: HashMap<WorkloadEndpointId, WorkloadEndpoint>,
}

// === impl EndpointManager ===

impl<B> EndpointManager<B>
where
    B: Backend + Send + Sync,
{
    pub fn new(backend: B, policy_sets: PolicySets, config: EndpointConfig) -> Self {
        let EndpointConfig {
            network_pattern,
            node_ip,
        } = config;
        Self {
            backend,
            policy_sets,
            endpoint_ids: EndpointIdCache::new(network_pattern),
            node_ip,
            pending: BTreeMap::new(),
            active: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy_sets(&self) -> &PolicySets {
        &self.policy_sets
    }

    pub fn endpoint_ids(&self) -> &EndpointIdCache {
        &self.endpoint_ids
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &WorkloadEndpointId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: &WorkloadEndpointId) -> bool {
        self.active.contains_key(id)
    }

    /// Records a datastore event.
    ///
    /// IP set events must already have been applied to the IP set sources
    /// the policy set store reads from.
    #[instrument(skip_all, fields(kind = update.kind()))]
    pub fn on_update(&mut self, update: &Update) {
        match update {
            Update::WorkloadEndpointUpdate { id, endpoint } => {
                debug!(%id, "Endpoint updated");
                self.pending.insert(id.clone(), Some(endpoint.clone()));
            }

            Update::WorkloadEndpointRemove { id } => {
                debug!(%id, "Endpoint removed");
                self.pending.insert(id.clone(), None);
            }

            Update::ActivePolicyUpdate { .. }
            | Update::ActivePolicyRemove { .. }
            | Update::ActiveProfileUpdate { .. }
            | Update::ActiveProfileRemove { .. } => {
                if let Some(name) = self.policy_sets.on_update(update) {
                    self.mark_impacted(&[name]);
                }
            }

            Update::IpSetUpdate { id, .. }
            | Update::IpSetDeltaUpdate { id, .. }
            | Update::IpSetRemove { id } => {
                let changed = self.policy_sets.process_ip_set_update(id);
                if !changed.is_empty() {
                    self.mark_impacted(&changed);
                }
            }
        }
    }

    /// Queues every active endpoint that may reference one of the changed
    /// policy sets.
    fn mark_impacted(&mut self, changed: &[String]) {
        for (id, endpoint) in &self.active {
            if self.pending.contains_key(id) {
                continue;
            }
            let impacted = policy_names_for_impact(endpoint)
                .iter()
                .any(|name| changed.contains(name));
            if impacted {
                debug!(%id, "Endpoint impacted by policy change");
                self.pending.insert(id.clone(), Some(endpoint.clone()));
            }
        }
    }

    /// Applies all pending endpoint changes to the backend.
    ///
    /// Endpoints are processed in id order. A backend failure stops the pass;
    /// endpoints applied before it stay active and the rest stay pending.
    /// Endpoints without a backend id are skipped and reported together once
    /// the pass completes.
    #[instrument(skip(self), fields(pending = self.pending.len()))]
    pub async fn complete_deferred_work(&mut self) -> Result<(), Error> {
        if self.pending.is_empty() {
            return Ok(());
        }

        self.endpoint_ids.refresh(&self.backend, false).await?;

        let ids = self.pending.keys().cloned().collect::<Vec<_>>();
        let mut missing = Vec::new();
        for id in ids {
            let Some(update) = self.pending.get(&id).cloned() else {
                continue;
            };

            let Some(endpoint) = update else {
                self.pending.remove(&id);
                self.active.remove(&id);
                info!(%id, "Endpoint removed");
                continue;
            };

            if self.apply_endpoint(&id, &endpoint).await? {
                self.pending.remove(&id);
                self.active.insert(id, endpoint);
            } else {
                missing.push(id);
            }
        }

        if !missing.is_empty() {
            return Err(Error::UnknownEndpoints(missing));
        }
        Ok(())
    }

    /// Returns false when the backend has no endpoint for the workload.
    async fn apply_endpoint(
        &mut self,
        id: &WorkloadEndpointId,
        endpoint: &WorkloadEndpoint,
    ) -> Result<bool, Error> {
        let addrs = endpoint_addrs(endpoint);
        let Some(backend_id) = self.endpoint_ids.lookup(&self.backend, &addrs).await? else {
            debug!(%id, ?addrs, "No backend endpoint");
            return Ok(false);
        };

        let rules = self.render_rules(endpoint);
        debug!(%id, %backend_id, rules = rules.len(), "Applying rules");
        self.backend
            .apply_rules(&backend_id, rules)
            .await
            .with_context(|| format!("failed to apply rules for {id} to endpoint {backend_id}"))?;
        info!(%id, %backend_id, "Endpoint updated");
        Ok(true)
    }

    /// Renders the inbound rules followed by the outbound rules.
    fn render_rules(&self, endpoint: &WorkloadEndpoint) -> Vec<AclRule> {
        let inbound = self
            .policy_sets
            .get_policy_set_rules(policy_names_for_direction(endpoint, true), true);
        let outbound = self
            .policy_sets
            .get_policy_set_rules(policy_names_for_direction(endpoint, false), false);

        let mut rules = Vec::with_capacity(inbound.len() + outbound.len() + 1);
        if let Some(node_ip) = self.node_ip {
            let mut rule = AclRule {
                remote_addresses: node_ip.to_string(),
                ..AclRule::new(Direction::In, AclAction::Allow)
            }
            .with_priority(HOST_RULE_PRIORITY);
            if self.policy_sets.features().rule_id {
                rule = rule.with_id(NODE_ALLOW_ID);
            }
            rules.push(rule);
        }
        rules.extend(inbound);
        rules.extend(outbound);
        rules
    }
}

/// Lists every policy set an endpoint may reference, in either direction.
///
/// Profiles are included unless both of the first tier's policy lists are
/// non-empty.
pub fn policy_names_for_impact(endpoint: &WorkloadEndpoint) -> Vec<String> {
    let mut names = Vec::new();
    let mut profiles_apply = true;
    if let Some(tier) = endpoint.first_tier() {
        names.extend(tier.ingress_policies.iter().map(|p| policy_set_name(p)));
        names.extend(tier.egress_policies.iter().map(|p| policy_set_name(p)));
        profiles_apply = tier.ingress_policies.is_empty() || tier.egress_policies.is_empty();
    }
    if profiles_apply {
        names.extend(endpoint.profile_ids.iter().map(|p| profile_set_name(p)));
    }
    names
}

/// Lists the policy sets applied to one direction of an endpoint.
///
/// The first tier's policies for the direction win; profiles apply only when
/// that list is empty.
pub fn policy_names_for_direction(endpoint: &WorkloadEndpoint, inbound: bool) -> Vec<String> {
    let policies = endpoint.first_tier().map(|tier| {
        if inbound {
            &tier.ingress_policies
        } else {
            &tier.egress_policies
        }
    });
    match policies {
        Some(policies) if !policies.is_empty() => {
            policies.iter().map(|p| policy_set_name(p)).collect()
        }
        _ => endpoint
            .profile_ids
            .iter()
            .map(|p| profile_set_name(p))
            .collect(),
    }
}

/// Parses the endpoint's addresses, in order.
fn endpoint_addrs(endpoint: &WorkloadEndpoint) -> Vec<IpAddr> {
    endpoint
        .ipv4_nets
        .iter()
        .filter_map(|net| {
            let addr = net
                .parse::<IpNet>()
                .map(|net| net.addr())
                .or_else(|_| net.parse::<IpAddr>());
            if addr.is_err() {
                warn!(endpoint = %endpoint.name, %net, "Ignoring invalid endpoint address");
            }
            addr.ok()
        })
        .collect()
}
