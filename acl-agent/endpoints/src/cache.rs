use acl_agent_core::Backend;
use ahash::AHashMap as HashMap;
use anyhow::{Context, Result};
use regex::Regex;
use std::net::IpAddr;
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

/// How long a backend listing is trusted before a lookup pass refreshes it.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Maps workload addresses to backend endpoint ids.
///
/// Only local endpoints attached to a network whose name matches the
/// configured pattern are indexed.
#[derive(Debug)]
pub struct EndpointIdCache {
    network_pattern: Regex,
    by_addr: HashMap<IpAddr, String>,
    refreshed_at: Option<Instant>,
}

// === impl EndpointIdCache ===

impl EndpointIdCache {
    pub fn new(network_pattern: Regex) -> Self {
        Self {
            network_pattern,
            by_addr: HashMap::new(),
            refreshed_at: None,
        }
    }

    /// Rebuilds the cache from the backend's endpoint listing.
    ///
    /// Unless `force` is set, a listing younger than [`REFRESH_INTERVAL`] is
    /// kept as is.
    pub async fn refresh<B>(&mut self, backend: &B, force: bool) -> Result<()>
    where
        B: Backend + ?Sized,
    {
        if !force {
            if let Some(at) = self.refreshed_at {
                if at.elapsed() < REFRESH_INTERVAL {
                    return Ok(());
                }
            }
        }

        let endpoints = backend
            .list_endpoints()
            .await
            .context("failed to list backend endpoints")?;

        let mut by_addr = HashMap::with_capacity(endpoints.len());
        for ep in endpoints {
            if ep.is_remote_endpoint {
                trace!(id = %ep.id, "Ignoring remote endpoint");
                continue;
            }
            if !self.network_pattern.is_match(&ep.virtual_network_name) {
                trace!(id = %ep.id, network = %ep.virtual_network_name, "Ignoring endpoint on unmatched network");
                continue;
            }
            match ep.ip_address {
                Some(addr) => {
                    by_addr.insert(addr, ep.id);
                }
                None => trace!(id = %ep.id, "Ignoring endpoint without an address"),
            }
        }

        debug!(force, endpoints = by_addr.len(), "Refreshed endpoint ids");
        self.by_addr = by_addr;
        self.refreshed_at = Some(Instant::now());
        Ok(())
    }

    /// Returns the backend id for the first of `addrs` that has one.
    ///
    /// When none of the addresses is cached, the listing is refreshed once
    /// and the lookup retried.
    pub async fn lookup<B>(&mut self, backend: &B, addrs: &[IpAddr]) -> Result<Option<String>>
    where
        B: Backend + ?Sized,
    {
        if let Some(id) = self.get_any(addrs) {
            return Ok(Some(id.to_string()));
        }

        self.refresh(backend, true).await?;
        Ok(self.get_any(addrs).map(str::to_string))
    }

    pub fn get(&self, addr: &IpAddr) -> Option<&str> {
        self.by_addr.get(addr).map(String::as_str)
    }

    fn get_any(&self, addrs: &[IpAddr]) -> Option<&str> {
        addrs.iter().find_map(|addr| self.get(addr))
    }

    pub fn len(&self) -> usize {
        self.by_addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_addr.is_empty()
    }
}
