use crate::{Config, DataplaneMetrics};
use acl_agent_core::{Backend, Update};
use acl_agent_endpoints::{EndpointManager, Error};
use acl_agent_policysets::{IpSetCache, IpSetResolver, PolicySets, SharedIpSetSource};
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    time::{self, Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Drives the endpoint manager from a stream of datastore updates.
///
/// All state is owned by a single task, so updates and apply passes never
/// interleave.
#[derive(Debug)]
pub struct Dataplane<B> {
    ip_sets: IpSetCache,
    manager: EndpointManager<B>,
    metrics: DataplaneMetrics,
    retry_interval: Duration,
}

// === impl Dataplane ===

impl<B> Dataplane<B>
where
    B: Backend + Send + Sync,
{
    pub fn new(backend: B, config: &Config, metrics: DataplaneMetrics) -> Self {
        let ip_sets = IpSetCache::default();
        let resolver = IpSetResolver::new([Arc::new(ip_sets.clone()) as SharedIpSetSource]);
        let policy_sets = PolicySets::new(resolver, backend.acl_features(), config.rule_chunk_size)
            .with_static_rules(config.static_rules.clone());
        Self {
            ip_sets,
            manager: EndpointManager::new(backend, policy_sets, config.endpoints.clone()),
            metrics,
            retry_interval: config.retry_interval,
        }
    }

    pub fn ip_sets(&self) -> &IpSetCache {
        &self.ip_sets
    }

    pub fn manager(&self) -> &EndpointManager<B> {
        &self.manager
    }

    /// Records an update. IP sets are updated before the manager sees the
    /// event so that re-rendered policies observe the new membership.
    pub fn apply_update(&mut self, update: Update) {
        self.metrics.update(update.kind());
        self.ip_sets.on_update(&update);
        self.manager.on_update(&update);
    }

    /// Runs an apply pass, returning true if it should be retried.
    #[instrument(skip(self))]
    pub async fn complete_deferred_work(&mut self) -> bool {
        let res = self.manager.complete_deferred_work().await;
        self.metrics.set_pending(self.manager.pending_len());
        match res {
            Ok(()) => {
                self.metrics.applied();
                false
            }
            Err(Error::UnknownEndpoints(ids)) => {
                self.metrics.unknown_endpoints(ids.len());
                info!(endpoints = ids.len(), "Waiting for the backend to create endpoints");
                true
            }
            Err(error) => {
                self.metrics.apply_failed();
                warn!(%error, "Failed to apply endpoint rules");
                true
            }
        }
    }

    /// Processes updates until the channel closes.
    ///
    /// Every batch of immediately available updates is followed by an apply
    /// pass. Failed passes are retried after the retry interval even if no
    /// further updates arrive.
    pub async fn run(mut self, mut updates: mpsc::Receiver<Update>) {
        let mut retry_at: Option<Instant> = None;
        loop {
            let update = match retry_at {
                Some(at) => tokio::select! {
                    update = updates.recv() => update,
                    () = time::sleep_until(at) => {
                        debug!("Retrying");
                        retry_at = self.retry_deadline().await;
                        continue;
                    }
                },
                None => updates.recv().await,
            };
            let Some(update) = update else {
                break;
            };

            self.apply_update(update);
            while let Ok(update) = updates.try_recv() {
                self.apply_update(update);
            }

            match self.retry_deadline().await {
                Some(at) => {
                    retry_at.get_or_insert(at);
                }
                None => retry_at = None,
            }
        }
        info!("Update stream closed");
    }

    async fn retry_deadline(&mut self) -> Option<Instant> {
        self.complete_deferred_work()
            .await
            .then(|| Instant::now() + self.retry_interval)
    }
}
