use crate::{Dataplane, DataplaneMetrics};
use acl_agent_core::{Backend, Update};
use acl_agent_endpoints::EndpointConfig;
use acl_agent_policysets::StaticRules;
use anyhow::{bail, Context, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use regex::RegexBuilder;
use std::{
    net::IpAddr,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use tokio::{sync::mpsc, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[clap(name = "acl-agent", about = "Programs host firewall ACLs from datastore policy")]
pub struct Args {
    #[clap(long, default_value = "acl_agent=info,warn", env = "ACL_AGENT_LOG")]
    log_level: String,

    #[clap(long, value_enum, default_value = "plain")]
    log_format: LogFormat,

    /// Backend networks whose endpoints are managed, as a case-insensitive
    /// regular expression.
    #[clap(long, default_value = "Calico.*", env = "KUBE_NETWORK")]
    network_name: String,

    /// Address of this node. When set, every endpoint admits traffic from it.
    #[clap(long, env = "ACL_AGENT_NODE_IP")]
    node_ip: Option<IpAddr>,

    /// Maximum number of addresses or ports carried by a single ACL rule.
    #[clap(long, default_value = "100")]
    rule_chunk_size: NonZeroUsize,

    #[clap(long, default_value = "1000")]
    retry_interval_ms: u64,

    /// JSON file of platform rules placed ahead of every endpoint's policies.
    #[clap(long, env = "ACL_AGENT_STATIC_RULES")]
    static_rules_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Validated settings for the dataplane.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub endpoints: EndpointConfig,
    pub rule_chunk_size: usize,
    pub retry_interval: Duration,
    pub static_rules: StaticRules,
}

// === impl Args ===

impl Args {
    pub fn build_config(self) -> Result<Config> {
        let Self {
            log_level,
            log_format,
            network_name,
            node_ip,
            rule_chunk_size,
            retry_interval_ms,
            static_rules_path,
        } = self;

        if retry_interval_ms == 0 {
            bail!("--retry-interval-ms must be positive");
        }

        let network_pattern = RegexBuilder::new(&network_name)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid network name pattern {network_name:?}"))?;

        let static_rules = match static_rules_path {
            Some(path) => load_static_rules(&path)?,
            None => StaticRules::default(),
        };

        Ok(Config {
            log_level,
            log_format,
            endpoints: EndpointConfig {
                network_pattern,
                node_ip,
            },
            rule_chunk_size: rule_chunk_size.get(),
            retry_interval: Duration::from_millis(retry_interval_ms),
            static_rules,
        })
    }

    /// Configures logging and runs the dataplane until `updates` closes.
    ///
    /// Metrics are registered in `prom`.
    pub async fn run<B>(
        self,
        backend: B,
        updates: mpsc::Receiver<Update>,
        prom: &mut Registry,
    ) -> Result<()>
    where
        B: Backend + Send + Sync,
    {
        let config = self.build_config()?;
        config.init_logging()?;

        let metrics = DataplaneMetrics::register(prom.sub_registry_with_prefix("acl_agent"));
        info!(
            network = %config.endpoints.network_pattern,
            node_ip = ?config.endpoints.node_ip,
            chunk_size = config.rule_chunk_size,
            static_rules = config.static_rules.len(),
            "Starting dataplane"
        );
        Dataplane::new(backend, &config, metrics).run(updates).await;
        Ok(())
    }
}

fn load_static_rules(path: &Path) -> Result<StaticRules> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read static rules from {}", path.display()))?;
    StaticRules::from_json(&json)
        .with_context(|| format!("invalid static rules in {}", path.display()))
}

// === impl Config ===

impl Config {
    /// Installs the global tracing subscriber.
    pub fn init_logging(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log_level)
            .with_context(|| format!("invalid log level {:?}", self.log_level))?;
        let registry = tracing_subscriber::registry().with(filter);
        match self.log_format {
            LogFormat::Plain => registry.with(fmt::layer()).try_init(),
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        }
        .context("failed to initialize logging")
    }
}
