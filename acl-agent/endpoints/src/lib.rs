//! Endpoint update coordination
//!
//! Tracks workload endpoints and pushes their rendered ACL rules to the host
//! firewall backend in two phases:
//!
//! - [`EndpointManager::on_update`] records datastore events. Endpoint
//!   updates and removals are queued as pending; policy, profile and IP set
//!   changes are applied to the policy set store and every active endpoint
//!   that may be affected is queued again.
//! - [`EndpointManager::complete_deferred_work`] drains the pending queue,
//!   resolving each endpoint's backend id through an [`EndpointIdCache`] and
//!   replacing its rules on the backend.
//!
//! ```text
//! [ Update ] -> on_update -> pending -> complete_deferred_work -> [ Backend ]
//!                   |                          ^
//!              [ PolicySets ] -----------------+
//! ```
//!
//! Endpoints the backend does not know yet stay pending and are reported with
//! a retryable error so the caller can try again later.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cache;
mod error;
mod manager;


pub use self::{
    cache::{EndpointIdCache, REFRESH_INTERVAL},
    error::Error,
    manager::{
        policy_names_for_direction, policy_names_for_impact, EndpointConfig, EndpointManager,
        NODE_ALLOW_ID,
    },
};
