#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use acl_agent_core as core;
pub use acl_agent_endpoints as endpoints;
pub use acl_agent_policysets as policysets;

mod args;
mod dataplane;
mod metrics;


pub use self::{
    args::{Args, Config, LogFormat},
    dataplane::Dataplane,
    metrics::DataplaneMetrics,
};
