//! Policy set rendering
//!
//! Turns active policies and profiles into the ordered ACL rules a host
//! firewall enforces on a workload endpoint:
//!
//! - Each rule is compiled into zero or more ACL rules. Rules using match
//!   criteria the backend cannot express are skipped with a warning; the
//!   trailing default deny keeps the endpoint closed.
//! - IP sets referenced by a rule are resolved at render time against an
//!   ordered list of [`IpSetSource`](acl_agent_core::IpSetSource)s.
//! - When a set of policies is requested for an endpoint, the rendered rules
//!   are concatenated and prioritized, and a default deny and host allow rule
//!   are appended. Configured static rules are placed ahead of them with
//!   their own priorities.
//!
//! ```text
//! [ Rule ] -> compile -> [ AclRule ]* -> sequence -> [ AclRule ]* + default deny + host allow
//!               ^
//!          [ IP sets ]
//! ```
//!
//! Rendered rules are cached per policy set; an IP set change re-renders only
//! the sets that reference it and reports which of them actually changed.

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod compile;
mod ipsets;
mod resolver;
pub mod sequence;
mod static_rules;
mod store;


pub use self::{
    compile::{Compiler, SkipReason},
    ipsets::IpSetCache,
    resolver::{IpSetResolver, SharedIpSetSource},
    static_rules::StaticRules,
    store::PolicySets,
};
