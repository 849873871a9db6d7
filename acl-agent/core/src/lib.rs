#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod acl;
pub mod backend;
pub mod endpoint;
pub mod ipset;
pub mod policy;
pub mod rule;
pub mod update;

pub use self::{
    acl::{AclAction, AclFeatures, AclRule, AclType, Direction, RuleType},
    backend::{Backend, BackendEndpoint},
    endpoint::{TierInfo, WorkloadEndpoint, WorkloadEndpointId},
    ipset::IpSetSource,
    policy::{Policy, PolicyId, PolicySetSource, Profile, ProfileId},
    rule::{IcmpMatch, PortRange, Protocol, Rule},
    update::Update,
};
pub use ipnet::{IpNet, Ipv4Net};
