use acl_agent_core::IpSetSource;
use ahash::AHashMap as HashMap;
use std::{fmt, sync::Arc};

pub type SharedIpSetSource = Arc<dyn IpSetSource + Send + Sync>;

/// Resolves IP set membership against an ordered list of sources.
///
/// The first source that knows a set wins; later sources are not consulted.
#[derive(Clone, Default)]
pub struct IpSetResolver {
    sources: Vec<SharedIpSetSource>,
}

/// Memoizes lookups for the duration of a single render so that a set
/// referenced by several rules is fetched once.
pub(crate) struct ResolvedIpSets<'r> {
    resolver: &'r IpSetResolver,
    cache: HashMap<String, Option<Arc<[String]>>>,
}

// === impl IpSetResolver ===

impl IpSetResolver {
    pub fn new(sources: impl IntoIterator<Item = SharedIpSetSource>) -> Self {
        Self {
            sources: sources.into_iter().collect(),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Vec<String>> {
        self.sources.iter().find_map(|src| src.ip_set_members(id))
    }
}

impl fmt::Debug for IpSetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpSetResolver")
            .field("sources", &self.sources.len())
            .finish()
    }
}

// === impl ResolvedIpSets ===

impl<'r> ResolvedIpSets<'r> {
    pub(crate) fn new(resolver: &'r IpSetResolver) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn members(&mut self, id: &str) -> Option<Arc<[String]>> {
        if let Some(members) = self.cache.get(id) {
            return members.clone();
        }
        let members = self.resolver.lookup(id).map(Arc::from);
        self.cache.insert(id.to_string(), members.clone());
        members
    }
}
