use acl_agent_core::{IpSetSource, Update};
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tracing::{debug, instrument};

/// An in-memory IP set source fed by datastore IP set events.
///
/// Clones share the same underlying sets: the dataplane driver writes while
/// the policy set store reads through an [`IpSetResolver`](crate::IpSetResolver).
#[derive(Clone, Debug, Default)]
pub struct IpSetCache(Arc<RwLock<HashMap<String, BTreeSet<String>>>>);

// === impl IpSetCache ===

impl IpSetCache {
    /// Applies an IP set event, returning the id of the set it touched.
    ///
    /// Non-IP-set updates are ignored.
    #[instrument(skip_all, fields(kind = update.kind()))]
    pub fn on_update(&self, update: &Update) -> Option<String> {
        match update {
            Update::IpSetUpdate { id, members } => {
                self.replace(id, members.iter().cloned());
                Some(id.clone())
            }
            Update::IpSetDeltaUpdate { id, added, removed } => {
                self.update_members(id, added.iter().cloned(), removed);
                Some(id.clone())
            }
            Update::IpSetRemove { id } => {
                self.remove(id);
                Some(id.clone())
            }
            _ => None,
        }
    }

    pub fn replace(&self, id: &str, members: impl IntoIterator<Item = String>) {
        let members = members.into_iter().collect::<BTreeSet<_>>();
        debug!(%id, members = members.len(), "Replacing IP set");
        self.0.write().insert(id.to_string(), members);
    }

    pub fn update_members(
        &self,
        id: &str,
        added: impl IntoIterator<Item = String>,
        removed: &[String],
    ) {
        let mut sets = self.0.write();
        let members = sets.entry(id.to_string()).or_default();
        for member in removed {
            members.remove(member);
        }
        members.extend(added);
        debug!(%id, members = members.len(), "Updated IP set");
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.0.write().remove(id).is_some();
        debug!(%id, removed, "Removing IP set");
        removed
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}

impl IpSetSource for IpSetCache {
    fn ip_set_members(&self, id: &str) -> Option<Vec<String>> {
        self.0
            .read()
            .get(id)
            .map(|members| members.iter().cloned().collect())
    }
}
