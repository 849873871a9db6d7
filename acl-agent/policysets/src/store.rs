use crate::{compile::Compiler, sequence::sequence_rules, IpSetResolver, StaticRules};
use acl_agent_core::{AclFeatures, AclRule, Direction, PolicySetSource, Update};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use tracing::{debug, instrument};

/// Holds the rendered form of every active policy and profile.
///
/// Rules are rendered when a set is added and again when an IP set it
/// references changes; lookups only assign priorities.
#[derive(Debug)]
pub struct PolicySets {
    compiler: Compiler,
    features: AclFeatures,
    static_rules: StaticRules,
    sets: HashMap<String, PolicySet>,
}

#[derive(Debug)]
struct PolicySet {
    source: PolicySetSource,

    /// IP sets referenced by any rule, in either direction.
    ip_set_ids: HashSet<String>,

    inbound: Vec<AclRule>,
    outbound: Vec<AclRule>,
}

// === impl PolicySets ===

impl PolicySets {
    pub fn new(resolver: IpSetResolver, features: AclFeatures, chunk_size: usize) -> Self {
        Self {
            compiler: Compiler::new(resolver, chunk_size),
            features,
            static_rules: StaticRules::default(),
            sets: HashMap::new(),
        }
    }

    /// Sets the rules placed ahead of every rendered policy.
    pub fn with_static_rules(mut self, static_rules: impl Into<StaticRules>) -> Self {
        self.static_rules = static_rules.into();
        self
    }

    pub fn features(&self) -> AclFeatures {
        self.features
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// Applies an active policy or profile event, returning the name of the
    /// policy set it touched.
    ///
    /// Other updates are ignored.
    pub fn on_update(&mut self, update: &Update) -> Option<String> {
        match update {
            Update::ActivePolicyUpdate { id, policy } => {
                let name = id.policy_set_name();
                self.add_or_replace_policy_set(name.clone(), policy.clone());
                Some(name)
            }
            Update::ActivePolicyRemove { id } => {
                let name = id.policy_set_name();
                self.remove_policy_set(&name);
                Some(name)
            }
            Update::ActiveProfileUpdate { id, profile } => {
                let name = id.policy_set_name();
                self.add_or_replace_policy_set(name.clone(), profile.clone());
                Some(name)
            }
            Update::ActiveProfileRemove { id } => {
                let name = id.policy_set_name();
                self.remove_policy_set(&name);
                Some(name)
            }
            _ => None,
        }
    }

    /// Renders and stores a policy set, replacing any prior definition.
    #[instrument(skip_all, fields(name = %name.as_ref()))]
    pub fn add_or_replace_policy_set(
        &mut self,
        name: impl AsRef<str> + Into<String>,
        source: impl Into<PolicySetSource>,
    ) {
        let source = source.into();
        let (inbound, outbound) = self.compiler.compile_policy_set(name.as_ref(), &source);
        let ip_set_ids = source
            .rules()
            .into_iter()
            .flat_map(|(inbound, outbound)| inbound.iter().chain(outbound))
            .flat_map(|rule| rule.ip_set_ids())
            .map(str::to_string)
            .collect();
        debug!(
            kind = source.kind(),
            inbound = inbound.len(),
            outbound = outbound.len(),
            "Updated policy set"
        );
        self.sets.insert(
            name.into(),
            PolicySet {
                source,
                ip_set_ids,
                inbound,
                outbound,
            },
        );
    }

    #[instrument(skip(self))]
    pub fn remove_policy_set(&mut self, name: &str) -> bool {
        let removed = self.sets.remove(name).is_some();
        debug!(removed, "Removed policy set");
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Returns the static rules for the direction, then the prioritized
    /// rules for the named policy sets in order, followed by the default deny
    /// and host allow rules.
    ///
    /// Unknown names contribute no rules. A name listed twice is rendered
    /// twice.
    pub fn get_policy_set_rules<I>(&self, names: I, inbound: bool) -> Vec<AclRule>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut rules: Vec<&AclRule> = Vec::new();
        for name in names {
            match self.sets.get(name.as_ref()) {
                Some(set) if inbound => rules.extend(&set.inbound),
                Some(set) => rules.extend(&set.outbound),
                None => debug!(name = %name.as_ref(), "Unknown policy set"),
            }
        }
        let direction = Direction::from_inbound(inbound);
        let mut out = self
            .static_rules
            .for_direction(direction)
            .cloned()
            .collect::<Vec<_>>();
        if !self.features.rule_id {
            for rule in &mut out {
                rule.id = None;
            }
        }
        out.extend(sequence_rules(rules, direction, self.features));
        out
    }

    /// Re-renders every policy set that references the given IP set,
    /// returning the names whose rendered rules changed.
    #[instrument(skip(self))]
    pub fn process_ip_set_update(&mut self, ip_set_id: &str) -> Vec<String> {
        let mut changed = Vec::new();
        for (name, set) in self.sets.iter_mut() {
            if !set.ip_set_ids.contains(ip_set_id) {
                continue;
            }

            let (inbound, outbound) = self.compiler.compile_policy_set(name, &set.source);
            if inbound == set.inbound && outbound == set.outbound {
                debug!(%name, "Policy set unchanged");
                continue;
            }

            debug!(%name, "Policy set changed");
            set.inbound = inbound;
            set.outbound = outbound;
            changed.push(name.clone());
        }
        changed.sort();
        changed
    }
}
