use acl_agent_core::{AclAction, AclFeatures, AclRule, Direction, RuleType};
use tracing::warn;

/// Priority of the first rendered rule.
pub const BASE_PRIORITY: u16 = 1000;

/// Priority of the host allow rule when the backend needs one.
pub const HOST_RULE_PRIORITY: u16 = 100;

pub const DEFAULT_DENY_ID: &str = "default-deny";
pub const DEFAULT_HOST_ALLOW_ID: &str = "default-allow-host";

/// Assigns priorities to a stream of rendered rules.
///
/// Consecutive rules with the same action share a priority; every change of
/// action moves to the next priority.
///
/// Priorities stop at `u16::MAX`. Rules past that point share the last
/// priority and a warning is logged once per stream.
#[derive(Debug)]
pub(crate) struct Sequencer {
    priority: u16,
    last_action: Option<AclAction>,
    exhausted: bool,
}

// === impl Sequencer ===

impl Sequencer {
    pub(crate) fn new() -> Self {
        Self::starting_at(BASE_PRIORITY)
    }

    fn starting_at(priority: u16) -> Self {
        Self {
            priority,
            last_action: None,
            exhausted: false,
        }
    }

    pub(crate) fn next(&mut self, action: AclAction) -> u16 {
        if matches!(self.last_action, Some(last) if last != action) {
            self.priority = self.step();
        }
        self.last_action = Some(action);
        self.priority
    }

    /// The default deny always sits one past the last priority used, even
    /// when the preceding rules already deny.
    fn default_deny_priority(&mut self) -> u16 {
        self.step()
    }

    fn step(&mut self) -> u16 {
        match self.priority.checked_add(1) {
            Some(priority) => priority,
            None => {
                if !self.exhausted {
                    warn!(
                        priority = self.priority,
                        "Rule priorities exhausted; remaining rules share the last priority"
                    );
                    self.exhausted = true;
                }
                self.priority
            }
        }
    }
}

/// Prioritizes rendered rules and appends the default deny and host allow
/// rules for the given direction.
pub fn sequence_rules<'r>(
    rules: impl IntoIterator<Item = &'r AclRule>,
    direction: Direction,
    features: AclFeatures,
) -> Vec<AclRule> {
    let mut seq = Sequencer::new();
    let mut out = rules
        .into_iter()
        .map(|rule| AclRule {
            priority: Some(seq.next(rule.action)),
            ..rule.clone()
        })
        .collect::<Vec<_>>();

    out.push(
        AclRule::new(direction, AclAction::Block)
            .with_id(DEFAULT_DENY_ID)
            .with_priority(seq.default_deny_priority()),
    );
    out.push(host_allow_rule(direction, features));

    if !features.rule_id {
        for rule in &mut out {
            rule.id = None;
        }
    }
    out
}

/// Always permits management traffic between the node and its endpoints.
pub fn host_allow_rule(direction: Direction, features: AclFeatures) -> AclRule {
    let mut rule = AclRule {
        rule_type: RuleType::Host,
        ..AclRule::new(direction, AclAction::Allow)
    }
    .with_id(DEFAULT_HOST_ALLOW_ID);
    if !features.no_host_rule_priority {
        rule.priority = Some(HOST_RULE_PRIORITY);
    }
    rule
}
