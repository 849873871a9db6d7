use acl_agent_core::{AclRule, Direction};
use serde::Deserialize;

/// Platform rules that precede every rendered policy on every endpoint.
///
/// The rules are read from a JSON document naming the provider that owns
/// them:
///
/// ```json
/// {
///   "Provider": "MyPlatform",
///   "Rules": [
///     {
///       "Name": "block-server",
///       "Rule": { "Action": "Block", "Direction": "Out", "Priority": 200 }
///     }
///   ]
/// }
/// ```
///
/// Each rule is identified as `<Provider>-<Name>` and otherwise applied as
/// written. Static rules keep their own priorities; they do not take part in
/// policy sequencing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticRules {
    rules: Vec<AclRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StaticRulesFile {
    #[serde(default)]
    provider: String,

    #[serde(default)]
    rules: Vec<NamedRule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NamedRule {
    name: String,
    rule: AclRule,
}

// === impl StaticRules ===

impl StaticRules {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let StaticRulesFile { provider, rules } = serde_json::from_str(json)?;
        let rules = rules
            .into_iter()
            .map(|NamedRule { name, rule }| {
                let id = if provider.is_empty() {
                    name
                } else {
                    format!("{provider}-{name}")
                };
                rule.with_id(id)
            })
            .collect();
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rules that apply in the given direction, in file order.
    pub fn for_direction(&self, direction: Direction) -> impl Iterator<Item = &AclRule> {
        self.rules
            .iter()
            .filter(move |rule| rule.direction == direction)
    }
}

impl From<Vec<AclRule>> for StaticRules {
    fn from(rules: Vec<AclRule>) -> Self {
        Self { rules }
    }
}
