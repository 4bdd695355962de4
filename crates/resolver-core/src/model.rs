//! Data model for specifications, rules, conditions, and request contexts.
//!
//! A struct-of-enums shape generalized from a single condition/action pair
//! per rule to a richer rule shape: priority, composition, dependencies,
//! exclusions, chains, and ordering constraints.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Deployment environment a specification is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local/dev environment.
    Development,
    /// Pre-production environment.
    Staging,
    /// Live production environment.
    Production,
}

/// The persistent unit: a versioned configuration specification for one app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    /// Stable identifier for this specification.
    pub id: String,
    /// Application identifier, e.g. `"com.example.app"`.
    pub app_id: String,
    /// Semver version string this specification applies to.
    pub version: String,
    /// Schema `defaultConfig` must satisfy.
    pub schema: Schema,
    /// Base configuration document, overlaid by matched rules.
    pub default_config: Json,
    /// Ordered set of rules (order is not semantic; priority is).
    pub rules: Vec<Rule>,
    /// Gating links for rules that are otherwise inert.
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
    /// Registered rule templates, keyed by template id.
    #[serde(default)]
    pub rule_templates: HashMap<String, PartialRule>,
    /// Deployment environment this specification belongs to.
    pub environment: Environment,
    /// Feature flags known at load time.
    #[serde(default)]
    pub feature_flags: HashMap<String, bool>,
    /// Rollout percentage (0-100) per rule id.
    #[serde(default)]
    pub rollout_percentages: HashMap<String, u8>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Required/optional/deprecated key sets for shallow top-level validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Schema version string, informational only.
    #[serde(default)]
    pub version: String,
    /// Keys that must be present.
    #[serde(default)]
    pub required_keys: Vec<String>,
    /// Keys that may be present.
    #[serde(default)]
    pub optional_keys: Vec<String>,
    /// Keys that may be present but are discouraged.
    #[serde(default)]
    pub deprecated_keys: Vec<String>,
}

/// How a matched rule's `config` combines with the document built so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Deep merge (default).
    Merge,
    /// Right-hand side wins entirely.
    Override,
    /// Shallow, left-wins overlay.
    Inherit,
}

impl Default for ResolutionStrategy {
    fn default() -> Self {
        Self::Merge
    }
}

/// A declarative configuration rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique identifier within its specification.
    pub id: String,
    /// Human-readable name.
    #[serde(default = "default_rule_name")]
    pub name: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Evaluation priority; higher evaluates first.
    #[serde(default)]
    pub priority: i32,
    /// Primitive conditions that must all hold (empty = always matches).
    #[serde(default)]
    pub conditions: Vec<PrimitiveCondition>,
    /// Configuration fragment contributed on match.
    #[serde(default)]
    pub config: Json,
    /// How `config` combines into the evolving document.
    #[serde(default)]
    pub resolution_strategy: ResolutionStrategy,
    /// Whether this rule is active at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rule ids that must already have matched for this rule to match.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Rule ids whose prior match blocks this rule.
    #[serde(default)]
    pub exclusions: Vec<String>,
    /// Recursive boolean expression over rule ids.
    #[serde(default)]
    pub chain: Option<RuleChain>,
    /// Ids this rule must execute after.
    #[serde(default)]
    pub execute_after: Vec<String>,
    /// Ids this rule must execute before.
    #[serde(default)]
    pub execute_before: Vec<String>,
    /// Stop evaluating further rules once this one matches.
    #[serde(default)]
    pub stop_propagation: bool,
    /// How this rule is materialized from others, if at all.
    #[serde(default)]
    pub composition: Option<Composition>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: HashMap<String, Json>,
}

fn default_rule_name() -> String {
    "Unnamed Rule".to_string()
}

fn default_true() -> bool {
    true
}

/// A partial rule, as registered as a template or supplied as overrides.
///
/// Every field is optional; `None` means "not supplied by this partial".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRule {
    /// See [`Rule::id`].
    #[serde(default)]
    pub id: Option<String>,
    /// See [`Rule::name`].
    #[serde(default)]
    pub name: Option<String>,
    /// See [`Rule::description`].
    #[serde(default)]
    pub description: Option<String>,
    /// See [`Rule::priority`].
    #[serde(default)]
    pub priority: Option<i32>,
    /// See [`Rule::conditions`].
    #[serde(default)]
    pub conditions: Option<Vec<PrimitiveCondition>>,
    /// See [`Rule::config`].
    #[serde(default)]
    pub config: Option<Json>,
    /// See [`Rule::resolution_strategy`].
    #[serde(default)]
    pub resolution_strategy: Option<ResolutionStrategy>,
    /// See [`Rule::enabled`].
    #[serde(default)]
    pub enabled: Option<bool>,
    /// See [`Rule::dependencies`].
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    /// See [`Rule::exclusions`].
    #[serde(default)]
    pub exclusions: Option<Vec<String>>,
    /// See [`Rule::chain`].
    #[serde(default)]
    pub chain: Option<RuleChain>,
    /// See [`Rule::execute_after`].
    #[serde(default)]
    pub execute_after: Option<Vec<String>>,
    /// See [`Rule::execute_before`].
    #[serde(default)]
    pub execute_before: Option<Vec<String>>,
    /// See [`Rule::stop_propagation`].
    #[serde(default)]
    pub stop_propagation: Option<bool>,
    /// See [`Rule::composition`].
    #[serde(default)]
    pub composition: Option<Composition>,
    /// See [`Rule::tags`].
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// See [`Rule::metadata`].
    #[serde(default)]
    pub metadata: Option<HashMap<String, Json>>,
}

/// Condition type a [`PrimitiveCondition`] matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Matches `RequestContext::app_version`.
    AppVersion,
    /// Matches OS name.
    Os,
    /// Matches device type.
    Device,
    /// Matches geo country.
    GeoCountry,
    /// Matches geo region.
    GeoRegion,
    /// Matches `timestamp >= value`.
    TimeAfter,
    /// Matches `timestamp <= value`.
    TimeBefore,
    /// Matches the raw user-agent string.
    UserAgentMatch,
    /// Any condition type this build does not recognize. Evaluates to
    /// `false` rather than failing deserialization of the containing
    /// specification.
    #[serde(other)]
    Unknown,
}

/// Comparison operator for a [`PrimitiveCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
    /// Membership in an array value.
    In,
    /// Regex partial match.
    Regex,
    /// Any operator this build does not recognize. Evaluates to `false`
    /// rather than failing deserialization.
    #[serde(other)]
    Unknown,
}

/// A single primitive match predicate over a request-context attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveCondition {
    /// Which context attribute to read.
    #[serde(rename = "type")]
    pub kind: ConditionType,
    /// How to compare it.
    pub operator: Operator,
    /// The value to compare against.
    pub value: Json,
}

/// Boolean combinator for a [`RuleChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChainOperator {
    /// All items must be true.
    And,
    /// At least one item must be true.
    Or,
    /// Negate the first item; other items are ignored.
    Not,
    /// Exactly one item must be true.
    Xor,
    /// Any chain operator this build does not recognize. Evaluates to
    /// `false` rather than failing deserialization.
    #[serde(other)]
    Unknown,
}

/// An item inside a [`RuleChain`]: either a rule id or a nested chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainItem {
    /// Reference to another rule's basic evaluation.
    RuleId(String),
    /// A nested boolean expression.
    Chain(RuleChain),
}

/// A recursive boolean expression over rule ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleChain {
    /// Combinator applied to `rules`.
    pub operator: ChainOperator,
    /// Ordered operands.
    pub rules: Vec<ChainItem>,
}

/// How a rule is materialized from other rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Composition {
    /// Derive from a single base rule.
    Extend {
        /// Rule id to extend.
        #[serde(rename = "baseRuleId")]
        base_rule_id: String,
        /// Partial overrides applied on top of the base.
        #[serde(default)]
        overrides: Option<PartialRule>,
    },
    /// Fold several source rules together.
    Compose {
        /// Rule ids to fold, in order.
        #[serde(rename = "sourceRuleIds")]
        source_rule_ids: Vec<String>,
        /// Partial overrides applied scalar-wise after composing.
        #[serde(default)]
        overrides: Option<PartialRule>,
    },
    /// Apply several mixins to this rule in order.
    Mixin {
        /// Mixin rule ids to apply, in order. Unknown ids are skipped.
        #[serde(rename = "sourceRuleIds")]
        source_rule_ids: Vec<String>,
        /// Partial overrides; unused by mixin but accepted for symmetry.
        #[serde(default)]
        overrides: Option<PartialRule>,
    },
}

/// Type of a [`LoadCondition`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadCondition {
    /// Specification environment must equal `value`.
    Environment {
        /// Required environment.
        value: Environment,
    },
    /// A feature flag must equal an expected value.
    FeatureFlag {
        /// Flag name.
        #[serde(rename = "flagName")]
        flag_name: String,
        /// Expected value.
        #[serde(rename = "expectedValue")]
        expected_value: bool,
    },
    /// Deterministic percentage rollout.
    PercentageRollout {
        /// Percentage, 0-100.
        percentage: u8,
        /// Rule id the rollout is computed for.
        #[serde(rename = "ruleId")]
        rule_id: String,
    },
    /// Arbitrary comparison against `customContext`.
    Custom {
        /// Key to read from `customContext`.
        key: String,
        /// Comparison operator.
        operator: Operator,
        /// Value to compare against.
        value: Json,
    },
}

/// A gating link that enables a rule only when all its load conditions hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    /// Rule id to enable when conditions hold.
    pub rule_id: String,
    /// All of these must hold (AND).
    pub load_conditions: Vec<LoadCondition>,
    /// Advisory hint; does not change evaluation semantics.
    #[serde(default)]
    pub lazy_load: bool,
}

/// Parsed user-agent fields, as supplied by the external UA parser capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUserAgent {
    /// OS name, if the parser could determine one.
    pub os_name: Option<String>,
    /// Device type, if the parser could determine one.
    pub device_type: Option<String>,
}

/// Client-supplied geo override, which takes precedence over IP-derived geo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientProvidedGeo {
    /// Country code, if supplied.
    pub country: Option<String>,
    /// Region code, if supplied.
    pub region: Option<String>,
}

/// Per-request context the resolver evaluates rules against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Raw `User-Agent` header value.
    #[serde(default)]
    pub user_agent: String,
    /// Structured form of `user_agent`, from the UA parser capability.
    #[serde(default, rename = "parsedUA")]
    pub parsed_ua: ParsedUserAgent,
    /// Client application version.
    pub app_version: String,
    /// Explicit OS override, if the caller supplied one.
    #[serde(default)]
    pub os: Option<String>,
    /// Explicit device-type override, if the caller supplied one.
    #[serde(default)]
    pub device: Option<String>,
    /// IP-derived country.
    #[serde(default)]
    pub geo_country: Option<String>,
    /// IP-derived region.
    #[serde(default)]
    pub geo_region: Option<String>,
    /// Client-supplied geo override.
    #[serde(default)]
    pub client_provided_geo: Option<ClientProvidedGeo>,
    /// Request timestamp, milliseconds since epoch.
    pub timestamp: i64,
    /// Environment override, if the caller supplied one.
    #[serde(default)]
    pub environment: Option<Environment>,
    /// Per-request feature flag overrides.
    #[serde(default)]
    pub feature_flags: HashMap<String, bool>,
    /// Opaque user identifier used for rollout bucketing.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Arbitrary caller-supplied context keys.
    #[serde(default)]
    pub custom_context: HashMap<String, Json>,
}

impl RequestContext {
    /// Effective OS: explicit context field, else the parsed user agent.
    ///
    /// Nullish-coalescing semantics: an explicit context field always wins
    /// over the parsed user agent when both are present.
    #[must_use]
    pub fn effective_os(&self) -> Option<&str> {
        self.os
            .as_deref()
            .or(self.parsed_ua.os_name.as_deref())
    }

    /// Effective device type: explicit context field, else parsed UA.
    #[must_use]
    pub fn effective_device(&self) -> Option<&str> {
        self.device
            .as_deref()
            .or(self.parsed_ua.device_type.as_deref())
    }

    /// Effective country: client-supplied geo, else IP-derived geo.
    #[must_use]
    pub fn effective_geo_country(&self) -> Option<&str> {
        self.client_provided_geo
            .as_ref()
            .and_then(|g| g.country.as_deref())
            .or(self.geo_country.as_deref())
    }

    /// Effective region: client-supplied geo, else IP-derived geo.
    #[must_use]
    pub fn effective_geo_region(&self) -> Option<&str> {
        self.client_provided_geo
            .as_ref()
            .and_then(|g| g.region.as_deref())
            .or(self.geo_region.as_deref())
    }
}
