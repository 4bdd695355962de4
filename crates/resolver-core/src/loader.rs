//! Conditional Loader: decide which gated rules join the evaluation
//! set for a request, with a cross-request context-hash cache.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use dashmap::DashMap;

use crate::condition;
use crate::hash::rollout_bucket;
use crate::model::{LoadCondition, RequestContext, Rule, Specification};

/// Decides which `conditionalRules` entries are active for a request, and
/// caches the materialized result keyed by a hash of everything the loader
/// can read from the request — the key must cover every field read,
/// including `clientProvidedGeo`, even though no load condition currently
/// reads it.
#[derive(Default)]
pub struct ConditionalLoader {
    cache: DashMap<u64, Vec<Rule>>,
}

impl ConditionalLoader {
    /// Construct an empty loader with no cached contexts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the set of conditionally-loaded rules for this request,
    /// using the cache when the context has been seen before.
    pub fn load(&self, spec: &Specification, ctx: &RequestContext) -> Vec<Rule> {
        let key = cache_key(spec, ctx);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let loaded = compute(spec, ctx);
        self.cache.insert(key, loaded.clone());
        loaded
    }
}

fn compute(spec: &Specification, ctx: &RequestContext) -> Vec<Rule> {
    let mut out = Vec::new();
    for conditional in &spec.conditional_rules {
        let all_hold = conditional
            .load_conditions
            .iter()
            .all(|lc| evaluate_load_condition(lc, spec, ctx));
        if !all_hold {
            continue;
        }
        if let Some(rule) = spec.rules.iter().find(|r| r.id == conditional.rule_id) {
            let mut materialized = rule.clone();
            // A conditional rule is typically stored `enabled: false` so it
            // is inert unless its gate permits it.
            materialized.enabled = true;
            out.push(materialized);
        }
    }
    out
}

fn evaluate_load_condition(
    condition: &LoadCondition,
    spec: &Specification,
    ctx: &RequestContext,
) -> bool {
    match condition {
        LoadCondition::Environment { value } => spec.environment == *value,
        LoadCondition::FeatureFlag {
            flag_name,
            expected_value,
        } => {
            let effective = ctx
                .feature_flags
                .get(flag_name)
                .or_else(|| spec.feature_flags.get(flag_name));
            effective == Some(expected_value)
        }
        LoadCondition::PercentageRollout {
            percentage,
            rule_id,
        } => match &ctx.user_id {
            None => false,
            Some(user_id) => rollout_bucket(rule_id, user_id) <= *percentage,
        },
        LoadCondition::Custom {
            key,
            operator,
            value,
        } => {
            let extracted = ctx.custom_context.get(key);
            condition::apply_operator(*operator, extracted, value)
        }
    }
}

fn cache_key(spec: &Specification, ctx: &RequestContext) -> u64 {
    let custom_context: BTreeMap<&String, &serde_json::Value> =
        ctx.custom_context.iter().collect();
    let feature_flags: BTreeMap<&String, &bool> = ctx.feature_flags.iter().collect();

    let canonical = serde_json::json!({
        "userId": ctx.user_id,
        "customContext": custom_context,
        "featureFlags": feature_flags,
        "environment": ctx.environment,
        "clientProvidedGeo": ctx.client_provided_geo,
        "specId": spec.id,
        "specVersion": spec.version,
    });

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical.to_string().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Environment, Operator, ResolutionStrategy};
    use serde_json::json;
    use std::collections::HashMap;

    fn spec_with_conditional(rule_id: &str, load_conditions: Vec<LoadCondition>) -> Specification {
        Specification {
            id: "spec1".to_string(),
            app_id: "app1".to_string(),
            version: "1.0.0".to_string(),
            schema: Default::default(),
            default_config: json!({}),
            rules: vec![Rule {
                id: rule_id.to_string(),
                name: rule_id.to_string(),
                description: None,
                priority: 0,
                conditions: vec![],
                config: json!({"gated": true}),
                resolution_strategy: ResolutionStrategy::Merge,
                enabled: false,
                dependencies: vec![],
                exclusions: vec![],
                chain: None,
                execute_after: vec![],
                execute_before: vec![],
                stop_propagation: false,
                composition: None,
                tags: vec![],
                metadata: HashMap::new(),
            }],
            conditional_rules: vec![crate::model::ConditionalRule {
                rule_id: rule_id.to_string(),
                load_conditions,
                lazy_load: false,
            }],
            rule_templates: HashMap::new(),
            environment: Environment::Production,
            feature_flags: HashMap::new(),
            rollout_percentages: HashMap::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn percentage_rollout_requires_user_id() {
        let spec = spec_with_conditional(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: 100,
                rule_id: "beta".to_string(),
            }],
        );
        let ctx = RequestContext::default();
        let loader = ConditionalLoader::new();
        assert!(loader.load(&spec, &ctx).is_empty());
    }

    #[test]
    fn percentage_rollout_forces_enabled_true() {
        let spec = spec_with_conditional(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: 100,
                rule_id: "beta".to_string(),
            }],
        );
        let ctx = RequestContext {
            user_id: Some("user055".to_string()),
            ..Default::default()
        };
        let loader = ConditionalLoader::new();
        let loaded = loader.load(&spec, &ctx);
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].enabled);
    }

    #[test]
    fn monotonic_rollout_membership() {
        let low = spec_with_conditional(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: 1,
                rule_id: "beta".to_string(),
            }],
        );
        let high = spec_with_conditional(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: 100,
                rule_id: "beta".to_string(),
            }],
        );
        let ctx = RequestContext {
            user_id: Some("user055".to_string()),
            ..Default::default()
        };
        let loader = ConditionalLoader::new();
        let low_loaded = !loader.load(&low, &ctx).is_empty();
        let high_loaded = !loader.load(&high, &ctx).is_empty();
        assert!(high_loaded);
        if low_loaded {
            assert!(high_loaded);
        }
    }

    #[test]
    fn feature_flag_context_overrides_spec() {
        let mut spec = spec_with_conditional(
            "gated",
            vec![LoadCondition::FeatureFlag {
                flag_name: "new_ui".to_string(),
                expected_value: true,
            }],
        );
        spec.feature_flags.insert("new_ui".to_string(), false);
        let mut ctx = RequestContext::default();
        ctx.feature_flags.insert("new_ui".to_string(), true);
        let loader = ConditionalLoader::new();
        assert_eq!(loader.load(&spec, &ctx).len(), 1);
    }

    #[test]
    fn custom_condition_uses_primitive_operator_semantics() {
        let spec = spec_with_conditional(
            "gated",
            vec![LoadCondition::Custom {
                key: "tier".to_string(),
                operator: Operator::Eq,
                value: json!("gold"),
            }],
        );
        let mut ctx = RequestContext::default();
        ctx.custom_context.insert("tier".to_string(), json!("gold"));
        let loader = ConditionalLoader::new();
        assert_eq!(loader.load(&spec, &ctx).len(), 1);
    }

    #[test]
    fn cache_reuses_identical_contexts() {
        let spec = spec_with_conditional(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: 100,
                rule_id: "beta".to_string(),
            }],
        );
        let ctx = RequestContext {
            user_id: Some("user055".to_string()),
            ..Default::default()
        };
        let loader = ConditionalLoader::new();
        let first = loader.load(&spec, &ctx);
        let second = loader.load(&spec, &ctx);
        assert_eq!(first.len(), second.len());
        assert_eq!(loader.cache.len(), 1);
    }
}
