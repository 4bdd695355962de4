//! Rule Evaluator: per-rule match decision with short-circuit
//! precedence over disabled/excluded/dependency/chain/condition checks.

use std::collections::{HashMap, HashSet};

use crate::chain;
use crate::condition;
use crate::model::{RequestContext, Rule};

/// Outcome of evaluating one rule against a request and the set of rules
/// that have already matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationOutcome {
    /// Whether the rule matched.
    pub matched: bool,
    /// Rule id this outcome is for.
    pub rule_id: String,
    /// Human-readable reason, matching the short-circuit precedence order.
    pub reason: &'static str,
}

/// Per-request memoization cache for basic condition evaluation, keyed by
/// rule id. Must be constructed fresh per request — never shared across
/// requests.
#[derive(Default)]
pub struct EvaluationCache {
    basic: HashMap<String, bool>,
}

impl EvaluationCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn basic_eval(&mut self, rule: &Rule, ctx: &RequestContext) -> bool {
        if let Some(&cached) = self.basic.get(&rule.id) {
            return cached;
        }
        let result = rule.enabled && rule.conditions.iter().all(|c| condition::evaluate(c, ctx));
        self.basic.insert(rule.id.clone(), result);
        result
    }
}

/// Evaluate one rule in order, given the rules matched so far and a
/// registry of all rules in the evaluation set (used to resolve `chain`
/// references). Precedence (first failure wins): disabled, excluded,
/// missing dependencies, failing chain, then conditions.
pub fn evaluate_rule(
    rule: &Rule,
    ctx: &RequestContext,
    matched_ids: &HashSet<String>,
    registry: &HashMap<String, Rule>,
    cache: &mut EvaluationCache,
) -> EvaluationOutcome {
    let outcome = |matched: bool, reason: &'static str| EvaluationOutcome {
        matched,
        rule_id: rule.id.clone(),
        reason,
    };

    if !rule.enabled {
        return outcome(false, "Rule disabled");
    }

    if rule.exclusions.iter().any(|id| matched_ids.contains(id)) {
        return outcome(false, "Excluded by another rule");
    }

    if rule
        .dependencies
        .iter()
        .any(|id| !matched_ids.contains(id))
    {
        return outcome(false, "Missing dependencies");
    }

    if let Some(rule_chain) = &rule.chain {
        if !chain::evaluate(rule_chain, registry, ctx) {
            return outcome(false, "Chain evaluation failed");
        }
    }

    if cache.basic_eval(rule, ctx) {
        outcome(true, "All conditions met")
    } else {
        outcome(false, "Conditions not met")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResolutionStrategy;
    use serde_json::json;

    fn rule(id: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            priority: 0,
            conditions: vec![],
            config: json!({}),
            resolution_strategy: ResolutionStrategy::Merge,
            enabled: true,
            dependencies: vec![],
            exclusions: vec![],
            chain: None,
            execute_after: vec![],
            execute_before: vec![],
            stop_propagation: false,
            composition: None,
            tags: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn disabled_short_circuits_first() {
        let mut r = rule("x");
        r.enabled = false;
        let mut cache = EvaluationCache::new();
        let outcome = evaluate_rule(
            &r,
            &RequestContext::default(),
            &HashSet::new(),
            &HashMap::new(),
            &mut cache,
        );
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "Rule disabled");
    }

    #[test]
    fn exclusion_blocks_match() {
        let mut r = rule("x");
        r.exclusions = vec!["y".to_string()];
        let mut matched = HashSet::new();
        matched.insert("y".to_string());
        let mut cache = EvaluationCache::new();
        let outcome = evaluate_rule(
            &r,
            &RequestContext::default(),
            &matched,
            &HashMap::new(),
            &mut cache,
        );
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "Excluded by another rule");
    }

    #[test]
    fn missing_dependency_blocks_match() {
        let mut r = rule("x");
        r.dependencies = vec!["y".to_string()];
        let mut cache = EvaluationCache::new();
        let outcome = evaluate_rule(
            &r,
            &RequestContext::default(),
            &HashSet::new(),
            &HashMap::new(),
            &mut cache,
        );
        assert!(!outcome.matched);
        assert_eq!(outcome.reason, "Missing dependencies");
    }

    #[test]
    fn empty_conditions_matches_when_enabled() {
        let r = rule("x");
        let mut cache = EvaluationCache::new();
        let outcome = evaluate_rule(
            &r,
            &RequestContext::default(),
            &HashSet::new(),
            &HashMap::new(),
            &mut cache,
        );
        assert!(outcome.matched);
        assert_eq!(outcome.reason, "All conditions met");
    }
}
