//! Resolver orchestrator: composer → loader → sort → evaluate → merge →
//! validate.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value as Json;

use crate::composer;
use crate::error::Result;
use crate::evaluator::{self, EvaluationCache};
use crate::loader::ConditionalLoader;
use crate::merge;
use crate::model::{RequestContext, Rule, Specification};
use crate::schema::{self, ValidationResult};
use crate::topo;

/// One matched rule, as surfaced in the resolution response.
#[derive(Debug, Clone, Serialize)]
pub struct MatchedRuleSummary {
    /// Rule id.
    pub id: String,
    /// Rule name.
    pub name: String,
    /// Rule priority at evaluation time.
    pub priority: i32,
}

/// Full result of resolving a specification against a request context.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    /// The composed effective configuration document.
    pub config: Json,
    /// Matched rules, in match (fold) order.
    pub matched_rules: Vec<MatchedRuleSummary>,
    /// Schema validation findings for `config`. Invalid does not suppress
    /// the response.
    pub validation: ValidationResult,
}

/// Resolve `spec` against `ctx`: a pure, deterministic function of its
/// inputs, aside from `loader`'s cross-request cache, which is keyed so
/// identical contexts always produce identical output.
pub fn resolve(
    spec: &Specification,
    ctx: &RequestContext,
    loader: &ConditionalLoader,
) -> Result<ResolveOutcome> {
    let source_rules: HashMap<String, Rule> = spec
        .rules
        .iter()
        .map(|r| (r.id.clone(), r.clone()))
        .collect();

    let mut materialized = Vec::with_capacity(spec.rules.len());
    for rule in &spec.rules {
        let composed = composer::process_composition(rule, &source_rules).map_err(|e| {
            crate::error::Error::Internal {
                message: format!("composition failed while resolving rule '{}': {e}", rule.id),
                source: Some(Box::new(e)),
            }
        })?;
        materialized.push(composed);
    }

    let existing_ids: HashSet<String> = materialized.iter().map(|r| r.id.clone()).collect();
    for conditional_rule in loader.load(spec, ctx) {
        if !existing_ids.contains(&conditional_rule.id) {
            materialized.push(conditional_rule);
        }
    }

    let sorted = topo::sort(materialized);
    let registry: HashMap<String, Rule> = sorted.iter().map(|r| (r.id.clone(), r.clone())).collect();

    let mut cache = EvaluationCache::new();
    let mut matched_ids: HashSet<String> = HashSet::new();
    let mut matched_rules: Vec<Rule> = Vec::new();
    let mut matched_summaries: Vec<MatchedRuleSummary> = Vec::new();

    for rule in &sorted {
        let outcome = evaluator::evaluate_rule(rule, ctx, &matched_ids, &registry, &mut cache);
        if outcome.matched {
            matched_ids.insert(rule.id.clone());
            matched_summaries.push(MatchedRuleSummary {
                id: rule.id.clone(),
                name: rule.name.clone(),
                priority: rule.priority,
            });
            matched_rules.push(rule.clone());
            if rule.stop_propagation {
                break;
            }
        }
    }

    let mut config = spec.default_config.clone();
    for rule in &matched_rules {
        config = merge::apply_strategy(rule.resolution_strategy, &config, &rule.config);
    }

    let validation = schema::validate(&config, &spec.schema);

    Ok(ResolveOutcome {
        config,
        matched_rules: matched_summaries,
        validation,
    })
}
