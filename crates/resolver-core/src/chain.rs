//! Chain Evaluator: recursively evaluate boolean rule chains.
//!
//! A chain item that names a rule id is resolved to that rule's *basic*
//! evaluation only (enabled && all primitive conditions match) — it
//! deliberately does not re-apply dependencies/exclusions/chain, which
//! would otherwise allow infinite recursion between a rule's `chain` and
//! the chains of the rules it references.

use std::collections::HashMap;

use crate::condition;
use crate::model::{ChainItem, ChainOperator, Rule, RuleChain};

/// Basic evaluation of a rule: enabled and all primitive conditions match.
#[must_use]
pub fn basic_eval(rule: &Rule, ctx: &crate::model::RequestContext) -> bool {
    rule.enabled && rule.conditions.iter().all(|c| condition::evaluate(c, ctx))
}

/// Evaluate a [`RuleChain`] against a rule registry and request context.
/// Unknown operators and unknown rule ids degrade to `false`.
#[must_use]
pub fn evaluate(
    chain: &RuleChain,
    registry: &HashMap<String, Rule>,
    ctx: &crate::model::RequestContext,
) -> bool {
    let results: Vec<bool> = chain
        .rules
        .iter()
        .map(|item| evaluate_item(item, registry, ctx))
        .collect();

    match chain.operator {
        ChainOperator::And => results.iter().all(|&b| b),
        ChainOperator::Or => results.iter().any(|&b| b),
        ChainOperator::Not => results.first().is_some_and(|&b| !b),
        ChainOperator::Xor => results.iter().filter(|&&b| b).count() == 1,
        ChainOperator::Unknown => false,
    }
}

fn evaluate_item(
    item: &ChainItem,
    registry: &HashMap<String, Rule>,
    ctx: &crate::model::RequestContext,
) -> bool {
    match item {
        ChainItem::RuleId(id) => registry
            .get(id)
            .is_some_and(|rule| basic_eval(rule, ctx)),
        ChainItem::Chain(nested) => evaluate(nested, registry, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConditionType, Operator, PrimitiveCondition, RequestContext};
    use serde_json::json;

    fn os_rule(id: &str, os: &str) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            priority: 0,
            conditions: vec![PrimitiveCondition {
                kind: ConditionType::Os,
                operator: Operator::Eq,
                value: json!(os),
            }],
            config: json!({}),
            resolution_strategy: Default::default(),
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

    fn registry() -> HashMap<String, Rule> {
        let mut m = HashMap::new();
        m.insert("iosRule".to_string(), os_rule("iosRule", "iOS"));
        m.insert("androidRule".to_string(), os_rule("androidRule", "Android"));
        m
    }

    #[test]
    fn xor_true_when_exactly_one_matches() {
        let ctx = RequestContext {
            os: Some("iOS".to_string()),
            ..Default::default()
        };
        let chain = RuleChain {
            operator: ChainOperator::Xor,
            rules: vec![
                ChainItem::RuleId("iosRule".to_string()),
                ChainItem::RuleId("androidRule".to_string()),
            ],
        };
        assert!(evaluate(&chain, &registry(), &ctx));
    }

    #[test]
    fn xor_false_when_both_match() {
        // Contrive a context where both conditions are vacuously true by
        // using empty-condition rules instead.
        let mut reg = registry();
        reg.get_mut("androidRule").unwrap().conditions.clear();
        reg.get_mut("iosRule").unwrap().conditions.clear();
        let ctx = RequestContext::default();
        let chain = RuleChain {
            operator: ChainOperator::Xor,
            rules: vec![
                ChainItem::RuleId("iosRule".to_string()),
                ChainItem::RuleId("androidRule".to_string()),
            ],
        };
        assert!(!evaluate(&chain, &reg, &ctx));
    }

    #[test]
    fn unknown_rule_id_is_false() {
        let chain = RuleChain {
            operator: ChainOperator::Or,
            rules: vec![ChainItem::RuleId("missing".to_string())],
        };
        assert!(!evaluate(&chain, &registry(), &RequestContext::default()));
    }

    #[test]
    fn not_negates_first_item_only() {
        let ctx = RequestContext {
            os: Some("iOS".to_string()),
            ..Default::default()
        };
        let chain = RuleChain {
            operator: ChainOperator::Not,
            rules: vec![ChainItem::RuleId("iosRule".to_string())],
        };
        assert!(!evaluate(&chain, &registry(), &ctx));
    }

    #[test]
    fn unrecognized_chain_operator_deserializes_to_unknown() {
        let operator: ChainOperator = serde_json::from_value(json!("NAND")).unwrap();
        assert_eq!(operator, ChainOperator::Unknown);
    }

    #[test]
    fn unknown_chain_operator_never_matches() {
        let ctx = RequestContext {
            os: Some("iOS".to_string()),
            ..Default::default()
        };
        let chain = RuleChain {
            operator: ChainOperator::Unknown,
            rules: vec![ChainItem::RuleId("iosRule".to_string())],
        };
        assert!(!evaluate(&chain, &registry(), &ctx));
    }
}
