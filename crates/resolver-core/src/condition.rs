//! Condition Evaluator: evaluate one primitive condition against a
//! request context.

use regex::Regex;
use serde_json::Value as Json;

use crate::model::{ConditionType, Operator, PrimitiveCondition, RequestContext};

/// Extract the context value a [`ConditionType`] reads.
fn extract(kind: ConditionType, ctx: &RequestContext) -> Option<Json> {
    match kind {
        ConditionType::AppVersion => Some(Json::String(ctx.app_version.clone())),
        ConditionType::Os => ctx.effective_os().map(|s| Json::String(s.to_string())),
        ConditionType::Device => ctx
            .effective_device()
            .map(|s| Json::String(s.to_string())),
        ConditionType::GeoCountry => ctx
            .effective_geo_country()
            .map(|s| Json::String(s.to_string())),
        ConditionType::GeoRegion => ctx
            .effective_geo_region()
            .map(|s| Json::String(s.to_string())),
        ConditionType::TimeAfter | ConditionType::TimeBefore => {
            Some(Json::Number(ctx.timestamp.into()))
        }
        ConditionType::UserAgentMatch => Some(Json::String(ctx.user_agent.clone())),
        ConditionType::Unknown => None,
    }
}

/// Evaluate a single primitive condition. Never fails: unknown condition
/// types, unknown operators, missing context values, and regex compile
/// failures all degrade to `false` in place, except that a missing value
/// under `ne` is `true` (strict-inequality semantics).
#[must_use]
pub fn evaluate(condition: &PrimitiveCondition, ctx: &RequestContext) -> bool {
    if matches!(condition.kind, ConditionType::Unknown) {
        return false;
    }
    let extracted = extract(condition.kind, ctx);
    apply_operator(condition.operator, extracted.as_ref(), &condition.value)
}

/// Apply a comparison operator between an extracted value and a literal,
/// using language-default comparison semantics. Shared with the Conditional
/// Loader's `custom` load condition, which compares `customContext` values
/// the same way.
pub(crate) fn apply_operator(operator: Operator, extracted: Option<&Json>, value: &Json) -> bool {
    if matches!(operator, Operator::Unknown) {
        return false;
    }

    let Some(extracted) = extracted else {
        // Missing context value: false for every operator except `ne`.
        return operator == Operator::Ne;
    };

    match operator {
        Operator::Eq => json_eq(extracted, value),
        Operator::Ne => !json_eq(extracted, value),
        Operator::Gt => json_cmp(extracted, value).is_some_and(|o| o.is_gt()),
        Operator::Lt => json_cmp(extracted, value).is_some_and(|o| o.is_lt()),
        Operator::Gte => json_cmp(extracted, value).is_some_and(|o| o.is_ge()),
        Operator::Lte => json_cmp(extracted, value).is_some_and(|o| o.is_le()),
        Operator::In => value
            .as_array()
            .is_some_and(|arr| arr.iter().any(|v| json_eq(v, extracted))),
        Operator::Regex => {
            let Some(pattern) = value.as_str() else {
                return false;
            };
            let Ok(re) = Regex::new(pattern) else {
                return false;
            };
            re.is_match(&json_as_string(extracted))
        }
        Operator::Unknown => false,
    }
}

fn json_eq(a: &Json, b: &Json) -> bool {
    a == b
}

fn json_cmp(a: &Json, b: &Json) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Json::Number(a), Json::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Json::String(a), Json::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn json_as_string(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext {
            app_version: "1.2.0".to_string(),
            os: Some("iOS".to_string()),
            timestamp: 1_700_000_000_000,
            user_agent: "GovUK.App/0.0.2 (iOS 17.0; iPhone)".to_string(),
            ..Default::default()
        }
    }

    fn cond(kind: ConditionType, operator: Operator, value: Json) -> PrimitiveCondition {
        PrimitiveCondition {
            kind,
            operator,
            value,
        }
    }

    #[test]
    fn os_eq_matches() {
        let c = cond(ConditionType::Os, Operator::Eq, json!("iOS"));
        assert!(evaluate(&c, &ctx()));
    }

    #[test]
    fn missing_value_is_false_except_ne() {
        let context = RequestContext::default();
        let eq = cond(ConditionType::Os, Operator::Eq, json!("iOS"));
        let ne = cond(ConditionType::Os, Operator::Ne, json!("iOS"));
        assert!(!evaluate(&eq, &context));
        assert!(evaluate(&ne, &context));
    }

    #[test]
    fn in_requires_array() {
        let c = cond(
            ConditionType::Os,
            Operator::In,
            json!(["Android", "iOS"]),
        );
        assert!(evaluate(&c, &ctx()));
    }

    #[test]
    fn regex_partial_match_on_user_agent() {
        let c = cond(
            ConditionType::UserAgentMatch,
            Operator::Regex,
            json!("iOS \\d+"),
        );
        assert!(evaluate(&c, &ctx()));
    }

    #[test]
    fn unknown_operator_on_bad_regex_is_false() {
        let c = cond(
            ConditionType::UserAgentMatch,
            Operator::Regex,
            json!("(unterminated"),
        );
        assert!(!evaluate(&c, &ctx()));
    }

    #[test]
    fn app_version_gt() {
        let c = cond(ConditionType::AppVersion, Operator::Gt, json!("1.0.0"));
        // String ordering, not semver-aware.
        assert!(evaluate(&c, &ctx()));
    }

    #[test]
    fn unrecognized_condition_type_deserializes_to_unknown() {
        let kind: ConditionType = serde_json::from_value(json!("totally_new_thing")).unwrap();
        assert_eq!(kind, ConditionType::Unknown);
    }

    #[test]
    fn unrecognized_operator_deserializes_to_unknown() {
        let operator: Operator = serde_json::from_value(json!("fuzzy_match")).unwrap();
        assert_eq!(operator, Operator::Unknown);
    }

    #[test]
    fn unknown_condition_type_never_matches() {
        let c = cond(ConditionType::Unknown, Operator::Ne, json!("iOS"));
        assert!(!evaluate(&c, &ctx()));
    }

    #[test]
    fn unknown_operator_never_matches() {
        let c = cond(ConditionType::Os, Operator::Unknown, json!("iOS"));
        assert!(!evaluate(&c, &ctx()));
    }
}
