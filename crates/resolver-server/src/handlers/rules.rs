//! Diagnostic/administrative rule-composition endpoints: exercise the
//! composer and condition evaluator directly, outside of a full resolve.

use std::collections::HashMap;

use axum::response::Json;
use resolver_core::composer;
use resolver_core::condition;
use resolver_core::error::Error;
use resolver_core::model::{
    PartialRule, PrimitiveCondition, RequestContext, ResolutionStrategy, Rule,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::handlers::ServerResult;

/// Body for `POST /rules/compose`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeRequest {
    pub sources: Vec<Rule>,
    pub new_id: String,
    #[serde(default)]
    pub strategy: ResolutionStrategy,
}

/// `POST /rules/compose` — exercises `composeRules` directly.
pub async fn compose_rules(Json(request): Json<ComposeRequest>) -> ServerResult<Json<Rule>> {
    let composed = composer::compose_rules(&request.sources, &request.new_id, request.strategy)
        .map_err(Error::Composition)?;
    Ok(Json(composed))
}

/// Body for `POST /rules/from-template`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FromTemplateRequest {
    pub templates: HashMap<String, PartialRule>,
    pub template_id: String,
    pub overrides: PartialRule,
}

/// `POST /rules/from-template` — exercises `createFromTemplate` directly.
pub async fn from_template(Json(request): Json<FromTemplateRequest>) -> ServerResult<Json<Rule>> {
    let rule = composer::create_from_template(&request.templates, &request.template_id, &request.overrides)
        .map_err(Error::Composition)?;
    Ok(Json(rule))
}

/// Body for `POST /rules/test-conditions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConditionsRequest {
    pub conditions: Vec<PrimitiveCondition>,
    pub context: RequestContext,
}

/// Per-condition diagnostic result.
#[derive(Debug, Serialize)]
struct ConditionOutcome {
    index: usize,
    matched: bool,
}

/// `POST /rules/test-conditions` — exercises condition evaluation outside
/// of a full resolution, for authoring/debugging rule conditions.
pub async fn test_conditions(Json(request): Json<TestConditionsRequest>) -> ServerResult<Json<JsonValue>> {
    let outcomes: Vec<ConditionOutcome> = request
        .conditions
        .iter()
        .enumerate()
        .map(|(index, condition)| ConditionOutcome {
            index,
            matched: condition::evaluate(condition, &request.context),
        })
        .collect();

    let all_matched = outcomes.iter().all(|o| o.matched);

    Ok(Json(json!({
        "allMatched": all_matched,
        "conditions": outcomes,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_request_accepts_camel_case_body() {
        let body = r#"{
            "sources": [],
            "newId": "combined",
            "strategy": "override"
        }"#;
        let request: ComposeRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.new_id, "combined");
        assert!(matches!(request.strategy, ResolutionStrategy::Override));
    }

    #[test]
    fn from_template_request_requires_template_id() {
        let body = r#"{
            "templates": {},
            "templateId": "base",
            "overrides": {"id": "rule-1"}
        }"#;
        let request: FromTemplateRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.template_id, "base");
        assert_eq!(request.overrides.id.as_deref(), Some("rule-1"));
    }
}
