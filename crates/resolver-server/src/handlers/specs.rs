//! Specification CRUD: `GET/POST /config`, `PUT/DELETE
//! /config/{appId}/{version}`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use resolver_core::error::Error;
use resolver_core::model::{
    ConditionalRule, Environment, PartialRule, Rule, Schema, Specification,
};
use resolver_core::schema;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::handlers::ServerResult;
use crate::server::AppState;

/// Body accepted by create/replace. Unlike [`Specification`], `id`,
/// `createdAt`, and `updatedAt` are server-assigned.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecPayload {
    pub app_id: String,
    pub version: String,
    #[serde(default)]
    pub schema: Schema,
    pub default_config: JsonValue,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
    #[serde(default)]
    pub rule_templates: HashMap<String, PartialRule>,
    pub environment: Environment,
    #[serde(default)]
    pub feature_flags: HashMap<String, bool>,
    #[serde(default)]
    pub rollout_percentages: HashMap<String, u8>,
}

/// `GET /config` — summary listing of every stored specification.
pub async fn list_specs(State(app_state): State<AppState>) -> ServerResult<Json<JsonValue>> {
    let specs = app_state.store.list().await;
    let summaries: Vec<JsonValue> = specs
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "appId": s.app_id,
                "version": s.version,
                "environment": s.environment,
                "ruleCount": s.rules.len(),
                "updatedAt": s.updated_at.to_rfc3339(),
            })
        })
        .collect();
    Ok(Json(json!({ "specifications": summaries })))
}

/// `POST /config` — create a specification. `defaultConfig` is validated
/// against `schema`; failure is a 400 with the accumulated errors.
pub async fn create_spec(
    State(app_state): State<AppState>,
    Json(payload): Json<SpecPayload>,
) -> ServerResult<(StatusCode, Json<Specification>)> {
    let validation = schema::validate(&payload.default_config, &payload.schema);
    if !validation.valid {
        return Err(Error::ValidationFailed { errors: validation.errors }.into());
    }

    let now = Utc::now();
    let spec = Specification {
        id: Uuid::new_v4().to_string(),
        app_id: payload.app_id,
        version: payload.version,
        schema: payload.schema,
        default_config: payload.default_config,
        rules: payload.rules,
        conditional_rules: payload.conditional_rules,
        rule_templates: payload.rule_templates,
        environment: payload.environment,
        feature_flags: payload.feature_flags,
        rollout_percentages: payload.rollout_percentages,
        created_at: now,
        updated_at: now,
    };

    info!(app_id = %spec.app_id, version = %spec.version, "creating specification");
    let saved = app_state.store.save(spec).await;
    app_state.persistence.save(&saved).await?;

    Ok((StatusCode::CREATED, Json(saved)))
}

/// `PUT /config/{appId}/{version}` — full replace. `id` and `createdAt`
/// survive from the existing record.
pub async fn replace_spec(
    State(app_state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
    Json(payload): Json<SpecPayload>,
) -> ServerResult<Json<Specification>> {
    let existing = app_state.store.get(&app_id, &version).await?;

    let validation = schema::validate(&payload.default_config, &payload.schema);
    if !validation.valid {
        return Err(Error::ValidationFailed { errors: validation.errors }.into());
    }

    let spec = Specification {
        id: existing.id,
        app_id,
        version,
        schema: payload.schema,
        default_config: payload.default_config,
        rules: payload.rules,
        conditional_rules: payload.conditional_rules,
        rule_templates: payload.rule_templates,
        environment: payload.environment,
        feature_flags: payload.feature_flags,
        rollout_percentages: payload.rollout_percentages,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    };

    let saved = app_state.store.save(spec).await;
    app_state.persistence.save(&saved).await?;

    Ok(Json(saved))
}

/// `DELETE /config/{appId}/{version}`.
pub async fn delete_spec(
    State(app_state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    if app_state.store.delete(&app_id, &version).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::not_found(app_id, version).into())
    }
}
