//! The one wire-level contract the core enforces: `GET
//! /config/{appId}/{version}`.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::Utc;
use resolver_core::model::{ClientProvidedGeo, Environment, RequestContext};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::handlers::ServerResult;
use crate::server::AppState;

/// Query parameters accepted by the resolution endpoint.
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    env: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    country: Option<String>,
    region: Option<String>,
    /// JSON-encoded `{flagName: bool}` mapping.
    flags: Option<String>,
    /// JSON-encoded arbitrary mapping.
    context: Option<String>,
}

/// `GET /config/{appId}/{version}` — resolve the effective configuration
/// for a request context. Malformed `flags` or `context` query parameters
/// are recovered as absent rather than surfaced as an error.
pub async fn resolve_config(
    State(app_state): State<AppState>,
    Path((app_id, version)): Path<(String, String)>,
    Query(query): Query<ResolveQuery>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> ServerResult<Json<JsonValue>> {
    debug!(%app_id, %version, "resolving configuration");

    let spec = app_state.store.get(&app_id, &version).await?;

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let parsed_ua = app_state.ua_parser.parse(&user_agent);

    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string());
    let geo = app_state.geo_resolver.resolve(&ip).await;

    let environment = query.env.as_deref().and_then(parse_environment);
    let feature_flags = query
        .flags
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(error = %e, "malformed flags query parameter, treating as absent");
            Default::default()
        }))
        .unwrap_or_default();
    let custom_context = query
        .context
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(error = %e, "malformed context query parameter, treating as absent");
            Default::default()
        }))
        .unwrap_or_default();

    let client_provided_geo = if query.country.is_some() || query.region.is_some() {
        Some(ClientProvidedGeo {
            country: query.country.clone(),
            region: query.region.clone(),
        })
    } else {
        None
    };

    let ctx = RequestContext {
        user_agent,
        parsed_ua,
        app_version: version.clone(),
        os: None,
        device: None,
        geo_country: geo.as_ref().and_then(|g| g.country.clone()),
        geo_region: geo.as_ref().and_then(|g| g.region.clone()),
        client_provided_geo,
        timestamp: Utc::now().timestamp_millis(),
        environment,
        feature_flags,
        user_id: query.user_id.clone(),
        custom_context,
    };

    let outcome = resolver_core::resolver::resolve(&spec, &ctx, &app_state.loader)?;

    Ok(Json(json!({
        "appId": app_id,
        "version": version,
        "config": outcome.config,
        "matchedRules": outcome.matched_rules,
        "validation": outcome.validation,
        "context": {
            "os": ctx.effective_os(),
            "device": ctx.effective_device(),
            "geoCountry": ctx.effective_geo_country(),
            "geoRegion": ctx.effective_geo_region(),
        }
    })))
}

fn parse_environment(raw: &str) -> Option<Environment> {
    match raw {
        "development" => Some(Environment::Development),
        "staging" => Some(Environment::Staging),
        "production" => Some(Environment::Production),
        _ => None,
    }
}
