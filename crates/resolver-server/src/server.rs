//! Axum application wiring: shared state, router, and the TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use resolver_core::config::Config;
use resolver_core::loader::ConditionalLoader;
use resolver_core::prelude::{GeoResolver, SpecificationPersistence, UserAgentParser};
use resolver_core::store::Store;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use crate::error::ServerError;

/// Shared application state, cloned into every handler via `State`.
#[derive(Clone)]
pub struct AppState {
    /// In-memory specification registry.
    pub store: Store,
    /// Conditional-rule cache, shared across requests.
    pub loader: Arc<ConditionalLoader>,
    /// User-agent parsing capability.
    pub ua_parser: Arc<dyn UserAgentParser>,
    /// Geo resolution capability.
    pub geo_resolver: Arc<dyn GeoResolver>,
    /// Specification persistence capability.
    pub persistence: Arc<dyn SpecificationPersistence>,
    /// Active service configuration.
    pub config: Config,
}

/// Build the router with all routes and middleware, loading persisted
/// specifications into `store` before returning.
pub async fn create_app(state: AppState) -> Result<Router, ServerError> {
    let persisted = state
        .persistence
        .load_all()
        .await
        .map_err(ServerError::Core)?;
    for spec in persisted {
        state.store.save(spec).await;
    }

    let router = Router::new()
        .route("/health", axum::routing::get(crate::handlers::health::health_check))
        .route(
            "/config",
            axum::routing::get(crate::handlers::specs::list_specs)
                .post(crate::handlers::specs::create_spec),
        )
        .route(
            "/config/:app_id/:version",
            axum::routing::get(crate::handlers::resolve::resolve_config)
                .put(crate::handlers::specs::replace_spec)
                .delete(crate::handlers::specs::delete_spec),
        )
        .route("/rules/compose", axum::routing::post(crate::handlers::rules::compose_rules))
        .route(
            "/rules/from-template",
            axum::routing::post(crate::handlers::rules::from_template),
        )
        .route(
            "/rules/test-conditions",
            axum::routing::post(crate::handlers::rules::test_conditions),
        )
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            tracing::span!(
                                Level::INFO,
                                "http_request",
                                method = %request.method(),
                                uri = %request.uri(),
                            )
                        })
                        .on_request(|_request: &axum::http::Request<_>, _span: &tracing::Span| {
                            tracing::debug!("request received");
                        })
                        .on_response(
                            |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                                tracing::debug!(status = %response.status(), ?latency, "response sent");
                            },
                        )
                        .on_failure(
                            |error: tower_http::classify::ServerErrorsFailureClass,
                             latency: Duration,
                             _span: &tracing::Span| {
                                tracing::warn!(%error, ?latency, "request failed");
                            },
                        ),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    Ok(router)
}

/// Bind and serve the application until the process is terminated.
pub async fn run(config: Config, state: AppState) -> Result<(), ServerError> {
    let app = create_app(state).await?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServerError::BadRequest(format!("invalid bind address: {e}")))?;

    info!(%addr, "starting resolver-server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Persistence(format!("failed to bind {addr}: {e}")))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServerError::Persistence(format!("server error: {e}")))?;

    Ok(())
}
