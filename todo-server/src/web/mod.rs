pub mod middleware;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use migration::MigratorTrait;
use sea_orm::Database;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnRequest, TraceLayer};
use tracing::{Level, Span};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::todo::api::{self, ErrorResponse, TodoJson, TodoPayload, TodoState, create_todo_router};
use crate::todo::{DatabaseTodoStore, HealthStats, TodoStore};
use middleware::{CorsHeaders, CorsLayer};

#[derive(OpenApi)]
#[openapi(
    paths(
        ping_handler,
        health_check_handler,
        api::list_todos_handler,
        api::get_todo_handler,
        api::create_todo_handler,
        api::update_todo_handler,
        api::delete_todo_handler,
    ),
    components(schemas(TodoJson, TodoPayload, ErrorResponse, PingResponse)),
    tags(
        (name = "Todos", description = "Todo CRUD endpoints"),
        (name = "Status", description = "Liveness and store health")
    )
)]
pub struct ApiDoc;

/// JSON response for the ping endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let store: Arc<dyn TodoStore> = Arc::new(DatabaseTodoStore::new(db));
    let app = create_app(&config, store.clone())?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Web server stopped, closing the store");
    store.close().await?;
    Ok(())
}

/// Assembles every route and the shared middleware around the given store.
pub fn create_app(config: &Config, store: Arc<dyn TodoStore>) -> anyhow::Result<Router> {
    let cors_headers = CorsHeaders::from_config(config)?;
    let todo_state = TodoState::new(store);

    let mut status_routes = Router::new()
        .route("/ping", get(ping_handler))
        .route("/health", get(health_check_handler))
        .with_state(todo_state.clone());
    if !config.is_production() {
        status_routes = status_routes
            .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let app = Router::new()
        .merge(status_routes)
        .merge(create_todo_router(todo_state))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(make_request_span)
                        .on_request(DefaultOnRequest::new().level(Level::INFO)),
                )
                .layer(CorsLayer::new(cors_headers))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(config.request_timeout_secs),
                )),
        );
    Ok(app)
}

/// Opens the per-request span so every event logged while handling carries
/// the method, path and remote address.
fn make_request_span(request: &Request<Body>) -> Span {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        remote_addr = %remote_addr,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Server is alive", body = PingResponse)),
    tag = "Status"
)]
pub async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store is reachable", body = BTreeMap<String, String>),
        (status = 500, description = "Store is unreachable", body = BTreeMap<String, String>)
    ),
    tag = "Status"
)]
pub async fn health_check_handler(
    State(state): State<TodoState>,
) -> (StatusCode, Json<HealthStats>) {
    let stats = state.store.health().await;
    let status_code = match stats.get("status").map(String::as_str) {
        Some("up") => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status_code, Json(stats))
}
