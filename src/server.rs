use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json,
};
use chrono::Local;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    conf,
    docs::ApiDoc,
    generator::{self, Entropy},
    types::{ErrorResponse, HealthReport, UsageReport},
};

#[cfg(test)]
mod tests;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug)]
pub struct ApiError(StatusCode, Json<ErrorResponse>);

impl ApiError {
    fn with_details(self, details: String) -> Self {
        let ApiError(status, Json(body)) = self;
        ApiError(
            status,
            Json(ErrorResponse {
                details: Some(details),
                ..body
            }),
        )
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        ApiError(
            status,
            Json(ErrorResponse {
                error: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
                details: None,
            }),
        )
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(status, body) = self;
        (status, body).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub entropy: Entropy,
    pub debug: bool,
}

impl AppState {
    #[must_use]
    pub fn from_conf(conf: &conf::Conf) -> Self {
        Self {
            entropy: Entropy::from_seed(conf.seed),
            debug: conf.debug,
        }
    }
}

#[tracing::instrument(name = "server", skip_all)]
pub async fn run() -> anyhow::Result<()> {
    let conf = conf::global();
    let dir = env::current_dir()?;
    tracing::info!(?dir, ?conf, "Starting.");
    let addr = SocketAddr::from((conf.addr, conf.port));
    let state = AppState::from_conf(&conf);
    let service = router(state)
        .into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to {addr}"))?;
    tracing::info!(?addr, debug = conf.debug, "Listening.");
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn router(state: AppState) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);
    axum::Router::new()
        .route("/api/usage", get(usage_handler))
        .route("/api/health", get(health_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(req_id_layer))
        .with_state(state)
}

#[tracing::instrument(skip_all, fields(req_id = %req_id()))]
#[utoipa::path(
    get,
    path = "/api/usage",
    responses(
        (status = 200, description = "Mock usage for every known user", body = UsageReport),
    )
)]
pub async fn usage_handler(
    State(state): State<AppState>,
    from: Option<ConnectInfo<SocketAddr>>,
) -> Json<UsageReport> {
    let from = from.map(|ConnectInfo(addr)| addr);
    tracing::info!(?from, "Handling usage request.");
    let now = Local::now();
    let mut rng = state.entropy.rng();
    let data = generator::generate(&mut rng, now);
    tracing::debug!(records = data.len(), entropy = ?state.entropy, "Generated.");
    Json(UsageReport::success(data, now.to_rfc3339()))
}

#[tracing::instrument(skip_all, fields(req_id = %req_id()))]
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthReport),
    )
)]
pub async fn health_handler() -> Json<HealthReport> {
    tracing::debug!("Handling health check.");
    Json(HealthReport::healthy())
}

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[tracing::instrument(skip_all, fields(req_id = %req_id()))]
async fn not_found(State(state): State<AppState>, uri: Uri) -> ApiError {
    tracing::warn!(%uri, "No such route.");
    let error = ApiError::from(StatusCode::NOT_FOUND);
    if state.debug {
        error.with_details(format!("No route for {}", uri.path()))
    } else {
        error
    }
}

#[derive(Debug, Clone)]
struct ReqId {
    pub req_id: String,
}

impl ReqId {
    fn new() -> Self {
        let req_id = cuid2::create_id();
        Self { req_id }
    }
}

tokio::task_local! {
    static REQ_ID: ReqId;
}

fn req_id() -> String {
    REQ_ID.try_with(|r| r.req_id.clone()).unwrap_or_default()
}

async fn req_id_layer(req: Request, next: Next) -> Response {
    let id = ReqId::new();
    let header = HeaderValue::from_str(&id.req_id);
    let mut resp = REQ_ID.scope(id, next.run(req)).await;
    match header {
        Ok(value) => {
            resp.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        Err(error) => {
            tracing::warn!(?error, "Request id is not a valid header value.");
        }
    }
    resp
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(?error, "Failed to install Ctrl+C handler.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(error) => {
                tracing::error!(?error, "Failed to install SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Signal received. Shutting down.");
}
