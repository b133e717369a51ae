//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/agent/query` | Answer a question (`{query, history?}` → `{answer}`) |
//! | `POST` | `/api/agent/cache/rebuild` | Force an embedding cache rebuild |
//! | `GET`  | `/api/health` | Local health checks; never calls the model |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "A propriedade \"query\" é obrigatória no corpo da requisição." } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).
//!
//! A question that fails inside the agent is still a `200`: the agent
//! turns failures into answers. `500` only covers a crashed request task.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser chat
//! client can be served from anywhere.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

use agromark_core::ConversationTurn;

use crate::app::App;
use crate::config::Config;
use crate::llm::credentials_present;

pub const MISSING_QUERY_MESSAGE: &str =
    "A propriedade \"query\" é obrigatória no corpo da requisição.";
pub const QUERY_FAILED_MESSAGE: &str = "Falha ao processar a sua pergunta.";

/// Build the app from `config` and serve on `[server].bind` until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let app = App::from_config(config).await?;
    serve(app).await
}

/// Serve an already-built [`App`] on its configured bind address.
pub async fn serve(app: App) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("AgroMark listening on http://{}", bind_addr);

    axum::serve(listener, router(app)).await?;
    Ok(())
}

/// The API routes with CORS applied.
pub fn router(app: App) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/agent/query", post(handle_query))
        .route("/api/agent/cache/rebuild", post(handle_cache_rebuild))
        .route("/api/health", get(handle_health))
        .layer(cors)
        .with_state(app)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ POST /api/agent/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: Option<String>,
    #[serde(default)]
    history: Vec<ConversationTurn>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

async fn handle_query(
    State(app): State<App>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected query body");
        bad_request(MISSING_QUERY_MESSAGE)
    })?;

    let query = match request.query {
        Some(q) if !q.trim().is_empty() => q,
        _ => return Err(bad_request(MISSING_QUERY_MESSAGE)),
    };

    let span = tracing::info_span!("query", request_id = %Uuid::new_v4());
    let agent = app.agent.clone();
    let history = request.history;
    let task = tokio::spawn(
        async move { agent.answer_query(&query, &history).await }.instrument(span),
    );

    match task.await {
        Ok(answer) => Ok(Json(QueryResponse { answer })),
        Err(e) => {
            tracing::error!(error = %e, "query task failed");
            Err(internal(QUERY_FAILED_MESSAGE))
        }
    }
}

// ============ POST /api/agent/cache/rebuild ============

#[derive(Serialize)]
struct RebuildResponse {
    documents: usize,
    built_at: String,
}

async fn handle_cache_rebuild(State(app): State<App>) -> Result<Json<RebuildResponse>, AppError> {
    let snapshot = app.cache.rebuild(true).await.map_err(|e| {
        tracing::error!(error = %e, "cache rebuild failed");
        internal(e.to_string())
    })?;

    Ok(Json(RebuildResponse {
        documents: snapshot.len(),
        built_at: snapshot.built_at().to_rfc3339(),
    }))
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
    services: HealthServices,
}

#[derive(Serialize)]
struct HealthServices {
    database: String,
    llm: String,
}

/// `503` when the database is unreachable; a missing model credential
/// only degrades the status.
async fn handle_health(State(app): State<App>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = app.store.ping().await;
    let llm = if !app.config.llm.is_enabled() {
        "disabled"
    } else if credentials_present(&app.config.llm) {
        "configured"
    } else {
        "missing_credentials"
    };

    let status = match (database_ok, llm) {
        (false, _) => "error",
        (true, "configured") => "ok",
        (true, _) => "degraded",
    };
    let code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            services: HealthServices {
                database: if database_ok { "ok" } else { "error" }.to_string(),
                llm: llm.to_string(),
            },
        }),
    )
}
