//! REST API server for CashFlow OS
//!
//! Auth, transaction records, summaries/dashboard and the CFO chat.
//! Every response uses the [`ApiResponse`] envelope.

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequestParts, Path, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advisor::Advisor;
use crate::auth::{AuthService, LoginRequest, SignupRequest};
use crate::config::AppConfig;
use crate::dashboard::{build_dashboard, DEFAULT_TREND_MONTHS};
use crate::error::CashflowError;
use crate::gemini::GeminiClient;
use crate::models::{PublicUser, RecordDraft, RiskTier};
use crate::risk::RiskLadder;
use crate::store::{ChatLog, JsonStore, RecordStore};
use crate::summary::{compute_summary, empty_summary};

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error side of every handler
pub struct ApiError(CashflowError);

impl From<CashflowError> for ApiError {
    fn from(e: CashflowError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CashflowError::InvalidInput(_) | CashflowError::Conflict(_) => StatusCode::BAD_REQUEST,
            CashflowError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CashflowError::NotFound(_) => StatusCode::NOT_FOUND,
            CashflowError::GenerationError(_) | CashflowError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // client errors carry their own message; internal ones stay generic
        let message = match &self.0 {
            CashflowError::InvalidInput(m)
            | CashflowError::Conflict(m)
            | CashflowError::Unauthorized(m)
            | CashflowError::NotFound(m) => m.clone(),
            other => {
                warn!("Request failed: {}", other);
                "Internal server error".to_string()
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

type ApiResult = std::result::Result<Json<ApiResponse>, ApiError>;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<JsonStore>,
    pub auth: Arc<AuthService>,
    pub advisor: Arc<Advisor>,
}

impl ApiState {
    /// Wire store, auth and advisor from configuration
    pub async fn from_config(config: &AppConfig) -> crate::Result<Self> {
        let store = Arc::new(JsonStore::open(&config.data_path).await?);
        let ladder = RiskLadder::from_preset(config.risk_ladder);

        let mut advisor = Advisor::new(store.clone(), store.clone(), ladder);
        match &config.gemini_api_key {
            Some(key) => {
                match GeminiClient::new(key.clone(), &config.gemini_model, config.gemini_timeout) {
                    Ok(client) => {
                        advisor = advisor.with_generator(Arc::new(client), config.gemini_timeout);
                        info!(model = %config.gemini_model, "Gemini text generation enabled");
                    }
                    Err(e) => warn!("Gemini client unavailable, using rule-based answers: {}", e),
                }
            }
            None => info!("GEMINI_API_KEY not set, CFO chat uses rule-based answers"),
        }

        let auth = AuthService::new(store.clone())
            .with_demo_data(config.seed_demo_data)
            .with_hash_cost(config.password_hash_cost)
            .with_session_ttl(config.session_ttl);

        Ok(Self {
            store,
            auth: Arc::new(auth),
            advisor: Arc::new(advisor),
        })
    }

}

/// =============================
/// Authentication Extractor
/// =============================

/// Caller resolved from an `Authorization: Bearer <token>` header
pub struct AuthUser(pub PublicUser);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            CashflowError::Unauthorized("Missing bearer token".to_string())
        })?;

        let user = state.auth.authenticate(token).await?;
        Ok(AuthUser(user))
    }
}

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub months: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SummaryView {
    summary: crate::models::FinancialSummary,
    risk_tier: RiskTier,
    risk_label: String,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Auth Endpoints
/// =============================

async fn signup(State(state): State<ApiState>, Json(req): Json<SignupRequest>) -> ApiResult {
    let response = state.auth.signup(req).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn login(State(state): State<ApiState>, Json(req): Json<LoginRequest>) -> ApiResult {
    let response = state.auth.login(req).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// =============================
/// Record Endpoints
/// =============================

async fn list_records(State(state): State<ApiState>, AuthUser(user): AuthUser) -> ApiResult {
    let records = state.store.list(user.id).await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn add_record(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Json(draft): Json<RecordDraft>,
) -> ApiResult {
    let record = state.store.add(user.id, draft, Utc::now()).await?;
    info!(record_id = %record.id, user_id = %user.id, "Record added");
    Ok(Json(ApiResponse::success(record)))
}

async fn delete_record(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> ApiResult {
    let record_id = Uuid::parse_str(&id)
        .map_err(|_| CashflowError::NotFound("Record not found".to_string()))?;

    state.store.delete(user.id, record_id).await?;
    info!(record_id = %record_id, user_id = %user.id, "Record deleted");
    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Record deleted"
    }))))
}

/// Summary for the caller; anonymous callers get a zeroed summary
async fn summary(State(state): State<ApiState>, user: Option<AuthUser>) -> ApiResult {
    let now = Utc::now();
    let summary = match user {
        Some(AuthUser(user)) => compute_summary(&state.store.list(user.id).await?, now),
        None => empty_summary(now),
    };

    let rung = state.advisor.ladder().assess(&summary);
    let view = SummaryView {
        risk_tier: rung.tier,
        risk_label: rung.label.clone(),
        summary,
    };

    Ok(Json(ApiResponse::success(view)))
}

async fn dashboard(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Query(query): Query<DashboardQuery>,
) -> ApiResult {
    let records = state.store.list(user.id).await?;
    let view = build_dashboard(
        &records,
        query.months.unwrap_or(DEFAULT_TREND_MONTHS),
        Utc::now(),
        state.advisor.ladder(),
    );
    Ok(Json(ApiResponse::success(view)))
}

/// =============================
/// CFO Chat Endpoints
/// =============================

/// Always answers 200, even for malformed or oversized bodies
async fn chat(
    State(state): State<ApiState>,
    user: Option<AuthUser>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let req = match body {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!("Unreadable chat body, answering with an empty message: {}", e);
            ChatRequest::default()
        }),
        Err(rejection) => {
            warn!(status = %rejection.status(), "Chat body rejected, answering with an empty message: {}", rejection);
            ChatRequest::default()
        }
    };

    let owner = user.map(|AuthUser(u)| u);
    let reply = state
        .advisor
        .respond(owner.as_ref(), &req.message, Utc::now())
        .await;

    (StatusCode::OK, Json(ApiResponse::success(reply)))
}

async fn chat_history(State(state): State<ApiState>, AuthUser(user): AuthUser) -> Json<ApiResponse> {
    let history = state.store.history(user.id).await.unwrap_or_else(|e| {
        warn!(user_id = %user.id, "Failed to load chat history: {}", e);
        Vec::new()
    });
    Json(ApiResponse::success(history))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/financials", get(list_records).post(add_record))
        .route("/api/financials/summary", get(summary))
        .route("/api/financials/dashboard", get(dashboard))
        .route("/api/financials/:id", delete(delete_record))
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/history", get(chat_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
