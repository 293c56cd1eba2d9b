// Rent Ledger - REST API (axum)
//
// Thin handlers: decode + validate the body, lock the shared connection,
// call the service, wrap the result in the JSON envelope.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::db;
use crate::entities::{
    NewTenant, PaymentInput, QuoteInput, RentCollection, RentCollectionWithTenant, Tenant,
    TenantUpdate,
};
use crate::error::LedgerError;
use crate::period::{RangePolicy, RentPeriod};
use crate::service;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub range_policy: RangePolicy,
}

impl AppState {
    pub fn new(conn: Connection, range_policy: RangePolicy) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            range_policy,
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> crate::error::Result<T>,
    ) -> Result<T, ApiError> {
        let conn = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
        f(&*conn).map_err(ApiError::from)
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

impl ApiResponse<()> {
    fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: Some(message.to_string()),
        }
    }

    fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            message: None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(err) => {
                let status = match &err {
                    LedgerError::TenantNotFound | LedgerError::RentCollectionNotFound => {
                        StatusCode::NOT_FOUND
                    }
                    LedgerError::InvalidDateRange { .. }
                    | LedgerError::InvalidDate(_)
                    | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                    LedgerError::DuplicateReceiptNumber(_)
                    | LedgerError::DuplicateSerialNumber(_) => StatusCode::CONFLICT,
                    LedgerError::Database(_)
                    | LedgerError::Serialization(_)
                    | LedgerError::Csv(_) => {
                        error!(error = %err, "request failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn respond<T>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((status, Json(ApiResponse::ok(data))))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/tenants - All tenants by serial number
async fn list_tenants(State(state): State<AppState>) -> ApiResult<Vec<Tenant>> {
    let tenants = state.with_conn(db::list_tenants)?;
    respond(StatusCode::OK, tenants)
}

/// POST /api/tenants - Register a tenant
async fn create_tenant(
    State(state): State<AppState>,
    body: Result<Json<NewTenant>, JsonRejection>,
) -> ApiResult<Tenant> {
    let Json(input) = body?;
    let tenant = state.with_conn(|conn| service::register_tenant(conn, input))?;
    respond(StatusCode::CREATED, tenant)
}

/// GET /api/tenants/next-sr-no - Suggested serial number for a new tenant
async fn next_serial_number(State(state): State<AppState>) -> ApiResult<i64> {
    let next = state.with_conn(db::next_serial_number)?;
    respond(StatusCode::OK, next)
}

/// GET /api/tenants/:id - One tenant with history
async fn get_tenant(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Tenant> {
    let tenant = state.with_conn(|conn| service::get_tenant(conn, &id))?;
    respond(StatusCode::OK, tenant)
}

/// PUT /api/tenants/:id - Update allow-listed fields, recording history
async fn update_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TenantUpdate>, JsonRejection>,
) -> ApiResult<Tenant> {
    let Json(update) = body?;
    let tenant = state.with_conn(|conn| service::update_tenant(conn, &id, update))?;
    respond(StatusCode::OK, tenant)
}

/// DELETE /api/tenants/:id - Answers `{ "success": true, "data": {} }`
async fn delete_tenant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    state.with_conn(|conn| service::remove_tenant(conn, &id))?;
    respond(StatusCode::OK, json!({}))
}

/// GET /api/rent - Every collection with its tenant, newest first
async fn list_rent(State(state): State<AppState>) -> ApiResult<Vec<RentCollectionWithTenant>> {
    let collections = state.with_conn(db::list_rent_collections)?;
    respond(StatusCode::OK, collections)
}

/// POST /api/rent - Record a payment
async fn create_rent(
    State(state): State<AppState>,
    body: Result<Json<PaymentInput>, JsonRejection>,
) -> ApiResult<RentCollection> {
    let Json(input) = body?;
    let policy = state.range_policy;
    let collection = state.with_conn(|conn| service::record_payment(conn, input, policy))?;
    respond(StatusCode::CREATED, collection)
}

/// POST /api/rent/quote - Months and total for a prospective payment
async fn quote_rent(
    State(state): State<AppState>,
    body: Result<Json<QuoteInput>, JsonRejection>,
) -> ApiResult<RentPeriod> {
    let Json(input) = body?;
    let policy = state.range_policy;
    let period = state.with_conn(|conn| service::quote_payment(conn, &input, policy))?;
    respond(StatusCode::OK, period)
}

/// GET /api/rent/:tenant_id - A tenant's collections, newest first
async fn tenant_rent(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Vec<RentCollection>> {
    let collections =
        state.with_conn(|conn| db::find_rent_collections_by_tenant(conn, &tenant_id))?;

    if collections.is_empty() {
        return Err(ApiError::NotFound(
            "No rent collections found for this tenant.".to_string(),
        ));
    }

    respond(StatusCode::OK, collections)
}

/// DELETE /api/rent/:id
async fn delete_rent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.with_conn(|conn| service::remove_payment(conn, &id))?;
    Ok(Json(ApiResponse::message("Rent collection deleted successfully.")))
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/next-sr-no", get(next_serial_number))
        .route(
            "/tenants/:id",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
        .route("/rent", get(list_rent).post(create_rent))
        .route("/rent/quote", post(quote_rent))
        .route("/rent/:id", get(tenant_rent).delete(delete_rent))
        .with_state(state)
}

/// Full application: API under /api, the browser UI at /
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes(state))
        .nest_service("/static", ServeDir::new("web"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
