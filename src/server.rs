//! HTTP API server.
//!
//! Exposes the derived booking view, the cart hand-off, and the enquiry
//! handshake as a JSON API for the mobile app and webview clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/ping` | Liveness probe with the API version |
//! | `GET`  | `/meta` | Service name, version, and site URLs |
//! | `GET`  | `/filters` | Enabled filter taxonomies with visible terms |
//! | `GET`  | `/news` | Site news feed |
//! | `GET`  | `/calendar/{calendar_id}` | Snapshot for a calendar (`?start`/`?end` ISO dates) |
//! | `GET`  | `/calendar/{calendar_id}/product` | Product owning a calendar |
//! | `GET`  | `/product/{product_id}/calendar` | Snapshot via product lookup |
//! | `POST` | `/cart/payload` | Verified cart form as JSON |
//! | `GET`  | `/cart/webview` | Cart form in an `ok`/`error` envelope (always 200 on business errors) |
//! | `GET`  | `/cart/bridge` | Self-submitting HTML page posting to the legacy cart |
//! | `POST` | `/enquiry/preview` | Stamp and sign an enquiry without sending |
//! | `POST` | `/enquiry` | Verify, record, and deliver an enquiry |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "slot_unavailable", "message": "...", "detail": { } } }
//! ```
//!
//! Upstream feed failures map to 502, booking-rule failures to 409,
//! enquiry validation/handshake failures to 400, and enquiry audit-store
//! failures to 500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted: the API is consumed
//! by webviews served from the legacy site's origin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::cart::{self, CartCommand, CartForm};
use crate::catalog::{CatalogStore, Product, StaticCatalog};
use crate::config::Config;
use crate::content::{ContentStore, MemoryContent, NewsItem};
use crate::enquiry::{self, EnquiryInput};
use crate::errors::{BookingError, EnquiryError, UpstreamError};
use crate::mail::{transport_from_config, MailTransport};
use crate::models::CalendarSnapshot;
use crate::snapshot::build_snapshot;
use crate::taxonomy::{self, FilterBlock};
use crate::upstream::{BookingFeed, HttpBookingFeed};

/// Shared application state; every collaborator sits behind a trait so
/// tests run the full router against fixtures.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub feed: Arc<dyn BookingFeed>,
    pub catalog: Arc<dyn CatalogStore>,
    pub content: Arc<dyn ContentStore>,
    pub mail: Arc<dyn MailTransport>,
}

/// Starts the API server on `[server].bind` with production collaborators.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let feed = HttpBookingFeed::new(&config.upstream.ajax_url, config.upstream.timeout_secs)?;
    let mail: Arc<dyn MailTransport> = Arc::from(transport_from_config(&config.mail)?);

    let state = AppState {
        config: Arc::new(config.clone()),
        feed: Arc::new(feed),
        catalog: Arc::new(StaticCatalog::new(&config.products)),
        content: Arc::new(MemoryContent::new(&config.news)),
        mail,
    };

    let app = build_router(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ping", get(handle_ping))
        .route("/meta", get(handle_meta))
        .route("/filters", get(handle_filters))
        .route("/news", get(handle_news))
        .route("/calendar/{calendar_id}", get(handle_calendar))
        .route("/calendar/{calendar_id}/product", get(handle_calendar_product))
        .route("/product/{product_id}/calendar", get(handle_product_calendar))
        .route("/cart/payload", post(handle_cart_payload))
        .route("/cart/webview", get(handle_cart_webview))
        .route("/cart/bridge", get(handle_cart_bridge))
        .route("/enquiry/preview", post(handle_enquiry_preview))
        .route("/enquiry", post(handle_enquiry_send))
        .layer(cors)
        .with_state(state)
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
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<Value>,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    detail: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                detail: self.detail,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
        detail: None,
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        AppError {
            status: StatusCode::BAD_GATEWAY,
            code: err.code().to_string(),
            message: err.to_string(),
            detail: None,
        }
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError {
            status: StatusCode::CONFLICT,
            code: err.code().to_string(),
            detail: err.detail(),
            message: err.to_string(),
        }
    }
}

impl From<EnquiryError> for AppError {
    fn from(err: EnquiryError) -> Self {
        let status = match err {
            EnquiryError::AuditStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        AppError {
            status,
            code: err.code().to_string(),
            detail: err.detail(),
            message: err.to_string(),
        }
    }
}

// ============ Basics ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct PingResponse {
    ping: &'static str,
    api_version: String,
}

async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong",
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct MetaResponse {
    name: String,
    version: String,
    base_url: String,
    cart_url: String,
    enquiry_ttl_secs: i64,
    endpoints: Vec<&'static str>,
}

async fn handle_meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        base_url: state.config.site.base_url.clone(),
        cart_url: state.config.site.cart_url(),
        enquiry_ttl_secs: state.config.enquiry.ttl_secs,
        endpoints: vec![
            "GET /health",
            "GET /ping",
            "GET /meta",
            "GET /filters",
            "GET /news",
            "GET /calendar/{calendar_id}",
            "GET /calendar/{calendar_id}/product",
            "GET /product/{product_id}/calendar",
            "POST /cart/payload",
            "GET /cart/webview",
            "GET /cart/bridge",
            "POST /enquiry/preview",
            "POST /enquiry",
        ],
    })
}

#[derive(Serialize)]
struct FiltersResponse {
    filters: Vec<FilterBlock>,
}

async fn handle_filters(State(state): State<AppState>) -> Json<FiltersResponse> {
    Json(FiltersResponse {
        filters: taxonomy::filter_blocks(&state.config.filters),
    })
}

#[derive(Deserialize)]
struct NewsQuery {
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Serialize)]
struct NewsResponse {
    news: Vec<NewsItem>,
    page: usize,
    per_page: usize,
    total: usize,
}

async fn handle_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<NewsResponse> {
    let all = state.content.news().await;
    let total = all.len();
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let news = all
        .into_iter()
        .skip(page.saturating_sub(1).saturating_mul(per_page))
        .take(per_page)
        .collect();
    Json(NewsResponse {
        news,
        page,
        per_page,
        total,
    })
}

// ============ Calendar snapshots ============

#[derive(Deserialize)]
struct RangeQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

async fn handle_calendar(
    State(state): State<AppState>,
    Path(calendar_id): Path<u32>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<CalendarSnapshot>, AppError> {
    let snapshot = build_snapshot(
        state.feed.clone(),
        &state.config,
        calendar_id,
        range.start,
        range.end,
    )
    .await?;
    Ok(Json(snapshot))
}

async fn handle_calendar_product(
    State(state): State<AppState>,
    Path(calendar_id): Path<u32>,
) -> Result<Json<Product>, AppError> {
    state
        .catalog
        .product_for_calendar(calendar_id)
        .await
        .map(Json)
        .ok_or_else(|| not_found(format!("no product owns calendar {calendar_id}")))
}

async fn handle_product_calendar(
    State(state): State<AppState>,
    Path(product_id): Path<u64>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<CalendarSnapshot>, AppError> {
    let product = state
        .catalog
        .product(product_id)
        .await
        .ok_or_else(|| not_found(format!("no product with id {product_id}")))?;
    let calendar_id = product
        .calendar_id
        .ok_or_else(|| not_found(format!("product {product_id} has no calendar")))?;
    let snapshot = build_snapshot(
        state.feed.clone(),
        &state.config,
        calendar_id,
        range.start,
        range.end,
    )
    .await?;
    Ok(Json(snapshot))
}

// ============ Cart hand-off ============

/// Builds the verified cart form for a command against a fresh snapshot.
async fn verified_cart_form(
    state: &AppState,
    command: &CartCommand,
) -> Result<Result<CartForm, BookingError>, UpstreamError> {
    let product_id = match command.product_id {
        Some(id) => id,
        None => state
            .catalog
            .product_for_calendar(command.calendar_id)
            .await
            .map(|p| p.id)
            .unwrap_or(0),
    };
    let snapshot = build_snapshot(
        state.feed.clone(),
        &state.config,
        command.calendar_id,
        Some(command.date),
        Some(command.date),
    )
    .await?;
    Ok(cart::build_cart_form(
        &snapshot.slots,
        &state.config.site.cart_url(),
        command,
        product_id,
    ))
}

async fn handle_cart_payload(
    State(state): State<AppState>,
    Json(command): Json<CartCommand>,
) -> Result<Json<CartForm>, AppError> {
    let form = verified_cart_form(&state, &command).await??;
    Ok(Json(form))
}

#[derive(Serialize)]
struct WebviewEnvelope {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<CartForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDetail>,
}

/// Webview variant of the cart payload: business failures come back as an
/// `ok: false` envelope with HTTP 200, because the embedding webview
/// cannot distinguish HTTP errors from network loss.
async fn handle_cart_webview(
    State(state): State<AppState>,
    Query(command): Query<CartCommand>,
) -> Result<Json<WebviewEnvelope>, AppError> {
    let envelope = match verified_cart_form(&state, &command).await? {
        Ok(form) => WebviewEnvelope {
            ok: true,
            form: Some(form),
            error: None,
        },
        Err(err) => WebviewEnvelope {
            ok: false,
            form: None,
            error: Some(ErrorDetail {
                code: err.code().to_string(),
                detail: err.detail(),
                message: err.to_string(),
            }),
        },
    };
    Ok(Json(envelope))
}

/// HTML bridge: renders a self-submitting form posting into the legacy
/// cart, or a human-readable failure page.
async fn handle_cart_bridge(
    State(state): State<AppState>,
    Query(command): Query<CartCommand>,
) -> Html<String> {
    let outcome = match verified_cart_form(&state, &command).await {
        Ok(Ok(form)) => return Html(cart::render_bridge_html(&form)),
        Ok(Err(booking)) => booking.to_string(),
        Err(upstream) => upstream.to_string(),
    };
    Html(format!(
        "<!doctype html>\n<html><body>\n<h1>Booking unavailable</h1>\n<p>{}</p>\n</body></html>\n",
        outcome
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    ))
}

// ============ Enquiry handshake ============

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn lookup_product(state: &AppState, input: &EnquiryInput) -> Result<Product, AppError> {
    state
        .catalog
        .product(input.product_id)
        .await
        .ok_or_else(|| AppError::from(EnquiryError::InvalidProductId))
}

async fn handle_enquiry_preview(
    State(state): State<AppState>,
    Json(input): Json<EnquiryInput>,
) -> Result<Json<enquiry::EnquiryPreview>, AppError> {
    let product = lookup_product(&state, &input).await?;
    let preview = enquiry::preview(&state.config, &product, &input, now_epoch())?;
    Ok(Json(preview))
}

async fn handle_enquiry_send(
    State(state): State<AppState>,
    Json(input): Json<EnquiryInput>,
) -> Result<Json<enquiry::EnquirySendResult>, AppError> {
    let product = lookup_product(&state, &input).await?;
    let result = enquiry::send(
        &state.config,
        &product,
        state.content.as_ref(),
        state.mail.as_ref(),
        &input,
        now_epoch(),
    )
    .await?;
    Ok(Json(result))
}
