//! API request handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::AppState;
use crate::services::{IngestError, ReconcileError};

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn ok(message: String, data: Value, errors: Vec<String>) -> Json<Value> {
    let mut body = json!({
        "success": true,
        "message": message,
        "data": data,
    });
    if !errors.is_empty() {
        body["errors"] = json!(errors);
    }
    Json(body)
}

fn fail(status: StatusCode, message: String) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "success": false,
            "message": message,
        })),
    )
}

/// Map ingest errors onto HTTP statuses: not-found and scrape failure are
/// distinct outcomes, everything else is a server error.
fn ingest_error(e: IngestError) -> (StatusCode, Json<Value>) {
    match &e {
        IngestError::Reconcile(ReconcileError::CategoryNotFound(_))
        | IngestError::Reconcile(ReconcileError::ProductNotFound(_)) => {
            fail(StatusCode::NOT_FOUND, e.to_string())
        }
        IngestError::Scrape(crate::scrapers::ScrapeError::InvalidTarget { .. }) => {
            fail(StatusCode::BAD_REQUEST, e.to_string())
        }
        IngestError::Scrape(_) => fail(StatusCode::BAD_GATEWAY, e.to_string()),
        _ => {
            error!(error = %e, "ingest request failed");
            fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn db_error(e: crate::repository::DieselError) -> (StatusCode, Json<Value>) {
    error!(error = %e, "database query failed");
    fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn scrape_categories(State(state): State<AppState>) -> ApiResult {
    let outcome = state
        .ingest
        .scrape_categories()
        .await
        .map_err(ingest_error)?;
    Ok(ok(
        format!("Processed {} categories", outcome.saved.len()),
        json!({ "categories": outcome.saved }),
        outcome.errors,
    ))
}

pub async fn scrape_products(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult {
    let outcome = state
        .ingest
        .scrape_products(&category)
        .await
        .map_err(ingest_error)?;
    Ok(ok(
        format!("Processed {} products", outcome.saved.len()),
        json!({ "products": outcome.saved }),
        outcome.errors,
    ))
}

pub async fn scrape_product_detail(
    State(state): State<AppState>,
    Path(product_id): Path<i32>,
) -> ApiResult {
    let product = state
        .ingest
        .scrape_product_detail(product_id)
        .await
        .map_err(ingest_error)?;
    Ok(ok(
        format!("Refreshed product detail for {}", product.title),
        json!({ "product": product }),
        Vec::new(),
    ))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult {
    let categories = state
        .ingest
        .categories()
        .list()
        .await
        .map_err(db_error)?;
    Ok(ok(
        format!("{} categories", categories.len()),
        json!({ "categories": categories }),
        Vec::new(),
    ))
}

pub async fn get_category(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult {
    let category = state
        .ingest
        .categories()
        .get(id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("category {id} not found")))?;
    Ok(ok(
        category.name.clone(),
        json!({ "category": category }),
        Vec::new(),
    ))
}

#[derive(Deserialize)]
pub struct ProductListQuery {
    pub category_id: Option<i32>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// Pages needed for `total` rows at `limit` rows per page. `limit` must
/// already be clamped positive.
fn page_count(total: i64, limit: i64) -> i64 {
    (total + limit - 1) / limit
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> ApiResult {
    // Clamp once; the same bound the repository applies, so the reported
    // page count matches the rows actually returned.
    let limit = query.limit.clamp(1, 100);
    let (products, total) = state
        .ingest
        .products()
        .list(query.category_id, query.page, limit)
        .await
        .map_err(db_error)?;
    Ok(ok(
        format!("{total} products"),
        json!({
            "products": products,
            "total": total,
            "page": query.page,
            "totalPages": page_count(total, limit),
        }),
        Vec::new(),
    ))
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<i32>) -> ApiResult {
    let product = state
        .ingest
        .products()
        .get(id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, format!("product {id} not found")))?;
    let reviews = state
        .ingest
        .products()
        .list_reviews(id)
        .await
        .map_err(db_error)?;
    Ok(ok(
        product.title.clone(),
        json!({ "product": product, "reviews": reviews }),
        Vec::new(),
    ))
}
