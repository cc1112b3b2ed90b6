//! Document endpoint routes.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use concord_engine::VersionTag;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::handlers::{
    create_document, delete_document, force_overwrite_document, get_document, handle_reconcile,
    query_documents, replace_document, CreateDocumentRequest, DocumentResponse, PartitionQuery,
    QueryRequest, QueryResponse, ReconcileRequest, ReconcileResponse, WriteDocumentRequest,
};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections/{collection}/documents", post(create_handler))
        .route(
            "/collections/{collection}/documents/{id}",
            axum::routing::get(get_handler)
                .put(replace_handler)
                .delete(delete_handler),
        )
        .route(
            "/collections/{collection}/documents/{id}/force",
            post(force_handler),
        )
        .route(
            "/collections/{collection}/documents/{id}/reconcile",
            post(reconcile_handler),
        )
        .route("/collections/{collection}/query", post(query_handler))
}

/// Document body with its tag echoed in the `ETag` header.
fn with_etag(status: StatusCode, document: DocumentResponse) -> Response {
    (
        status,
        [(header::ETAG, document.etag.to_header_value())],
        Json(document),
    )
        .into_response()
}

/// Tag from `If-Match`. `*` is rejected: a write must name the revision it
/// was based on.
fn if_match(headers: &HeaderMap) -> Result<Option<VersionTag>> {
    let Some(raw) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };
    let raw = raw
        .to_str()
        .map_err(|_| AppError::BadRequest("If-Match is not valid text".to_string()))?;

    VersionTag::from_header_value(raw).map(Some).ok_or_else(|| {
        AppError::BadRequest("If-Match must name a specific entity tag".to_string())
    })
}

/// POST /collections/{collection}/documents - Create a document.
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<Response> {
    let document = create_document(&state, &collection, request).await?;
    Ok(with_etag(StatusCode::CREATED, document))
}

/// GET /collections/{collection}/documents/{id} - Read a document.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<PartitionQuery>,
) -> Result<Response> {
    let document = get_document(&state, &collection, &id, query).await?;
    Ok(with_etag(StatusCode::OK, document))
}

/// PUT /collections/{collection}/documents/{id} - Conditional replace.
async fn replace_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<PartitionQuery>,
    headers: HeaderMap,
    Json(request): Json<WriteDocumentRequest>,
) -> Result<Response> {
    let tag = if_match(&headers)?.ok_or(AppError::PreconditionRequired)?;
    let document = replace_document(&state, &collection, &id, query, tag, request).await?;
    Ok(with_etag(StatusCode::OK, document))
}

/// POST /collections/{collection}/documents/{id}/force - Unconditional replace.
async fn force_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<PartitionQuery>,
    Json(request): Json<WriteDocumentRequest>,
) -> Result<Response> {
    let document = force_overwrite_document(&state, &collection, &id, query, request).await?;
    Ok(with_etag(StatusCode::OK, document))
}

/// DELETE /collections/{collection}/documents/{id} - Delete a document.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<PartitionQuery>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    delete_document(&state, &collection, &id, query, if_match(&headers)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /collections/{collection}/documents/{id}/reconcile - Save with retries.
async fn reconcile_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>> {
    let response = handle_reconcile(&state, &collection, &id, request).await?;
    Ok(Json(response))
}

/// POST /collections/{collection}/query - Query a collection.
async fn query_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = query_documents(&state, &collection, request).await?;
    Ok(Json(response))
}
