use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::catalog::SearchPage;
use crate::error::ArtQueryError;
use crate::request_body::SearchRequest;

/// Query string of GET /api/v1/arts: the whole request as JSON in `req`.
#[derive(Debug, Deserialize)]
pub struct ReqParam {
    pub req: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: ArtQueryError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Search failed: {}", err);
    } else {
        debug!("Rejected search: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn find_many(state: &AppState, req: &SearchRequest) -> Result<Json<SearchPage>, ApiError> {
    state.catalog.find_many(req).map(Json).map_err(api_error)
}

/// GET /api/v1/arts?req=<json>
/// A missing `req` searches with the default request.
pub async fn find_many_get(
    State(state): State<AppState>,
    Query(params): Query<ReqParam>,
) -> Result<Json<SearchPage>, ApiError> {
    let req = match params.req.as_deref() {
        None | Some("") => SearchRequest::default(),
        Some(raw) => SearchRequest::from_json(raw).map_err(|e| {
            api_error(ArtQueryError::MalformedUrlState(format!("invalid req parameter: {}", e)))
        })?,
    };

    find_many(&state, &req)
}

/// POST /api/v1/arts
/// A body that does not parse is a 400 with the usual `{ "error": .. }` payload.
pub async fn find_many_post(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SearchPage>, ApiError> {
    let req = SearchRequest::from_json(&body).map_err(|e| {
        api_error(ArtQueryError::InvalidQuery(format!("invalid request body: {}", e)))
    })?;

    find_many(&state, &req)
}
