//! `GET /api/price`.

use axum::extract::{Query, State};
use axum::Json;
use devflation_oracle::{PriceAnswer, PriceQuery};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    pub mint: Option<String>,
    pub symbol: Option<String>,
    pub quote: Option<String>,
}

/// Prices never fail: unknown or unreachable prices come back as `null`.
pub async fn price(
    State(state): State<AppState>,
    Query(params): Query<PriceParams>,
) -> Result<Json<PriceAnswer>, ApiError> {
    let query = PriceQuery::parse(
        params.mint.as_deref(),
        params.symbol.as_deref(),
        params.quote.as_deref(),
    )
    .ok_or(ApiError::BadRequest("missing mint or symbol"))?;
    Ok(Json(state.oracle.quote(&query).await))
}
