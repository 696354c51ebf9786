//! Result handlers for an uploaded image.

use axum::extract::{Path, Query, State};
use axum::Json;
use lookalike_models::{sort_by_price, PriceSort, ResultGroup, TaggedProduct};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

/// Optional ordering of returned products.
#[derive(Debug, Default, Deserialize)]
pub struct SortQuery {
    pub sort: Option<PriceSort>,
}

/// Visual matches for the whole image, tagged `"Initial"`.
pub async fn initial_results(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<SortQuery>,
) -> ApiResult<Json<Vec<TaggedProduct>>> {
    let cancel = state.shutdown.subscribe();
    let mut products = state.pipeline.get_initial_results(&image_id, &cancel).await?;

    if let Some(order) = query.sort {
        sort_by_price(&mut products, order);
    }
    Ok(Json(products))
}

/// One group of matches per detected object. Sorting applies within each group.
pub async fn object_results(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<SortQuery>,
) -> ApiResult<Json<Vec<ResultGroup>>> {
    let cancel = state.shutdown.subscribe();
    let mut groups = state
        .pipeline
        .get_detected_object_results(&image_id, &cancel)
        .await?;

    if let Some(order) = query.sort {
        for group in &mut groups {
            sort_by_price(&mut group.products, order);
        }
    }
    Ok(Json(groups))
}

/// All per-object matches in one list.
pub async fn visual_matches(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Query(query): Query<SortQuery>,
) -> ApiResult<Json<Vec<TaggedProduct>>> {
    let cancel = state.shutdown.subscribe();
    let mut products = state.pipeline.get_visual_matches(&image_id, &cancel).await?;

    if let Some(order) = query.sort {
        sort_by_price(&mut products, order);
    }
    Ok(Json(products))
}
