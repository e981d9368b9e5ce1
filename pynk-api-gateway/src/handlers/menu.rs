use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::get,
};
use pynk_proto::menu_service::{GetMenuItemPayload, ListMenuItemsPayload};
use tracing::instrument;

use crate::error::ApiError;
use crate::models::*;

use super::{AppState, menu_item_view};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/menu", get(list_menu))
        .route("/menu/{id}", get(get_menu_item))
}

#[utoipa::path(
    get,
    path = "/menu",
    responses(
        (status = 200, description = "Dishes currently on offer", body = [MenuItemResponse]),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn list_menu(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError> {
    let mut client = state.menu_client.clone();

    let request = tonic::Request::new(ListMenuItemsPayload {
        include_inactive: false,
    });
    let response = client.list_menu_items(request).await?;

    Ok(Json(
        response
            .into_inner()
            .menu_items
            .into_iter()
            .map(menu_item_view)
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/menu/{id}",
    responses(
        (status = 200, description = "One dish", body = MenuItemResponse),
        (status = 404, description = "Unknown or retired dish", body = ApiErrorResponse),
    ),
    params(
        ("id" = i32, Path, description = "Menu item id")
    ),
    tag = "menu"
)]
#[instrument(skip(state))]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid id".into()))?;
    let mut client = state.menu_client.clone();

    let request = tonic::Request::new(GetMenuItemPayload {
        id,
        include_inactive: false,
    });
    let item = client.get_menu_item(request).await?.into_inner();

    Ok(Json(menu_item_view(item)))
}
