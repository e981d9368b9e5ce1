use axum::{
    Router,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
    routing::{get, patch, post},
};
use pynk_proto::menu_service::{
    CreateMenuItemPayload, DeleteMenuItemPayload, ListMenuItemsPayload, StringList,
    UpdateMenuItemPayload,
};
use pynk_proto::order_service::{ListOrdersPayload, UpdateOrderStatusPayload};
use tracing::instrument;

use crate::error::{ApiError, ApiJson};
use crate::models::*;
use crate::validation::{self, non_blank};

use super::{AppState, admin_menu_item, order_view, require_admin};

/// Orders shown on the kitchen board.
pub const ADMIN_ORDER_LIMIT: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_orders).patch(update_order_status))
        .route("/admin/orders/offline", post(create_offline_order))
        .route("/admin/menu-items", get(list_menu_items).post(create_menu_item))
        .route(
            "/admin/menu-items/{id}",
            patch(update_menu_item).delete(delete_menu_item),
        )
}

fn parse_id(id: &str) -> Result<i32, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest("Invalid id".into()))
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    responses(
        (status = 200, description = "Latest orders with items and contact details", body = OrdersResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<OrdersResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let mut order_client = state.order_client.clone();

    let request = tonic::Request::new(ListOrdersPayload {
        telegram_user_id: None,
        limit: Some(ADMIN_ORDER_LIMIT),
    });
    let orders = order_client.list_orders(request).await?.into_inner().orders;

    Ok(Json(OrdersResponse {
        ok: true,
        orders: orders.into_iter().map(order_view).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/admin/orders",
    request_body = AdminStatusUpdateRequest,
    responses(
        (status = 200, description = "Updated order", body = OrderResponse),
        (status = 400, description = "Missing fields or unknown status", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<AdminStatusUpdateRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let (Some(public_code), Some(status)) = (
        non_blank(payload.code.as_deref()),
        non_blank(payload.status.as_deref()),
    ) else {
        return Err(ApiError::BadRequest("Missing code/status".into()));
    };
    let mut order_client = state.order_client.clone();

    let request = tonic::Request::new(UpdateOrderStatusPayload {
        public_code,
        status,
    });
    let order = order_client.update_order_status(request).await?.into_inner();

    Ok(Json(OrderResponse {
        ok: true,
        order: order_view(order),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/orders/offline",
    request_body = OfflineOrderRequest,
    responses(
        (status = 200, description = "Order recorded", body = OrderResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "A dish is unknown or no longer offered", body = ApiErrorResponse),
    ),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip_all)]
pub async fn create_offline_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<OfflineOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let request = validation::offline_order_payload(payload)?;
    let mut order_client = state.order_client.clone();

    let order = order_client
        .create_order(tonic::Request::new(request))
        .await?
        .into_inner();
    tracing::info!(code = %order.public_code, "offline order recorded");

    Ok(Json(OrderResponse {
        ok: true,
        order: order_view(order),
    }))
}

#[utoipa::path(
    get,
    path = "/admin/menu-items",
    responses(
        (status = 200, description = "Every dish, retired ones included", body = AdminMenuItemsResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn list_menu_items(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AdminMenuItemsResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let mut menu_client = state.menu_client.clone();

    let request = tonic::Request::new(ListMenuItemsPayload {
        include_inactive: true,
    });
    let items = menu_client.list_menu_items(request).await?.into_inner().menu_items;

    Ok(Json(AdminMenuItemsResponse {
        ok: true,
        items: items.into_iter().map(admin_menu_item).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/admin/menu-items",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 200, description = "Dish created", body = AdminMenuItemResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
    ),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn create_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreateMenuItemRequest>,
) -> Result<Json<AdminMenuItemResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let mut menu_client = state.menu_client.clone();

    let request = tonic::Request::new(CreateMenuItemPayload {
        name_en: payload.name_en,
        name_de: payload.name_de,
        description_en: payload.description_en,
        description_de: payload.description_de,
        ingredients_en: payload.ingredients_en.unwrap_or_default(),
        ingredients_de: payload.ingredients_de.unwrap_or_default(),
        spicy_level: payload.spicy_level,
        price_euros: payload.price_euros,
        images: payload.images.unwrap_or_default(),
        active: payload.active,
    });
    let item = menu_client.create_menu_item(request).await?.into_inner();

    Ok(Json(AdminMenuItemResponse {
        ok: true,
        item: admin_menu_item(item),
    }))
}

#[utoipa::path(
    patch,
    path = "/admin/menu-items/{id}",
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Dish updated", body = AdminMenuItemResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Dish not found", body = ApiErrorResponse),
    ),
    params(("id" = i32, Path, description = "Menu item id")),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn update_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateMenuItemRequest>,
) -> Result<Json<AdminMenuItemResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id)?;
    let mut menu_client = state.menu_client.clone();

    let list = |values: Option<Vec<String>>| values.map(|values| StringList { values });
    let request = tonic::Request::new(UpdateMenuItemPayload {
        id,
        name_en: payload.name_en,
        name_de: payload.name_de,
        description_en: payload.description_en,
        description_de: payload.description_de,
        ingredients_en: list(payload.ingredients_en),
        ingredients_de: list(payload.ingredients_de),
        spicy_level: payload.spicy_level,
        price_euros: payload.price_euros,
        images: list(payload.images),
        active: payload.active,
    });
    let item = menu_client.update_menu_item(request).await?.into_inner();

    Ok(Json(AdminMenuItemResponse {
        ok: true,
        item: admin_menu_item(item),
    }))
}

#[utoipa::path(
    delete,
    path = "/admin/menu-items/{id}",
    responses(
        (status = 200, description = "Dish deleted", body = AckResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Dish not found", body = ApiErrorResponse),
    ),
    params(("id" = i32, Path, description = "Menu item id")),
    security(("admin_key" = []), ("bearer" = [])),
    tag = "admin"
)]
#[instrument(skip(state, headers))]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let id = parse_id(&id)?;
    let mut menu_client = state.menu_client.clone();

    let request = tonic::Request::new(DeleteMenuItemPayload { id });
    let deleted = menu_client.delete_menu_item(request).await?.into_inner().deleted;
    if !deleted {
        return Err(ApiError::NotFound("Not found".into()));
    }

    Ok(Json(AckResponse::ok()))
}
