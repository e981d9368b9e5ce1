use axum::{
    Router,
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use pynk_proto::order_service::{
    ListOrdersPayload, RequestReviewPayload, SubmitReviewPayload, UpdateOrderStatusPayload,
};
use tracing::instrument;

use crate::error::{ApiError, ApiJson, FieldError};
use crate::models::*;
use crate::validation::{self, non_blank};

use super::{AppState, cents_to_euros, order_view, require_admin, timestamp};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/by-telegram", get(list_orders_by_telegram))
        .route("/orders/status", post(update_status))
        .route("/orders/review", post(review))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = CreateOrderResponse),
        (status = 400, description = "Invalid payload", body = ApiErrorResponse),
        (status = 404, description = "A dish is unknown or no longer offered", body = ApiErrorResponse),
        (status = 503, description = "Service unavailable", body = ApiErrorResponse),
    ),
    tag = "orders"
)]
#[instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ApiError> {
    let request = validation::order_payload(payload)?;
    let mut order_client = state.order_client.clone();

    let order = order_client
        .create_order(tonic::Request::new(request))
        .await?
        .into_inner();
    tracing::info!(code = %order.public_code, total_cents = order.total_cents, "order placed");

    Ok(Json(CreateOrderResponse {
        ok: true,
        order_id: order.public_code,
        id: order.id,
        total: cents_to_euros(order.total_cents),
        created_at: timestamp(order.created_at),
    }))
}

#[utoipa::path(
    get,
    path = "/orders/by-telegram",
    responses(
        (status = 200, description = "The customer's recent orders, newest first", body = OrdersResponse),
        (status = 400, description = "Missing userId", body = ApiErrorResponse),
    ),
    params(
        ("userId" = String, Query, description = "Telegram user id")
    ),
    tag = "orders"
)]
#[instrument(skip(state))]
pub async fn list_orders_by_telegram(
    State(state): State<AppState>,
    Query(query): Query<TelegramUserQuery>,
) -> Result<Json<OrdersResponse>, ApiError> {
    let telegram_user_id = non_blank(query.user_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Missing userId".into()))?;
    let mut order_client = state.order_client.clone();

    let request = tonic::Request::new(ListOrdersPayload {
        telegram_user_id: Some(telegram_user_id),
        limit: None,
    });
    let orders = order_client.list_orders(request).await?.into_inner().orders;

    Ok(Json(OrdersResponse {
        ok: true,
        orders: orders.into_iter().map(order_view).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/orders/status",
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status changed", body = StatusUpdateResponse),
        (status = 400, description = "Missing fields or unknown status", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    security(
        ("admin_key" = []),
        ("bearer" = [])
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers))]
pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    require_admin(&state, &headers).await?;

    let (Some(public_code), Some(status)) = (
        non_blank(payload.order_id.as_deref()),
        non_blank(payload.status.as_deref()),
    ) else {
        return Err(ApiError::BadRequest("Missing orderId/status".into()));
    };
    let mut order_client = state.order_client.clone();

    let request = tonic::Request::new(UpdateOrderStatusPayload {
        public_code,
        status,
    });
    let order = order_client.update_order_status(request).await?.into_inner();

    Ok(Json(StatusUpdateResponse {
        ok: true,
        order_id: order.public_code,
        status: order.status,
    }))
}

#[utoipa::path(
    post,
    path = "/orders/review",
    request_body = ReviewActionRequest,
    responses(
        (status = 200, description = "Review requested or recorded", body = AckResponse),
        (status = 400, description = "Missing fields, unknown action or bad rating", body = ApiErrorResponse),
        (status = 401, description = "Requesting a review needs admin rights", body = ApiErrorResponse),
        (status = 404, description = "Order not found", body = ApiErrorResponse),
    ),
    tag = "orders"
)]
#[instrument(skip(state, headers, payload))]
pub async fn review(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ReviewActionRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let (Some(action), Some(public_code)) = (
        non_blank(payload.action.as_deref()),
        non_blank(payload.order_id.as_deref()),
    ) else {
        return Err(ApiError::BadRequest("Missing action/orderId".into()));
    };
    let mut order_client = state.order_client.clone();

    match action.as_str() {
        "request" => {
            if !state.is_admin_key(payload.admin_key.as_deref()) {
                require_admin(&state, &headers).await?;
            }
            let request = tonic::Request::new(RequestReviewPayload { public_code });
            order_client.request_review(request).await?;
        }
        "submit" => {
            if payload.rating.is_some_and(|r| !(1..=5).contains(&r)) {
                return Err(ApiError::Validation(vec![FieldError::new(
                    "rating",
                    "must be between 1 and 5",
                )]));
            }
            let request = tonic::Request::new(SubmitReviewPayload {
                public_code,
                rating: payload.rating,
                comment: non_blank(payload.comment.as_deref()),
            });
            order_client.submit_review(request).await?;
        }
        _ => return Err(ApiError::BadRequest("Unknown action".into())),
    }

    Ok(Json(AckResponse::ok()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::*;

    fn checkout() -> serde_json::Value {
        json!({
            "items": [
                {"id": 1, "name": "Samosa Chaat", "price": 8.5, "quantity": 2},
                {"id": 3, "name": "Mango Lassi", "price": 4.5, "quantity": 1}
            ],
            "delivery": {"method": "pickup"},
            "telegramUserId": "4242",
            "customer": {"name": "Asha", "email": "asha@example.com"},
            "total": 99
        })
    }

    #[tokio::test]
    async fn test_order_submission_returns_public_code() {
        let (app, backend) = app_with_backend().await;
        let (status, body) = send(app, json_request("POST", "/orders", checkout())).await;

        assert_eq!(status, 200);
        assert_eq!(body["ok"], true);
        assert_eq!(body["orderId"], "070301");
        assert_eq!(body["total"], 21.5);

        let sent = backend.orders.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].items.len(), 2);
        assert_eq!(sent[0].client_total_cents, Some(9900));
        assert_eq!(
            sent[0].telegram.as_ref().unwrap().telegram_user_id,
            "4242"
        );
    }

    #[tokio::test]
    async fn test_invalid_submission_never_reaches_backend() {
        let (app, backend) = app_with_backend().await;
        let mut body = checkout();
        body["items"][0]["quantity"] = json!(100);
        body["customer"]["email"] = json!("nope");

        let (status, body) = send(app, json_request("POST", "/orders", body)).await;
        assert_eq!(status, 400);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["items[0].quantity", "customer.email"]);
        assert!(backend.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let (app, _) = app_with_backend().await;
        let (status, body) = send(
            app,
            json_request("POST", "/orders", json!({"items": "nope"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["fields"][0]["field"], "body");
    }

    #[tokio::test]
    async fn test_unavailable_item_is_not_found() {
        let (app, _) = app_with_backend().await;
        let mut body = checkout();
        body["items"][1]["id"] = json!(404);

        let (status, body) = send(app, json_request("POST", "/orders", body)).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Item not found or inactive: 404");
    }

    #[tokio::test]
    async fn test_orders_by_telegram() {
        let (app, _) = app_with_backend().await;
        let (status, body) = send(app.clone(), get("/orders/by-telegram?userId=4242")).await;
        assert_eq!(status, 200);
        assert_eq!(body["orders"][0]["code"], "070302");
        assert_eq!(body["orders"][0]["items"][0]["unitPrice"], 8.5);

        let (status, body) = send(app, get("/orders/by-telegram")).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Missing userId");
    }

    #[tokio::test]
    async fn test_status_update_needs_admin() {
        let (app, backend) = app_with_backend().await;
        let update = json!({"orderId": "070301", "status": "ready"});

        let (status, _) = send(app.clone(), json_request("POST", "/orders/status", update.clone())).await;
        assert_eq!(status, 401);

        let mut request = json_request("POST", "/orders/status", update);
        request
            .headers_mut()
            .insert("x-admin-key", ADMIN_KEY.parse().unwrap());
        let (status, body) = send(app, request).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ready");
        assert_eq!(backend.status_updates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_status_update_accepts_login_token() {
        let (app, _) = app_with_backend().await;

        let mut bogus = json_request("POST", "/orders/status", json!({"orderId": "070301", "status": "bogus"}));
        bogus
            .headers_mut()
            .insert("authorization", format!("Bearer {GOOD_TOKEN}").parse().unwrap());
        let (status, _) = send(app.clone(), bogus).await;
        assert_eq!(status, 400);

        let mut missing = json_request("POST", "/orders/status", json!({"orderId": "999999", "status": "ready"}));
        missing
            .headers_mut()
            .insert("cookie", format!("admin_auth={GOOD_TOKEN}").parse().unwrap());
        let (status, _) = send(app.clone(), missing).await;
        assert_eq!(status, 404);

        let mut stale = json_request("POST", "/orders/status", json!({"orderId": "070301", "status": "ready"}));
        stale
            .headers_mut()
            .insert("authorization", "Bearer expired".parse().unwrap());
        let (status, _) = send(app, stale).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn test_review_actions() {
        let (app, backend) = app_with_backend().await;

        let (status, _) = send(
            app.clone(),
            json_request("POST", "/orders/review", json!({"action": "request", "orderId": "070301"})),
        )
        .await;
        assert_eq!(status, 401);

        let (status, _) = send(
            app.clone(),
            json_request(
                "POST",
                "/orders/review",
                json!({"action": "request", "orderId": "070301", "adminKey": ADMIN_KEY}),
            ),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(*backend.review_requests.lock().unwrap(), vec!["070301".to_string()]);

        let (status, body) = send(
            app.clone(),
            json_request("POST", "/orders/review", json!({"action": "submit", "orderId": "070301", "rating": 6})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["fields"][0]["field"], "rating");

        let (status, _) = send(
            app.clone(),
            json_request(
                "POST",
                "/orders/review",
                json!({"action": "submit", "orderId": "070301", "rating": 3, "comment": "ok"}),
            ),
        )
        .await;
        assert_eq!(status, 200);
        let reviews = backend.reviews.lock().unwrap();
        assert_eq!(reviews[0].rating, Some(3));
        assert_eq!(reviews[0].comment.as_deref(), Some("ok"));
        drop(reviews);

        let (status, _) = send(
            app.clone(),
            json_request("POST", "/orders/review", json!({"action": "submit", "orderId": "999999"})),
        )
        .await;
        assert_eq!(status, 404);

        let (status, body) = send(
            app,
            json_request("POST", "/orders/review", json!({"action": "delete", "orderId": "070301"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Unknown action");
    }
}
