pub mod admin;
pub mod auth;
pub mod menu;
pub mod order;
pub mod telegram;
pub mod user;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderMap, header},
};
use chrono::{DateTime, Utc};
use pynk_proto::{
    auth_service::{GetTokenInfoPayload, auth_service_client::AuthServiceClient},
    menu_service::{MenuItem, menu_service_client::MenuServiceClient},
    order_service::{DeliveryMethod, Order, order_service_client::OrderServiceClient},
    user_service::user_service_client::UserServiceClient,
};
use tonic::transport::Channel;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
#[cfg(feature = "swagger-ui")]
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::models::*;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const ADMIN_COOKIE: &str = "admin_auth";

#[derive(Clone)]
pub struct AppState {
    pub menu_client: MenuServiceClient<Channel>,
    pub order_client: OrderServiceClient<Channel>,
    pub user_client: UserServiceClient<Channel>,
    pub auth_client: AuthServiceClient<Channel>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    /// All four services live behind the same order service endpoint.
    pub fn new(channel: Channel, admin_api_key: Option<String>) -> Self {
        Self {
            menu_client: MenuServiceClient::new(channel.clone()),
            order_client: OrderServiceClient::new(channel.clone()),
            user_client: UserServiceClient::new(channel.clone()),
            auth_client: AuthServiceClient::new(channel),
            admin_api_key: admin_api_key.map(Arc::from),
        }
    }

    pub fn is_admin_key(&self, provided: Option<&str>) -> bool {
        match (&self.admin_api_key, provided) {
            (Some(expected), Some(provided)) => expected.as_ref() == provided,
            _ => false,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(menu::router())
        .merge(order::router())
        .merge(admin::router())
        .merge(auth::router())
        .merge(user::router())
        .merge(telegram::router())
        .merge(api_docs())
        .with_state(state)
        .layer(CorsLayer::permissive())
}

const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[cfg(feature = "swagger-ui")]
fn api_docs() -> Router<AppState> {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into()
}

/// Without the bundled UI the document itself is still served.
#[cfg(not(feature = "swagger-ui"))]
fn api_docs() -> Router<AppState> {
    Router::new().route(
        OPENAPI_PATH,
        axum::routing::get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// The login token from `Authorization: Bearer` or the `admin_auth` cookie.
fn admin_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(ADMIN_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
}

/// Admits requests carrying the configured admin key or a valid login token.
async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let key = headers.get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    if state.is_admin_key(key) {
        return Ok(());
    }

    let token = admin_token(headers).ok_or_else(ApiError::unauthorized)?;
    let mut auth_client = state.auth_client.clone();
    let request = tonic::Request::new(GetTokenInfoPayload { token });
    match auth_client.get_token_info(request).await {
        Ok(info) if info.get_ref().role == "admin" => Ok(()),
        Ok(_) => Err(ApiError::unauthorized()),
        Err(status) if status.code() == tonic::Code::Unavailable => {
            Err(ApiError::ServiceUnavailable(status.message().to_string()))
        }
        Err(_) => Err(ApiError::unauthorized()),
    }
}

fn timestamp(ts: Option<prost_types::Timestamp>) -> Option<DateTime<Utc>> {
    ts.and_then(|ts| DateTime::from_timestamp(ts.seconds, ts.nanos as u32))
}

fn cents_to_euros(cents: i32) -> f64 {
    f64::from(cents) / 100.0
}

fn menu_item_view(item: MenuItem) -> MenuItemResponse {
    MenuItemResponse {
        id: item.id,
        name: LocalizedText {
            en: item.name_en,
            de: item.name_de,
        },
        description: LocalizedText {
            en: item.description_en.unwrap_or_default(),
            de: item.description_de.unwrap_or_default(),
        },
        ingredients: LocalizedList {
            en: item.ingredients_en,
            de: item.ingredients_de,
        },
        spicy_level: item.spicy_level,
        price: cents_to_euros(item.price_cents),
        images: item.images,
    }
}

fn admin_menu_item(item: MenuItem) -> AdminMenuItem {
    AdminMenuItem {
        id: item.id,
        name_en: item.name_en,
        name_de: item.name_de,
        description_en: item.description_en,
        description_de: item.description_de,
        ingredients_en: item.ingredients_en,
        ingredients_de: item.ingredients_de,
        spicy_level: item.spicy_level,
        price_cents: item.price_cents,
        price: cents_to_euros(item.price_cents),
        images: item.images,
        active: item.active,
    }
}

fn order_view(order: Order) -> OrderView {
    let delivery_method = match order.delivery_method() {
        DeliveryMethod::Pickup => "pickup",
        DeliveryMethod::Delivery => "delivery",
    };
    let customer = order.customer.unwrap_or_default();
    let review = order.review.unwrap_or_default();

    OrderView {
        id: order.id,
        code: order.public_code,
        created_at: timestamp(order.created_at),
        updated_at: timestamp(order.updated_at),
        fulfilled_at: timestamp(order.fulfilled_at),
        status: order.status,
        total: cents_to_euros(order.total_cents),
        customer: CustomerView {
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
        },
        delivery_method: delivery_method.to_string(),
        notes: order.notes,
        telegram_user_id: order.telegram_user_id,
        review: ReviewView {
            requested_at: timestamp(review.requested_at),
            rating: review.rating,
            comment: review.comment,
        },
        items: order
            .line_items
            .into_iter()
            .map(|line| OrderLineView {
                id: line.id,
                item_code: line.item_code,
                name: line.item_name,
                name_de: line.item_name_de,
                quantity: line.quantity,
                unit_price: cents_to_euros(line.unit_price_cents),
                line_total: cents_to_euros(line.line_total_cents),
                image_url: line.image_url,
            })
            .collect(),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        menu::list_menu,
        menu::get_menu_item,
        order::create_order,
        order::list_orders_by_telegram,
        order::update_status,
        order::review,
        admin::list_orders,
        admin::update_order_status,
        admin::create_offline_order,
        admin::list_menu_items,
        admin::create_menu_item,
        admin::update_menu_item,
        admin::delete_menu_item,
        auth::request_code,
        auth::verify_code,
        user::get_by_telegram,
        user::register,
        telegram::webhook,
        telegram::webhook_status,
    ),
    components(
        schemas(
            crate::models::MenuItemResponse,
            crate::models::LocalizedText,
            crate::models::LocalizedList,
            crate::models::AdminMenuItem,
            crate::models::AdminMenuItemsResponse,
            crate::models::AdminMenuItemResponse,
            crate::models::CreateMenuItemRequest,
            crate::models::UpdateMenuItemRequest,
            crate::models::CreateOrderRequest,
            crate::models::IncomingOrderItem,
            crate::models::DeliveryRequest,
            crate::models::CustomerRequest,
            crate::models::CreateOrderResponse,
            crate::models::OfflineOrderRequest,
            crate::models::OfflineOrderItem,
            crate::models::OrderView,
            crate::models::OrderLineView,
            crate::models::CustomerView,
            crate::models::ReviewView,
            crate::models::OrdersResponse,
            crate::models::OrderResponse,
            crate::models::StatusUpdateRequest,
            crate::models::StatusUpdateResponse,
            crate::models::AdminStatusUpdateRequest,
            crate::models::ReviewActionRequest,
            crate::models::AckResponse,
            crate::models::VerifyCodeRequest,
            crate::models::VerifyCodeResponse,
            crate::models::UserProfileView,
            crate::models::UserProfileResponse,
            crate::models::RegisterUserRequest,
            crate::models::RegisteredUser,
            crate::models::RegisterUserResponse,
            crate::models::ApiErrorResponse,
            crate::error::FieldError
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "menu", description = "Public menu"),
        (name = "orders", description = "Order submission and tracking"),
        (name = "admin", description = "Kitchen admin endpoints"),
        (name = "auth", description = "Kitchen admin login"),
        (name = "users", description = "Telegram customer profiles"),
        (name = "telegram", description = "Telegram bot webhook")
    ),
    info(
        title = "Pynk API Gateway",
        description = "HTTP surface of the Pynk ordering system",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::*;
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_KEY_HEADER))),
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! An in-process stand-in for the order service, and helpers to drive the
    //! router against it.

    use std::sync::Mutex;

    use axum::{body::Body, http::Request, response::Response};
    use pynk_proto::{
        auth_service::{
            GetTokenInfoPayload, TokenInfo, TokenResponse, VerifyLoginCodePayload,
            auth_service_server::{AuthService, AuthServiceServer},
        },
        menu_service::{
            CreateMenuItemPayload, DeleteMenuItemPayload, DeleteMenuItemResponse,
            GetMenuItemPayload, ListMenuItemsPayload, ListMenuItemsResponse, MenuItem,
            UpdateMenuItemPayload,
            menu_service_server::{MenuService, MenuServiceServer},
        },
        order_service::{
            CreateOrderPayload, CustomerContact, GetOrderPayload, ListOrdersPayload,
            ListOrdersResponse, Order, OrderLineItem, RequestReviewPayload, SubmitReviewPayload,
            UpdateOrderStatusPayload,
            order_service_server::{OrderService, OrderServiceServer},
        },
        user_service::{
            GetUserByTelegramPayload, GetUserByTelegramResponse, StartBotSessionPayload,
            UpsertUserPayload, User, UserProfile,
            user_service_server::{UserService, UserServiceServer},
        },
    };
    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{Request as RpcRequest, Response as RpcResponse, Status, transport::Server};
    use tower::ServiceExt;

    use super::*;

    pub const ADMIN_KEY: &str = "kitchen-key";
    pub const GOOD_TOKEN: &str = "good-token";
    pub const GOOD_CODE: &str = "ABC234";

    /// Records what reached the backend so tests can assert on it.
    #[derive(Default)]
    pub struct Backend {
        pub orders: Mutex<Vec<CreateOrderPayload>>,
        pub status_updates: Mutex<Vec<UpdateOrderStatusPayload>>,
        pub reviews: Mutex<Vec<SubmitReviewPayload>>,
        pub review_requests: Mutex<Vec<String>>,
        pub bot_sessions: Mutex<Vec<StartBotSessionPayload>>,
        pub login_codes_requested: Mutex<u32>,
    }

    #[derive(Clone)]
    pub struct FakeOrderService(pub Arc<Backend>);

    pub fn sample_item(id: i32, active: bool) -> MenuItem {
        MenuItem {
            id,
            name_en: format!("Dish {id}"),
            name_de: format!("Gericht {id}"),
            description_en: Some("Tasty".into()),
            description_de: None,
            ingredients_en: vec!["Rice".into()],
            ingredients_de: vec!["Reis".into()],
            spicy_level: 2,
            price_cents: 850,
            images: vec![format!("https://img.example/{id}.jpg")],
            active,
        }
    }

    pub fn sample_order(code: &str) -> Order {
        Order {
            id: 7,
            public_code: code.to_string(),
            user_id: None,
            telegram_user_id: Some("4242".into()),
            total_cents: 2150,
            customer: Some(CustomerContact {
                name: Some("Asha".into()),
                phone: None,
                email: None,
                language: None,
            }),
            delivery_method: DeliveryMethod::Pickup as i32,
            notes: None,
            status: "new".into(),
            review: None,
            created_at: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 0,
            }),
            updated_at: None,
            fulfilled_at: None,
            line_items: vec![OrderLineItem {
                id: 1,
                item_code: Some("1".into()),
                item_name: "Samosa Chaat".into(),
                item_name_de: "Samosa Chaat".into(),
                unit_price_cents: 850,
                quantity: 2,
                line_total_cents: 1700,
                image_url: None,
            }],
        }
    }

    #[tonic::async_trait]
    impl MenuService for FakeOrderService {
        async fn list_menu_items(
            &self,
            request: RpcRequest<ListMenuItemsPayload>,
        ) -> Result<RpcResponse<ListMenuItemsResponse>, Status> {
            let mut menu_items = vec![sample_item(1, true)];
            if request.into_inner().include_inactive {
                menu_items.push(sample_item(2, false));
            }
            Ok(RpcResponse::new(ListMenuItemsResponse { menu_items }))
        }

        async fn get_menu_item(
            &self,
            request: RpcRequest<GetMenuItemPayload>,
        ) -> Result<RpcResponse<MenuItem>, Status> {
            match request.into_inner().id {
                1 => Ok(RpcResponse::new(sample_item(1, true))),
                id => Err(Status::not_found(format!("Menu item {id} not found"))),
            }
        }

        async fn create_menu_item(
            &self,
            request: RpcRequest<CreateMenuItemPayload>,
        ) -> Result<RpcResponse<MenuItem>, Status> {
            let payload = request.into_inner();
            let mut item = sample_item(9, payload.active.unwrap_or(true));
            item.name_en = payload.name_en;
            item.price_cents = (payload.price_euros * 100.0).round() as i32;
            Ok(RpcResponse::new(item))
        }

        async fn update_menu_item(
            &self,
            request: RpcRequest<UpdateMenuItemPayload>,
        ) -> Result<RpcResponse<MenuItem>, Status> {
            let payload = request.into_inner();
            if payload.id != 1 {
                return Err(Status::not_found(format!("Menu item {} not found", payload.id)));
            }
            let mut item = sample_item(1, payload.active.unwrap_or(true));
            if let Some(images) = payload.images {
                item.images = images.values;
            }
            Ok(RpcResponse::new(item))
        }

        async fn delete_menu_item(
            &self,
            request: RpcRequest<DeleteMenuItemPayload>,
        ) -> Result<RpcResponse<DeleteMenuItemResponse>, Status> {
            Ok(RpcResponse::new(DeleteMenuItemResponse {
                deleted: request.into_inner().id == 1,
            }))
        }
    }

    #[tonic::async_trait]
    impl OrderService for FakeOrderService {
        async fn create_order(
            &self,
            request: RpcRequest<CreateOrderPayload>,
        ) -> Result<RpcResponse<Order>, Status> {
            let payload = request.into_inner();
            if payload.items.iter().any(|i| i.menu_item_id == 404) {
                return Err(Status::not_found("Item not found or inactive: 404"));
            }
            self.0.orders.lock().unwrap().push(payload);
            Ok(RpcResponse::new(sample_order("070301")))
        }

        async fn get_order(
            &self,
            request: RpcRequest<GetOrderPayload>,
        ) -> Result<RpcResponse<Order>, Status> {
            Ok(RpcResponse::new(sample_order(&request.into_inner().public_code)))
        }

        async fn list_orders(
            &self,
            request: RpcRequest<ListOrdersPayload>,
        ) -> Result<RpcResponse<ListOrdersResponse>, Status> {
            let payload = request.into_inner();
            let orders = match payload.telegram_user_id.as_deref() {
                Some("4242") | None => vec![sample_order("070302"), sample_order("070301")],
                Some(_) => vec![],
            };
            Ok(RpcResponse::new(ListOrdersResponse { orders }))
        }

        async fn update_order_status(
            &self,
            request: RpcRequest<UpdateOrderStatusPayload>,
        ) -> Result<RpcResponse<Order>, Status> {
            let payload = request.into_inner();
            if payload.status == "bogus" {
                return Err(Status::invalid_argument("unknown order status `bogus`"));
            }
            if payload.public_code == "999999" {
                return Err(Status::not_found("Order not found"));
            }
            let mut order = sample_order(&payload.public_code);
            order.status = payload.status.clone();
            self.0.status_updates.lock().unwrap().push(payload);
            Ok(RpcResponse::new(order))
        }

        async fn request_review(
            &self,
            request: RpcRequest<RequestReviewPayload>,
        ) -> Result<RpcResponse<Order>, Status> {
            let code = request.into_inner().public_code;
            self.0.review_requests.lock().unwrap().push(code.clone());
            Ok(RpcResponse::new(sample_order(&code)))
        }

        async fn submit_review(
            &self,
            request: RpcRequest<SubmitReviewPayload>,
        ) -> Result<RpcResponse<Order>, Status> {
            let payload = request.into_inner();
            if payload.public_code == "999999" {
                return Err(Status::not_found("Order not found"));
            }
            let order = sample_order(&payload.public_code);
            self.0.reviews.lock().unwrap().push(payload);
            Ok(RpcResponse::new(order))
        }
    }

    fn sample_user(telegram_user_id: String) -> User {
        User {
            id: 3,
            telegram_user_id,
            first_name: Some("Asha".into()),
            last_name: None,
            username: Some("asha".into()),
            phone: None,
            email: None,
            language_code: Some("en".into()),
            chat_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tonic::async_trait]
    impl UserService for FakeOrderService {
        async fn upsert_user(
            &self,
            request: RpcRequest<UpsertUserPayload>,
        ) -> Result<RpcResponse<User>, Status> {
            let payload = request.into_inner();
            let mut user = sample_user(payload.telegram_user_id);
            user.email = payload.email;
            Ok(RpcResponse::new(user))
        }

        async fn get_user_by_telegram(
            &self,
            request: RpcRequest<GetUserByTelegramPayload>,
        ) -> Result<RpcResponse<GetUserByTelegramResponse>, Status> {
            let id = request.into_inner().telegram_user_id;
            let profile = (id == "4242").then(|| UserProfile {
                user: Some(sample_user(id)),
                orders_count: 2,
                last_order_code: Some("070302".into()),
                last_order_at: None,
            });
            Ok(RpcResponse::new(GetUserByTelegramResponse { profile }))
        }

        async fn start_bot_session(
            &self,
            request: RpcRequest<StartBotSessionPayload>,
        ) -> Result<RpcResponse<User>, Status> {
            let payload = request.into_inner();
            if payload.telegram_user_id == "500" {
                return Err(Status::internal("database error"));
            }
            let user = sample_user(payload.telegram_user_id.clone());
            self.0.bot_sessions.lock().unwrap().push(payload);
            Ok(RpcResponse::new(user))
        }
    }

    #[tonic::async_trait]
    impl AuthService for FakeOrderService {
        async fn request_login_code(
            &self,
            _request: RpcRequest<()>,
        ) -> Result<RpcResponse<()>, Status> {
            *self.0.login_codes_requested.lock().unwrap() += 1;
            Ok(RpcResponse::new(()))
        }

        async fn verify_login_code(
            &self,
            request: RpcRequest<VerifyLoginCodePayload>,
        ) -> Result<RpcResponse<TokenResponse>, Status> {
            if request.into_inner().code != GOOD_CODE {
                return Err(Status::unauthenticated("Invalid or expired code"));
            }
            Ok(RpcResponse::new(TokenResponse {
                token_type: "Bearer".into(),
                access_token: GOOD_TOKEN.into(),
                expires_in: 28_800,
            }))
        }

        async fn get_token_info(
            &self,
            request: RpcRequest<GetTokenInfoPayload>,
        ) -> Result<RpcResponse<TokenInfo>, Status> {
            if request.into_inner().token != GOOD_TOKEN {
                return Err(Status::unauthenticated("Invalid token"));
            }
            Ok(RpcResponse::new(TokenInfo {
                role: "admin".into(),
            }))
        }
    }

    /// Serves the fake on an ephemeral port and returns a router wired to it.
    pub async fn app_with_backend() -> (Router, Arc<Backend>) {
        let backend = Arc::new(Backend::default());
        let fake = FakeOrderService(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            Server::builder()
                .add_service(MenuServiceServer::new(fake.clone()))
                .add_service(OrderServiceServer::new(fake.clone()))
                .add_service(UserServiceServer::new(fake.clone()))
                .add_service(AuthServiceServer::new(fake))
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .unwrap();
        });

        let channel = tonic::transport::Endpoint::from_shared(format!("http://{addr}"))
            .unwrap()
            .connect_lazy();
        (app(AppState::new(channel, Some(ADMIN_KEY.into()))), backend)
    }

    /// A router whose backend refuses every connection.
    pub fn app_without_backend() -> Router {
        let channel = tonic::transport::Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        app(AppState::new(channel, Some(ADMIN_KEY.into())))
    }

    pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn send(app: Router, request: Request<Body>) -> (u16, serde_json::Value) {
        let response: Response = app.oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
