use std::sync::Arc;

use chrono::{DateTime, Utc};
use diesel::{Connection, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use prost_types::Timestamp;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing_subscriber::EnvFilter;

use pynk_order_service::admin_auth::AdminAuth;
use pynk_order_service::catalog::{MenuItemDraft, MenuItemPatch};
use pynk_order_service::config::ServiceConfig;
use pynk_order_service::models::{self, DeliveryMethod, NewAppUser, OrderDetails};
use pynk_order_service::notifications::Dispatcher;
use pynk_order_service::orders::{CustomerContact, LineRequest, OrderDraft};
use pynk_order_service::service::OrderingService;
use pynk_order_service::users::UserProfile;
use pynk_order_service::build_pool;

use pynk_proto::auth_service::auth_service_server::{AuthService, AuthServiceServer};
use pynk_proto::auth_service::{GetTokenInfoPayload, TokenInfo, TokenResponse, VerifyLoginCodePayload};
use pynk_proto::menu_service::menu_service_server::{MenuService, MenuServiceServer};
use pynk_proto::menu_service::{
    CreateMenuItemPayload, DeleteMenuItemPayload, DeleteMenuItemResponse, GetMenuItemPayload,
    ListMenuItemsPayload, ListMenuItemsResponse, MenuItem, UpdateMenuItemPayload,
};
use pynk_proto::order_service::order_service_server::{OrderService, OrderServiceServer};
use pynk_proto::order_service::{
    self as order_proto, CreateOrderPayload, GetOrderPayload, ListOrdersPayload,
    ListOrdersResponse, Order, OrderLineItem, RequestReviewPayload, Review, SubmitReviewPayload,
    UpdateOrderStatusPayload,
};
use pynk_proto::user_service::user_service_server::{UserService, UserServiceServer};
use pynk_proto::user_service::{
    GetUserByTelegramPayload, GetUserByTelegramResponse, StartBotSessionPayload,
    UpsertUserPayload, User, UserProfile as ProtoUserProfile,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

fn timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

fn serialize_menu_item(item: models::MenuItem) -> MenuItem {
    MenuItem {
        id: item.id,
        name_en: item.name_en,
        name_de: item.name_de,
        description_en: item.description_en,
        description_de: item.description_de,
        ingredients_en: item.ingredients_en,
        ingredients_de: item.ingredients_de,
        spicy_level: item.spicy_level,
        price_cents: item.price_cents,
        images: item.images,
        active: item.active,
    }
}

fn serialize_order(details: OrderDetails) -> Order {
    let OrderDetails { order, items } = details;
    Order {
        id: order.id,
        public_code: order.public_code,
        user_id: order.user_id,
        telegram_user_id: order.telegram_user_id,
        total_cents: order.total_cents,
        customer: Some(order_proto::CustomerContact {
            name: order.raw_customer_name,
            phone: order.raw_customer_phone,
            email: order.raw_customer_email,
            language: None,
        }),
        delivery_method: order_proto::DeliveryMethod::from(order.delivery_method).into(),
        notes: order.notes,
        status: order.status.to_string(),
        review: Some(Review {
            requested_at: order.review_requested_at.map(timestamp),
            rating: order.review_rating,
            comment: order.review_comment,
        }),
        created_at: Some(timestamp(order.created_at)),
        updated_at: Some(timestamp(order.updated_at)),
        fulfilled_at: order.fulfilled_at.map(timestamp),
        line_items: items
            .into_iter()
            .map(|i| OrderLineItem {
                id: i.id,
                item_code: i.item_code,
                item_name: i.item_name,
                item_name_de: i.item_name_de,
                unit_price_cents: i.unit_price_cents,
                quantity: i.quantity,
                line_total_cents: i.line_total_cents,
                image_url: i.image_url,
            })
            .collect(),
    }
}

fn serialize_user(user: models::AppUser) -> User {
    User {
        id: user.id,
        telegram_user_id: user.telegram_user_id,
        first_name: user.first_name,
        last_name: user.last_name,
        username: user.username,
        phone: user.phone,
        email: user.email,
        language_code: user.language_code,
        chat_id: user.chat_id,
        created_at: Some(timestamp(user.created_at)),
        updated_at: Some(timestamp(user.updated_at)),
    }
}

fn serialize_profile(profile: UserProfile) -> ProtoUserProfile {
    ProtoUserProfile {
        user: Some(serialize_user(profile.user)),
        orders_count: profile.orders_count,
        last_order_code: profile.last_order_code,
        last_order_at: profile.last_order_at.map(timestamp),
    }
}

fn deserialize_order_payload(
    payload: CreateOrderPayload,
) -> Result<(OrderDraft, Option<NewAppUser>), Status> {
    let delivery_method = order_proto::DeliveryMethod::try_from(payload.delivery_method)
        .map_err(|_| Status::invalid_argument("Invalid delivery_method"))?;
    let customer = payload.customer.unwrap_or_default();
    let identity = payload
        .telegram
        .filter(|t| !t.telegram_user_id.trim().is_empty())
        .map(|t| NewAppUser {
            telegram_user_id: t.telegram_user_id,
            first_name: t.first_name,
            last_name: t.last_name,
            username: t.username,
            phone: customer.phone.clone(),
            email: customer.email.clone(),
            language_code: customer.language.clone(),
            chat_id: None,
        });

    let draft = OrderDraft {
        items: payload
            .items
            .into_iter()
            .map(|i| LineRequest {
                menu_item_id: i.menu_item_id,
                quantity: i.quantity,
            })
            .collect(),
        delivery_method: DeliveryMethod::from(delivery_method),
        customer: CustomerContact {
            name: customer.name,
            phone: customer.phone,
            email: customer.email,
        },
        notes: payload.notes.filter(|n| !n.trim().is_empty()),
        telegram_user_id: identity.as_ref().map(|u| u.telegram_user_id.trim().to_string()),
        client_total_cents: payload.client_total_cents,
    };
    Ok((draft, identity))
}

fn string_list(list: Option<pynk_proto::menu_service::StringList>) -> Option<Vec<String>> {
    list.map(|l| l.values)
}

pub struct MenuServiceImpl {
    service: Arc<OrderingService>,
}

#[tonic::async_trait]
impl MenuService for MenuServiceImpl {
    async fn list_menu_items(
        &self,
        request: Request<ListMenuItemsPayload>,
    ) -> Result<Response<ListMenuItemsResponse>, Status> {
        let payload = request.into_inner();
        let items = self.service.list_menu(payload.include_inactive).await?;
        Ok(Response::new(ListMenuItemsResponse {
            menu_items: items.into_iter().map(serialize_menu_item).collect(),
        }))
    }

    async fn get_menu_item(
        &self,
        request: Request<GetMenuItemPayload>,
    ) -> Result<Response<MenuItem>, Status> {
        let payload = request.into_inner();
        let item = self
            .service
            .get_menu_item(payload.id, payload.include_inactive)
            .await?;
        Ok(Response::new(serialize_menu_item(item)))
    }

    async fn create_menu_item(
        &self,
        request: Request<CreateMenuItemPayload>,
    ) -> Result<Response<MenuItem>, Status> {
        let payload = request.into_inner();
        let item = self
            .service
            .create_menu_item(MenuItemDraft {
                name_en: payload.name_en,
                name_de: payload.name_de,
                description_en: payload.description_en,
                description_de: payload.description_de,
                ingredients_en: payload.ingredients_en,
                ingredients_de: payload.ingredients_de,
                spicy_level: payload.spicy_level,
                price_euros: payload.price_euros,
                images: payload.images,
                active: payload.active,
            })
            .await?;
        Ok(Response::new(serialize_menu_item(item)))
    }

    async fn update_menu_item(
        &self,
        request: Request<UpdateMenuItemPayload>,
    ) -> Result<Response<MenuItem>, Status> {
        let payload = request.into_inner();
        let item = self
            .service
            .update_menu_item(
                payload.id,
                MenuItemPatch {
                    name_en: payload.name_en,
                    name_de: payload.name_de,
                    description_en: payload.description_en,
                    description_de: payload.description_de,
                    ingredients_en: string_list(payload.ingredients_en),
                    ingredients_de: string_list(payload.ingredients_de),
                    spicy_level: payload.spicy_level,
                    price_euros: payload.price_euros,
                    images: string_list(payload.images),
                    active: payload.active,
                },
            )
            .await?;
        Ok(Response::new(serialize_menu_item(item)))
    }

    async fn delete_menu_item(
        &self,
        request: Request<DeleteMenuItemPayload>,
    ) -> Result<Response<DeleteMenuItemResponse>, Status> {
        let deleted = self.service.delete_menu_item(request.into_inner().id).await?;
        Ok(Response::new(DeleteMenuItemResponse { deleted }))
    }
}

pub struct OrderServiceImpl {
    service: Arc<OrderingService>,
}

#[tonic::async_trait]
impl OrderService for OrderServiceImpl {
    async fn create_order(
        &self,
        request: Request<CreateOrderPayload>,
    ) -> Result<Response<Order>, Status> {
        let (draft, identity) = deserialize_order_payload(request.into_inner())?;
        let details = self.service.create_order(draft, identity).await?;
        Ok(Response::new(serialize_order(details)))
    }

    async fn get_order(
        &self,
        request: Request<GetOrderPayload>,
    ) -> Result<Response<Order>, Status> {
        let details = self
            .service
            .get_order(request.into_inner().public_code)
            .await?;
        Ok(Response::new(serialize_order(details)))
    }

    async fn list_orders(
        &self,
        request: Request<ListOrdersPayload>,
    ) -> Result<Response<ListOrdersResponse>, Status> {
        let payload = request.into_inner();
        let orders = self
            .service
            .list_orders(
                payload.telegram_user_id.filter(|id| !id.is_empty()),
                payload.limit,
            )
            .await?;
        Ok(Response::new(ListOrdersResponse {
            orders: orders.into_iter().map(serialize_order).collect(),
        }))
    }

    async fn update_order_status(
        &self,
        request: Request<UpdateOrderStatusPayload>,
    ) -> Result<Response<Order>, Status> {
        let payload = request.into_inner();
        let code = payload.public_code;
        self.service
            .update_status(code.clone(), payload.status)
            .await?
            .map(|details| Response::new(serialize_order(details)))
            .ok_or_else(|| Status::not_found(format!("order {code} not found")))
    }

    async fn request_review(
        &self,
        request: Request<RequestReviewPayload>,
    ) -> Result<Response<Order>, Status> {
        let code = request.into_inner().public_code;
        self.service
            .request_review(code.clone())
            .await?
            .map(|details| Response::new(serialize_order(details)))
            .ok_or_else(|| Status::not_found(format!("order {code} not found")))
    }

    async fn submit_review(
        &self,
        request: Request<SubmitReviewPayload>,
    ) -> Result<Response<Order>, Status> {
        let payload = request.into_inner();
        let code = payload.public_code;
        self.service
            .submit_review(code.clone(), payload.rating, payload.comment)
            .await?
            .map(|details| Response::new(serialize_order(details)))
            .ok_or_else(|| Status::not_found(format!("order {code} not found")))
    }
}

pub struct UserServiceImpl {
    service: Arc<OrderingService>,
}

#[tonic::async_trait]
impl UserService for UserServiceImpl {
    async fn upsert_user(
        &self,
        request: Request<UpsertUserPayload>,
    ) -> Result<Response<User>, Status> {
        let payload = request.into_inner();
        let user = self
            .service
            .upsert_user(NewAppUser {
                telegram_user_id: payload.telegram_user_id,
                first_name: payload.first_name,
                last_name: payload.last_name,
                username: payload.username,
                phone: payload.phone,
                email: payload.email,
                language_code: payload.language_code,
                chat_id: payload.chat_id,
            })
            .await?;
        Ok(Response::new(serialize_user(user)))
    }

    async fn get_user_by_telegram(
        &self,
        request: Request<GetUserByTelegramPayload>,
    ) -> Result<Response<GetUserByTelegramResponse>, Status> {
        let profile = self
            .service
            .user_profile(request.into_inner().telegram_user_id)
            .await?;
        Ok(Response::new(GetUserByTelegramResponse {
            profile: profile.map(serialize_profile),
        }))
    }

    async fn start_bot_session(
        &self,
        request: Request<StartBotSessionPayload>,
    ) -> Result<Response<User>, Status> {
        let payload = request.into_inner();
        let user = self
            .service
            .start_bot_session(
                NewAppUser {
                    telegram_user_id: payload.telegram_user_id,
                    first_name: payload.first_name,
                    last_name: payload.last_name,
                    username: payload.username,
                    language_code: payload.language_code,
                    ..Default::default()
                },
                payload.chat_id,
            )
            .await?;
        Ok(Response::new(serialize_user(user)))
    }
}

pub struct AuthServiceImpl {
    service: Arc<OrderingService>,
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn request_login_code(&self, _request: Request<()>) -> Result<Response<()>, Status> {
        self.service.request_login_code().await?;
        Ok(Response::new(()))
    }

    async fn verify_login_code(
        &self,
        request: Request<VerifyLoginCodePayload>,
    ) -> Result<Response<TokenResponse>, Status> {
        let token = self
            .service
            .verify_login_code(request.into_inner().code)
            .await?;
        Ok(Response::new(TokenResponse {
            token_type: "Bearer".to_string(),
            access_token: token.access_token,
            expires_in: token.expires_in,
        }))
    }

    async fn get_token_info(
        &self,
        request: Request<GetTokenInfoPayload>,
    ) -> Result<Response<TokenInfo>, Status> {
        let claims = self.service.token_info(&request.into_inner().token)?;
        Ok(Response::new(TokenInfo { role: claims.role }))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn migrate(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut conn = PgConnection::establish(database_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| e as Box<dyn std::error::Error>)?;
    tracing::info!(applied = applied.len(), "migrations up to date");
    Ok(())
}

pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let config = ServiceConfig::from_env()?;

    migrate(&config.database_url)?;

    let pool = build_pool(&config.database_url)?;
    let dispatcher = Dispatcher::from_config(&config.telegram)?;
    let service = Arc::new(OrderingService::new(
        pool,
        dispatcher,
        AdminAuth::new(&config.jwt_secret),
    ));

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<OrderServiceServer<OrderServiceImpl>>()
        .await;

    tracing::info!(addr = %config.listen_addr, "order service listening");

    Server::builder()
        .add_service(health_service)
        .add_service(MenuServiceServer::new(MenuServiceImpl {
            service: service.clone(),
        }))
        .add_service(OrderServiceServer::new(OrderServiceImpl {
            service: service.clone(),
        }))
        .add_service(UserServiceServer::new(UserServiceImpl {
            service: service.clone(),
        }))
        .add_service(AuthServiceServer::new(AuthServiceImpl { service }))
        .serve(config.listen_addr)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use pynk_proto::order_service::{MenuItemIdAndQuantity, TelegramIdentity};

    use super::*;

    #[test]
    fn test_order_payload_maps_to_draft_and_identity() {
        let payload = CreateOrderPayload {
            items: vec![MenuItemIdAndQuantity {
                menu_item_id: 1,
                quantity: 2,
            }],
            delivery_method: order_proto::DeliveryMethod::Delivery.into(),
            customer: Some(order_proto::CustomerContact {
                name: Some("Asha".into()),
                phone: Some("+49 170 000".into()),
                email: None,
                language: Some("de".into()),
            }),
            notes: Some("  ".into()),
            telegram: Some(TelegramIdentity {
                telegram_user_id: "42".into(),
                username: Some("asha".into()),
                first_name: None,
                last_name: None,
            }),
            client_total_cents: Some(1700),
        };

        let (draft, identity) = deserialize_order_payload(payload).unwrap();
        assert_eq!(draft.delivery_method, DeliveryMethod::Delivery);
        assert_eq!(draft.items, vec![LineRequest { menu_item_id: 1, quantity: 2 }]);
        assert_eq!(draft.notes, None);
        assert_eq!(draft.telegram_user_id.as_deref(), Some("42"));
        assert_eq!(draft.customer.name.as_deref(), Some("Asha"));

        let identity = identity.unwrap();
        assert_eq!(identity.username.as_deref(), Some("asha"));
        assert_eq!(identity.phone.as_deref(), Some("+49 170 000"));
        assert_eq!(identity.language_code.as_deref(), Some("de"));
    }

    #[test]
    fn test_unknown_delivery_method_is_rejected() {
        let payload = CreateOrderPayload {
            delivery_method: 7,
            ..Default::default()
        };
        let status = deserialize_order_payload(payload).unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_blank_telegram_identity_is_ignored() {
        let payload = CreateOrderPayload {
            telegram: Some(TelegramIdentity {
                telegram_user_id: " ".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (draft, identity) = deserialize_order_payload(payload).unwrap();
        assert!(identity.is_none());
        assert!(draft.telegram_user_id.is_none());
    }

    #[test]
    fn test_migrate_reports_unreachable_database() {
        assert!(migrate("postgres://nobody@127.0.0.1:1/pynk").is_err());
    }

    #[test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    fn test_migrate_is_repeatable() {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").unwrap();
        migrate(&url).unwrap();
        migrate(&url).unwrap();
    }
}
