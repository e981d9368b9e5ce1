use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct LocalizedText {
    pub en: String,
    pub de: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocalizedList {
    pub en: Vec<String>,
    pub de: Vec<String>,
}

/// A dish as the storefront renders it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    pub id: i32,
    pub name: LocalizedText,
    pub description: LocalizedText,
    pub ingredients: LocalizedList,
    pub spicy_level: i32,
    /// Price in euros
    pub price: f64,
    pub images: Vec<String>,
}

/// A dish as the kitchen admin edits it.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminMenuItem {
    pub id: i32,
    pub name_en: String,
    pub name_de: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Vec<String>,
    pub ingredients_de: Vec<String>,
    pub spicy_level: i32,
    pub price_cents: i32,
    /// Price in euros
    pub price: f64,
    pub images: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminMenuItemsResponse {
    pub ok: bool,
    pub items: Vec<AdminMenuItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminMenuItemResponse {
    pub ok: bool,
    pub item: AdminMenuItem,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub name_en: String,
    pub name_de: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Option<Vec<String>>,
    pub ingredients_de: Option<Vec<String>>,
    pub spicy_level: Option<i32>,
    pub price_euros: f64,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Every field is optional; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub name_en: Option<String>,
    pub name_de: Option<String>,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Option<Vec<String>>,
    pub ingredients_de: Option<Vec<String>>,
    pub spicy_level: Option<i32>,
    pub price_euros: Option<f64>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Ids and Telegram user ids arrive as either JSON numbers or strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrString {
    pub fn as_text(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncomingOrderItem {
    #[schema(value_type = String)]
    pub id: NumberOrString,
    pub name: String,
    /// Shown to the customer at checkout; never used for pricing
    pub price: f64,
    pub quantity: f64,
    pub images: Option<Vec<String>>,
    pub name_de: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryRequest {
    pub method: String,
    #[schema(value_type = Object)]
    pub address: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CustomerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<IncomingOrderItem>,
    pub delivery: DeliveryRequest,
    #[schema(value_type = Option<String>)]
    pub telegram_user_id: Option<NumberOrString>,
    pub telegram_username: Option<String>,
    pub telegram_first_name: Option<String>,
    pub telegram_last_name: Option<String>,
    pub customer: Option<CustomerRequest>,
    pub notes: Option<String>,
    /// Cart total as the client computed it, in euros
    pub total: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub ok: bool,
    /// Public order code, e.g. `070301`
    pub order_id: String,
    pub id: i64,
    /// Total in euros, as priced by the kitchen
    pub total: f64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfflineOrderItem {
    pub id: i32,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfflineOrderRequest {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub items: Vec<OfflineOrderItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerView {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    pub id: i64,
    pub item_code: Option<String>,
    pub name: String,
    pub name_de: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub requested_at: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i64,
    pub code: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub status: String,
    /// Total in euros
    pub total: f64,
    pub customer: CustomerView,
    pub delivery_method: String,
    pub notes: Option<String>,
    pub telegram_user_id: Option<String>,
    pub review: ReviewView,
    pub items: Vec<OrderLineView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrdersResponse {
    pub ok: bool,
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub ok: bool,
    pub order: OrderView,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub order_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub ok: bool,
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminStatusUpdateRequest {
    pub code: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewActionRequest {
    /// `request` (admin) or `submit` (customer)
    pub action: Option<String>,
    pub order_id: Option<String>,
    pub rating: Option<i32>,
    pub comment: Option<String>,
    pub admin_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AckResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
            error: None,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub ok: bool,
    pub token_type: String,
    pub access_token: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TelegramUserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileView {
    pub telegram_user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language: Option<String>,
    pub orders_count: i64,
    pub last_order_id: Option<String>,
    pub last_order_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub ok: bool,
    pub user: Option<UserProfileView>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub action: Option<String>,
    #[schema(value_type = Option<String>)]
    pub telegram_user_id: Option<NumberOrString>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: i32,
    pub telegram_user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterUserResponse {
    pub ok: bool,
    pub user: RegisteredUser,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

/// The subset of a Bot API `Update` the webhook reacts to.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<crate::error::FieldError>>,
}
