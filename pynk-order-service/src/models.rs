use std::fmt;
use std::io::Write;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
};

use crate::schema::{admin_login_codes, app_users, menu_items, order_items, orders};

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Hash, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::OrderStatus)]
pub enum OrderStatus {
    New,
    Preparing,
    Ready,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Fulfilled,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Fulfilled => "fulfilled",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl ToSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::OrderStatus, Pg> for OrderStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"new" => Ok(OrderStatus::New),
            b"preparing" => Ok(OrderStatus::Preparing),
            b"ready" => Ok(OrderStatus::Ready),
            b"fulfilled" => Ok(OrderStatus::Fulfilled),
            b"cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

#[derive(FromSqlRow, AsExpression, PartialEq, Eq, Copy, Clone, Debug)]
#[diesel(sql_type = crate::schema::sql_types::DeliveryMethod)]
pub enum DeliveryMethod {
    Pickup,
    Delivery,
}

impl ToSql<crate::schema::sql_types::DeliveryMethod, Pg> for DeliveryMethod {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        match *self {
            DeliveryMethod::Pickup => out.write_all(b"pickup")?,
            DeliveryMethod::Delivery => out.write_all(b"delivery")?,
        }
        Ok(IsNull::No)
    }
}

impl FromSql<crate::schema::sql_types::DeliveryMethod, Pg> for DeliveryMethod {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"pickup" => Ok(DeliveryMethod::Pickup),
            b"delivery" => Ok(DeliveryMethod::Delivery),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl From<pynk_proto::order_service::DeliveryMethod> for DeliveryMethod {
    fn from(m: pynk_proto::order_service::DeliveryMethod) -> Self {
        match m {
            pynk_proto::order_service::DeliveryMethod::Pickup => DeliveryMethod::Pickup,
            pynk_proto::order_service::DeliveryMethod::Delivery => DeliveryMethod::Delivery,
        }
    }
}

impl From<DeliveryMethod> for pynk_proto::order_service::DeliveryMethod {
    fn from(m: DeliveryMethod) -> Self {
        match m {
            DeliveryMethod::Pickup => pynk_proto::order_service::DeliveryMethod::Pickup,
            DeliveryMethod::Delivery => pynk_proto::order_service::DeliveryMethod::Delivery,
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct MenuItem {
    pub id: i32,
    pub name_en: String,
    pub name_de: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Vec<String>,
    pub ingredients_de: Vec<String>,
    pub spicy_level: i32,
    pub price_cents: i32,
    pub images: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub name_en: String,
    pub name_de: String,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Vec<String>,
    pub ingredients_de: Vec<String>,
    pub spicy_level: i32,
    pub price_cents: i32,
    pub images: Vec<String>,
    pub active: bool,
}

/// Partial update of a menu item. `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Default, PartialEq)]
#[diesel(table_name = menu_items)]
pub struct MenuItemChanges {
    pub name_en: Option<String>,
    pub name_de: Option<String>,
    pub description_en: Option<String>,
    pub description_de: Option<String>,
    pub ingredients_en: Option<Vec<String>>,
    pub ingredients_de: Option<Vec<String>>,
    pub spicy_level: Option<i32>,
    pub price_cents: Option<i32>,
    pub images: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: i64,
    pub public_code: String,
    pub seq_date: NaiveDate,
    pub user_id: Option<i32>,
    pub telegram_user_id: Option<String>,
    pub total_cents: i32,
    pub raw_customer_name: Option<String>,
    pub raw_customer_phone: Option<String>,
    pub raw_customer_email: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub notes: Option<String>,
    pub status: OrderStatus,
    pub review_requested_at: Option<DateTime<Utc>>,
    pub review_rating: Option<i32>,
    pub review_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub public_code: String,
    pub seq_date: NaiveDate,
    pub user_id: Option<i32>,
    pub telegram_user_id: Option<String>,
    pub total_cents: i32,
    pub raw_customer_name: Option<String>,
    pub raw_customer_phone: Option<String>,
    pub raw_customer_email: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub notes: Option<String>,
    pub status: OrderStatus,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Order))]
#[diesel(table_name = order_items)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub item_code: Option<String>,
    pub item_name: String,
    pub item_name_de: String,
    pub unit_price_cents: i32,
    pub quantity: i32,
    pub line_total_cents: i32,
    pub image_url: Option<String>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub item_code: Option<String>,
    pub item_name: String,
    pub item_name_de: String,
    pub unit_price_cents: i32,
    pub quantity: i32,
    pub line_total_cents: i32,
    pub image_url: Option<String>,
}

/// An order header together with its line items.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = app_users)]
pub struct AppUser {
    pub id: i32,
    pub telegram_user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language_code: Option<String>,
    pub chat_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Default, Clone, PartialEq)]
#[diesel(table_name = app_users)]
pub struct NewAppUser {
    pub telegram_user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub language_code: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Debug, PartialEq)]
#[diesel(table_name = admin_login_codes)]
pub struct AdminLoginCode {
    pub id: i32,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = admin_login_codes)]
pub struct NewAdminLoginCode {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}
