//! Order store: atomic creation of order header + line items, and read paths.

use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::{insert_into, prelude::*};

use crate::catalog;
use crate::errors::OrderError;
use crate::models::{
    DeliveryMethod, MenuItem, NewOrder, NewOrderItem, Order, OrderDetails, OrderItem, OrderStatus,
};
use crate::schema::{app_users, order_items, orders};
use crate::sequence;

pub const MAX_QUANTITY: i32 = 99;
pub const DEFAULT_LIST_LIMIT: u32 = 100;
pub const CUSTOMER_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    pub menu_item_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub items: Vec<LineRequest>,
    pub delivery_method: DeliveryMethod,
    pub customer: CustomerContact,
    pub notes: Option<String>,
    pub telegram_user_id: Option<String>,
    /// What the client believed the total to be. Only compared and logged.
    pub client_total_cents: Option<i32>,
}

/// A line item priced from the catalog, not yet attached to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub item_code: Option<String>,
    pub item_name: String,
    pub item_name_de: String,
    pub unit_price_cents: i32,
    pub quantity: i32,
    pub line_total_cents: i32,
    pub image_url: Option<String>,
}

impl PricedLine {
    fn attach(self, order_id: i64) -> NewOrderItem {
        NewOrderItem {
            order_id,
            item_code: self.item_code,
            item_name: self.item_name,
            item_name_de: self.item_name_de,
            unit_price_cents: self.unit_price_cents,
            quantity: self.quantity,
            line_total_cents: self.line_total_cents,
            image_url: self.image_url,
        }
    }
}

/// Prices every requested line from `catalog_items`. Client prices never
/// enter the calculation. Fails on the first id missing from the catalog.
pub fn price_lines(
    requests: &[LineRequest],
    catalog_items: &[MenuItem],
) -> Result<(Vec<PricedLine>, i32), OrderError> {
    if requests.is_empty() {
        return Err(OrderError::validation("No items"));
    }
    let by_id: HashMap<i32, &MenuItem> = catalog_items.iter().map(|m| (m.id, m)).collect();

    let mut total: i32 = 0;
    let mut lines = Vec::with_capacity(requests.len());
    for request in requests {
        if !(1..=MAX_QUANTITY).contains(&request.quantity) {
            return Err(OrderError::validation(format!(
                "quantity for item {} must be between 1 and {MAX_QUANTITY}",
                request.menu_item_id
            )));
        }
        let item = by_id
            .get(&request.menu_item_id)
            .ok_or(OrderError::ItemUnavailable(request.menu_item_id))?;
        let line_total = item
            .price_cents
            .checked_mul(request.quantity)
            .ok_or_else(|| OrderError::validation("order total is too large"))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| OrderError::validation("order total is too large"))?;

        lines.push(PricedLine {
            item_code: Some(item.id.to_string()),
            item_name: item.name_en.clone(),
            item_name_de: item.name_de.clone(),
            unit_price_cents: item.price_cents,
            quantity: request.quantity,
            line_total_cents: line_total,
            image_url: item.images.first().cloned(),
        });
    }
    Ok((lines, total))
}

/// Creates an order dated `business_date`.
///
/// Catalog lookup and pricing happen before the transaction; the ordinal,
/// header and items are written in one transaction so none of them
/// survives without the others.
#[tracing::instrument(skip(conn, draft), fields(lines = draft.items.len()))]
pub fn create_order(
    conn: &mut PgConnection,
    draft: OrderDraft,
    business_date: NaiveDate,
) -> Result<OrderDetails, OrderError> {
    if draft.items.is_empty() {
        return Err(OrderError::validation("No items"));
    }
    let ids: Vec<i32> = draft.items.iter().map(|l| l.menu_item_id).collect();
    let catalog_items = catalog::get_by_ids(conn, &ids)?;
    let (lines, total_cents) = price_lines(&draft.items, &catalog_items)?;

    if let Some(client_total) = draft.client_total_cents {
        if client_total != total_cents {
            tracing::warn!(
                client_total_cents = client_total,
                total_cents,
                "client total differs from catalog total"
            );
        }
    }

    let user_id = match &draft.telegram_user_id {
        Some(tg_id) => app_users::table
            .select(app_users::id)
            .filter(app_users::telegram_user_id.eq(tg_id))
            .first::<i32>(conn)
            .optional()
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "could not resolve user for order");
                None
            }),
        None => None,
    };

    conn.transaction(|conn| {
        let public_code = sequence::next_code(conn, business_date)?;
        let order = insert_into(orders::table)
            .values(&NewOrder {
                public_code,
                seq_date: business_date,
                user_id,
                telegram_user_id: draft.telegram_user_id,
                total_cents,
                raw_customer_name: draft.customer.name,
                raw_customer_phone: draft.customer.phone,
                raw_customer_email: draft.customer.email,
                delivery_method: draft.delivery_method,
                notes: draft.notes,
                status: OrderStatus::New,
            })
            .returning(Order::as_returning())
            .get_result(conn)?;

        let new_items: Vec<NewOrderItem> =
            lines.into_iter().map(|line| line.attach(order.id)).collect();
        let items = insert_into(order_items::table)
            .values(&new_items)
            .returning(OrderItem::as_returning())
            .get_results(conn)?;

        tracing::info!(public_code = %order.public_code, total_cents, "order created");
        Ok(OrderDetails { order, items })
    })
}

/// Attaches `user_id` to an order placed before its customer had a row.
pub fn link_user(conn: &mut PgConnection, order_id: i64, user_id: i32) -> QueryResult<Order> {
    diesel::update(orders::table.find(order_id))
        .set(orders::user_id.eq(user_id))
        .returning(Order::as_returning())
        .get_result(conn)
}

/// The most recent order carrying `code`. Codes repeat once a year.
pub fn find_order_by_code(conn: &mut PgConnection, code: &str) -> QueryResult<Option<Order>> {
    orders::table
        .select(Order::as_select())
        .filter(orders::public_code.eq(code))
        .order((orders::created_at.desc(), orders::id.desc()))
        .first(conn)
        .optional()
}

pub fn find_by_code(conn: &mut PgConnection, code: &str) -> QueryResult<Option<OrderDetails>> {
    match find_order_by_code(conn, code)? {
        Some(order) => with_items(conn, order).map(Some),
        None => Ok(None),
    }
}

pub fn with_items(conn: &mut PgConnection, order: Order) -> QueryResult<OrderDetails> {
    let items = OrderItem::belonging_to(&order)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load(conn)?;
    Ok(OrderDetails { order, items })
}

fn attach_items(conn: &mut PgConnection, headers: Vec<Order>) -> QueryResult<Vec<OrderDetails>> {
    let items = OrderItem::belonging_to(&headers)
        .select(OrderItem::as_select())
        .order(order_items::id.asc())
        .load(conn)?;
    Ok(items
        .grouped_by(&headers)
        .into_iter()
        .zip(headers)
        .map(|(items, order)| OrderDetails { order, items })
        .collect())
}

pub fn clamp_limit(limit: Option<u32>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, DEFAULT_LIST_LIMIT) as i64
}

/// Newest orders first, for the admin board.
pub fn list_recent(conn: &mut PgConnection, limit: Option<u32>) -> QueryResult<Vec<OrderDetails>> {
    let headers = orders::table
        .select(Order::as_select())
        .order((orders::created_at.desc(), orders::id.desc()))
        .limit(clamp_limit(limit))
        .load(conn)?;
    attach_items(conn, headers)
}

pub fn list_by_telegram_user(
    conn: &mut PgConnection,
    telegram_user_id: &str,
) -> QueryResult<Vec<OrderDetails>> {
    let headers = orders::table
        .select(Order::as_select())
        .filter(orders::telegram_user_id.eq(telegram_user_id))
        .order((orders::created_at.desc(), orders::id.desc()))
        .limit(CUSTOMER_HISTORY_LIMIT)
        .load(conn)?;
    attach_items(conn, headers)
}
