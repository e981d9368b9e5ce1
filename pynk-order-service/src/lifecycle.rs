//! Status and review mutations on existing orders.
//!
//! Every operation addresses the order by public code and returns `None`
//! when no order carries that code.

use chrono::Utc;
use diesel::{prelude::*, update};

use crate::errors::OrderError;
use crate::models::{OrderDetails, OrderStatus};
use crate::orders::{find_order_by_code, with_items};
use crate::schema::orders;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

pub fn parse_status(status: &str) -> Result<OrderStatus, OrderError> {
    status
        .parse()
        .map_err(|e: crate::models::UnknownStatus| OrderError::validation(e.to_string()))
}

pub fn validate_rating(rating: Option<i32>) -> Result<(), OrderError> {
    match rating {
        Some(r) if !(MIN_RATING..=MAX_RATING).contains(&r) => Err(OrderError::validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        ))),
        _ => Ok(()),
    }
}

/// Any known status may replace any other. `fulfilled_at` is stamped when
/// the order moves into `fulfilled` and is never cleared afterwards.
#[tracing::instrument(skip(conn))]
pub fn update_status(
    conn: &mut PgConnection,
    code: &str,
    status: &str,
) -> Result<Option<OrderDetails>, OrderError> {
    let status = parse_status(status)?;

    conn.transaction(|conn| {
        let Some(order) = find_order_by_code(conn, code)? else {
            return Ok(None);
        };
        let now = Utc::now();
        let fulfilled_at = if status == OrderStatus::Fulfilled {
            Some(now)
        } else {
            order.fulfilled_at
        };
        let order = update(orders::table.find(order.id))
            .set((
                orders::status.eq(status),
                orders::fulfilled_at.eq(fulfilled_at),
                orders::updated_at.eq(now),
            ))
            .returning(crate::models::Order::as_returning())
            .get_result(conn)?;
        Ok(Some(with_items(conn, order)?))
    })
}

#[tracing::instrument(skip(conn))]
pub fn request_review(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<OrderDetails>, OrderError> {
    conn.transaction(|conn| {
        let Some(order) = find_order_by_code(conn, code)? else {
            return Ok(None);
        };
        let now = Utc::now();
        let order = update(orders::table.find(order.id))
            .set((
                orders::review_requested_at.eq(Some(now)),
                orders::updated_at.eq(now),
            ))
            .returning(crate::models::Order::as_returning())
            .get_result(conn)?;
        Ok(Some(with_items(conn, order)?))
    })
}

/// Stores the customer's rating and comment. Either may be absent; an
/// empty comment is stored as null.
#[tracing::instrument(skip(conn, comment))]
pub fn submit_review(
    conn: &mut PgConnection,
    code: &str,
    rating: Option<i32>,
    comment: Option<String>,
) -> Result<Option<OrderDetails>, OrderError> {
    validate_rating(rating)?;
    let comment = comment.filter(|c| !c.trim().is_empty());

    conn.transaction(|conn| {
        let Some(order) = find_order_by_code(conn, code)? else {
            return Ok(None);
        };
        let order = update(orders::table.find(order.id))
            .set((
                orders::review_rating.eq(rating),
                orders::review_comment.eq(comment),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(crate::models::Order::as_returning())
            .get_result(conn)?;
        Ok(Some(with_items(conn, order)?))
    })
}
