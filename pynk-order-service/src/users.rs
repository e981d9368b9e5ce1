//! Registered customers, keyed by their Telegram user id.

use chrono::{DateTime, Utc};
use diesel::{
    define_sql_function, insert_into,
    prelude::*,
    sql_types::{Nullable, Text},
    upsert::excluded,
};

use crate::errors::OrderError;
use crate::models::{AppUser, NewAppUser};
use crate::schema::{app_users, orders};

define_sql_function! {
    fn coalesce(x: Nullable<Text>, y: Nullable<Text>) -> Nullable<Text>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user: AppUser,
    pub orders_count: i64,
    pub last_order_code: Option<String>,
    pub last_order_at: Option<DateTime<Utc>>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims every field and turns blank strings into nulls, so a blank value
/// never overwrites a stored one.
pub fn normalize(user: NewAppUser) -> Result<NewAppUser, OrderError> {
    let telegram_user_id = user.telegram_user_id.trim().to_string();
    if telegram_user_id.is_empty() {
        return Err(OrderError::validation("telegram_user_id must not be empty"));
    }
    Ok(NewAppUser {
        telegram_user_id,
        first_name: non_blank(user.first_name),
        last_name: non_blank(user.last_name),
        username: non_blank(user.username),
        phone: non_blank(user.phone),
        email: non_blank(user.email),
        language_code: non_blank(user.language_code),
        chat_id: non_blank(user.chat_id),
    })
}

/// Inserts or merges a user. Names and username take the new values;
/// phone, email and language keep the stored value when the new one is
/// null; a stored chat id is never replaced.
#[tracing::instrument(skip_all, fields(telegram_user_id = %user.telegram_user_id))]
pub fn upsert(conn: &mut PgConnection, user: NewAppUser) -> Result<AppUser, OrderError> {
    let user = normalize(user)?;
    let stored = insert_into(app_users::table)
        .values(&user)
        .on_conflict(app_users::telegram_user_id)
        .do_update()
        .set((
            app_users::first_name.eq(excluded(app_users::first_name)),
            app_users::last_name.eq(excluded(app_users::last_name)),
            app_users::username.eq(excluded(app_users::username)),
            app_users::phone.eq(coalesce(excluded(app_users::phone), app_users::phone)),
            app_users::email.eq(coalesce(excluded(app_users::email), app_users::email)),
            app_users::language_code.eq(coalesce(
                excluded(app_users::language_code),
                app_users::language_code,
            )),
            app_users::chat_id.eq(coalesce(app_users::chat_id, excluded(app_users::chat_id))),
            app_users::updated_at.eq(Utc::now()),
        ))
        .returning(AppUser::as_returning())
        .get_result(conn)?;
    Ok(stored)
}

pub fn find_by_telegram_id(
    conn: &mut PgConnection,
    telegram_user_id: &str,
) -> QueryResult<Option<AppUser>> {
    app_users::table
        .select(AppUser::as_select())
        .filter(app_users::telegram_user_id.eq(telegram_user_id))
        .first(conn)
        .optional()
}

/// The chat to notify for a customer, if they ever started the bot.
pub fn chat_id_for(conn: &mut PgConnection, telegram_user_id: &str) -> QueryResult<Option<String>> {
    let chat_id = app_users::table
        .select(app_users::chat_id)
        .filter(app_users::telegram_user_id.eq(telegram_user_id))
        .first::<Option<String>>(conn)
        .optional()?;
    Ok(chat_id.flatten())
}

pub fn profile(conn: &mut PgConnection, telegram_user_id: &str) -> QueryResult<Option<UserProfile>> {
    let Some(user) = find_by_telegram_id(conn, telegram_user_id)? else {
        return Ok(None);
    };

    let orders_count = orders::table
        .filter(orders::telegram_user_id.eq(telegram_user_id))
        .count()
        .get_result::<i64>(conn)?;
    let last_order = orders::table
        .select((orders::public_code, orders::created_at))
        .filter(orders::telegram_user_id.eq(telegram_user_id))
        .order((orders::created_at.desc(), orders::id.desc()))
        .first::<(String, DateTime<Utc>)>(conn)
        .optional()?;
    let (last_order_code, last_order_at) = last_order.unzip();

    Ok(Some(UserProfile {
        user,
        orders_count,
        last_order_code,
        last_order_at,
    }))
}
