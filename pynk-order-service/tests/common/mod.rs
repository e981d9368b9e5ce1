#![allow(dead_code)]

use std::sync::OnceLock;

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use pynk_order_service::catalog::{self, MenuItemDraft};
use pynk_order_service::models::{DeliveryMethod, MenuItem};
use pynk_order_service::orders::{CustomerContact, LineRequest, OrderDraft};
use pynk_order_service::schema::{app_users, daily_sequences, orders};
use pynk_order_service::{build_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Shared pool against `DATABASE_URL`, migrated once per test binary.
pub fn pool() -> &'static DbPool {
    static POOL: OnceLock<DbPool> = OnceLock::new();
    POOL.get_or_init(|| {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = build_pool(&url).expect("cannot build pool");
        pool.get()
            .expect("cannot connect")
            .run_pending_migrations(MIGRATIONS)
            .expect("cannot run migrations");
        pool
    })
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Forgets every order and ordinal minted for `day`, so a test owns it.
pub fn reset_day(conn: &mut PgConnection, day: NaiveDate) {
    diesel::delete(orders::table.filter(orders::seq_date.eq(day)))
        .execute(conn)
        .unwrap();
    diesel::delete(daily_sequences::table.filter(daily_sequences::seq_date.eq(day)))
        .execute(conn)
        .unwrap();
}

pub fn reset_user(conn: &mut PgConnection, telegram_user_id: &str) {
    diesel::delete(orders::table.filter(orders::telegram_user_id.eq(telegram_user_id)))
        .execute(conn)
        .unwrap();
    diesel::delete(app_users::table.filter(app_users::telegram_user_id.eq(telegram_user_id)))
        .execute(conn)
        .unwrap();
}

pub fn menu_item(conn: &mut PgConnection, name: &str, price_euros: f64) -> MenuItem {
    catalog::create(
        conn,
        MenuItemDraft {
            name_en: name.to_string(),
            name_de: format!("{name} DE"),
            price_euros,
            images: vec![format!("https://img.example/{name}.jpg")],
            ..Default::default()
        },
    )
    .unwrap()
}

pub fn draft(lines: &[(i32, i32)]) -> OrderDraft {
    OrderDraft {
        items: lines
            .iter()
            .map(|&(menu_item_id, quantity)| LineRequest {
                menu_item_id,
                quantity,
            })
            .collect(),
        delivery_method: DeliveryMethod::Pickup,
        customer: CustomerContact {
            name: Some("Test Customer".into()),
            ..Default::default()
        },
        notes: None,
        telegram_user_id: None,
        client_total_cents: None,
    }
}
