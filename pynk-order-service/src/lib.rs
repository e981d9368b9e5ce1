use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use diesel::PgConnection;

pub mod admin_auth;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod models;
pub mod money;
pub mod notifications;
pub mod orders;
pub mod schema;
pub mod sequence;
pub mod service;
pub mod users;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn build_pool(database_url: &str) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().build(manager)
}
