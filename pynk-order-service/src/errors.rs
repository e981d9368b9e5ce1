use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("Item not found or inactive: {0}")]
    ItemUnavailable(i32),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("{0}")]
    Internal(String),
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }
}

impl From<tokio::task::JoinError> for OrderError {
    fn from(err: tokio::task::JoinError) -> Self {
        OrderError::Internal(format!("blocking task failed: {err}"))
    }
}

impl From<OrderError> for Status {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(message) => Status::invalid_argument(message),
            err @ OrderError::ItemUnavailable(_) => Status::not_found(err.to_string()),
            err @ OrderError::NotFound(_) => Status::not_found(err.to_string()),
            OrderError::Conflict(message) => Status::already_exists(message),
            OrderError::Unauthorized(message) => Status::unauthenticated(message),
            OrderError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => {
                tracing::error!(detail = info.message(), "unique constraint violated");
                Status::already_exists("Conflicting record")
            }
            OrderError::Database(DieselError::NotFound) => Status::not_found("Record not found"),
            OrderError::Database(err) => {
                tracing::error!(error = %err, "database failure");
                Status::internal("Internal server error")
            }
            OrderError::Pool(err) => {
                tracing::error!(error = %err, "database pool exhausted");
                Status::unavailable("Database unavailable")
            }
            OrderError::Internal(message) => {
                tracing::error!(%message, "internal failure");
                Status::internal("Internal server error")
            }
        }
    }
}
