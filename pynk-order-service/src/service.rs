//! The ordering workflow as the RPC layer sees it: storage calls run on the
//! blocking pool, and notifications go out only after they commit.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use diesel::PgConnection;

use crate::admin_auth::{self, AdminAuth, Claims, IssuedToken};
use crate::catalog::{self, MenuItemDraft, MenuItemPatch};
use crate::errors::OrderError;
use crate::lifecycle;
use crate::models::{AppUser, MenuItem, NewAppUser, OrderDetails};
use crate::notifications::{messages, Dispatcher, Notification};
use crate::orders::{self, OrderDraft};
use crate::users::{self, UserProfile};
use crate::DbPool;

pub struct OrderingService {
    pool: DbPool,
    dispatcher: Dispatcher,
    auth: Arc<AdminAuth>,
}

/// The calendar day new orders are numbered under.
pub fn business_date() -> NaiveDate {
    Local::now().date_naive()
}

fn resolve_chat(conn: &mut PgConnection, telegram_user_id: Option<&str>) -> Option<String> {
    let telegram_user_id = telegram_user_id?;
    users::chat_id_for(conn, telegram_user_id).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not look up chat id");
        None
    })
}

fn record_customer(conn: &mut PgConnection, details: &mut OrderDetails, identity: NewAppUser) {
    let user = match users::upsert(conn, identity) {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(error = %err, "could not record customer identity");
            return;
        }
    };
    if details.order.user_id.is_some() {
        return;
    }
    match orders::link_user(conn, details.order.id, user.id) {
        Ok(order) => details.order = order,
        Err(err) => tracing::warn!(error = %err, "could not link order to customer"),
    }
}

impl OrderingService {
    pub fn new(pool: DbPool, dispatcher: Dispatcher, auth: AdminAuth) -> Self {
        Self {
            pool,
            dispatcher,
            auth: Arc::new(auth),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, OrderError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, OrderError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }

    fn notify(&self, notification: Notification) {
        // Detached; the task logs its own outcome.
        let _ = self.dispatcher.dispatch(notification);
    }

    fn notify_customer(&self, chat_id: Option<String>, text: String) {
        if let Some(chat_id) = chat_id {
            self.notify(Notification::User { chat_id, text });
        }
    }

    pub async fn list_menu(&self, include_inactive: bool) -> Result<Vec<MenuItem>, OrderError> {
        self.run(move |conn| {
            let items = if include_inactive {
                catalog::list_all(conn)?
            } else {
                catalog::list_active(conn)?
            };
            Ok(items)
        })
        .await
    }

    pub async fn get_menu_item(
        &self,
        id: i32,
        include_inactive: bool,
    ) -> Result<MenuItem, OrderError> {
        self.run(move |conn| {
            if include_inactive {
                catalog::get(conn, id)
            } else {
                catalog::get_active(conn, id)
            }
        })
        .await
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name_en))]
    pub async fn create_menu_item(&self, draft: MenuItemDraft) -> Result<MenuItem, OrderError> {
        self.run(move |conn| catalog::create(conn, draft)).await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_menu_item(
        &self,
        id: i32,
        patch: MenuItemPatch,
    ) -> Result<MenuItem, OrderError> {
        self.run(move |conn| catalog::update_item(conn, id, patch)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_menu_item(&self, id: i32) -> Result<bool, OrderError> {
        self.run(move |conn| Ok(catalog::delete_item(conn, id)?)).await
    }

    pub async fn create_order(
        &self,
        draft: OrderDraft,
        identity: Option<NewAppUser>,
    ) -> Result<OrderDetails, OrderError> {
        self.create_order_on(draft, identity, business_date()).await
    }

    /// Creates an order numbered under `date`. A Telegram `identity` sent
    /// along with the order is merged into the user table once the order
    /// has committed, best-effort; rejected orders write no user rows.
    #[tracing::instrument(skip(self, draft, identity))]
    pub async fn create_order_on(
        &self,
        draft: OrderDraft,
        identity: Option<NewAppUser>,
        date: NaiveDate,
    ) -> Result<OrderDetails, OrderError> {
        let (details, chat_id) = self
            .run(move |conn| {
                let mut details = orders::create_order(conn, draft, date)?;
                if let Some(identity) = identity {
                    record_customer(conn, &mut details, identity);
                }
                let chat_id = resolve_chat(conn, details.order.telegram_user_id.as_deref());
                Ok((details, chat_id))
            })
            .await?;

        let order = &details.order;
        self.notify(Notification::Admin(messages::order_created_admin(
            &order.public_code,
            &details.items,
            order.total_cents,
            order.raw_customer_name.as_deref(),
        )));
        self.notify_customer(
            chat_id,
            messages::order_confirmation(&order.public_code, &details.items, order.total_cents),
        );
        Ok(details)
    }

    pub async fn get_order(&self, code: String) -> Result<OrderDetails, OrderError> {
        self.run(move |conn| {
            orders::find_by_code(conn, &code)?
                .ok_or_else(|| OrderError::NotFound(format!("order {code}")))
        })
        .await
    }

    pub async fn list_orders(
        &self,
        telegram_user_id: Option<String>,
        limit: Option<u32>,
    ) -> Result<Vec<OrderDetails>, OrderError> {
        self.run(move |conn| {
            let orders = match telegram_user_id {
                Some(id) => orders::list_by_telegram_user(conn, &id)?,
                None => orders::list_recent(conn, limit)?,
            };
            Ok(orders)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        code: String,
        status: String,
    ) -> Result<Option<OrderDetails>, OrderError> {
        let updated = self
            .run(move |conn| {
                let Some(details) = lifecycle::update_status(conn, &code, &status)? else {
                    return Ok(None);
                };
                let chat_id = resolve_chat(conn, details.order.telegram_user_id.as_deref());
                Ok(Some((details, chat_id)))
            })
            .await?;

        Ok(updated.map(|(details, chat_id)| {
            let order = &details.order;
            self.notify_customer(
                chat_id,
                messages::status_update(&order.public_code, order.status.as_str()),
            );
            details
        }))
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_review(&self, code: String) -> Result<Option<OrderDetails>, OrderError> {
        let updated = self
            .run(move |conn| {
                let Some(details) = lifecycle::request_review(conn, &code)? else {
                    return Ok(None);
                };
                let chat_id = resolve_chat(conn, details.order.telegram_user_id.as_deref());
                Ok(Some((details, chat_id)))
            })
            .await?;

        Ok(updated.map(|(details, chat_id)| {
            self.notify_customer(chat_id, messages::review_request(&details.order.public_code));
            details
        }))
    }

    #[tracing::instrument(skip(self, comment))]
    pub async fn submit_review(
        &self,
        code: String,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<Option<OrderDetails>, OrderError> {
        let updated = self
            .run(move |conn| {
                let Some(details) = lifecycle::submit_review(conn, &code, rating, comment)? else {
                    return Ok(None);
                };
                let chat_id = resolve_chat(conn, details.order.telegram_user_id.as_deref());
                Ok(Some((details, chat_id)))
            })
            .await?;

        Ok(updated.map(|(details, chat_id)| {
            let order = &details.order;
            self.notify(Notification::Admin(messages::review_received_admin(
                &order.public_code,
                order.review_rating,
                order.review_comment.as_deref(),
            )));
            self.notify_customer(chat_id, messages::review_thanks(&order.public_code));
            details
        }))
    }

    pub async fn upsert_user(&self, user: NewAppUser) -> Result<AppUser, OrderError> {
        self.run(move |conn| users::upsert(conn, user)).await
    }

    pub async fn user_profile(
        &self,
        telegram_user_id: String,
    ) -> Result<Option<UserProfile>, OrderError> {
        self.run(move |conn| Ok(users::profile(conn, &telegram_user_id)?))
            .await
    }

    /// Registers whoever sent `/start` to the bot and greets them in that chat.
    #[tracing::instrument(skip_all, fields(telegram_user_id = %user.telegram_user_id))]
    pub async fn start_bot_session(
        &self,
        user: NewAppUser,
        chat_id: String,
    ) -> Result<AppUser, OrderError> {
        if chat_id.trim().is_empty() {
            return Err(OrderError::validation("chat_id must not be empty"));
        }
        let session_chat = chat_id.clone();
        let stored = self
            .run(move |conn| {
                users::upsert(
                    conn,
                    NewAppUser {
                        chat_id: Some(session_chat),
                        ..user
                    },
                )
            })
            .await?;
        self.notify(Notification::User {
            chat_id,
            text: messages::WELCOME.to_string(),
        });
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_login_code(&self) -> Result<(), OrderError> {
        let code = admin_auth::generate_code();
        let auth = self.auth.clone();
        let stored = code.clone();
        self.run(move |conn| auth.store_code(conn, &stored)).await?;
        self.notify(Notification::Admin(messages::login_code(&code)));
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub async fn verify_login_code(&self, input: String) -> Result<IssuedToken, OrderError> {
        let code = admin_auth::normalize_code(&input)
            .ok_or_else(|| OrderError::validation("Login code must be 6 characters"))?;
        let auth = self.auth.clone();
        let redeemed = self.run(move |conn| auth.redeem_code(conn, &code)).await?;
        if !redeemed {
            return Err(OrderError::Unauthorized("Invalid or expired code".into()));
        }
        self.auth.issue_token()
    }

    pub fn token_info(&self, token: &str) -> Result<Claims, OrderError> {
        self.auth.verify_token(token)
    }
}
