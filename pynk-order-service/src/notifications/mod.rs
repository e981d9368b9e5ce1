//! Best-effort outbound messages over the Telegram Bot API.
//!
//! Nothing in here returns an error to the order flow: every send resolves
//! to a [`Delivery`] that callers may inspect or drop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::config::TelegramConfig;

pub mod messages;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("message rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}

pub struct TelegramSender {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramSender {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
        })
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;
        let status = response.status();
        let body = response.json::<SendMessageResponse>().await.ok();

        match body {
            Some(body) if status.is_success() && body.ok => Ok(()),
            None if status.is_success() => Ok(()),
            body => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: body.and_then(|b| b.description).unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Admin(String),
    User { chat_id: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No bot token or no destination chat configured.
    Skipped,
    Failed(String),
}

#[derive(Clone, Default)]
pub struct Dispatcher {
    sender: Option<Arc<dyn MessageSender>>,
    admin_chat_id: Option<String>,
}

impl Dispatcher {
    pub fn new(sender: Option<Arc<dyn MessageSender>>, admin_chat_id: Option<String>) -> Self {
        Self {
            sender,
            admin_chat_id,
        }
    }

    /// Without a bot token every send is skipped.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let sender = match &config.bot_token {
            Some(token) => {
                Some(Arc::new(TelegramSender::new(&config.api_base, token)?) as Arc<dyn MessageSender>)
            }
            None => {
                tracing::info!("TELEGRAM_BOT_TOKEN not set, notifications disabled");
                None
            }
        };
        Ok(Self::new(sender, config.admin_chat_id.clone()))
    }

    pub async fn notify_admin(&self, text: &str) -> Delivery {
        match &self.admin_chat_id {
            Some(chat_id) => self.notify_user(chat_id, text).await,
            None => Delivery::Skipped,
        }
    }

    pub async fn notify_user(&self, chat_id: &str, text: &str) -> Delivery {
        let Some(sender) = &self.sender else {
            return Delivery::Skipped;
        };
        match sender.send_message(chat_id, text).await {
            Ok(()) => Delivery::Sent,
            Err(err) => Delivery::Failed(err.to_string()),
        }
    }

    pub async fn deliver(&self, notification: &Notification) -> Delivery {
        match notification {
            Notification::Admin(text) => self.notify_admin(text).await,
            Notification::User { chat_id, text } => self.notify_user(chat_id, text).await,
        }
    }

    /// Sends on a background task. The outcome is logged there; the
    /// returned handle may be dropped without affecting delivery.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<Delivery> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let delivery = dispatcher.deliver(&notification).await;
            match &delivery {
                Delivery::Sent => tracing::debug!(?notification, "notification sent"),
                Delivery::Skipped => tracing::debug!("notification skipped"),
                Delivery::Failed(reason) => {
                    tracing::warn!(%reason, "notification failed")
                }
            }
            delivery
        })
    }
}
