//! Bot API webhook. Telegram retries anything that is not a 200, so every
//! update is acknowledged, including ones we fail to process.

use axum::{Router, body::Bytes, extract::State, response::Json, routing::get};
use pynk_proto::user_service::StartBotSessionPayload;
use tracing::instrument;

use crate::models::*;

use super::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/telegram/webhook", get(webhook_status).post(webhook))
}

/// The `/start` session the update asks for, if any.
fn start_session(update: TelegramUpdate) -> Option<StartBotSessionPayload> {
    let message = update.message?;
    let from = message.from?;
    if !message.text.as_deref().unwrap_or_default().starts_with("/start") {
        return None;
    }
    Some(StartBotSessionPayload {
        telegram_user_id: from.id.to_string(),
        first_name: from.first_name,
        last_name: from.last_name,
        username: from.username,
        language_code: from.language_code,
        chat_id: message.chat.id.to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/telegram/webhook",
    request_body(content = String, description = "Bot API Update", content_type = "application/json"),
    responses(
        (status = 200, description = "Update acknowledged", body = AckResponse),
    ),
    tag = "telegram"
)]
#[instrument(skip_all)]
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> Json<AckResponse> {
    let update: TelegramUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring unreadable update");
            return Json(AckResponse {
                ok: false,
                message: None,
                error: Some(err.to_string()),
            });
        }
    };

    let Some(session) = start_session(update) else {
        return Json(AckResponse::ok());
    };
    tracing::info!(telegram_user_id = %session.telegram_user_id, "bot session started");

    let mut user_client = state.user_client.clone();
    match user_client
        .start_bot_session(tonic::Request::new(session))
        .await
    {
        Ok(_) => Json(AckResponse::ok()),
        Err(status) => {
            tracing::warn!(error = %status, "could not start bot session");
            Json(AckResponse {
                ok: false,
                message: None,
                error: Some(status.message().to_string()),
            })
        }
    }
}

#[utoipa::path(
    get,
    path = "/telegram/webhook",
    responses(
        (status = 200, description = "Webhook is reachable", body = AckResponse),
    ),
    tag = "telegram"
)]
pub async fn webhook_status() -> Json<AckResponse> {
    Json(AckResponse {
        ok: true,
        message: Some("Telegram webhook active".into()),
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::*;

    fn start_update(user_id: i64, text: &str) -> serde_json::Value {
        json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": user_id, "is_bot": false, "first_name": "Asha", "language_code": "de"},
                "chat": {"id": 555, "type": "private"},
                "text": text
            }
        })
    }

    #[tokio::test]
    async fn test_start_registers_the_chat() {
        let (app, backend) = app_with_backend().await;
        let (status, body) = send(
            app,
            json_request("POST", "/telegram/webhook", start_update(4242, "/start")),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body, json!({"ok": true}));
        let sessions = backend.bot_sessions.lock().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].telegram_user_id, "4242");
        assert_eq!(sessions[0].chat_id, "555");
        assert_eq!(sessions[0].language_code.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_other_messages_are_ignored() {
        let (app, backend) = app_with_backend().await;
        for update in [
            start_update(4242, "hello"),
            json!({"update_id": 2}),
            json!({"update_id": 3, "message": {"message_id": 1, "chat": {"id": 5, "type": "group"}, "text": "/start"}}),
        ] {
            let (status, body) = send(app.clone(), json_request("POST", "/telegram/webhook", update)).await;
            assert_eq!(status, 200);
            assert_eq!(body["ok"], true);
        }
        assert!(backend.bot_sessions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_still_answer_200() {
        let (app, _) = app_with_backend().await;
        let (status, body) = send(
            app.clone(),
            json_request("POST", "/telegram/webhook", start_update(500, "/start")),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], false);

        let (status, body) = send(
            app_without_backend(),
            json_request("POST", "/telegram/webhook", start_update(1, "/start now")),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], false);

        let (status, body) = send(app, json_request("POST", "/telegram/webhook", json!("garbage"))).await;
        assert_eq!(status, 200);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn test_liveness_check() {
        let (status, body) = send(app_without_backend(), get("/telegram/webhook")).await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Telegram webhook active");
    }
}
