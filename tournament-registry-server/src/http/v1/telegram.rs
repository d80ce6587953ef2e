use hyper::Method;

use tournament_registry_api::id::TeamId;
use tournament_registry_api::teams::TeamStatus;

use crate::http::{Request, RequestUri, Response, Result};
use crate::telegram::{CallbackQuery, Message, Update};
use crate::{method, Error, State, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        Some("webhook") => method!(req, {
            Method::POST => webhook(req).await,
        }),
        _ => Err(StatusCodeError::not_found().into()),
    }
}

/// Handles a bot update. Always answers 200: Telegram retries failed
/// deliveries and a malformed update would be retried forever.
async fn webhook(mut req: Request) -> Result {
    let update: Update = match req.json().await {
        Ok(update) => update,
        Err(err) => {
            log::debug!("Discarding malformed bot update: {:?}", err);
            return Ok(Response::ok());
        }
    };

    let state = req.state().clone();

    if let Some(callback) = update.callback_query {
        handle_callback(&state, callback).await?;
    } else if let Some(message) = update.message {
        handle_message(&state, message).await;
    }

    Ok(Response::ok())
}

/// Handles an approve/reject button press from an admin chat.
async fn handle_callback(state: &State, callback: CallbackQuery) -> std::result::Result<(), Error> {
    let data = match callback.data.as_deref() {
        Some(data) => data,
        None => return Ok(()),
    };

    // Only linked admin chats may moderate.
    let chats = state.store.admins().notification_chats().await?;
    if !chats.contains(&callback.from.id) {
        log::warn!(
            "Ignoring moderation callback from unknown chat {}",
            callback.from.id
        );
        state.notifier.answer_callback(&callback.id, "Not allowed").await;
        return Ok(());
    }

    let (status, reply) = if let Some(id) = data.strip_prefix("approve_") {
        (TeamStatus::Approved, id)
    } else if let Some(id) = data.strip_prefix("reject_") {
        (TeamStatus::Rejected, id)
    } else {
        log::debug!("Ignoring unknown callback data: {}", data);
        return Ok(());
    };

    let id: TeamId = match reply.parse() {
        Ok(id) => id,
        Err(_) => return Ok(()),
    };

    let mut team = match state.store.teams().get(id).await? {
        Some(team) => team,
        None => {
            state
                .notifier
                .answer_callback(&callback.id, "Team no longer exists")
                .await;
            return Ok(());
        }
    };

    team.status = status;
    state.store.teams().update(id, &team).await?;

    log::info!("Team {} is now {} (via bot)", id, status);

    let text = match status {
        TeamStatus::Approved => format!("✅ {} approved", team.name),
        _ => format!("❌ {} rejected", team.name),
    };
    state.notifier.answer_callback(&callback.id, &text).await;

    Ok(())
}

/// Replies to plain bot commands.
async fn handle_message(state: &State, message: Message) {
    let text = match message.text.as_deref() {
        Some(text) => text,
        None => return,
    };

    if text.starts_with("/start") {
        state
            .notifier
            .send_text(
                message.chat.id,
                "👋 This is the tournament registry bot.\n\nAdmins with a linked chat receive \
                new registrations here and can approve or reject them with one tap.",
            )
            .await;
    }
}
