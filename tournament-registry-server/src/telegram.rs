use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use tournament_registry_api::teams::Team;

use crate::config::Telegram;

const API_BASE: &str = "https://api.telegram.org";

/// The outbound half of the bot: delivers registration notifications to
/// admins and auth codes to captains.
///
/// Delivery is best effort. A missing token disables the notifier entirely
/// and failures are logged, never propagated: bot trouble must not fail team
/// registration.
#[derive(Clone, Debug)]
pub struct Notifier {
    client: Client,
    config: Telegram,
}

impl Notifier {
    pub fn new(config: Telegram) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        Self { client, config }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        !self.config.token.is_empty()
    }

    /// Notifies all admin chats about a new registration, with inline
    /// approve/reject buttons.
    pub async fn notify_registration(&self, team: &Team, chats: &[i64]) {
        let text = format!(
            "🆕 New team registration!\n\n🏆 Team: {}\n👤 Captain: {}\n📱 Telegram: {}\n🔑 Code: {}\n\n👥 Roster:\n{}",
            team.name, team.captain_name, team.captain_telegram, team.auth_code, team.members_info
        );

        self.send_moderation_message(team, chats, text).await;
    }

    /// Notifies all admin chats that a team edited its entry and went back
    /// to moderation.
    pub async fn notify_edited(&self, team: &Team, chats: &[i64]) {
        let text = format!(
            "✏️ Team edited and sent back to moderation\n\n🏆 Team: {}\n👤 Captain: {}\n📱 Telegram: {}\n\n👥 New roster:\n{}",
            team.name, team.captain_name, team.captain_telegram, team.members_info
        );

        self.send_moderation_message(team, chats, text).await;
    }

    async fn send_moderation_message(&self, team: &Team, chats: &[i64], text: String) {
        if !self.is_enabled() {
            return;
        }

        let keyboard = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![
                InlineKeyboardButton {
                    text: "✅ Approve".to_owned(),
                    callback_data: format!("approve_{}", team.id),
                },
                InlineKeyboardButton {
                    text: "❌ Reject".to_owned(),
                    callback_data: format!("reject_{}", team.id),
                },
            ]],
        };

        for chat in chats {
            let message = SendMessage {
                chat_id: ChatTarget::Id(*chat),
                text: text.clone(),
                reply_markup: Some(keyboard.clone()),
            };

            self.call("sendMessage", &message).await;
        }
    }

    /// Sends the auth code to the captain. Only reaches captains whose
    /// Telegram handle accepts messages by username.
    pub async fn send_auth_code(&self, team: &Team) {
        if !self.is_enabled() || team.captain_telegram.is_empty() {
            return;
        }

        let username = team.captain_telegram.trim_start_matches('@');

        let message = SendMessage {
            chat_id: ChatTarget::Username(format!("@{}", username)),
            text: format!(
                "✅ Team registered!\n\n🔑 Your edit code: {}\n\nKeep this code to update your team later.",
                team.auth_code
            ),
            reply_markup: None,
        };

        self.call("sendMessage", &message).await;
    }

    /// Acknowledges an inline button press.
    pub async fn answer_callback(&self, callback_query_id: &str, text: &str) {
        if !self.is_enabled() {
            return;
        }

        let answer = AnswerCallbackQuery {
            callback_query_id: callback_query_id.to_owned(),
            text: text.to_owned(),
        };

        self.call("answerCallbackQuery", &answer).await;
    }

    /// Sends a plain text reply to a chat.
    pub async fn send_text(&self, chat_id: i64, text: &str) {
        if !self.is_enabled() {
            return;
        }

        let message = SendMessage {
            chat_id: ChatTarget::Id(chat_id),
            text: text.to_owned(),
            reply_markup: None,
        };

        self.call("sendMessage", &message).await;
    }

    async fn call<T>(&self, method: &str, payload: &T)
    where
        T: Serialize,
    {
        let url = format!("{}/bot{}/{}", API_BASE, self.config.token, method);

        match self.client.post(&url).json(payload).send().await {
            Ok(resp) if !resp.status().is_success() => {
                log::warn!("Telegram API {} returned {}", method, resp.status());
            }
            Ok(_) => {}
            Err(err) => {
                log::warn!("Failed to call Telegram API {}: {}", method, err);
            }
        }
    }
}

/// `chat_id` accepts a numeric chat id or an `@channelusername` string.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
enum ChatTarget {
    Id(i64),
    Username(String),
}

#[derive(Clone, Debug, Serialize)]
struct SendMessage {
    chat_id: ChatTarget,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Clone, Debug, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Clone, Debug, Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

#[derive(Clone, Debug, Serialize)]
struct AnswerCallbackQuery {
    callback_query_id: String,
    text: String,
}

/// An incoming bot update delivered to the webhook.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::Update;

    #[test]
    fn test_update_parse_callback() {
        let json = r#"{
            "update_id": 10,
            "callback_query": {
                "id": "442",
                "from": {"id": 77, "is_bot": false, "first_name": "A"},
                "data": "approve_3"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let callback = update.callback_query.unwrap();

        assert_eq!(callback.id, "442");
        assert_eq!(callback.from.id, 77);
        assert_eq!(callback.data.as_deref(), Some("approve_3"));
    }

    #[test]
    fn test_update_parse_message() {
        let json = r#"{
            "update_id": 11,
            "message": {
                "message_id": 5,
                "chat": {"id": 99, "type": "private"},
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();

        assert_eq!(message.chat.id, 99);
        assert_eq!(message.text.as_deref(), Some("/start"));
    }
}
