use serde::{Deserialize, Serialize};

use crate::id::AdminId;

/// An administrator account.
///
/// `password` carries the plain password inbound (account creation) and is
/// never serialized back out; the server stores only the salted hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(default)]
    pub id: AdminId,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default)]
    pub is_superadmin: bool,
    /// Chat to notify about new registrations, if the admin linked one.
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::AdminUser;

    #[test]
    fn test_password_is_never_serialized() {
        let admin = AdminUser {
            id: 1.into(),
            username: "root".into(),
            password: "hunter2".into(),
            is_superadmin: true,
            telegram_chat_id: None,
        };

        let value = serde_json::to_value(&admin).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["username"], "root");
    }
}
