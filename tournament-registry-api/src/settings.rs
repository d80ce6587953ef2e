use serde::{Deserialize, Serialize};

/// The registration window. When closed, team self-service (register, edit,
/// delete by auth code) is refused; admin operations are unaffected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationSettings {
    pub is_open: bool,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Default for RegistrationSettings {
    /// Registration starts open until an admin closes it.
    fn default() -> Self {
        Self {
            is_open: true,
            updated_by: None,
        }
    }
}
