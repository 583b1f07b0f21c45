use std::fmt::{Debug, Formatter};

/// Application name carried in the `x-client` header.
pub const CLIENT_APP_NAME: &str = "ProductivityOwl";

/// A Habitica user id and API token. Both halves are always present.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    user_id: String,
    api_token: String,
}

impl Credentials {
    /// Builds credentials from stored values, treating a missing or blank half
    /// as absence of the whole pair.
    pub fn from_parts(user_id: Option<String>, api_token: Option<String>) -> Option<Self> {
        let user_id = non_blank(user_id)?;
        let api_token = non_blank(api_token)?;
        Some(Self { user_id, api_token })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn client_id(&self) -> String {
        format!("{}-{CLIENT_APP_NAME}", self.user_id)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
