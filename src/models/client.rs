use std::fmt;

use super::supplied;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Client {
    pub client_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

// Rows print as tuples, e.g. (2, 'Charlotte', 'Riley', 'charlotte@riley.com')
impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, '{}', '{}', ",
            self.client_id, self.first_name, self.last_name
        )?;
        match &self.email {
            Some(email) => write!(f, "'{}')", email),
            None => write!(f, "None)"),
        }
    }
}

/// Renders rows space-separated on a single line
pub fn render_rows(clients: &[Client]) -> String {
    clients
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fields to change on an existing client. `None` or empty leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    /// Existing number to overwrite when the client has several
    pub replace_phone: Option<String>,
}

impl ClientUpdate {
    pub fn with_replace_phone(mut self, old: impl Into<String>) -> Self {
        self.replace_phone = Some(old.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        supplied(&self.first_name).is_none()
            && supplied(&self.last_name).is_none()
            && supplied(&self.email).is_none()
            && supplied(&self.phone_number).is_none()
    }
}

/// Named search filters; each supplied filter contributes its matches
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}
