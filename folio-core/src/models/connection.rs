//! Contact-form submissions ("connections")

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

/// Connection workflow state
///
/// `unread` → `read` on first admin view, `unread`/`read` → `replied`
/// on an explicit reply. `replied` is never downgraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Unread,
    Read,
    Replied,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Replied => "replied",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Unread, Self::Read, Self::Replied]
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unread, Self::Read)
                | (Self::Unread, Self::Replied)
                | (Self::Read, Self::Replied)
                | (Self::Replied, Self::Replied)
        )
    }

    /// States from which `next` may be entered
    pub fn sources(next: Self) -> impl Iterator<Item = Self> {
        Self::all()
            .iter()
            .copied()
            .filter(move |s| s.can_transition_to(next))
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::Unread
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "replied" => Ok(Self::Replied),
            _ => Err(ValidationError::InvalidVariant {
                field: "connection status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ConnectionStatus,
    #[serde(default)]
    pub reply_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Public contact form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("name", &self.name, 200)?;
        validation::email("email", &self.email)?;
        validation::required_text("subject", &self.subject, 300)?;
        validation::required_text("message", &self.message, 10_000)?;
        Ok(())
    }
}
