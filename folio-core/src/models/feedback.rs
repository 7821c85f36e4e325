//! Visitor feedback
//!
//! Status vocabulary is `unread | read | replied`, mirroring connections.
//! `replied` is reachable only through a reply, which stores the reply
//! message in the same write.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection::ConnectionStatus;
use super::validation::{self, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Feedback,
    Complaint,
    Suggestion,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Complaint => "complaint",
            Self::Suggestion => "suggestion",
        }
    }
}

impl FromStr for FeedbackKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feedback" => Ok(Self::Feedback),
            "complaint" => Ok(Self::Complaint),
            "suggestion" => Ok(Self::Suggestion),
            _ => Err(ValidationError::InvalidVariant {
                field: "feedback type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ValidationError::InvalidVariant {
                field: "priority",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Unread,
    Read,
    Replied,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Read => "read",
            Self::Replied => "replied",
        }
    }

    /// Transitions allowed through a plain status write.
    ///
    /// `replied` is excluded: it requires a reply message.
    pub fn can_set_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unread, Self::Read)
                | (Self::Read, Self::Unread)
                | (Self::Unread, Self::Unread)
                | (Self::Read, Self::Read)
        )
    }
}

impl Default for FeedbackStatus {
    fn default() -> Self {
        Self::Unread
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unread" => Ok(Self::Unread),
            "read" => Ok(Self::Read),
            "replied" => Ok(Self::Replied),
            _ => Err(ValidationError::InvalidVariant {
                field: "feedback status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub content: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub status: FeedbackStatus,
    #[serde(default)]
    pub reply_message: Option<String>,
    /// Connection that identifies the sender, if any
    #[serde(default)]
    pub connection_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Sender identity borrowed from the linked connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderInfo {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackWithSender {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub sender: Option<SenderInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub content: String,
    pub priority: Option<Priority>,
    pub connection_id: Option<String>,
}

impl NewFeedback {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("content", &self.content, 10_000)?;
        validation::optional_text("connection_id", self.connection_id.as_deref(), 64)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replied_needs_a_reply() {
        use FeedbackStatus::*;
        assert!(Unread.can_set_to(Read));
        assert!(Read.can_set_to(Unread));
        assert!(!Read.can_set_to(Replied));
        assert!(!Replied.can_set_to(Read));
    }

    #[test]
    fn kind_serializes_as_type() {
        let new = NewFeedback {
            kind: FeedbackKind::Suggestion,
            content: "Dark mode".into(),
            priority: Some(Priority::Low),
            connection_id: None,
        };
        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(value["type"], json!("suggestion"));
        assert_eq!(value["priority"], json!("low"));
    }

    #[test]
    fn legacy_status_values_are_rejected() {
        assert!("spam".parse::<FeedbackStatus>().is_err());
        assert!("archived".parse::<FeedbackStatus>().is_err());
    }
}
