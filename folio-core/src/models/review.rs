//! Reviews / testimonials

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

/// Review moderation state: `pending` → `approved` | `rejected`, no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Pending, Self::Approved, Self::Rejected]
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only an open review can be decided, and only to a final state.
    pub fn can_transition_to(&self, next: Self) -> bool {
        !self.is_terminal() && next.is_terminal()
    }

    /// States from which `next` may be entered
    pub fn sources(next: Self) -> impl Iterator<Item = Self> {
        Self::all()
            .iter()
            .copied()
            .filter(move |s| s.can_transition_to(next))
    }
}

impl Default for ReviewStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ValidationError::InvalidVariant {
                field: "review status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub company: Option<String>,
    pub content: String,
    #[serde(default)]
    pub rating: Option<i16>,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub name: String,
    pub role: String,
    pub company: Option<String>,
    pub content: String,
    pub rating: Option<i16>,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("name", &self.name, 200)?;
        validation::required_text("role", &self.role, 200)?;
        validation::optional_text("company", self.company.as_deref(), 200)?;
        validation::required_text("content", &self.content, 5000)?;
        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(ValidationError::OutOfRange {
                    field: "rating",
                    min: MIN_RATING.into(),
                    max: MAX_RATING.into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: Option<i16>) -> NewReview {
        NewReview {
            name: "Grace".into(),
            role: "Engineer".into(),
            company: None,
            content: "Great work".into(),
            rating,
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(review(None).validate().is_ok());
        assert!(review(Some(1)).validate().is_ok());
        assert!(review(Some(5)).validate().is_ok());
        assert!(matches!(
            review(Some(0)).validate(),
            Err(ValidationError::OutOfRange { field: "rating", .. })
        ));
        assert!(review(Some(6)).validate().is_err());
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!ReviewStatus::Pending.is_terminal());
        assert!(ReviewStatus::Approved.is_terminal());
        assert!(ReviewStatus::Rejected.is_terminal());
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Pending.can_transition_to(ReviewStatus::Pending));
        assert_eq!(
            ReviewStatus::sources(ReviewStatus::Rejected).collect::<Vec<_>>(),
            [ReviewStatus::Pending]
        );
    }
}
