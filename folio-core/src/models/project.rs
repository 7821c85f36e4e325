//! Portfolio projects
//!
//! A project links to zero or more technologies through the
//! `project_technologies` join table; the link set travels separately
//! from the scalar payloads below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::technology::Technology;
use super::validation::{self, ValidationError};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5000;

/// Project row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    /// Legacy duplicate of `live_url`, still written by older admin forms
    #[serde(default)]
    pub live_demo_url: Option<String>,
    /// Legacy duplicate of `repo_url`
    #[serde(default)]
    pub github_url: Option<String>,
    pub is_featured: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Live link, falling back to the legacy column.
    pub fn live_link(&self) -> Option<&str> {
        self.live_url.as_deref().or(self.live_demo_url.as_deref())
    }

    /// Source link, falling back to the legacy column.
    pub fn repo_link(&self) -> Option<&str> {
        self.repo_url.as_deref().or(self.github_url.as_deref())
    }
}

/// Project with its linked technologies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWithTechnologies {
    #[serde(flatten)]
    pub project: Project,
    pub technologies: Vec<Technology>,
}

impl ProjectWithTechnologies {
    pub fn technology_ids(&self) -> Vec<&str> {
        self.technologies.iter().map(|t| t.id.as_str()).collect()
    }
}

/// Insert payload for a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub live_demo_url: Option<String>,
    pub github_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl NewProject {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("title", &self.title, MAX_TITLE_LEN)?;
        validation::required_text("description", &self.description, MAX_DESCRIPTION_LEN)?;
        validation::optional_link("image_url", self.image_url.as_deref())?;
        validation::optional_link("live_url", self.live_url.as_deref())?;
        validation::optional_link("repo_url", self.repo_url.as_deref())?;
        validation::optional_link("live_demo_url", self.live_demo_url.as_deref())?;
        validation::optional_link("github_url", self.github_url.as_deref())?;
        Ok(())
    }
}

/// Partial update for a project.
///
/// `None` leaves a column untouched. For nullable columns `Some(None)`
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub live_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub repo_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub live_demo_url: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub github_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl ProjectPatch {
    /// True when the patch touches no column.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            validation::required_text("title", title, MAX_TITLE_LEN)?;
        }
        if let Some(description) = &self.description {
            validation::required_text("description", description, MAX_DESCRIPTION_LEN)?;
        }
        let links = [
            ("image_url", &self.image_url),
            ("live_url", &self.live_url),
            ("repo_url", &self.repo_url),
            ("live_demo_url", &self.live_demo_url),
            ("github_url", &self.github_url),
        ];
        for (field, value) in links {
            if let Some(value) = value {
                validation::optional_link(field, value.as_deref())?;
            }
        }
        Ok(())
    }
}
