//! Technologies (the tags projects link to)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

/// Group name used for technologies without a category
pub const UNCATEGORIZED: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTechnology {
    pub name: String,
    pub icon_name: Option<String>,
    pub category: Option<String>,
}

impl NewTechnology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::required_text("name", &self.name, 100)?;
        validation::optional_text("icon_name", self.icon_name.as_deref(), 100)?;
        validation::optional_text("category", self.category.as_deref(), 100)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub icon_name: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::nullable::deserialize"
    )]
    pub category: Option<Option<String>>,
}

impl TechnologyPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::required_text("name", name, 100)?;
        }
        if let Some(Some(icon)) = &self.icon_name {
            validation::required_text("icon_name", icon, 100)?;
        }
        if let Some(Some(category)) = &self.category {
            validation::required_text("category", category, 100)?;
        }
        Ok(())
    }
}

/// Technologies sharing a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologiesByCategory {
    pub category: String,
    pub technologies: Vec<Technology>,
}

/// Group technologies by category, preserving input order inside each group.
///
/// Groups appear in order of first occurrence, so sorting the input by
/// (category, name) yields alphabetical groups of alphabetical entries.
pub fn group_by_category(technologies: Vec<Technology>) -> Vec<TechnologiesByCategory> {
    let mut groups: Vec<TechnologiesByCategory> = Vec::new();
    for tech in technologies {
        let category = tech
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.technologies.push(tech),
            None => groups.push(TechnologiesByCategory {
                category,
                technologies: vec![tech],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tech(name: &str, category: Option<&str>) -> Technology {
        Technology {
            id: name.to_lowercase(),
            name: name.to_string(),
            icon_name: None,
            category: category.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let groups = group_by_category(vec![
            tech("Axum", Some("Backend")),
            tech("Rust", Some("Backend")),
            tech("Svelte", Some("Frontend")),
            tech("Docker", None),
        ]);

        let names: Vec<_> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, ["Backend", "Frontend", UNCATEGORIZED]);
        assert_eq!(groups[0].technologies.len(), 2);
        assert_eq!(groups[0].technologies[1].name, "Rust");
    }

    #[test]
    fn patch_tells_null_from_missing() {
        let patch: TechnologyPatch = serde_json::from_str(r#"{ "category": null }"#).unwrap();
        assert_eq!(patch.category, Some(None));
        assert_eq!(patch.icon_name, None);
        assert!(!patch.is_empty());
    }

    #[test]
    fn empty_name_rejected() {
        assert!(NewTechnology::new("").validate().is_err());
        assert!(NewTechnology::new("Rust").with_category("Language").validate().is_ok());
    }
}
