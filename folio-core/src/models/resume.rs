//! Work history, education and certifications

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::technology::Technology;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Experience {
    pub fn period(&self) -> Period {
        Period {
            start: Some(self.start_date),
            end: self.end_date,
            ongoing: self.is_current,
        }
    }
}

/// Experience with the technologies used there, sorted by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceWithTechnologies {
    #[serde(flatten)]
    pub experience: Experience,
    pub technologies: Vec<Technology>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl Education {
    pub fn period(&self) -> Period {
        Period {
            start: self.start_date,
            end: self.end_date,
            ongoing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub issuer: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub credential_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Date range shown as `2021-03 - present`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Still running; wins over `end`
    pub ongoing: bool,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = |d: NaiveDate| d.format("%Y-%m").to_string();
        let start = self.start.map(month).unwrap_or_else(|| "?".into());
        match (self.ongoing, self.end) {
            (true, _) => write!(f, "{start} - present"),
            (false, Some(end)) => write!(f, "{start} - {}", month(end)),
            (false, None) => write!(f, "{start}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn experience_reads_date_columns() {
        let experience: Experience = serde_json::from_value(json!({
            "id": "e1",
            "company": "Acme",
            "position": "Engineer",
            "start_date": "2021-03-01",
            "end_date": "2023-06-30",
            "is_current": false,
            "sort_order": 1,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(experience.start_date, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(experience.description, None);
        assert_eq!(experience.period().to_string(), "2021-03 - 2023-06");
    }

    #[test]
    fn ongoing_period_ignores_end() {
        let period = Period {
            start: NaiveDate::from_ymd_opt(2022, 1, 10),
            end: NaiveDate::from_ymd_opt(2022, 5, 1),
            ongoing: true,
        };
        assert_eq!(period.to_string(), "2022-01 - present");

        let open = Period {
            start: None,
            end: None,
            ongoing: false,
        };
        assert_eq!(open.to_string(), "?");
    }
}
