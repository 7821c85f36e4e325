//! Fun facts shown on the about page, grouped by category

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunFact {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub category_icon_name: Option<String>,
    pub content: String,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Facts sharing a category, with the category's icon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunFactsByCategory {
    pub category: String,
    pub category_icon_name: Option<String>,
    pub items: Vec<FunFact>,
}

/// Group facts by category in order of first occurrence.
///
/// The group icon is the first fact's icon. Input sorted by
/// (category, sort_order) yields alphabetical groups in display order.
pub fn group_fun_facts(facts: Vec<FunFact>) -> Vec<FunFactsByCategory> {
    let mut groups: Vec<FunFactsByCategory> = Vec::new();
    for fact in facts {
        match groups.iter_mut().find(|g| g.category == fact.category) {
            Some(group) => group.items.push(fact),
            None => groups.push(FunFactsByCategory {
                category: fact.category.clone(),
                category_icon_name: fact.category_icon_name.clone(),
                items: vec![fact],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(category: &str, icon: Option<&str>, content: &str) -> FunFact {
        FunFact {
            id: content.to_lowercase(),
            category: category.to_string(),
            category_icon_name: icon.map(str::to_string),
            content: content.to_string(),
            sort_order: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn icon_comes_from_first_fact() {
        let groups = group_fun_facts(vec![
            fact("Hobbies", Some("guitar"), "Plays bass"),
            fact("Hobbies", Some("bike"), "Rides gravel"),
            fact("Food", None, "Makes ramen"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category_icon_name.as_deref(), Some("guitar"));
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].category, "Food");
        assert_eq!(groups[1].category_icon_name, None);
    }
}
