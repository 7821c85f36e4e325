//! Table definitions mirrored from `migrations/`
//!
//! The in-memory store enforces these rules so tests see the same
//! constraint failures PostgreSQL would raise.

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Deleting a referenced row fails while references exist
    Restrict,
    /// References are cleared
    SetNull,
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: Table,
    pub referenced_column: &'static str,
    pub on_delete: OnDelete,
}

/// Value filled in when an insert omits the column
#[derive(Debug, Clone, Copy)]
pub enum ColumnDefault {
    Uuid,
    Now,
    Bool(bool),
    Int(i64),
    Text(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: Table,
    pub columns: &'static [&'static str],
    pub key: &'static [&'static str],
    pub unique: &'static [&'static [&'static str]],
    /// NOT NULL columns without a default
    pub required: &'static [&'static str],
    pub defaults: &'static [(&'static str, ColumnDefault)],
    pub foreign_keys: &'static [ForeignKey],
    /// CHECK (column IN (...)) constraints
    pub allowed: &'static [(&'static str, &'static [&'static str])],
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }
}

const CONNECTION_STATUSES: &[&str] = &["unread", "read", "replied"];

static PROJECTS: TableSchema = TableSchema {
    table: Table::Projects,
    columns: &[
        "id",
        "title",
        "description",
        "image_url",
        "live_url",
        "repo_url",
        "live_demo_url",
        "github_url",
        "is_featured",
        "sort_order",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["title", "description"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("is_featured", ColumnDefault::Bool(false)),
        ("sort_order", ColumnDefault::Int(0)),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

static TECHNOLOGIES: TableSchema = TableSchema {
    table: Table::Technologies,
    columns: &["id", "name", "icon_name", "category", "created_at"],
    key: &["id"],
    unique: &[&["name"]],
    required: &["name"],
    defaults: &[("id", ColumnDefault::Uuid), ("created_at", ColumnDefault::Now)],
    foreign_keys: &[],
    allowed: &[],
};

static PROJECT_TECHNOLOGIES: TableSchema = TableSchema {
    table: Table::ProjectTechnologies,
    columns: &["project_id", "technology_id"],
    key: &["project_id", "technology_id"],
    unique: &[],
    required: &["project_id", "technology_id"],
    defaults: &[],
    foreign_keys: &[
        ForeignKey {
            column: "project_id",
            references: Table::Projects,
            referenced_column: "id",
            on_delete: OnDelete::Restrict,
        },
        ForeignKey {
            column: "technology_id",
            references: Table::Technologies,
            referenced_column: "id",
            on_delete: OnDelete::Restrict,
        },
    ],
    allowed: &[],
};

static CONNECTIONS: TableSchema = TableSchema {
    table: Table::Connections,
    columns: &[
        "id",
        "name",
        "email",
        "subject",
        "message",
        "status",
        "reply_message",
        "created_at",
        "updated_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["name", "email", "subject", "message"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("status", ColumnDefault::Text("unread")),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[("status", CONNECTION_STATUSES)],
};

static REVIEWS: TableSchema = TableSchema {
    table: Table::Reviews,
    columns: &[
        "id",
        "name",
        "role",
        "company",
        "content",
        "rating",
        "status",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["name", "role", "content"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("status", ColumnDefault::Text("pending")),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[("status", &["pending", "approved", "rejected"])],
};

static FEEDBACK: TableSchema = TableSchema {
    table: Table::Feedback,
    columns: &[
        "id",
        "type",
        "content",
        "priority",
        "status",
        "reply_message",
        "connection_id",
        "created_at",
        "updated_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["type", "content"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("status", ColumnDefault::Text("unread")),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[ForeignKey {
        column: "connection_id",
        references: Table::Connections,
        referenced_column: "id",
        on_delete: OnDelete::SetNull,
    }],
    allowed: &[
        ("type", &["feedback", "complaint", "suggestion"]),
        ("priority", &["low", "medium", "high"]),
        ("status", CONNECTION_STATUSES),
    ],
};

static PORTFOLIO_STATS: TableSchema = TableSchema {
    table: Table::PortfolioStats,
    columns: &["metric_name", "metric_value", "updated_at"],
    key: &["metric_name"],
    unique: &[],
    required: &["metric_name"],
    defaults: &[
        ("metric_value", ColumnDefault::Int(0)),
        ("updated_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

static PROFILES: TableSchema = TableSchema {
    table: Table::Profiles,
    columns: &[
        "id",
        "full_name",
        "headline",
        "bio",
        "avatar_url",
        "location",
        "email",
        "resume_url",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["full_name"],
    defaults: &[("id", ColumnDefault::Uuid), ("created_at", ColumnDefault::Now)],
    foreign_keys: &[],
    allowed: &[],
};

static EXPERIENCES: TableSchema = TableSchema {
    table: Table::Experiences,
    columns: &[
        "id",
        "company",
        "position",
        "description",
        "location",
        "start_date",
        "end_date",
        "is_current",
        "sort_order",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["company", "position", "start_date"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("is_current", ColumnDefault::Bool(false)),
        ("sort_order", ColumnDefault::Int(0)),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

static EXPERIENCE_TECHNOLOGIES: TableSchema = TableSchema {
    table: Table::ExperienceTechnologies,
    columns: &["experience_id", "technology_id"],
    key: &["experience_id", "technology_id"],
    unique: &[],
    required: &["experience_id", "technology_id"],
    defaults: &[],
    foreign_keys: &[
        ForeignKey {
            column: "experience_id",
            references: Table::Experiences,
            referenced_column: "id",
            on_delete: OnDelete::Restrict,
        },
        ForeignKey {
            column: "technology_id",
            references: Table::Technologies,
            referenced_column: "id",
            on_delete: OnDelete::Restrict,
        },
    ],
    allowed: &[],
};

static EDUCATION: TableSchema = TableSchema {
    table: Table::Education,
    columns: &[
        "id",
        "institution",
        "degree",
        "field_of_study",
        "start_date",
        "end_date",
        "description",
        "sort_order",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["institution", "degree"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("sort_order", ColumnDefault::Int(0)),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

static CERTIFICATIONS: TableSchema = TableSchema {
    table: Table::Certifications,
    columns: &[
        "id",
        "name",
        "issuer",
        "issue_date",
        "credential_url",
        "is_active",
        "sort_order",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["name", "issuer"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("is_active", ColumnDefault::Bool(true)),
        ("sort_order", ColumnDefault::Int(0)),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

static FUN_FACTS: TableSchema = TableSchema {
    table: Table::FunFacts,
    columns: &[
        "id",
        "category",
        "category_icon_name",
        "content",
        "sort_order",
        "created_at",
    ],
    key: &["id"],
    unique: &[],
    required: &["category", "content"],
    defaults: &[
        ("id", ColumnDefault::Uuid),
        ("sort_order", ColumnDefault::Int(0)),
        ("created_at", ColumnDefault::Now),
    ],
    foreign_keys: &[],
    allowed: &[],
};

pub fn schema(table: Table) -> &'static TableSchema {
    match table {
        Table::Projects => &PROJECTS,
        Table::Technologies => &TECHNOLOGIES,
        Table::ProjectTechnologies => &PROJECT_TECHNOLOGIES,
        Table::Connections => &CONNECTIONS,
        Table::Reviews => &REVIEWS,
        Table::Feedback => &FEEDBACK,
        Table::PortfolioStats => &PORTFOLIO_STATS,
        Table::Profiles => &PROFILES,
        Table::Experiences => &EXPERIENCES,
        Table::ExperienceTechnologies => &EXPERIENCE_TECHNOLOGIES,
        Table::Education => &EDUCATION,
        Table::Certifications => &CERTIFICATIONS,
        Table::FunFacts => &FUN_FACTS,
    }
}

/// Foreign keys in other tables that point at `table`
pub fn references_to(table: Table) -> impl Iterator<Item = (Table, &'static ForeignKey)> {
    Table::all().iter().flat_map(move |&owner| {
        schema(owner)
            .foreign_keys
            .iter()
            .filter(move |fk| fk.references == table)
            .map(move |fk| (owner, fk))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_a_schema() {
        for &table in Table::all() {
            let schema = schema(table);
            assert_eq!(schema.table, table);
            for key in schema.key {
                assert!(schema.has_column(key), "{table}.{key} missing");
            }
            for fk in schema.foreign_keys {
                assert!(schema.has_column(fk.column));
            }
        }
    }

    #[test]
    fn join_table_is_referenced_from_projects() {
        let refs: Vec<_> = references_to(Table::Projects).map(|(t, _)| t).collect();
        assert_eq!(refs, vec![Table::ProjectTechnologies]);

        let refs: Vec<_> = references_to(Table::Connections).map(|(t, _)| t).collect();
        assert_eq!(refs, vec![Table::Feedback]);
    }

    #[test]
    fn technologies_are_referenced_by_both_join_tables() {
        let refs: Vec<_> = references_to(Table::Technologies)
            .map(|(t, fk)| (t, fk.column))
            .collect();
        assert_eq!(
            refs,
            vec![
                (Table::ProjectTechnologies, "technology_id"),
                (Table::ExperienceTechnologies, "technology_id"),
            ]
        );
    }
}
