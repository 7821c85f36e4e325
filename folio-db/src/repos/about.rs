//! About-page content: profile, experience, education, certifications
//! and fun facts. Read-only; rows are maintained outside this crate.

use serde::Serialize;

use folio_core::{
    group_fun_facts, Certification, Education, Experience, ExperienceWithTechnologies, FunFact,
    FunFactsByCategory, Profile,
};

use crate::client::Folio;
use crate::error::DbResult;
use crate::store::{Filter, Select, Table};

use super::linked::linked_technologies;

/// Every about-page section in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AboutPage {
    pub profile: Option<Profile>,
    pub experiences: Vec<ExperienceWithTechnologies>,
    pub education: Vec<Education>,
    pub certifications: Vec<Certification>,
    pub fun_facts: Vec<FunFactsByCategory>,
}

/// About-page repository
pub struct AboutRepo<'a> {
    db: &'a Folio,
}

impl<'a> AboutRepo<'a> {
    pub fn new(db: &'a Folio) -> Self {
        Self { db }
    }

    /// The site owner's profile; `None` until one is created.
    ///
    /// With several rows the earliest created wins.
    pub async fn profile(&self) -> DbResult<Option<Profile>> {
        let query = Select::from(Table::Profiles).order_asc("created_at");
        self.db.fetch_optional("about.profile", "profile", &query).await
    }

    /// Work history by ascending `sort_order`, with technologies.
    pub async fn experiences(&self) -> DbResult<Vec<ExperienceWithTechnologies>> {
        let query = Select::from(Table::Experiences).order_asc("sort_order");
        let experiences: Vec<Experience> =
            self.db.fetch_all("about.experiences", "experience", &query).await?;

        let mut linked = linked_technologies(
            self.db,
            "about.experiences",
            Table::ExperienceTechnologies,
            "experience_id",
            experiences.iter().map(|e| e.id.as_str()),
        )
        .await?;

        Ok(experiences
            .into_iter()
            .map(|experience| ExperienceWithTechnologies {
                technologies: linked.remove(&experience.id).unwrap_or_default(),
                experience,
            })
            .collect())
    }

    pub async fn education(&self) -> DbResult<Vec<Education>> {
        let query = Select::from(Table::Education).order_asc("sort_order");
        self.db.fetch_all("about.education", "education", &query).await
    }

    /// Active certifications only, by ascending `sort_order`
    pub async fn certifications(&self) -> DbResult<Vec<Certification>> {
        let query = Select::from(Table::Certifications)
            .filter(Filter::eq("is_active", true))
            .order_asc("sort_order");
        self.db
            .fetch_all("about.certifications", "certification", &query)
            .await
    }

    /// Facts grouped by category (alphabetical), each group by `sort_order`
    pub async fn fun_facts_by_category(&self) -> DbResult<Vec<FunFactsByCategory>> {
        let query = Select::from(Table::FunFacts)
            .order_asc("category")
            .order_asc("sort_order");
        let facts: Vec<FunFact> = self.db.fetch_all("about.fun_facts", "fun fact", &query).await?;
        Ok(group_fun_facts(facts))
    }

    /// All sections, fetched concurrently.
    pub async fn page(&self) -> DbResult<AboutPage> {
        let (profile, experiences, education, certifications, fun_facts) = tokio::try_join!(
            self.profile(),
            self.experiences(),
            self.education(),
            self.certifications(),
            self.fun_facts_by_category(),
        )?;
        Ok(AboutPage {
            profile,
            experiences,
            education,
            certifications,
            fun_facts,
        })
    }
}
