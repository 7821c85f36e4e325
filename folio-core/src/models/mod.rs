//! Domain models with validation at construction
//!
//! Insert and patch payloads validate before they reach the store.
//! Invalid input returns ValidationError, not panic.

pub mod connection;
pub mod feedback;
pub mod fun_fact;
mod nullable;
pub mod profile;
pub mod project;
pub mod resume;
pub mod review;
pub mod stat;
pub mod technology;
pub mod validation;

pub use connection::{Connection, ConnectionStatus, ContactForm};
pub use feedback::{
    Feedback, FeedbackKind, FeedbackStatus, FeedbackWithSender, NewFeedback, Priority, SenderInfo,
};
pub use fun_fact::{group_fun_facts, FunFact, FunFactsByCategory};
pub use profile::Profile;
pub use project::{NewProject, Project, ProjectPatch, ProjectWithTechnologies};
pub use resume::{Certification, Education, Experience, ExperienceWithTechnologies, Period};
pub use review::{NewReview, Review, ReviewStatus};
pub use stat::{PortfolioStat, TOTAL_CONNECTIONS};
pub use technology::{
    group_by_category, NewTechnology, TechnologiesByCategory, Technology, TechnologyPatch,
};
pub use validation::ValidationError;
