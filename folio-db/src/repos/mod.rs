//! Repository pattern for the portfolio tables
//!
//! Each repository borrows the [`Folio`](crate::Folio) handle and issues
//! its store calls through the retry wrapper.

pub mod about;
pub mod connections;
pub mod dashboard;
pub mod feedback;
mod linked;
pub mod projects;
pub mod reviews;
pub mod stats;
pub mod technologies;

pub use about::{AboutPage, AboutRepo};
pub use connections::ConnectionRepo;
pub use dashboard::DashboardSummary;
pub use feedback::FeedbackRepo;
pub use projects::{ProjectRepo, ProjectTechnology};
pub use reviews::ReviewRepo;
pub use stats::StatsRepo;
pub use technologies::TechnologyRepo;
