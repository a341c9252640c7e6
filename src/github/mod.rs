pub mod classifier;
pub mod client;
pub mod graphql;
pub mod paginator;
pub mod rate_limiter;
pub mod traits;

pub use classifier::{ErrorClassifier, Lookup, RawFailure};
pub use client::GitHubClient;
pub use paginator::Paginator;
pub use rate_limiter::RateLimiter;
pub use traits::{GitHubApi, IssueClient, LabelMilestoneClient, ProjectClient, RepositoryClient};
