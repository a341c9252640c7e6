pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod provision;

pub use config::{Config, ProvisionConfig};
pub use error::{ClassifiedError, Error, ErrorKind, Result};
pub use github::{ErrorClassifier, GitHubApi, GitHubClient, Lookup};
pub use models::{IssueSpec, ProvisioningResult, ResourceSpec};
pub use provision::{CancellationToken, Normalizer, ProvisioningOrchestrator, WorkflowHalted};
