pub mod assignees;
pub mod cancel;
pub mod ensure;
pub mod issues;
pub mod normalizer;
pub mod orchestrator;
pub mod project;

#[cfg(test)]
pub(crate) mod testing;

pub use assignees::{normalize_logins, AssigneeValidation, AssigneeValidator};
pub use cancel::CancellationToken;
pub use ensure::{ensure, ensure_label, ensure_milestone, ensure_repository, Ensured};
pub use issues::{build_issue_body, IssueProvisioner};
pub use normalizer::{DefinitionSet, Normalizer, ResourceDefinition};
pub use orchestrator::{ProvisioningOrchestrator, RepoTarget, WorkflowHalted};
pub use project::ProjectResolver;
