use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;

use crate::config::ProvisionConfig;
use crate::error::{Error, Result};
use crate::github::GitHubApi;
use crate::models::{
    LabelStyle, ProvisioningResult, ResourceSpec, DRY_RUN_MARKER, EMPTY_TITLE_MARKER,
};
use crate::provision::cancel::{self, CancellationToken};
use crate::provision::ensure::{ensure_label, ensure_milestone, ensure_repository};
use crate::provision::issues::IssueProvisioner;
use crate::provision::normalizer::Normalizer;
use crate::provision::project::ProjectResolver;

const DRY_RUN_OWNER: &str = "<authenticated-user>";

/// A run that stopped at a fatal step. `result` holds everything recorded
/// up to that point, with `fatal_error` set.
#[derive(Error, Debug)]
#[error("Workflow halted: {source}")]
pub struct WorkflowHalted {
    #[source]
    pub source: Error,
    pub result: Box<ProvisioningResult>,
}

/// Parsed `owner/name` or bare `name` repository argument.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoTarget {
    pub owner: Option<String>,
    pub name: String,
}

impl RepoTarget {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (owner, name) = match input.split_once('/') {
            Some((owner, name)) => {
                let (owner, name) = (owner.trim(), name.trim());
                if owner.is_empty() || name.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "Invalid repository '{}', expected owner/name",
                        input
                    )));
                }
                (Some(owner.to_string()), name)
            }
            None => (None, input),
        };

        if name.is_empty() || name.contains('/') {
            return Err(Error::InvalidInput(format!(
                "Invalid repository name '{}': must be non-empty and must not contain '/'",
                name
            )));
        }

        Ok(Self {
            owner,
            name: name.to_string(),
        })
    }
}

/// Keeps classified, caller and cancellation errors as they are; anything
/// else is wrapped as `Unexpected`.
fn escalate(err: Error, context: &str) -> Error {
    match err {
        Error::Classified(_) | Error::InvalidInput(_) | Error::Cancelled | Error::Unexpected { .. } => {
            err
        }
        other => Error::unexpected(context, other),
    }
}

pub struct ProvisioningOrchestrator {
    client: Arc<dyn GitHubApi>,
    config: ProvisionConfig,
    normalizer: Option<Normalizer>,
    cancel: Option<CancellationToken>,
}

impl ProvisioningOrchestrator {
    pub fn new(client: Arc<dyn GitHubApi>, config: ProvisionConfig) -> Self {
        Self {
            client,
            config,
            normalizer: None,
            cancel: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn run(
        &self,
        spec: &ResourceSpec,
        repository: &str,
        project_name: Option<&str>,
        dry_run: bool,
    ) -> std::result::Result<ProvisioningResult, WorkflowHalted> {
        tracing::info!(
            "Starting provisioning of {} issues into '{}' (dry run: {})",
            spec.issues.len(),
            repository,
            dry_run
        );

        let spec = match &self.normalizer {
            Some(normalizer) => Cow::Owned(normalizer.normalize_spec(spec)),
            None => Cow::Borrowed(spec),
        };
        let mut result = ProvisioningResult::new(project_name);

        let outcome = match RepoTarget::parse(repository) {
            Ok(target) if dry_run => {
                self.project_dry_run(&spec, &target, &mut result);
                Ok(())
            }
            Ok(target) => self.execute(&spec, &target, project_name, &mut result).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(
                    "Provisioning finished: {} issues created, {} skipped, {} failed",
                    result.issue_outcome.created.len(),
                    result.issue_outcome.skipped.len(),
                    result.issue_outcome.failed.len()
                );
                Ok(result)
            }
            Err(source) => {
                tracing::error!("Workflow halted: {}", source);
                result.fatal_error = Some(format!("Workflow halted due to error: {}", source));
                Err(WorkflowHalted {
                    source,
                    result: Box::new(result),
                })
            }
        }
    }

    /// Pure projection of the input; makes no remote calls.
    fn project_dry_run(&self, spec: &ResourceSpec, target: &RepoTarget, result: &mut ProvisioningResult) {
        tracing::warn!("Dry run mode enabled, skipping GitHub operations");
        let owner = target.owner.as_deref().unwrap_or(DRY_RUN_OWNER);
        result.repository_url = Some(format!(
            "https://github.com/{}/{} {}",
            owner, target.name, DRY_RUN_MARKER
        ));
        result.created_labels = spec.unique_labels();
        result.processed_milestones = spec
            .unique_milestones()
            .into_iter()
            .map(|m| (m, 0))
            .collect();
        if result.project_name.is_some() {
            result.project_id = Some(DRY_RUN_MARKER.to_string());
        }

        let outcome = &mut result.issue_outcome;
        for issue in &spec.issues {
            if issue.has_title() {
                outcome.created.push((
                    format!("URL for '{}' {}", issue.title, DRY_RUN_MARKER),
                    DRY_RUN_MARKER.to_string(),
                ));
            } else {
                outcome.record_failure(EMPTY_TITLE_MARKER, "Skipped issue due to empty title.");
            }
        }
        tracing::warn!("Dry run finished");
    }

    async fn execute(
        &self,
        spec: &ResourceSpec,
        target: &RepoTarget,
        project_name: Option<&str>,
        result: &mut ProvisioningResult,
    ) -> Result<()> {
        let client = self.client.as_ref();
        let token = self.cancel.as_ref();

        // Step 1: Resolve owner
        cancel::check(token)?;
        tracing::info!("Step 1: Resolving repository owner and name");
        let owner = match &target.owner {
            Some(owner) => owner.clone(),
            None => {
                cancel::guarded(token, client.get_authenticated_user())
                    .await
                    .map_err(|e| escalate(e, "resolving the authenticated user"))?
                    .login
            }
        };
        let repo = target.name.as_str();
        tracing::info!("Target repository: {}/{}", owner, repo);

        // Step 2: Repository
        cancel::check(token)?;
        tracing::info!("Step 2: Ensuring repository '{}/{}' exists", owner, repo);
        let repository = cancel::guarded(
            token,
            ensure_repository(client, &owner, repo, self.config.private_repository),
        )
        .await
        .map_err(|e| escalate(e, "ensuring the repository"))?;
        result.repository_url = Some(repository.value.html_url);

        // Step 3: Labels
        cancel::check(token)?;
        let labels = spec.unique_labels();
        tracing::info!("Step 3: Ensuring {} labels", labels.len());
        for label in &labels {
            let style = self.label_style(label);
            match cancel::guarded(token, ensure_label(client, &owner, repo, label, &style)).await {
                Ok(ensured) => {
                    if ensured.was_created {
                        tracing::info!("Label '{}' created", label);
                    }
                    result.created_labels.push(label.clone());
                }
                Err(e) if e.is_classified() => {
                    tracing::warn!("Failed to ensure label '{}': {}", label, e);
                    result.failed_labels.push((label.clone(), e.to_string()));
                }
                Err(e) => return Err(escalate(e, "ensuring labels")),
            }
        }

        // Step 4: Milestones
        cancel::check(token)?;
        let milestones = spec.unique_milestones();
        tracing::info!("Step 4: Ensuring {} milestones", milestones.len());
        let mut milestone_ids: HashMap<String, u64> = HashMap::new();
        for name in &milestones {
            let description = self
                .normalizer
                .as_ref()
                .and_then(|n| n.milestone_description(name));
            let ensured = ensure_milestone(
                client,
                &owner,
                repo,
                name,
                self.config.milestone_state,
                description,
            );
            match cancel::guarded(token, ensured).await {
                Ok(ensured) => {
                    milestone_ids.insert(name.clone(), ensured.value.number);
                    result
                        .processed_milestones
                        .push((name.clone(), ensured.value.number));
                }
                Err(e) if e.is_classified() => {
                    tracing::warn!("Failed to ensure milestone '{}': {}", name, e);
                    result.failed_milestones.push((name.clone(), e.to_string()));
                }
                Err(e) => return Err(escalate(e, "ensuring milestones")),
            }
        }

        // Step 5: Project
        cancel::check(token)?;
        let resolver = ProjectResolver::new(client);
        if let Some(name) = project_name {
            tracing::info!("Step 5: Looking up project '{}'", name);
            match cancel::guarded(token, resolver.find_project_id(&owner, name)).await {
                Ok(Some(id)) => result.project_id = Some(id),
                Ok(None) => tracing::warn!("Project '{}' not found, issues will not be linked", name),
                Err(e) if e.is_classified() => {
                    tracing::warn!("Project lookup for '{}' failed: {}", name, e);
                    result.project_lookup_error = Some(e.to_string());
                }
                Err(e) => return Err(escalate(e, "looking up the project")),
            }
        } else {
            tracing::info!("Step 5: No project requested, skipping lookup");
        }

        // Step 6: Issues
        cancel::check(token)?;
        tracing::info!("Step 6: Provisioning {} issues", spec.issues.len());
        let provisioner =
            IssueProvisioner::new(client, &owner, repo, self.config.assignee_check_concurrency)
                .with_cancellation(token);
        let pb = self.progress_bar(spec.issues.len(), "issues");
        let provisioned = provisioner
            .provision_all(&spec.issues, &milestone_ids, &mut result.issue_outcome, &pb)
            .await;
        pb.finish_and_clear();
        provisioned.map_err(|e| escalate(e, "provisioning issues"))?;

        // Step 7: Project links
        let Some(project_id) = result.project_id.clone() else {
            tracing::info!("Step 7: No project to link, skipping");
            return Ok(());
        };
        let created = result.issue_outcome.created.clone();
        tracing::info!("Step 7: Linking {} issues to project {}", created.len(), project_id);
        let pb = self.progress_bar(created.len(), "links");
        for (url, node_id) in &created {
            if let Err(e) = cancel::check(token) {
                pb.finish_and_clear();
                return Err(e);
            }
            match cancel::guarded(token, resolver.link_item(&project_id, node_id)).await {
                Ok(_) => result.project_items_added += 1,
                Err(e) if e.is_classified() => {
                    tracing::warn!("Failed to link issue {} to project: {}", url, e);
                    result.project_items_failed.push((node_id.clone(), e.to_string()));
                }
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(escalate(e, "linking issues to the project"));
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(())
    }

    fn label_style(&self, name: &str) -> LabelStyle {
        self.normalizer
            .as_ref()
            .map(|n| n.label_style(name))
            .unwrap_or_default()
    }

    fn progress_bar(&self, len: usize, unit: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
            unit
        );
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{IssueSpec, Milestone};
    use crate::provision::normalizer::ResourceDefinition;
    use crate::provision::testing::{FakeGitHub, FakeState};

    fn orchestrator(fake: &Arc<FakeGitHub>) -> ProvisioningOrchestrator {
        ProvisioningOrchestrator::new(fake.clone(), ProvisionConfig::default())
    }

    fn sample_spec() -> ResourceSpec {
        ResourceSpec::new(vec![
            IssueSpec::new("A")
                .unwrap()
                .with_labels(["bug", "ui"])
                .with_milestone("v1.0"),
            IssueSpec::new("B")
                .unwrap()
                .with_labels(["bug"])
                .with_milestone("v1.0"),
        ])
    }

    #[test]
    fn test_repo_target_parse() {
        assert_eq!(
            RepoTarget::parse("acme/app").unwrap(),
            RepoTarget {
                owner: Some("acme".into()),
                name: "app".into()
            }
        );
        assert_eq!(RepoTarget::parse(" app ").unwrap().owner, None);
        assert!(RepoTarget::parse("acme/").is_err());
        assert!(RepoTarget::parse("/app").is_err());
        assert!(RepoTarget::parse("a/b/c").is_err());
        assert!(RepoTarget::parse("  ").is_err());
    }

    #[tokio::test]
    async fn test_full_run_dedupes_labels_and_milestones() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            login: Some("acme".into()),
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "app", None, false)
            .await
            .unwrap();

        assert_eq!(result.repository_url.as_deref(), Some("https://github.com/acme/app"));
        assert_eq!(result.created_labels, vec!["bug".to_string(), "ui".to_string()]);
        assert_eq!(fake.count_calls("create_label"), 2);
        assert_eq!(fake.count_calls("create_milestone"), 1);
        assert_eq!(result.processed_milestones.len(), 1);
        assert_eq!(result.issue_outcome.created.len(), 2);
        let milestone_id = result.processed_milestones[0].1;
        assert!(fake
            .created_issues()
            .iter()
            .all(|i| i.milestone == Some(milestone_id)));
        assert!(!result.is_halted());
        assert!(!result.has_failures());
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let mut spec = sample_spec();
        spec.issues.push(IssueSpec::default());
        let result = orchestrator(&fake)
            .run(&spec, "app", Some("Roadmap"), true)
            .await
            .unwrap();

        assert!(fake.calls().is_empty());
        assert_eq!(
            result.repository_url.as_deref(),
            Some("https://github.com/<authenticated-user>/app (Dry Run)")
        );
        assert_eq!(result.project_id.as_deref(), Some(DRY_RUN_MARKER));
        assert_eq!(result.created_labels, vec!["bug".to_string(), "ui".to_string()]);
        assert_eq!(result.processed_milestones, vec![("v1.0".to_string(), 0)]);
        assert_eq!(result.issue_outcome.created.len(), 2);
        assert!(result.issue_outcome.created[0].0.ends_with(DRY_RUN_MARKER));
        assert_eq!(result.issue_outcome.failed, vec![EMPTY_TITLE_MARKER.to_string()]);
    }

    #[tokio::test]
    async fn test_existing_repository_is_reused() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            existing_repo: true,
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&ResourceSpec::default(), "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.repository_url.as_deref(), Some("https://github.com/acme/app"));
        assert_eq!(fake.count_calls("get_authenticated_user"), 0);
        assert!(result.fatal_error.is_none());
    }

    #[tokio::test]
    async fn test_existing_repository_still_gets_issues() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            existing_repo: true,
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(fake.count_calls("get_repository"), 1);
        assert_eq!(result.created_labels, vec!["bug".to_string(), "ui".to_string()]);
        assert_eq!(result.processed_milestones.len(), 1);
        assert_eq!(result.issue_outcome.created.len(), 2);
        let titles: Vec<String> = fake.created_issues().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["A".to_string(), "B".to_string()]);
        assert!(result.fatal_error.is_none());
    }

    #[tokio::test]
    async fn test_empty_title_between_valid_issues_is_recorded() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let spec = ResourceSpec::new(vec![
            IssueSpec::new("A").unwrap(),
            IssueSpec {
                title: String::new(),
                ..Default::default()
            },
            IssueSpec::new("B").unwrap(),
        ]);
        let result = orchestrator(&fake)
            .run(&spec, "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.issue_outcome.failed, vec![EMPTY_TITLE_MARKER.to_string()]);
        assert_eq!(result.issue_outcome.created.len(), 2);
        let titles: Vec<String> = fake.created_issues().into_iter().map(|i| i.title).collect();
        assert_eq!(titles, vec!["A".to_string(), "B".to_string()]);
        assert!(result.fatal_error.is_none());
    }

    #[tokio::test]
    async fn test_repository_auth_failure_halts() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            repo_error: Some(ErrorKind::Auth),
            ..Default::default()
        }));
        let halted = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap_err();
        assert_eq!(halted.source.kind(), Some(ErrorKind::Auth));
        assert!(halted.result.is_halted());
        assert!(halted.result.repository_url.is_none());
        assert_eq!(fake.count_calls("get_label"), 0);
    }

    #[tokio::test]
    async fn test_owner_resolution_failure_halts() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let halted = orchestrator(&fake)
            .run(&sample_spec(), "app", None, false)
            .await
            .unwrap_err();
        assert_eq!(halted.source.kind(), Some(ErrorKind::Auth));
        assert_eq!(fake.calls(), vec!["get_authenticated_user".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_repository_input_halts_without_calls() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let halted = orchestrator(&fake)
            .run(&sample_spec(), "acme/", None, false)
            .await
            .unwrap_err();
        assert!(matches!(halted.source, Error::InvalidInput(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_label_and_milestone_failures_are_recorded() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            labels: vec!["bug".into()],
            label_errors: [("ui".to_string(), ErrorKind::Validation)].into_iter().collect(),
            milestone_errors: [("v1.0".to_string(), ErrorKind::Auth)].into_iter().collect(),
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.created_labels, vec!["bug".to_string()]);
        assert_eq!(result.failed_labels.len(), 1);
        assert_eq!(result.failed_milestones.len(), 1);
        assert!(fake.created_issues().iter().all(|i| i.milestone.is_none()));
        assert_eq!(result.issue_outcome.created.len(), 2);
        assert!(result.has_failures());
    }

    #[tokio::test]
    async fn test_label_race_counts_as_existing() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            racing_labels: ["ui".to_string()].into_iter().collect(),
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.created_labels, vec!["bug".to_string(), "ui".to_string()]);
        assert!(result.failed_labels.is_empty());
    }

    #[tokio::test]
    async fn test_existing_closed_milestone_is_reused() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            milestones: vec![Milestone {
                number: 7,
                title: "v1.0".into(),
                state: Some("closed".into()),
            }],
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.processed_milestones, vec![("v1.0".to_string(), 7)]);
        assert_eq!(fake.count_calls("create_milestone"), 0);
    }

    #[tokio::test]
    async fn test_unclassified_issue_error_halts_with_partial_result() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            broken_issue_titles: ["B".to_string()].into_iter().collect(),
            projects: vec![("PVT_1".into(), "Roadmap".into())],
            ..Default::default()
        }));
        let halted = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", Some("Roadmap"), false)
            .await
            .unwrap_err();
        assert!(matches!(halted.source, Error::Unexpected { .. }));
        assert_eq!(halted.result.issue_outcome.created.len(), 1);
        assert!(halted
            .result
            .fatal_error
            .as_deref()
            .unwrap()
            .starts_with("Workflow halted due to error:"));
        assert_eq!(fake.count_calls("add_item_to_project_v2"), 0);
    }

    #[tokio::test]
    async fn test_project_linking_records_partial_failures() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            projects: vec![("PVT_1".into(), "Roadmap".into())],
            link_errors: ["I_2".to_string()].into_iter().collect(),
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", Some("Roadmap"), false)
            .await
            .unwrap();
        assert_eq!(result.project_id.as_deref(), Some("PVT_1"));
        assert_eq!(result.project_items_added, 1);
        assert_eq!(result.project_items_failed.len(), 1);
        assert_eq!(result.project_items_failed[0].0, "I_2");
    }

    #[tokio::test]
    async fn test_project_lookup_failure_is_recoverable() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            project_error: Some(ErrorKind::Auth),
            ..Default::default()
        }));
        let result = orchestrator(&fake)
            .run(&sample_spec(), "acme/app", Some("Roadmap"), false)
            .await
            .unwrap();
        assert!(result.project_id.is_none());
        assert!(result.project_lookup_error.is_some());
        assert_eq!(result.issue_outcome.created.len(), 2);
        assert_eq!(fake.count_calls("add_item_to_project_v2"), 0);
    }

    #[tokio::test]
    async fn test_assignee_example() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            collaborators: vec!["user1".into(), "user2".into()],
            ..Default::default()
        }));
        let spec = ResourceSpec::new(vec![IssueSpec::new("Login")
            .unwrap()
            .with_assignees(["user1", "@user2", "@invalid-user"])]);
        let result = orchestrator(&fake)
            .run(&spec, "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(
            fake.created_issues()[0].assignees,
            vec!["user1".to_string(), "user2".to_string()]
        );
        assert_eq!(
            result.issue_outcome.invalid_assignee_issues,
            vec![("Login".to_string(), vec!["invalid-user".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_halts_before_first_step() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let token = CancellationToken::new();
        token.cancel();
        let halted = orchestrator(&fake)
            .with_cancellation(token)
            .run(&sample_spec(), "acme/app", None, false)
            .await
            .unwrap_err();
        assert!(matches!(halted.source, Error::Cancelled));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_issue_create_halts() {
        let fake = Arc::new(FakeGitHub::new(FakeState {
            issue_delay: Some(std::time::Duration::from_secs(30)),
            ..Default::default()
        }));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let orchestrator = orchestrator(&fake).with_cancellation(token);
        let halted = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            orchestrator.run(&sample_spec(), "acme/app", None, false),
        )
        .await
        .expect("cancellation should end the pending create")
        .unwrap_err();
        assert!(matches!(halted.source, Error::Cancelled));
        assert!(halted.result.issue_outcome.created.is_empty());
        assert!(halted.result.fatal_error.is_some());
        assert_eq!(fake.count_calls("create_issue"), 0);
    }

    #[tokio::test]
    async fn test_normalizer_applies_before_run() {
        let fake = Arc::new(FakeGitHub::new(FakeState::default()));
        let normalizer = Normalizer::new(
            vec![ResourceDefinition::new("bug")
                .with_aliases(["defect"])
                .with_color("d73a4a")],
            vec![],
        );
        let spec = ResourceSpec::new(vec![IssueSpec::new("A")
            .unwrap()
            .with_labels(["Defect", "wontfix"])]);
        let result = orchestrator(&fake)
            .with_normalizer(normalizer)
            .run(&spec, "acme/app", None, false)
            .await
            .unwrap();
        assert_eq!(result.created_labels, vec!["bug".to_string()]);
        let created = fake.created_labels();
        assert_eq!(created[0].1.color.as_deref(), Some("d73a4a"));
        assert_eq!(fake.created_issues()[0].labels, vec!["bug".to_string()]);
    }
}
