use std::collections::HashMap;

use indicatif::ProgressBar;

use crate::error::Result;
use crate::github::IssueClient;
use crate::models::{IssueOutcome, IssueSpec, NewIssue, EMPTY_TITLE_MARKER};
use crate::provision::assignees::AssigneeValidator;
use crate::provision::cancel::{self, CancellationToken};

/// Renders the issue body: description, then the non-empty checklist sections.
pub fn build_issue_body(issue: &IssueSpec) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !issue.description.is_empty() {
        parts.push(issue.description.clone());
    }

    let sections: [(&str, &[String], &str); 4] = [
        ("Tasks", issue.tasks.as_slice(), "- [ ] "),
        ("Related Requirements", issue.related_requirements.as_slice(), "- "),
        ("Related Issues", issue.related_issues.as_slice(), "- "),
        ("Acceptance Criteria", issue.acceptance_criteria.as_slice(), "- [ ] "),
    ];
    for (heading, items, prefix) in sections {
        let items: Vec<&String> = items.iter().filter(|item| !item.trim().is_empty()).collect();
        if items.is_empty() {
            continue;
        }
        parts.push(format!("\n## {}", heading));
        parts.extend(items.into_iter().map(|item| format!("{}{}", prefix, item)));
    }

    parts.join("\n")
}

/// Creates issues one at a time, recording per-issue outcomes.
pub struct IssueProvisioner<'a, C: IssueClient + ?Sized> {
    client: &'a C,
    owner: &'a str,
    repo: &'a str,
    validator: AssigneeValidator<'a, C>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, C: IssueClient + ?Sized> IssueProvisioner<'a, C> {
    pub fn new(client: &'a C, owner: &'a str, repo: &'a str, assignee_concurrency: usize) -> Self {
        Self {
            client,
            owner,
            repo,
            validator: AssigneeValidator::new(client, assignee_concurrency),
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Provisions every issue in order. Returns `Err` only for cancellation or
    /// an unclassified failure; everything else lands in `outcome`.
    pub async fn provision_all(
        &self,
        issues: &[IssueSpec],
        milestone_ids: &HashMap<String, u64>,
        outcome: &mut IssueOutcome,
        progress: &ProgressBar,
    ) -> Result<()> {
        for issue in issues {
            cancel::check(self.cancel)?;
            progress.set_message(issue.title.clone());
            self.provision(issue, milestone_ids, outcome).await?;
            progress.inc(1);
        }
        Ok(())
    }

    pub async fn provision(
        &self,
        issue: &IssueSpec,
        milestone_ids: &HashMap<String, u64>,
        outcome: &mut IssueOutcome,
    ) -> Result<()> {
        if !issue.has_title() {
            tracing::warn!("Skipping issue with empty title");
            outcome.record_failure(EMPTY_TITLE_MARKER, "Skipped issue due to empty title.");
            return Ok(());
        }

        let attempt = self.try_provision(issue, milestone_ids, outcome);
        match cancel::guarded(self.cancel, attempt).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_classified() => {
                tracing::error!("Failed to process issue '{}': {}", issue.title, e);
                outcome.record_failure(
                    issue.title.clone(),
                    format!("Failed to process issue '{}': {}", issue.title, e),
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn try_provision(
        &self,
        issue: &IssueSpec,
        milestone_ids: &HashMap<String, u64>,
        outcome: &mut IssueOutcome,
    ) -> Result<()> {
        let title = issue.title.as_str();

        let open = self
            .client
            .search_issues_by_title(self.owner, self.repo, title)
            .await?;
        if open > 0 {
            tracing::info!("Issue '{}' already exists, skipping", title);
            outcome.skipped.push(title.to_string());
            return Ok(());
        }

        let milestone = match issue.milestone_name() {
            Some(name) => {
                let id = milestone_ids.get(name).copied();
                if id.is_none() {
                    tracing::warn!(
                        "Milestone '{}' for issue '{}' was not provisioned, creating without it",
                        name,
                        title
                    );
                }
                id
            }
            None => None,
        };

        let assignees = if issue.assignees.is_empty() {
            Vec::new()
        } else {
            let validation = self
                .validator
                .validate(self.owner, self.repo, &issue.assignees)
                .await;
            if !validation.invalid.is_empty() {
                tracing::warn!(
                    "Issue '{}' has invalid assignees: {}",
                    title,
                    validation.invalid.join(", ")
                );
                outcome
                    .invalid_assignee_issues
                    .push((title.to_string(), validation.invalid));
            }
            validation.valid
        };

        let new_issue = NewIssue {
            title: title.to_string(),
            body: build_issue_body(issue),
            labels: issue.label_names(),
            milestone,
            assignees,
        };

        let created = self
            .client
            .create_issue(self.owner, self.repo, &new_issue)
            .await?;
        tracing::info!("Created issue #{}: {}", created.number, created.html_url);
        outcome.created.push((created.html_url, created.node_id));
        Ok(())
    }
}
