use serde::Serialize;

pub const EMPTY_TITLE_MARKER: &str = "(Empty Title)";
pub const DRY_RUN_MARKER: &str = "(Dry Run)";

/// Per-issue results of one provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IssueOutcome {
    /// (html url, node id) of every issue created.
    pub created: Vec<(String, String)>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub errors: Vec<String>,
    pub invalid_assignee_issues: Vec<(String, Vec<String>)>,
}

impl IssueOutcome {
    pub fn total_processed(&self) -> usize {
        self.created.len() + self.skipped.len() + self.failed.len()
    }

    pub fn record_failure(&mut self, title: impl Into<String>, error: impl Into<String>) {
        self.failed.push(title.into());
        self.errors.push(error.into());
    }
}

/// Aggregated report of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisioningResult {
    pub repository_url: Option<String>,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// Both newly created and already existing labels.
    pub created_labels: Vec<String>,
    pub failed_labels: Vec<(String, String)>,
    pub processed_milestones: Vec<(String, u64)>,
    pub failed_milestones: Vec<(String, String)>,
    pub issue_outcome: IssueOutcome,
    pub project_items_added: usize,
    pub project_items_failed: Vec<(String, String)>,
    pub project_lookup_error: Option<String>,
    pub fatal_error: Option<String>,
}

impl ProvisioningResult {
    pub fn new(project_name: Option<&str>) -> Self {
        Self {
            project_name: project_name.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn is_halted(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// True when the run completed but some resources could not be provisioned.
    pub fn has_failures(&self) -> bool {
        !self.failed_labels.is_empty()
            || !self.failed_milestones.is_empty()
            || !self.issue_outcome.failed.is_empty()
            || !self.project_items_failed.is_empty()
            || self.project_lookup_error.is_some()
    }
}
