use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One issue to provision, as produced by the upstream extraction step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSpec {
    pub title: String,
    #[serde(default, alias = "body")]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub related_requirements: Vec<String>,
    #[serde(default)]
    pub related_issues: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub milestone: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

impl IssueSpec {
    /// Builds an issue spec, rejecting blank titles.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Issue title cannot be empty or whitespace only".to_string(),
            ));
        }
        Ok(Self {
            title,
            ..Default::default()
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_acceptance_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = Some(milestone.into());
        self
    }

    pub fn with_assignees<I, S>(mut self, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignees = assignees.into_iter().map(Into::into).collect();
        self
    }

    /// Labels trimmed, without blanks or repeats, in first-seen order.
    pub fn label_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            let label = label.trim();
            if !label.is_empty() && !names.iter().any(|n| n == label) {
                names.push(label.to_string());
            }
        }
        names
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Milestone name with surrounding whitespace removed, if any is set.
    pub fn milestone_name(&self) -> Option<&str> {
        self.milestone
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Ordered collection of issues to provision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub issues: Vec<IssueSpec>,
}

impl ResourceSpec {
    pub fn new(issues: Vec<IssueSpec>) -> Self {
        Self { issues }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Unique, non-blank label names in sorted order.
    pub fn unique_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .issues
            .iter()
            .flat_map(IssueSpec::label_names)
            .collect();
        labels.sort();
        labels.dedup();
        labels
    }

    /// Unique, non-blank milestone names in sorted order.
    pub fn unique_milestones(&self) -> Vec<String> {
        let mut milestones: Vec<String> = self
            .issues
            .iter()
            .filter_map(IssueSpec::milestone_name)
            .map(str::to_string)
            .collect();
        milestones.sort();
        milestones.dedup();
        milestones
    }
}
