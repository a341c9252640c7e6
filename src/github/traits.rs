use async_trait::async_trait;

use crate::error::Result;
use crate::github::classifier::Lookup;
use crate::models::{
    AuthenticatedUser, CreatedIssue, Label, LabelStyle, Milestone, MilestoneState, NewIssue,
    ProjectPage, Repository,
};

#[async_trait]
pub trait RepositoryClient: Send + Sync {
    async fn create_repository(&self, name: &str, private: bool) -> Result<Repository>;
    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository>;
    async fn get_authenticated_user(&self) -> Result<AuthenticatedUser>;
}

#[async_trait]
pub trait LabelMilestoneClient: Send + Sync {
    async fn get_label(&self, owner: &str, repo: &str, name: &str) -> Result<Lookup<Label>>;
    async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        style: &LabelStyle,
    ) -> Result<Label>;
    async fn list_milestones(
        &self,
        owner: &str,
        repo: &str,
        state: MilestoneState,
    ) -> Result<Vec<Milestone>>;
    async fn create_milestone(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        state: MilestoneState,
        description: Option<&str>,
    ) -> Result<Milestone>;
}

#[async_trait]
pub trait IssueClient: Send + Sync {
    async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue) -> Result<CreatedIssue>;
    /// Number of open issues whose title matches `title`.
    async fn search_issues_by_title(&self, owner: &str, repo: &str, title: &str) -> Result<u64>;
    async fn check_collaborator(&self, owner: &str, repo: &str, login: &str) -> Result<bool>;
}

#[async_trait]
pub trait ProjectClient: Send + Sync {
    /// One page of the owner's Projects-V2. `Absent` when the owner or
    /// any expected response field is missing.
    async fn list_projects_v2(
        &self,
        owner: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Lookup<ProjectPage>>;
    async fn add_item_to_project_v2(&self, project_id: &str, content_id: &str) -> Result<String>;
}

/// Every remote operation the provisioning workflow needs.
pub trait GitHubApi: RepositoryClient + LabelMilestoneClient + IssueClient + ProjectClient {}

impl<T> GitHubApi for T where T: RepositoryClient + LabelMilestoneClient + IssueClient + ProjectClient {}
