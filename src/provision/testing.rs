//! In-memory GitHub double shared by the provisioning tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClassifiedError, Error, ErrorKind, Result};
use crate::github::{IssueClient, LabelMilestoneClient, Lookup, ProjectClient, RepositoryClient};
use crate::models::{
    AuthenticatedUser, CreatedIssue, Label, LabelStyle, Milestone, MilestoneState, NewIssue,
    PageInfo, ProjectNode, ProjectPage, Repository,
};

#[derive(Debug, Default)]
pub struct FakeState {
    /// `None` makes the authenticated-user call fail with `Auth`.
    pub login: Option<String>,
    pub existing_repo: bool,
    pub repo_error: Option<ErrorKind>,
    pub labels: Vec<String>,
    pub label_errors: HashMap<String, ErrorKind>,
    /// Label creates that lose the race: 422 "already exists", label then visible.
    pub racing_labels: HashSet<String>,
    pub milestones: Vec<Milestone>,
    pub milestone_errors: HashMap<String, ErrorKind>,
    pub open_issue_titles: Vec<String>,
    pub issue_errors: HashMap<String, ErrorKind>,
    /// Issue titles whose create fails with an unclassified error.
    pub broken_issue_titles: HashSet<String>,
    /// Creates stall this long before answering.
    pub issue_delay: Option<Duration>,
    pub collaborators: Vec<String>,
    pub collaborator_errors: HashSet<String>,
    /// (id, title) in listing order.
    pub projects: Vec<(String, String)>,
    /// Every page is full and reports another one.
    pub endless_projects: bool,
    pub project_error: Option<ErrorKind>,
    pub link_errors: HashSet<String>,
    pub calls: Vec<String>,
    pub created_issues: Vec<NewIssue>,
    pub created_labels: Vec<(String, LabelStyle)>,
}

pub struct FakeGitHub {
    state: Mutex<FakeState>,
}

fn failure(kind: ErrorKind, message: &str) -> Error {
    ClassifiedError::new(kind, message).into()
}

fn duplicate(message: &str) -> Error {
    ClassifiedError::new(ErrorKind::Validation, message)
        .with_status(422)
        .marked_already_exists()
        .into()
}

impl FakeGitHub {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == name)
            .count()
    }

    pub fn created_issues(&self) -> Vec<NewIssue> {
        self.state.lock().unwrap().created_issues.clone()
    }

    pub fn created_labels(&self) -> Vec<(String, LabelStyle)> {
        self.state.lock().unwrap().created_labels.clone()
    }

    fn record(&self, call: &str) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.to_string());
        state
    }
}

fn repository(owner: &str, name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        full_name: format!("{}/{}", owner, name),
        html_url: format!("https://github.com/{}/{}", owner, name),
        private: true,
    }
}

#[async_trait]
impl RepositoryClient for FakeGitHub {
    async fn create_repository(&self, name: &str, _private: bool) -> Result<Repository> {
        let state = self.record("create_repository");
        if let Some(kind) = state.repo_error {
            return Err(failure(kind, "repository create rejected"));
        }
        if state.existing_repo {
            return Err(duplicate("name already exists on this account"));
        }
        let owner = state.login.clone().unwrap_or_else(|| "acme".to_string());
        Ok(repository(&owner, name))
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let _state = self.record("get_repository");
        Ok(repository(owner, name))
    }

    async fn get_authenticated_user(&self) -> Result<AuthenticatedUser> {
        let state = self.record("get_authenticated_user");
        match &state.login {
            Some(login) => Ok(AuthenticatedUser {
                login: login.clone(),
            }),
            None => Err(failure(ErrorKind::Auth, "Bad credentials")),
        }
    }
}

#[async_trait]
impl LabelMilestoneClient for FakeGitHub {
    async fn get_label(&self, _owner: &str, _repo: &str, name: &str) -> Result<Lookup<Label>> {
        let state = self.record("get_label");
        let found = state.labels.iter().find(|l| l.as_str() == name).map(|l| Label {
            name: l.clone(),
            color: None,
            description: None,
        });
        Ok(found.into())
    }

    async fn create_label(
        &self,
        _owner: &str,
        _repo: &str,
        name: &str,
        style: &LabelStyle,
    ) -> Result<Label> {
        let mut state = self.record("create_label");
        if let Some(kind) = state.label_errors.get(name) {
            return Err(failure(*kind, "label create rejected"));
        }
        if state.racing_labels.remove(name) {
            state.labels.push(name.to_string());
            return Err(duplicate("Label already exists"));
        }
        state.labels.push(name.to_string());
        state.created_labels.push((name.to_string(), style.clone()));
        Ok(Label {
            name: name.to_string(),
            color: style.color.clone(),
            description: style.description.clone(),
        })
    }

    async fn list_milestones(
        &self,
        _owner: &str,
        _repo: &str,
        _state: MilestoneState,
    ) -> Result<Vec<Milestone>> {
        let state = self.record("list_milestones");
        Ok(state.milestones.clone())
    }

    async fn create_milestone(
        &self,
        _owner: &str,
        _repo: &str,
        title: &str,
        milestone_state: MilestoneState,
        _description: Option<&str>,
    ) -> Result<Milestone> {
        let mut state = self.record("create_milestone");
        if let Some(kind) = state.milestone_errors.get(title) {
            return Err(failure(*kind, "milestone create rejected"));
        }
        let number = 100 + state.milestones.len() as u64;
        let milestone = Milestone {
            number,
            title: title.to_string(),
            state: Some(milestone_state.to_string()),
        };
        state.milestones.push(milestone.clone());
        Ok(milestone)
    }
}

#[async_trait]
impl IssueClient for FakeGitHub {
    async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue) -> Result<CreatedIssue> {
        let delay = self.state.lock().unwrap().issue_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.record("create_issue");
        if state.broken_issue_titles.contains(&issue.title) {
            return Err(Error::Config("response handler panicked".to_string()));
        }
        if let Some(kind) = state.issue_errors.get(&issue.title) {
            return Err(failure(*kind, "issue create rejected"));
        }
        state.created_issues.push(issue.clone());
        let number = state.created_issues.len() as u64;
        Ok(CreatedIssue {
            number,
            html_url: format!("https://github.com/{}/{}/issues/{}", owner, repo, number),
            node_id: format!("I_{}", number),
        })
    }

    async fn search_issues_by_title(&self, _owner: &str, _repo: &str, title: &str) -> Result<u64> {
        let state = self.record("search_issues_by_title");
        Ok(state.open_issue_titles.iter().filter(|t| t.as_str() == title).count() as u64)
    }

    async fn check_collaborator(&self, _owner: &str, _repo: &str, login: &str) -> Result<bool> {
        let state = self.record("check_collaborator");
        if state.collaborator_errors.contains(login) {
            return Err(failure(ErrorKind::Transient, "connection reset"));
        }
        Ok(state.collaborators.iter().any(|c| c == login))
    }
}

#[async_trait]
impl ProjectClient for FakeGitHub {
    async fn list_projects_v2(
        &self,
        _owner: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Lookup<ProjectPage>> {
        let state = self.record("list_projects_v2");
        if let Some(kind) = state.project_error {
            return Err(failure(kind, "projects query rejected"));
        }

        let start: usize = after.and_then(|c| c.parse().ok()).unwrap_or(0);
        let first = first as usize;

        if state.endless_projects {
            let nodes = (start..start + first)
                .map(|i| {
                    Some(ProjectNode {
                        id: Some(format!("PVT_{}", i)),
                        title: Some(format!("Board {}", i)),
                    })
                })
                .collect();
            return Ok(Lookup::Found(ProjectPage {
                nodes: Some(nodes),
                page_info: Some(PageInfo {
                    end_cursor: Some((start + first).to_string()),
                    has_next_page: true,
                }),
            }));
        }

        let end = (start + first).min(state.projects.len());
        let nodes = state.projects[start.min(end)..end]
            .iter()
            .map(|(id, title)| {
                Some(ProjectNode {
                    id: Some(id.clone()),
                    title: Some(title.clone()),
                })
            })
            .collect();
        Ok(Lookup::Found(ProjectPage {
            nodes: Some(nodes),
            page_info: Some(PageInfo {
                end_cursor: Some(end.to_string()),
                has_next_page: end < state.projects.len(),
            }),
        }))
    }

    async fn add_item_to_project_v2(&self, _project_id: &str, content_id: &str) -> Result<String> {
        let state = self.record("add_item_to_project_v2");
        if state.link_errors.contains(content_id) {
            return Err(failure(ErrorKind::Auth, "Resource not accessible by integration"));
        }
        Ok(format!("PVTI_{}", content_id))
    }
}
