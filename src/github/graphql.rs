use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ProjectPage;

pub const LIST_PROJECTS_QUERY: &str = r#"
query GetProjectsList($ownerLogin: String!, $first: Int!, $after: String) {
  repositoryOwner(login: $ownerLogin) {
    ... on ProjectV2Owner {
      projectsV2(first: $first, after: $after) {
        nodes { id title }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

pub const ADD_PROJECT_ITEM_MUTATION: &str = r#"
mutation AddItemToProject($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
    item { id }
  }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectsData {
    #[serde(default, rename = "repositoryOwner")]
    pub repository_owner: Option<ProjectOwner>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectOwner {
    #[serde(default, rename = "projectsV2")]
    pub projects_v2: Option<ProjectPage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemData {
    #[serde(default, rename = "addProjectV2ItemById")]
    pub add_item: Option<AddItemPayload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemPayload {
    #[serde(default)]
    pub item: Option<ProjectItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectItem {
    #[serde(default)]
    pub id: Option<String>,
}

impl ProjectsData {
    /// Unwraps `repositoryOwner.projectsV2`, or `None` when either level is missing.
    pub fn into_page(self) -> Option<ProjectPage> {
        self.repository_owner.and_then(|owner| owner.projects_v2)
    }
}

impl AddItemData {
    pub fn item_id(self) -> Option<String> {
        self.add_item
            .and_then(|payload| payload.item)
            .and_then(|item| item.id)
            .filter(|id| !id.is_empty())
    }
}
