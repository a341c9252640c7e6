use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::{Config, DEFAULT_API_URL};
use crate::error::{ClassifiedError, Error, ErrorKind, Result};
use crate::github::classifier::{ErrorClassifier, Lookup, RawFailure};
use crate::github::graphql::{
    AddItemData, GraphQlRequest, GraphQlResponse, ProjectsData, ADD_PROJECT_ITEM_MUTATION,
    LIST_PROJECTS_QUERY,
};
use crate::github::paginator::Paginator;
use crate::github::rate_limiter::RateLimiter;
use crate::github::traits::{IssueClient, LabelMilestoneClient, ProjectClient, RepositoryClient};
use crate::models::{
    AuthenticatedUser, CreatedIssue, IssueSearchResult, Label, LabelStyle, Milestone,
    MilestoneState, NewIssue, ProjectPage, Repository,
};

const MILESTONE_PAGE_LIMIT: u32 = 10;

/// reqwest-backed implementation of every client trait.
pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_URL, 0)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_base_url(
            &config.github_token,
            &config.api_url,
            config.max_requests_per_minute,
        )
    }

    pub fn with_base_url(token: &str, base_url: &str, requests_per_minute: u32) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if !token.is_empty() {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("ghprovision/0.1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid GitHub API URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "GitHub API URL '{}' cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(requests_per_minute),
            base_url,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends one request; non-2xx responses and transport failures come back classified.
    pub(crate) async fn execute(
        &self,
        request: RequestBuilder,
        classifier: ErrorClassifier,
        context: &str,
    ) -> std::result::Result<Response, ClassifiedError> {
        self.rate_limiter.wait().await;
        tracing::debug!("Executing GitHub API call: {}", context);

        let response = request
            .send()
            .await
            .map_err(|e| classifier.classify(RawFailure::Transport(e), context))?;
        self.rate_limiter.update_from_headers(response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classifier.classify(
            RawFailure::Http {
                status,
                headers,
                body,
            },
            context,
        ))
    }

    pub(crate) async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        classifier: ErrorClassifier,
        context: &str,
    ) -> std::result::Result<T, ClassifiedError> {
        response
            .json()
            .await
            .map_err(|e| classifier.classify(RawFailure::Transport(e), context))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        classifier: ErrorClassifier,
        context: &str,
    ) -> std::result::Result<T, ClassifiedError> {
        let response = self.execute(request, classifier, context).await?;
        self.decode(response, classifier, context).await
    }

    /// Runs a GraphQL document. Error entries in a 200 response are classified too.
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        classifier: ErrorClassifier,
        context: &str,
    ) -> std::result::Result<Option<T>, ClassifiedError> {
        let request = self
            .client
            .post(self.endpoint(&["graphql"]))
            .json(&GraphQlRequest { query, variables });
        let response: GraphQlResponse<T> = self.send_json(request, classifier, context).await?;

        match response.errors {
            Some(errors) if !errors.is_empty() => {
                Err(classifier.classify(RawFailure::GraphQl(errors), context))
            }
            _ => Ok(response.data),
        }
    }
}

fn missing_field(context: &str, what: &str) -> ClassifiedError {
    let err = ClassifiedError::new(
        ErrorKind::Unknown,
        format!("Response during {} is missing {}", context, what),
    );
    tracing::error!("{}", err.message);
    err
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn create_repository(&self, name: &str, private: bool) -> Result<Repository> {
        let context = format!("creating repository '{}'", name);
        tracing::info!("Attempting to create repository: {} (private: {})", name, private);
        let request = self
            .client
            .post(self.endpoint(&["user", "repos"]))
            .json(&json!({ "name": name, "private": private, "auto_init": true }));
        Ok(self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?)
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository> {
        let context = format!("getting repository {}/{}", owner, name);
        let request = self.client.get(self.endpoint(&["repos", owner, name]));
        Ok(self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?)
    }

    async fn get_authenticated_user(&self) -> Result<AuthenticatedUser> {
        let context = "getting authenticated user";
        let request = self.client.get(self.endpoint(&["user"]));
        let user: AuthenticatedUser = self
            .send_json(request, ErrorClassifier::new(), context)
            .await?;
        if user.login.trim().is_empty() {
            return Err(missing_field(context, "the user login").into());
        }
        Ok(user)
    }
}

#[async_trait]
impl LabelMilestoneClient for GitHubClient {
    async fn get_label(&self, owner: &str, repo: &str, name: &str) -> Result<Lookup<Label>> {
        let context = format!("getting label '{}' in {}/{}", name, owner, repo);
        let classifier = ErrorClassifier::ignoring_not_found();
        let request = self
            .client
            .get(self.endpoint(&["repos", owner, repo, "labels", name]));
        let outcome = self.send_json::<Label>(request, classifier, &context).await;
        Ok(classifier.lookup(outcome)?)
    }

    async fn create_label(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        style: &LabelStyle,
    ) -> Result<Label> {
        let name = name.trim();
        let context = format!("creating label '{}' in {}/{}", name, owner, repo);
        tracing::info!("Attempting to create label '{}' in {}/{}", name, owner, repo);

        let mut payload = json!({ "name": name });
        if let Some(color) = &style.color {
            payload["color"] = json!(color.trim_start_matches('#'));
        }
        if let Some(description) = &style.description {
            payload["description"] = json!(description);
        }

        let request = self
            .client
            .post(self.endpoint(&["repos", owner, repo, "labels"]))
            .json(&payload);
        Ok(self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?)
    }

    async fn list_milestones(
        &self,
        owner: &str,
        repo: &str,
        state: MilestoneState,
    ) -> Result<Vec<Milestone>> {
        let context = format!("listing {} milestones for {}/{}", state, owner, repo);
        let mut url = self.endpoint(&["repos", owner, repo, "milestones"]);
        url.query_pairs_mut().append_pair("state", state.as_str());

        let paginator = Paginator::new(self, MILESTONE_PAGE_LIMIT);
        Ok(paginator.fetch_all(url, 100, &context).await?)
    }

    async fn create_milestone(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        state: MilestoneState,
        description: Option<&str>,
    ) -> Result<Milestone> {
        let title = title.trim();
        let context = format!("creating milestone '{}' in {}/{}", title, owner, repo);
        tracing::info!("Attempting to create milestone '{}' in {}/{}", title, owner, repo);

        let state = match state {
            MilestoneState::All => {
                tracing::warn!(
                    "Milestone '{}' cannot be created with state 'all', using 'open'",
                    title
                );
                MilestoneState::Open
            }
            other => other,
        };
        let mut payload = json!({ "title": title, "state": state.as_str() });
        if let Some(description) = description {
            payload["description"] = json!(description);
        }

        let request = self
            .client
            .post(self.endpoint(&["repos", owner, repo, "milestones"]))
            .json(&payload);
        Ok(self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?)
    }
}

#[async_trait]
impl IssueClient for GitHubClient {
    async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue) -> Result<CreatedIssue> {
        let context = format!("creating issue '{}' in {}/{}", issue.title, owner, repo);
        tracing::info!("Attempting to create issue '{}' in {}/{}", issue.title, owner, repo);
        let request = self
            .client
            .post(self.endpoint(&["repos", owner, repo, "issues"]))
            .json(issue);
        let created: CreatedIssue = self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?;
        if created.html_url.is_empty() || created.node_id.is_empty() {
            return Err(missing_field(&context, "the issue URL or node id").into());
        }
        Ok(created)
    }

    async fn search_issues_by_title(&self, owner: &str, repo: &str, title: &str) -> Result<u64> {
        let query = format!(
            "repo:{}/{} is:issue is:open in:title \"{}\"",
            owner,
            repo,
            title.replace('"', "")
        );
        let context = format!("searching issues with query '{}'", query);
        let request = self
            .client
            .get(self.endpoint(&["search", "issues"]))
            .query(&[("q", query.as_str()), ("per_page", "1")]);
        let result: IssueSearchResult = self
            .send_json(request, ErrorClassifier::new(), &context)
            .await?;
        tracing::debug!("Search for '{}' returned {} results", title, result.total_count);
        Ok(result.total_count)
    }

    async fn check_collaborator(&self, owner: &str, repo: &str, login: &str) -> Result<bool> {
        let context = format!("checking collaborator status for '{}' in {}/{}", login, owner, repo);
        let classifier = ErrorClassifier::ignoring_not_found();
        let request = self
            .client
            .get(self.endpoint(&["repos", owner, repo, "collaborators", login]));
        let outcome = self.execute(request, classifier, &context).await;

        let is_collaborator = match classifier.lookup(outcome)? {
            Lookup::Found(response) => response.status() == StatusCode::NO_CONTENT,
            Lookup::Absent => false,
        };
        tracing::debug!(
            "User '{}' is{} a collaborator on {}/{}",
            login,
            if is_collaborator { "" } else { " not" },
            owner,
            repo
        );
        Ok(is_collaborator)
    }
}

#[async_trait]
impl ProjectClient for GitHubClient {
    async fn list_projects_v2(
        &self,
        owner: &str,
        first: u32,
        after: Option<&str>,
    ) -> Result<Lookup<ProjectPage>> {
        let context = format!("listing Projects V2 for owner '{}'", owner);
        let classifier = ErrorClassifier::ignoring_not_found();
        let variables = json!({ "ownerLogin": owner, "first": first, "after": after });

        let outcome = self
            .graphql::<ProjectsData>(LIST_PROJECTS_QUERY, variables, classifier, &context)
            .await;
        let page = match classifier.lookup(outcome)? {
            Lookup::Found(Some(data)) => Lookup::from(data.into_page()),
            Lookup::Found(None) | Lookup::Absent => Lookup::Absent,
        };
        if !page.is_found() {
            tracing::warn!("No Projects V2 data in response during {}", context);
        }
        Ok(page)
    }

    async fn add_item_to_project_v2(&self, project_id: &str, content_id: &str) -> Result<String> {
        let (project_id, content_id) = (project_id.trim(), content_id.trim());
        if project_id.is_empty() || content_id.is_empty() {
            return Err(Error::InvalidInput(
                "Project node id and content node id cannot be empty".to_string(),
            ));
        }

        let context = format!("adding item '{}' to project '{}'", content_id, project_id);
        let variables = json!({ "projectId": project_id, "contentId": content_id });
        let data = self
            .graphql::<AddItemData>(ADD_PROJECT_ITEM_MUTATION, variables, ErrorClassifier::new(), &context)
            .await?;

        let item_id = data
            .and_then(AddItemData::item_id)
            .ok_or_else(|| missing_field(&context, "the project item id"))?;
        tracing::info!(
            "Added item '{}' to project '{}', new item ID: {}",
            content_id,
            project_id,
            item_id
        );
        Ok(item_id)
    }
}
