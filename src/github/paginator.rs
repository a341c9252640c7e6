use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::error::ClassifiedError;
use crate::github::classifier::ErrorClassifier;
use crate::github::client::GitHubClient;

/// Follows REST `Link: rel="next"` pagination.
pub struct Paginator<'a> {
    github: &'a GitHubClient,
    max_pages: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(github: &'a GitHubClient, max_pages: u32) -> Self {
        Self { github, max_pages }
    }

    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        base_url: Url,
        per_page: u32,
        context: &str,
    ) -> Result<Vec<T>, ClassifiedError> {
        let classifier = ErrorClassifier::new();
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let mut url = base_url.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &per_page.to_string())
                .append_pair("page", &page.to_string());

            tracing::debug!("Fetching: {}", url);
            let response = self
                .github
                .execute(self.github.client().get(url), classifier, context)
                .await?;

            let has_next = response
                .headers()
                .get("link")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.contains("rel=\"next\""))
                .unwrap_or(false);

            let items: Vec<T> = self.github.decode(response, classifier, context).await?;
            let items_count = items.len();
            all_items.extend(items);

            if !has_next || items_count < per_page as usize {
                break;
            }
            if page >= self.max_pages {
                tracing::warn!(
                    "Stopped paginating after {} pages during {}",
                    self.max_pages,
                    context
                );
                break;
            }

            page += 1;
        }

        Ok(all_items)
    }
}
