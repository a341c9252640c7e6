use futures::stream::{self, StreamExt};

use crate::github::IssueClient;

/// Logins split by whether they can be assigned in the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssigneeValidation {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Trims, strips a leading '@', drops blanks and duplicates. Order is kept.
pub fn normalize_logins(raw: &[String]) -> Vec<String> {
    let mut logins: Vec<String> = Vec::with_capacity(raw.len());
    for login in raw {
        let login = login.trim().trim_start_matches('@').trim();
        if !login.is_empty() && !logins.iter().any(|l| l == login) {
            logins.push(login.to_string());
        }
    }
    logins
}

pub struct AssigneeValidator<'a, C: IssueClient + ?Sized> {
    client: &'a C,
    concurrency: usize,
}

impl<'a, C: IssueClient + ?Sized> AssigneeValidator<'a, C> {
    pub fn new(client: &'a C, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Checks every login against the collaborator endpoint. A failed check
    /// marks the login invalid rather than failing the issue.
    pub async fn validate(&self, owner: &str, repo: &str, raw: &[String]) -> AssigneeValidation {
        let logins = normalize_logins(raw);
        if logins.is_empty() {
            return AssigneeValidation::default();
        }

        let client = self.client;
        let checks: Vec<(String, bool)> = stream::iter(logins)
            .map(|login| async move {
                let ok = match client.check_collaborator(owner, repo, &login).await {
                    Ok(is_collaborator) => is_collaborator,
                    Err(e) => {
                        tracing::warn!("Could not verify assignee '{}': {}", login, e);
                        false
                    }
                };
                (login, ok)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut validation = AssigneeValidation::default();
        for (login, ok) in checks {
            if ok {
                validation.valid.push(login);
            } else {
                validation.invalid.push(login);
            }
        }
        validation
    }
}
