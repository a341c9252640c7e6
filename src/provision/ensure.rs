use std::future::Future;

use crate::error::{Error, Result};
use crate::github::{LabelMilestoneClient, Lookup, RepositoryClient};
use crate::models::{Label, LabelStyle, Milestone, MilestoneState, Repository};

/// A resource that is known to exist after an ensure call.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensured<T> {
    pub value: T,
    pub was_created: bool,
}

impl<T> Ensured<T> {
    fn existing(value: T) -> Self {
        Self {
            value,
            was_created: false,
        }
    }

    fn created(value: T) -> Self {
        Self {
            value,
            was_created: true,
        }
    }
}

/// Get-or-create. A create that loses a race ("already exists") is followed
/// by one more lookup before the error is surfaced.
pub async fn ensure<T, L, LF, C, CF>(what: &str, mut lookup: L, create: C) -> Result<Ensured<T>>
where
    L: FnMut() -> LF,
    LF: Future<Output = Result<Lookup<T>>>,
    C: FnOnce() -> CF,
    CF: Future<Output = Result<T>>,
{
    if let Lookup::Found(value) = lookup().await? {
        tracing::info!("{} already exists", what);
        return Ok(Ensured::existing(value));
    }

    tracing::info!("{} not found, creating it", what);
    match create().await {
        Ok(value) => Ok(Ensured::created(value)),
        Err(err) if err.is_already_exists() => {
            tracing::warn!("{} was created concurrently, reading it back", what);
            match lookup().await? {
                Lookup::Found(value) => Ok(Ensured::existing(value)),
                Lookup::Absent => Err(err),
            }
        }
        Err(err) => Err(err),
    }
}

pub async fn ensure_label<C>(
    client: &C,
    owner: &str,
    repo: &str,
    name: &str,
    style: &LabelStyle,
) -> Result<Ensured<Label>>
where
    C: LabelMilestoneClient + ?Sized,
{
    let what = format!("Label '{}'", name);
    ensure(
        &what,
        || client.get_label(owner, repo, name),
        || client.create_label(owner, repo, name, style),
    )
    .await
}

/// Milestones are matched by exact title across open and closed ones.
pub async fn ensure_milestone<C>(
    client: &C,
    owner: &str,
    repo: &str,
    title: &str,
    state: MilestoneState,
    description: Option<&str>,
) -> Result<Ensured<Milestone>>
where
    C: LabelMilestoneClient + ?Sized,
{
    let what = format!("Milestone '{}'", title);
    ensure(
        &what,
        move || async move {
            let milestones = client
                .list_milestones(owner, repo, MilestoneState::All)
                .await?;
            let found = milestones.into_iter().find(|m| m.title == title);
            Ok::<_, Error>(Lookup::from(found))
        },
        || client.create_milestone(owner, repo, title, state, description),
    )
    .await
}

/// Repositories are created first; an "already exists" rejection falls back
/// to reading the existing one. Any other failure is returned as is.
pub async fn ensure_repository<C>(
    client: &C,
    owner: &str,
    name: &str,
    private: bool,
) -> Result<Ensured<Repository>>
where
    C: RepositoryClient + ?Sized,
{
    match client.create_repository(name, private).await {
        Ok(repo) => {
            tracing::info!("Repository '{}/{}' created: {}", owner, name, repo.html_url);
            Ok(Ensured::created(repo))
        }
        Err(err) if err.is_already_exists() => {
            tracing::warn!(
                "Repository '{}/{}' already exists. Proceeding with existing repository",
                owner,
                name
            );
            let repo = client.get_repository(owner, name).await?;
            Ok(Ensured::existing(repo))
        }
        Err(err) => Err(err),
    }
}
