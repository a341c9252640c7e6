use crate::error::Result;
use crate::github::{Lookup, ProjectClient};

pub const PROJECT_PAGE_SIZE: u32 = 100;
pub const MAX_PROJECT_PAGES: u32 = 10;

struct PageCursor {
    after: Option<String>,
    page_count: u32,
    max_pages: u32,
}

impl PageCursor {
    fn new(max_pages: u32) -> Self {
        Self {
            after: None,
            page_count: 0,
            max_pages,
        }
    }

    fn exhausted(&self) -> bool {
        self.page_count >= self.max_pages
    }
}

/// Finds Projects-V2 boards by title and links issues to them.
pub struct ProjectResolver<'a, C: ProjectClient + ?Sized> {
    client: &'a C,
    page_size: u32,
    max_pages: u32,
}

impl<'a, C: ProjectClient + ?Sized> ProjectResolver<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            page_size: PROJECT_PAGE_SIZE,
            max_pages: MAX_PROJECT_PAGES,
        }
    }

    /// Exact, case-sensitive title match over at most `max_pages` pages.
    /// Missing or malformed data yields `None`; classified failures are returned.
    pub async fn find_project_id(&self, owner: &str, project_name: &str) -> Result<Option<String>> {
        let owner = owner.trim();
        let project_name = project_name.trim();
        if owner.is_empty() || project_name.is_empty() {
            tracing::warn!("Owner and project name are required to look up a project");
            return Ok(None);
        }

        tracing::info!("Searching for project '{}' owned by '{}'", project_name, owner);
        let mut cursor = PageCursor::new(self.max_pages);

        while !cursor.exhausted() {
            cursor.page_count += 1;
            tracing::debug!(
                "Fetching projects page {} for '{}' (after: {:?})",
                cursor.page_count,
                owner,
                cursor.after
            );

            let page = match self
                .client
                .list_projects_v2(owner, self.page_size, cursor.after.as_deref())
                .await?
            {
                Lookup::Found(page) => page,
                Lookup::Absent => {
                    tracing::warn!("Owner '{}' not found or has no accessible projects", owner);
                    return Ok(None);
                }
            };

            let (Some(nodes), Some(page_info)) = (page.nodes, page.page_info) else {
                tracing::warn!("Incomplete projects page for '{}', stopping search", owner);
                return Ok(None);
            };

            for node in nodes.into_iter().flatten() {
                if node.title.as_deref() != Some(project_name) {
                    continue;
                }
                match node.id.filter(|id| !id.is_empty()) {
                    Some(id) => {
                        tracing::info!("Found project '{}' with id {}", project_name, id);
                        return Ok(Some(id));
                    }
                    None => tracing::warn!("Project '{}' matched but has no id", project_name),
                }
            }

            if !page_info.has_next_page {
                tracing::warn!("Project '{}' not found for owner '{}'", project_name, owner);
                return Ok(None);
            }

            match page_info.end_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor.after = Some(next),
                None => {
                    tracing::warn!("Projects listing reported more pages but no cursor, stopping");
                    return Ok(None);
                }
            }
        }

        tracing::warn!(
            "Stopped searching for project '{}' after {} pages",
            project_name,
            cursor.max_pages
        );
        Ok(None)
    }

    /// Adds an issue (by node id) to a project, returning the project item id.
    pub async fn link_item(&self, project_id: &str, content_id: &str) -> Result<String> {
        let item_id = self
            .client
            .add_item_to_project_v2(project_id, content_id)
            .await?;
        tracing::debug!("Linked {} to project {} as {}", content_id, project_id, item_id);
        Ok(item_id)
    }
}
