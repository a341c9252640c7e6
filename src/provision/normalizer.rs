use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::models::{IssueSpec, LabelStyle, ResourceSpec};

/// A canonical label or milestone and the spellings that map to it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Contents of a `--defaults` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionSet {
    #[serde(default)]
    pub labels: Vec<ResourceDefinition>,
    #[serde(default)]
    pub milestones: Vec<ResourceDefinition>,
}

impl DefinitionSet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

struct Catalog {
    definitions: Vec<ResourceDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    fn new(definitions: Vec<ResourceDefinition>) -> Self {
        let mut index = HashMap::new();
        for (i, def) in definitions.iter().enumerate() {
            for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
                index.entry(key.trim().to_lowercase()).or_insert(i);
            }
        }
        Self { definitions, index }
    }

    fn resolve(&self, raw: &str) -> Option<&ResourceDefinition> {
        self.index
            .get(&raw.trim().to_lowercase())
            .map(|&i| &self.definitions[i])
    }
}

/// Maps free-form label and milestone names onto a known set.
pub struct Normalizer {
    labels: Catalog,
    milestones: Catalog,
}

impl Normalizer {
    pub fn new(labels: Vec<ResourceDefinition>, milestones: Vec<ResourceDefinition>) -> Self {
        Self {
            labels: Catalog::new(labels),
            milestones: Catalog::new(milestones),
        }
    }

    pub fn from_definitions(set: DefinitionSet) -> Self {
        Self::new(set.labels, set.milestones)
    }

    /// Unknown labels are dropped; duplicates collapse.
    pub fn normalize_labels(&self, labels: &[String]) -> Vec<String> {
        let mut normalized: Vec<String> = Vec::new();
        for raw in labels {
            if raw.trim().is_empty() {
                continue;
            }
            match self.labels.resolve(raw) {
                Some(def) => {
                    if !normalized.contains(&def.name) {
                        normalized.push(def.name.clone());
                    }
                }
                None => tracing::warn!("Unknown label '{}' dropped", raw),
            }
        }
        normalized
    }

    /// Unknown milestones are kept as written.
    pub fn normalize_milestone(&self, milestone: &str) -> String {
        match self.milestones.resolve(milestone) {
            Some(def) => def.name.clone(),
            None => {
                tracing::warn!("Unknown milestone '{}' kept as is", milestone);
                milestone.to_string()
            }
        }
    }

    pub fn normalize_issue(&self, issue: &IssueSpec) -> IssueSpec {
        IssueSpec {
            labels: self.normalize_labels(&issue.labels),
            milestone: issue
                .milestone_name()
                .map(|m| self.normalize_milestone(m)),
            ..issue.clone()
        }
    }

    pub fn normalize_spec(&self, spec: &ResourceSpec) -> ResourceSpec {
        ResourceSpec::new(spec.issues.iter().map(|i| self.normalize_issue(i)).collect())
    }

    pub fn label_style(&self, name: &str) -> LabelStyle {
        self.labels
            .resolve(name)
            .map(|def| LabelStyle {
                color: def.color.clone(),
                description: def.description.clone(),
            })
            .unwrap_or_default()
    }

    pub fn milestone_description(&self, name: &str) -> Option<&str> {
        self.milestones
            .resolve(name)
            .and_then(|def| def.description.as_deref())
    }
}
