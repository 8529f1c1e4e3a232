use super::snapshot::{BlacklistInput, LinkedIssueInput};
use crate::domain::registry::{Assignee, CustomFieldValue};
use indexmap::IndexMap;
use serde::Deserialize;

/// The outer object the server wraps every change-set in
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeSetEnvelope {
    pub changes: ChangeSetInput,
}

/// One incremental diff
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChangeSetInput {
    pub view: u64,
    #[serde(default)]
    pub issues: Option<IssueChangesInput>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub fix_versions: Vec<String>,
    #[serde(default)]
    pub custom: IndexMap<String, Vec<CustomFieldValue>>,
    #[serde(default)]
    pub blacklist: Option<BlacklistInput>,
    #[serde(default)]
    pub rank: IndexMap<String, Vec<RankEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IssueChangesInput {
    pub new: Vec<NewIssueInput>,
    pub update: Vec<IssueUpdateInput>,
    pub delete: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewIssueInput {
    pub key: String,
    #[serde(rename = "type", default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub summary: String,
    /// Own state name in the issue's project
    pub state: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub fix_versions: Vec<String>,
    #[serde(default)]
    pub custom: IndexMap<String, String>,
    /// Task code to option index
    #[serde(default)]
    pub parallel_tasks: IndexMap<String, usize>,
    #[serde(default)]
    pub linked_issues: Vec<LinkedIssueInput>,
}

/// A partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IssueUpdateInput {
    pub key: String,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub summary: Option<String>,
    pub state: Option<String>,
    pub assignee: Option<String>,
    pub unassigned: bool,
    pub components: Option<Vec<String>>,
    pub clear_components: bool,
    pub labels: Option<Vec<String>>,
    pub clear_labels: bool,
    pub fix_versions: Option<Vec<String>>,
    pub clear_fix_versions: bool,
    /// Field name to value key; `null` clears the field
    pub custom: IndexMap<String, Option<String>>,
    pub parallel_tasks: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankEntry {
    pub index: usize,
    pub key: String,
}
