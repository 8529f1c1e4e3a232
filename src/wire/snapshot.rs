use crate::domain::registry::{Assignee, CustomFieldValue, IssueType, ParallelTask, Priority};
use indexmap::IndexMap;
use serde::Deserialize;

/// A full board snapshot
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotInput {
    pub view: u64,
    pub states: Vec<StateEntry>,
    #[serde(default)]
    pub priorities: Vec<Priority>,
    #[serde(default)]
    pub issue_types: Vec<IssueType>,
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
    pub projects: ProjectsInput,
    #[serde(default)]
    pub issues: IndexMap<String, SnapshotIssueInput>,
    #[serde(default)]
    pub blacklist: Option<BlacklistInput>,
}

/// A board state is sent either as a bare name or as an object carrying one
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StateEntry {
    Name(String),
    Object { name: String },
}

impl StateEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsInput {
    pub owner: String,
    pub main: IndexMap<String, MainProjectInput>,
    #[serde(default)]
    pub linked: IndexMap<String, LinkedProjectInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MainProjectInput {
    /// Board state name to own state name; `null` means the board state does
    /// not exist for this project
    #[serde(default)]
    pub state_links: IndexMap<String, Option<String>>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub ranked: Vec<String>,
    #[serde(default)]
    pub parallel_tasks: Vec<ParallelTask>,
    /// The project's full own-state list, including states with no board link
    #[serde(default)]
    pub states: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedProjectInput {
    pub states: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotIssueInput {
    pub key: String,
    #[serde(rename = "type", default)]
    pub issue_type: Option<usize>,
    #[serde(default)]
    pub priority: Option<usize>,
    #[serde(default)]
    pub summary: String,
    pub state: usize,
    #[serde(default)]
    pub assignee: Option<usize>,
    #[serde(default)]
    pub components: Vec<usize>,
    #[serde(default)]
    pub labels: Vec<usize>,
    #[serde(default)]
    pub fix_versions: Vec<usize>,
    #[serde(default)]
    pub custom: IndexMap<String, usize>,
    #[serde(default)]
    pub parallel_tasks: Vec<usize>,
    #[serde(default)]
    pub linked_issues: Vec<LinkedIssueInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedIssueInput {
    pub key: String,
    #[serde(default)]
    pub summary: String,
    pub state: usize,
}

/// Blacklist entries, shared by snapshots and change-sets
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlacklistInput {
    pub states: Vec<String>,
    pub priorities: Vec<String>,
    pub issue_types: Vec<String>,
    pub issues: Vec<String>,
    pub removed_issues: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_entries_accept_both_shapes() {
        let states: Vec<StateEntry> =
            serde_json::from_value(json!(["S1", {"name": "S2", "header": 0}])).unwrap();
        assert_eq!(states[0].name(), "S1");
        assert_eq!(states[1].name(), "S2");
    }

    #[test]
    fn test_main_projects_keep_document_order() {
        let projects: ProjectsInput = serde_json::from_value(json!({
            "owner": "ZZZ",
            "main": {"ZZZ": {}, "AAA": {}, "MMM": {}}
        }))
        .unwrap();
        let codes: Vec<&str> = projects.main.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["ZZZ", "AAA", "MMM"]);
        assert!(projects.linked.is_empty());
    }

    #[test]
    fn test_null_state_link_is_kept() {
        let project: MainProjectInput = serde_json::from_value(json!({
            "state-links": {"S1": null, "S2": "X"},
            "ranked": ["TBG-1"]
        }))
        .unwrap();
        assert_eq!(project.state_links.get("S1"), Some(&None));
        assert_eq!(project.state_links.get("S2"), Some(&Some("X".to_string())));
    }
}
