use crate::domain::project::{project_code_for_key, BoardProjects, MainProject};
use crate::domain::registry::{MultiSelectValue, ReferenceData, Registry, RegistryEntry};
use crate::wire::{IssueUpdateInput, LinkedIssueInput, NewIssueInput, SnapshotIssueInput};
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// Read-only snapshot of an issue in a linked project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedIssue {
    pub key: String,
    pub summary: String,
    pub state: usize,
}

impl LinkedIssue {
    fn from_input(input: &LinkedIssueInput) -> Self {
        Self {
            key: input.key.clone(),
            summary: input.summary.clone(),
            state: input.state,
        }
    }

    /// The state name in the linked issue's own project
    pub fn own_status<'a>(&self, projects: &'a BoardProjects) -> Option<&'a str> {
        projects
            .linked_project(project_code_for_key(&self.key))
            .and_then(|p| p.state_name(self.state))
    }
}

/// A card on the board.
///
/// Reference facets are held by registry key. The board column the issue
/// lands in is derived from its own state and cached until the next change.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub key: String,
    pub project_code: String,
    pub summary: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    /// Index into the owning project's own state list
    pub state: usize,
    pub components: BTreeSet<String>,
    pub labels: BTreeSet<String>,
    pub fix_versions: BTreeSet<String>,
    pub custom_fields: BTreeMap<String, String>,
    /// Selected option per parallel task, in the project's task order
    pub parallel_tasks: Vec<Option<usize>>,
    pub linked_issues: Vec<LinkedIssue>,
    /// Hidden by the current filters; recomputed on every rebuild
    pub filtered: bool,
    #[serde(skip)]
    board_state: OnceCell<Option<usize>>,
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.project_code == other.project_code
            && self.summary == other.summary
            && self.assignee == other.assignee
            && self.priority == other.priority
            && self.issue_type == other.issue_type
            && self.state == other.state
            && self.components == other.components
            && self.labels == other.labels
            && self.fix_versions == other.fix_versions
            && self.custom_fields == other.custom_fields
            && self.parallel_tasks == other.parallel_tasks
            && self.linked_issues == other.linked_issues
            && self.filtered == other.filtered
    }
}

impl Issue {
    pub fn new(key: impl Into<String>, state: usize) -> Self {
        let key = key.into();
        Self {
            project_code: project_code_for_key(&key).to_string(),
            key,
            summary: String::new(),
            assignee: None,
            priority: None,
            issue_type: None,
            state,
            components: BTreeSet::new(),
            labels: BTreeSet::new(),
            fix_versions: BTreeSet::new(),
            custom_fields: BTreeMap::new(),
            parallel_tasks: Vec::new(),
            linked_issues: Vec::new(),
            filtered: false,
            board_state: OnceCell::new(),
        }
    }

    /// Builds an issue from a snapshot entry, resolving indices against the
    /// registries. Unresolvable references become absent values.
    pub fn from_snapshot(
        input: &SnapshotIssueInput,
        refs: &ReferenceData,
        project: &MainProject,
    ) -> Option<Self> {
        if project.own_state_name(input.state).is_none() {
            warn!(
                issue = %input.key,
                state = input.state,
                "issue state index out of range, skipping"
            );
            return None;
        }

        let mut issue = Issue::new(&input.key, input.state);
        issue.summary = input.summary.clone();
        issue.assignee = input
            .assignee
            .and_then(|i| resolve_index(&refs.assignees, i, "assignee", &input.key));
        issue.priority = input
            .priority
            .and_then(|i| resolve_index(&refs.priorities, i, "priority", &input.key));
        issue.issue_type = input
            .issue_type
            .and_then(|i| resolve_index(&refs.issue_types, i, "issue-type", &input.key));
        issue.components =
            resolve_indices(&refs.components, &input.components, "component", &input.key);
        issue.labels = resolve_indices(&refs.labels, &input.labels, "label", &input.key);
        issue.fix_versions =
            resolve_indices(&refs.fix_versions, &input.fix_versions, "fix-version", &input.key);

        for (field_name, &index) in &input.custom {
            let value = refs
                .custom_field(field_name)
                .and_then(|field| field.values.for_index(index));
            match value {
                Some(value) => {
                    issue.custom_fields.insert(field_name.clone(), value.key.clone());
                }
                None => warn!(
                    issue = %input.key,
                    field = %field_name,
                    index,
                    "unknown custom field value"
                ),
            }
        }

        let tasks = project.parallel_tasks();
        issue.parallel_tasks = (0..tasks.len())
            .map(|position| {
                let option = *input.parallel_tasks.get(position)?;
                let task = tasks.for_index(position)?;
                task.option(option).map(|_| option)
            })
            .collect();

        issue.linked_issues = input.linked_issues.iter().map(LinkedIssue::from_input).collect();
        Some(issue)
    }

    /// Builds an issue announced by a change-set, where references are by name
    pub fn from_new(
        input: &NewIssueInput,
        refs: &ReferenceData,
        project: &MainProject,
    ) -> Option<Self> {
        let Some(state) = project.own_state_index_for_name(&input.state) else {
            warn!(
                issue = %input.key,
                state = %input.state,
                "new issue has unknown state, skipping"
            );
            return None;
        };

        let mut issue = Issue::new(&input.key, state);
        issue.summary = input.summary.clone();
        issue.assignee = input
            .assignee
            .as_deref()
            .and_then(|a| resolve_key(&refs.assignees, a, "assignee", &input.key));
        issue.priority = input
            .priority
            .as_deref()
            .and_then(|p| resolve_key(&refs.priorities, p, "priority", &input.key));
        issue.issue_type = input
            .issue_type
            .as_deref()
            .and_then(|t| resolve_key(&refs.issue_types, t, "issue-type", &input.key));
        issue.components =
            resolve_names(&refs.components, &input.components, "component", &input.key);
        issue.labels = resolve_names(&refs.labels, &input.labels, "label", &input.key);
        issue.fix_versions =
            resolve_names(&refs.fix_versions, &input.fix_versions, "fix-version", &input.key);
        for (field_name, value_key) in &input.custom {
            if custom_value_exists(refs, field_name, value_key, &input.key) {
                issue.custom_fields.insert(field_name.clone(), value_key.clone());
            }
        }
        issue.parallel_tasks = vec![None; project.parallel_tasks().len()];
        issue.set_parallel_tasks(&input.parallel_tasks, project);
        issue.linked_issues = input.linked_issues.iter().map(LinkedIssue::from_input).collect();
        Some(issue)
    }

    /// Applies a partial update. Clear flags win over a positive value for
    /// the same facet.
    pub fn apply_update(
        &mut self,
        update: &IssueUpdateInput,
        refs: &ReferenceData,
        project: &MainProject,
    ) {
        if let Some(summary) = &update.summary {
            self.summary = summary.clone();
        }
        if let Some(issue_type) = &update.issue_type {
            self.issue_type = resolve_key(&refs.issue_types, issue_type, "issue-type", &self.key);
        }
        if let Some(priority) = &update.priority {
            self.priority = resolve_key(&refs.priorities, priority, "priority", &self.key);
        }
        if let Some(state) = &update.state {
            match project.own_state_index_for_name(state) {
                Some(index) => self.set_state(index),
                None => {
                    warn!(issue = %self.key, state = %state, "update has unknown state, ignoring")
                }
            }
        }

        if update.unassigned {
            self.assignee = None;
        } else if let Some(assignee) = &update.assignee {
            self.assignee = resolve_key(&refs.assignees, assignee, "assignee", &self.key);
        }

        if update.clear_components {
            self.components.clear();
        } else if let Some(components) = &update.components {
            self.components = resolve_names(&refs.components, components, "component", &self.key);
        }
        if update.clear_labels {
            self.labels.clear();
        } else if let Some(labels) = &update.labels {
            self.labels = resolve_names(&refs.labels, labels, "label", &self.key);
        }
        if update.clear_fix_versions {
            self.fix_versions.clear();
        } else if let Some(fix_versions) = &update.fix_versions {
            self.fix_versions =
                resolve_names(&refs.fix_versions, fix_versions, "fix-version", &self.key);
        }

        for (field_name, value) in &update.custom {
            match value {
                None => {
                    self.custom_fields.remove(field_name);
                }
                Some(value_key) => {
                    if custom_value_exists(refs, field_name, value_key, &self.key) {
                        self.custom_fields.insert(field_name.clone(), value_key.clone());
                    }
                }
            }
        }

        self.set_parallel_tasks(&update.parallel_tasks, project);
    }

    fn set_parallel_tasks<'a>(
        &mut self,
        selections: impl IntoIterator<Item = (&'a String, &'a usize)>,
        project: &MainProject,
    ) {
        let tasks = project.parallel_tasks();
        if self.parallel_tasks.len() < tasks.len() {
            self.parallel_tasks.resize(tasks.len(), None);
        }
        for (code, &option) in selections {
            let valid = tasks.index_of(code).filter(|&position| {
                tasks
                    .for_index(position)
                    .and_then(|t| t.option(option))
                    .is_some()
            });
            match valid {
                Some(position) => self.parallel_tasks[position] = Some(option),
                None => {
                    warn!(issue = %self.key, task = %code, option, "unknown parallel task option")
                }
            }
        }
    }

    pub fn set_state(&mut self, state: usize) {
        self.state = state;
        self.invalidate_board_state();
    }

    pub fn invalidate_board_state(&mut self) {
        self.board_state.take();
    }

    /// The board column this issue is shown in, computed on first read
    pub fn board_state_index(&self, project: &MainProject) -> Option<usize> {
        *self
            .board_state
            .get_or_init(|| project.board_state_index_for_own(self.state))
    }

    pub fn board_status<'a>(&self, projects: &'a BoardProjects) -> Option<&'a str> {
        let project = projects.main_project(&self.project_code)?;
        let index = self.board_state_index(project)?;
        projects.board_states().get(index).map(String::as_str)
    }

    /// The state name in the issue's own project workflow
    pub fn own_status<'a>(&self, project: &'a MainProject) -> Option<&'a str> {
        project.own_state_name(self.state)
    }

    /// Option name selected for a parallel task, by task code
    pub fn parallel_task_option<'a>(
        &self,
        project: &'a MainProject,
        code: &str,
    ) -> Option<&'a str> {
        let tasks = project.parallel_tasks();
        let position = tasks.index_of(code)?;
        let option = self.parallel_tasks.get(position).copied().flatten()?;
        tasks.for_index(position)?.option(option)
    }
}

fn resolve_index<T: RegistryEntry>(
    registry: &Registry<T>,
    index: usize,
    facet: &str,
    issue: &str,
) -> Option<String> {
    let resolved = registry.for_index(index).map(|v| v.key().to_string());
    if resolved.is_none() {
        warn!(issue, facet, index, "reference index not in registry");
    }
    resolved
}

fn resolve_indices(
    registry: &Registry<MultiSelectValue>,
    indices: &[usize],
    facet: &str,
    issue: &str,
) -> BTreeSet<String> {
    indices
        .iter()
        .filter_map(|&i| resolve_index(registry, i, facet, issue))
        .collect()
}

fn resolve_key<T: RegistryEntry>(
    registry: &Registry<T>,
    key: &str,
    facet: &str,
    issue: &str,
) -> Option<String> {
    if registry.contains(key) {
        Some(key.to_string())
    } else {
        warn!(issue, facet, key, "reference key not in registry");
        None
    }
}

fn resolve_names(
    registry: &Registry<MultiSelectValue>,
    names: &[String],
    facet: &str,
    issue: &str,
) -> BTreeSet<String> {
    names
        .iter()
        .filter_map(|n| resolve_key(registry, n, facet, issue))
        .collect()
}

fn custom_value_exists(refs: &ReferenceData, field: &str, value: &str, issue: &str) -> bool {
    let exists = refs
        .custom_field(field)
        .is_some_and(|f| f.values.contains(value));
    if !exists {
        warn!(issue, field, value, "unknown custom field value");
    }
    exists
}

/// The canonical key -> issue map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueStore {
    issues: HashMap<String, Issue>,
}

impl IssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Issue> {
        self.issues.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Issue> {
        self.issues.get_mut(key)
    }

    /// Inserts an issue, returning the one it replaced
    pub(crate) fn insert(&mut self, issue: Issue) -> Option<Issue> {
        self.issues.insert(issue.key.clone(), issue)
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<Issue> {
        self.issues.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.issues.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Issue> {
        self.issues.values_mut()
    }

    pub(crate) fn invalidate_board_states(&mut self) {
        self.iter_mut().for_each(Issue::invalidate_board_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::registry::{Assignee, CustomFieldValue, ParallelTask, Priority};
    use crate::wire::MainProjectInput;
    use serde_json::json;

    fn refs() -> ReferenceData {
        let mut refs = ReferenceData {
            assignees: Registry::from_entries(vec![Assignee {
                key: "kabir".to_string(),
                email: String::new(),
                avatar: String::new(),
                name: "Kabir Khan".to_string(),
            }]),
            priorities: Registry::from_entries(vec![Priority {
                name: "high".to_string(),
                icon: String::new(),
            }]),
            components: Registry::from_entries(vec![
                MultiSelectValue::new("C1"),
                MultiSelectValue::new("C2"),
            ]),
            ..ReferenceData::default()
        };
        refs.extend_custom_field(
            "Tester",
            vec![CustomFieldValue {
                key: "bob".to_string(),
                value: "Bob".to_string(),
            }],
        );
        refs
    }

    fn project() -> MainProject {
        let input = MainProjectInput {
            state_links: Default::default(),
            colour: None,
            ranked: vec![],
            parallel_tasks: vec![ParallelTask {
                code: "US".to_string(),
                name: "Upstream".to_string(),
                options: vec!["TODO".to_string(), "Done".to_string()],
            }],
            states: None,
        };
        let states: Vec<String> = ["S1", "S2"].iter().map(|s| s.to_string()).collect();
        MainProject::owner("TDP", &states, &input)
    }

    #[test]
    fn test_snapshot_issue_with_bad_indices_keeps_rendering() {
        let input: SnapshotIssueInput = serde_json::from_value(json!({
            "key": "TDP-1", "priority": 5, "state": 1, "assignee": 0,
            "components": [1, 7], "custom": {"Tester": 0, "Nope": 0},
            "parallel-tasks": [1]
        }))
        .unwrap();

        let issue = Issue::from_snapshot(&input, &refs(), &project()).unwrap();
        assert_eq!(issue.project_code, "TDP");
        assert_eq!(issue.assignee.as_deref(), Some("kabir"));
        assert!(issue.priority.is_none());
        assert_eq!(issue.components.iter().collect::<Vec<_>>(), vec!["C2"]);
        assert_eq!(issue.custom_fields.get("Tester").map(String::as_str), Some("bob"));
        assert_eq!(issue.parallel_task_option(&project(), "US"), Some("Done"));
    }

    #[test]
    fn test_snapshot_issue_with_bad_state_is_dropped() {
        let input: SnapshotIssueInput =
            serde_json::from_value(json!({"key": "TDP-1", "state": 9})).unwrap();
        assert!(Issue::from_snapshot(&input, &refs(), &project()).is_none());
    }

    #[test]
    fn test_clear_flags_win_over_values() {
        let project = project();
        let mut issue = Issue::new("TDP-1", 0);
        issue.assignee = Some("kabir".to_string());
        issue.components.insert("C1".to_string());

        let update: IssueUpdateInput = serde_json::from_value(json!({
            "key": "TDP-1",
            "assignee": "kabir",
            "unassigned": true,
            "components": ["C2"],
            "clear-components": true,
            "summary": "changed"
        }))
        .unwrap();
        issue.apply_update(&update, &refs(), &project);

        assert!(issue.assignee.is_none());
        assert!(issue.components.is_empty());
        assert_eq!(issue.summary, "changed");
    }

    #[test]
    fn test_update_leaves_unspecified_fields() {
        let project = project();
        let mut issue = Issue::new("TDP-1", 0);
        issue.priority = Some("high".to_string());
        issue.custom_fields.insert("Tester".to_string(), "bob".to_string());

        let update: IssueUpdateInput =
            serde_json::from_value(json!({"key": "TDP-1", "custom": {"Tester": null}})).unwrap();
        issue.apply_update(&update, &refs(), &project);

        assert_eq!(issue.priority.as_deref(), Some("high"));
        assert!(issue.custom_fields.is_empty());
    }

    #[test]
    fn test_board_state_cache_is_invalidated_on_state_change() {
        let project = project();
        let mut issue = Issue::new("TDP-1", 0);
        assert_eq!(issue.board_state_index(&project), Some(0));

        issue.set_state(1);
        assert_eq!(issue.board_state_index(&project), Some(1));
    }

    #[test]
    fn test_new_issue_resolves_names() {
        let input: NewIssueInput = serde_json::from_value(json!({
            "key": "TDP-9", "state": "S2", "priority": "high", "assignee": "ghost",
            "components": ["C1"], "parallel-tasks": {"US": 0}
        }))
        .unwrap();

        let issue = Issue::from_new(&input, &refs(), &project()).unwrap();
        assert_eq!(issue.state, 1);
        assert_eq!(issue.priority.as_deref(), Some("high"));
        assert!(issue.assignee.is_none());
        assert_eq!(issue.parallel_tasks, vec![Some(0)]);
    }
}
