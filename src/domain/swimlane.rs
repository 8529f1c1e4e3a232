use crate::domain::filter::{BoardFilters, Facet};
use crate::domain::issue::Issue;
use crate::domain::project::BoardProjects;
use crate::domain::registry::{ReferenceData, Registry, RegistryEntry};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// The closed set of swimlane strategies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SwimlaneFacet {
    Project,
    Priority,
    IssueType,
    Assignee,
    Component,
    Label,
    FixVersion,
    CustomField(String),
}

impl SwimlaneFacet {
    /// Resolves a swimlane name. Custom fields are accepted either bare or as
    /// `custom.<name>`, but only when the board has that field configured.
    pub fn resolve(name: &str, refs: &ReferenceData) -> Option<Self> {
        let facet = match name {
            "project" => Self::Project,
            "priority" => Self::Priority,
            "issue-type" => Self::IssueType,
            "assignee" => Self::Assignee,
            "component" => Self::Component,
            "label" => Self::Label,
            "fix-version" => Self::FixVersion,
            _ => {
                let field = name.strip_prefix("custom.").unwrap_or(name);
                refs.custom_field(field)?;
                Self::CustomField(field.to_string())
            }
        };
        Some(facet)
    }

    /// The filter facet governing lane visibility
    pub fn filter_facet(&self) -> Facet {
        match self {
            Self::Project => Facet::Project,
            Self::Priority => Facet::Priority,
            Self::IssueType => Facet::IssueType,
            Self::Assignee => Facet::Assignee,
            Self::Component => Facet::Component,
            Self::Label => Facet::Label,
            Self::FixVersion => Facet::FixVersion,
            Self::CustomField(name) => Facet::CustomField(name.clone()),
        }
    }

    fn has_none_lane(&self) -> bool {
        !matches!(self, Self::Project)
    }

    /// Lane keys an issue belongs to; `None` is the "no value" lane
    fn lane_keys(&self, issue: &Issue) -> Vec<Option<String>> {
        let single = |value: &Option<String>| vec![value.clone()];
        let multi = |values: &BTreeSet<String>| {
            if values.is_empty() {
                vec![None]
            } else {
                values.iter().cloned().map(Some).collect()
            }
        };
        match self {
            Self::Project => vec![Some(issue.project_code.clone())],
            Self::Priority => single(&issue.priority),
            Self::IssueType => single(&issue.issue_type),
            Self::Assignee => single(&issue.assignee),
            Self::Component => multi(&issue.components),
            Self::Label => multi(&issue.labels),
            Self::FixVersion => multi(&issue.fix_versions),
            Self::CustomField(name) => vec![issue.custom_fields.get(name).cloned()],
        }
    }
}

impl fmt::Display for SwimlaneFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filter_facet())
    }
}

/// Identity and display text of one lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneHeader {
    pub name: String,
    pub display: String,
    /// The facet value the lane holds; `None` for the trailing none lane.
    /// Visibility is carried across rebuilds under this value.
    pub value: Option<String>,
}

/// Buckets issues into the lanes of one facet
pub struct SwimlaneIndexer<'a> {
    facet: &'a SwimlaneFacet,
    refs: &'a ReferenceData,
    projects: &'a BoardProjects,
    none_lane_name: &'a str,
}

impl<'a> SwimlaneIndexer<'a> {
    pub fn new(
        facet: &'a SwimlaneFacet,
        refs: &'a ReferenceData,
        projects: &'a BoardProjects,
        none_lane_name: &'a str,
    ) -> Self {
        Self {
            facet,
            refs,
            projects,
            none_lane_name,
        }
    }

    pub fn facet(&self) -> &SwimlaneFacet {
        self.facet
    }

    /// Lane headers in registry order, none lane last
    pub fn lanes(&self) -> Vec<LaneHeader> {
        fn headers<T: RegistryEntry>(
            registry: &Registry<T>,
            display: impl Fn(&T) -> String,
        ) -> Vec<LaneHeader> {
            registry
                .iter()
                .map(|value| LaneHeader {
                    name: value.key().to_string(),
                    display: display(value),
                    value: Some(value.key().to_string()),
                })
                .collect()
        }

        let mut lanes: Vec<LaneHeader> = match self.facet {
            SwimlaneFacet::Project => self
                .projects
                .main_codes()
                .map(|code| LaneHeader {
                    name: code.to_string(),
                    display: code.to_string(),
                    value: Some(code.to_string()),
                })
                .collect(),
            SwimlaneFacet::Priority => headers(&self.refs.priorities, |p| p.name.clone()),
            SwimlaneFacet::IssueType => headers(&self.refs.issue_types, |t| t.name.clone()),
            SwimlaneFacet::Assignee => headers(&self.refs.assignees, |a| a.name.clone()),
            SwimlaneFacet::Component => headers(&self.refs.components, |c| c.name.clone()),
            SwimlaneFacet::Label => headers(&self.refs.labels, |l| l.name.clone()),
            SwimlaneFacet::FixVersion => headers(&self.refs.fix_versions, |v| v.name.clone()),
            SwimlaneFacet::CustomField(name) => self
                .refs
                .custom_field(name)
                .map(|field| headers(&field.values, |v| v.value.clone()))
                .unwrap_or_default(),
        };

        if self.facet.has_none_lane() {
            lanes.push(LaneHeader {
                name: self.none_lane_name.to_string(),
                display: self.none_lane_name.to_string(),
                value: None,
            });
        }
        lanes
    }

    fn value_count(&self) -> usize {
        match self.facet {
            SwimlaneFacet::Project => self.projects.main_codes().count(),
            SwimlaneFacet::Priority => self.refs.priorities.len(),
            SwimlaneFacet::IssueType => self.refs.issue_types.len(),
            SwimlaneFacet::Assignee => self.refs.assignees.len(),
            SwimlaneFacet::Component => self.refs.components.len(),
            SwimlaneFacet::Label => self.refs.labels.len(),
            SwimlaneFacet::FixVersion => self.refs.fix_versions.len(),
            SwimlaneFacet::CustomField(name) => {
                self.refs.custom_field(name).map_or(0, |f| f.values.len())
            }
        }
    }

    fn index_of_value(&self, value: &str) -> Option<usize> {
        match self.facet {
            SwimlaneFacet::Project => self.projects.main_codes().position(|c| c == value),
            SwimlaneFacet::Priority => self.refs.priorities.index_of(value),
            SwimlaneFacet::IssueType => self.refs.issue_types.index_of(value),
            SwimlaneFacet::Assignee => self.refs.assignees.index_of(value),
            SwimlaneFacet::Component => self.refs.components.index_of(value),
            SwimlaneFacet::Label => self.refs.labels.index_of(value),
            SwimlaneFacet::FixVersion => self.refs.fix_versions.index_of(value),
            SwimlaneFacet::CustomField(name) => self
                .refs
                .custom_field(name)
                .and_then(|f| f.values.index_of(value)),
        }
    }

    /// Lane ordinals the issue is placed in
    pub fn swimlane_index(&self, issue: &Issue) -> Vec<usize> {
        let none_lane = self.value_count();
        let mut indices: Vec<usize> = self
            .facet
            .lane_keys(issue)
            .iter()
            .filter_map(|key| match key {
                Some(value) => self
                    .index_of_value(value)
                    .or_else(|| self.facet.has_none_lane().then_some(none_lane)),
                None => self.facet.has_none_lane().then_some(none_lane),
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Whether the lane is hidden by the current filters
    pub fn filter(&self, lane: &LaneHeader, filters: &BoardFilters) -> bool {
        match filters.get(&self.facet.filter_facet()) {
            Some(filter) if filter.is_active() => match &lane.value {
                Some(value) => !filter.values.contains(value),
                None => !filter.include_none,
            },
            _ => false,
        }
    }
}

/// Answers whether a candidate issue shares a lane with a target issue,
/// without building the lane table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwimlaneMatcher {
    facet: SwimlaneFacet,
    target_lanes: BTreeSet<Option<String>>,
}

impl SwimlaneMatcher {
    pub fn new(facet: SwimlaneFacet, target: &Issue) -> Self {
        let target_lanes = facet.lane_keys(target).into_iter().collect();
        Self {
            facet,
            target_lanes,
        }
    }

    pub fn matches(&self, candidate: &Issue) -> bool {
        self.facet
            .lane_keys(candidate)
            .iter()
            .any(|lane| self.target_lanes.contains(lane))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::FacetFilter;
    use crate::domain::registry::{Assignee, CustomFieldValue, MultiSelectValue};
    use crate::wire::ProjectsInput;
    use serde_json::json;

    fn refs() -> ReferenceData {
        let mut refs = ReferenceData {
            assignees: Registry::from_entries(["kabir", "brian"].map(|key| Assignee {
                key: key.to_string(),
                email: String::new(),
                avatar: String::new(),
                name: key.to_uppercase(),
            })),
            components: Registry::from_entries(["C1", "C2", "C3"].map(MultiSelectValue::new)),
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

    fn projects() -> BoardProjects {
        let input: ProjectsInput = serde_json::from_value(json!({
            "owner": "TDP",
            "main": {"TDP": {}, "TBG": {"state-links": {"S1": "A"}}}
        }))
        .unwrap();
        BoardProjects::from_input(vec!["S1".to_string()], &input).unwrap()
    }

    #[test]
    fn test_resolve_names() {
        let refs = refs();
        assert_eq!(SwimlaneFacet::resolve("assignee", &refs), Some(SwimlaneFacet::Assignee));
        assert_eq!(
            SwimlaneFacet::resolve("Tester", &refs),
            Some(SwimlaneFacet::CustomField("Tester".to_string()))
        );
        assert_eq!(
            SwimlaneFacet::resolve("custom.Tester", &refs),
            Some(SwimlaneFacet::CustomField("Tester".to_string()))
        );
        assert_eq!(SwimlaneFacet::resolve("Developer", &refs), None);
    }

    #[test]
    fn test_assignee_lanes_with_none() {
        let (refs, projects) = (refs(), projects());
        let facet = SwimlaneFacet::Assignee;
        let indexer = SwimlaneIndexer::new(&facet, &refs, &projects, "None");

        let names: Vec<String> = indexer.lanes().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["kabir", "brian", "None"]);

        let mut issue = Issue::new("TDP-1", 0);
        assert_eq!(indexer.swimlane_index(&issue), vec![2]);
        issue.assignee = Some("brian".to_string());
        assert_eq!(indexer.swimlane_index(&issue), vec![1]);
    }

    #[test]
    fn test_multi_valued_lanes() {
        let (refs, projects) = (refs(), projects());
        let facet = SwimlaneFacet::Component;
        let indexer = SwimlaneIndexer::new(&facet, &refs, &projects, "None");

        let mut issue = Issue::new("TDP-1", 0);
        assert_eq!(indexer.swimlane_index(&issue), vec![3]);
        issue.components = ["C3", "C1"].iter().map(|c| c.to_string()).collect();
        assert_eq!(indexer.swimlane_index(&issue), vec![0, 2]);
    }

    #[test]
    fn test_project_lanes_have_no_none_lane() {
        let (refs, projects) = (refs(), projects());
        let facet = SwimlaneFacet::Project;
        let indexer = SwimlaneIndexer::new(&facet, &refs, &projects, "None");

        let names: Vec<String> = indexer.lanes().into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["TDP", "TBG"]);
        assert_eq!(indexer.swimlane_index(&Issue::new("TBG-4", 0)), vec![1]);
    }

    #[test]
    fn test_lane_filter_follows_facet_filter() {
        let (refs, projects) = (refs(), projects());
        let facet = SwimlaneFacet::Assignee;
        let indexer = SwimlaneIndexer::new(&facet, &refs, &projects, "None");
        let lanes = indexer.lanes();

        let filters = BoardFilters::new();
        assert!(lanes.iter().all(|lane| !indexer.filter(lane, &filters)));

        let filters = BoardFilters::new().with(Facet::Assignee, FacetFilter::of(["kabir"]));
        let hidden: Vec<bool> = lanes.iter().map(|lane| indexer.filter(lane, &filters)).collect();
        assert_eq!(hidden, vec![false, true, true]);

        let filters = BoardFilters::new().with(Facet::Assignee, FacetFilter::none());
        let hidden: Vec<bool> = lanes.iter().map(|lane| indexer.filter(lane, &filters)).collect();
        assert_eq!(hidden, vec![true, true, false]);
    }

    #[test]
    fn test_matcher_shares_any_lane() {
        let mut target = Issue::new("TDP-1", 0);
        target.components = ["C1", "C2"].iter().map(|c| c.to_string()).collect();
        let matcher = SwimlaneMatcher::new(SwimlaneFacet::Component, &target);

        let mut candidate = Issue::new("TDP-2", 0);
        assert!(!matcher.matches(&candidate));
        candidate.components.insert("C2".to_string());
        assert!(matcher.matches(&candidate));

        let unassigned = SwimlaneMatcher::new(SwimlaneFacet::Assignee, &Issue::new("TDP-3", 0));
        assert!(unassigned.matches(&Issue::new("TDP-4", 0)));
    }
}
