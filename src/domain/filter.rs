use crate::domain::issue::Issue;
use crate::domain::project::BoardProjects;
use crate::error::{BoardError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Query token selecting issues that have no value for a facet
pub const NONE_TOKEN: &str = "$none";

/// A filterable facet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Facet {
    Project,
    Priority,
    IssueType,
    Assignee,
    Component,
    Label,
    FixVersion,
    CustomField(String),
    ParallelTask(String),
}

impl FromStr for Facet {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "project" => Ok(Facet::Project),
            "priority" => Ok(Facet::Priority),
            "issue-type" => Ok(Facet::IssueType),
            "assignee" => Ok(Facet::Assignee),
            "component" => Ok(Facet::Component),
            "label" => Ok(Facet::Label),
            "fix-version" => Ok(Facet::FixVersion),
            _ => {
                if let Some(name) = s.strip_prefix("custom.").filter(|n| !n.is_empty()) {
                    Ok(Facet::CustomField(name.to_string()))
                } else if let Some(code) =
                    s.strip_prefix("parallel-task.").filter(|c| !c.is_empty())
                {
                    Ok(Facet::ParallelTask(code.to_string()))
                } else {
                    Err(BoardError::UnknownFacet(s.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Priority => write!(f, "priority"),
            Self::IssueType => write!(f, "issue-type"),
            Self::Assignee => write!(f, "assignee"),
            Self::Component => write!(f, "component"),
            Self::Label => write!(f, "label"),
            Self::FixVersion => write!(f, "fix-version"),
            Self::CustomField(name) => write!(f, "custom.{}", name),
            Self::ParallelTask(code) => write!(f, "parallel-task.{}", code),
        }
    }
}

/// Selection state for one facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetFilter {
    pub values: BTreeSet<String>,
    pub include_none: bool,
}

impl FacetFilter {
    pub fn of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            include_none: false,
        }
    }

    pub fn none() -> Self {
        Self {
            values: BTreeSet::new(),
            include_none: true,
        }
    }

    pub fn with_none(mut self) -> Self {
        self.include_none = true;
        self
    }

    /// Parses a comma separated selection; [`NONE_TOKEN`] selects "no value"
    pub fn parse(query: &str) -> Self {
        let mut filter = FacetFilter::default();
        for token in query.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == NONE_TOKEN {
                filter.include_none = true;
            } else {
                filter.values.insert(token.to_string());
            }
        }
        filter
    }

    pub fn is_active(&self) -> bool {
        self.include_none || !self.values.is_empty()
    }

    /// Match for a single-valued facet
    pub fn matches_single(&self, value: Option<&str>) -> bool {
        match value {
            Some(value) => self.values.contains(value),
            None => self.include_none,
        }
    }

    /// Match for a multi-valued facet: any selected value is enough, and an
    /// empty set only matches the none selector
    pub fn matches_multi(&self, values: &BTreeSet<String>) -> bool {
        if values.is_empty() {
            self.include_none
        } else {
            values.iter().any(|v| self.values.contains(v))
        }
    }
}

/// The full filter set applied to the board. A facet with no selection
/// never excludes; an issue failing any active facet is hidden.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardFilters {
    facets: BTreeMap<Facet, FacetFilter>,
}

impl BoardFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection for a facet; an inactive selection removes it
    pub fn set(&mut self, facet: Facet, filter: FacetFilter) {
        if filter.is_active() {
            self.facets.insert(facet, filter);
        } else {
            self.facets.remove(&facet);
        }
    }

    pub fn with(mut self, facet: Facet, filter: FacetFilter) -> Self {
        self.set(facet, filter);
        self
    }

    /// Sets a facet from its name and a comma separated query value
    pub fn set_from_query(&mut self, name: &str, query: &str) -> Result<()> {
        let facet: Facet = name.parse()?;
        self.set(facet, FacetFilter::parse(query));
        Ok(())
    }

    pub fn get(&self, facet: &Facet) -> Option<&FacetFilter> {
        self.facets.get(facet)
    }

    pub fn clear(&mut self) {
        self.facets.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Whether the issue is hidden by the current filters
    pub fn filter_issue(&self, issue: &Issue, projects: &BoardProjects) -> bool {
        self.facets
            .iter()
            .any(|(facet, filter)| !Self::facet_matches(facet, filter, issue, projects))
    }

    fn facet_matches(
        facet: &Facet,
        filter: &FacetFilter,
        issue: &Issue,
        projects: &BoardProjects,
    ) -> bool {
        match facet {
            Facet::Project => filter.matches_single(Some(issue.project_code.as_str())),
            Facet::Priority => filter.matches_single(issue.priority.as_deref()),
            Facet::IssueType => filter.matches_single(issue.issue_type.as_deref()),
            Facet::Assignee => filter.matches_single(issue.assignee.as_deref()),
            Facet::Component => filter.matches_multi(&issue.components),
            Facet::Label => filter.matches_multi(&issue.labels),
            Facet::FixVersion => filter.matches_multi(&issue.fix_versions),
            Facet::CustomField(name) => {
                filter.matches_single(issue.custom_fields.get(name).map(String::as_str))
            }
            // No "none" bucket here: a project without the task, or an issue
            // without an option, is excluded whenever the facet is filtered
            Facet::ParallelTask(code) => projects
                .main_project(&issue.project_code)
                .and_then(|project| issue.parallel_task_option(project, code))
                .is_some_and(|option| filter.values.contains(option)),
        }
    }
}
