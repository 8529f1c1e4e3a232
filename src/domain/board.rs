use crate::config::BoardConfig;
use crate::domain::blacklist::Blacklist;
use crate::domain::filter::BoardFilters;
use crate::domain::issue::{Issue, IssueStore};
use crate::domain::project::BoardProjects;
use crate::domain::registry::{MultiSelectValue, ReferenceData, Registry};
use crate::domain::swimlane::{LaneHeader, SwimlaneFacet, SwimlaneIndexer, SwimlaneMatcher};
use crate::error::Result;
use crate::wire::SnapshotInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Which view the projection currently maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardMode {
    Uninitialized,
    Flat,
    Lanewise,
}

/// Issue keys per board state column, in project then rank order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueTable {
    pub columns: Vec<Vec<String>>,
    /// Issues per column not hidden by the filters
    pub visible_counts: Vec<usize>,
}

impl IssueTable {
    fn with_states(state_count: usize) -> Self {
        Self {
            columns: vec![Vec::new(); state_count],
            visible_counts: vec![0; state_count],
        }
    }
}

/// One horizontal lane with its own state-column grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Swimlane {
    pub header: LaneHeader,
    pub table: IssueTable,
    /// Hidden by the current filters
    pub filtered: bool,
    /// User-toggled; preserved across rebuilds
    pub visible: bool,
}

impl Swimlane {
    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn is_empty(&self) -> bool {
        self.table.columns.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwimlaneTable {
    pub facet: SwimlaneFacet,
    pub lanes: Vec<Swimlane>,
}

impl SwimlaneTable {
    pub fn lane(&self, name: &str) -> Option<&Swimlane> {
        self.lanes.iter().find(|lane| lane.name() == name)
    }
}

/// The projection of one rendered board.
///
/// Derives either a flat state-column grid or a swimlane x state grid from
/// the store. Every mutation ends in a rebuild; lane visibility is the only
/// view state carried across rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardData {
    config: BoardConfig,
    pub(crate) initialized: bool,
    pub(crate) view: u64,
    pub(crate) refs: ReferenceData,
    pub(crate) projects: BoardProjects,
    pub(crate) issues: IssueStore,
    pub(crate) blacklist: Blacklist,
    filters: BoardFilters,
    swimlane_request: Option<String>,
    swimlane: Option<SwimlaneFacet>,
    issue_table: Option<IssueTable>,
    swimlane_table: Option<SwimlaneTable>,
    total_issues_by_state: Vec<usize>,
    visible_issues_by_state: Vec<usize>,
}

impl Default for BoardData {
    fn default() -> Self {
        Self::new(BoardConfig::default())
    }
}

impl BoardData {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            swimlane_request: config.initial_swimlane.clone(),
            config,
            initialized: false,
            view: 0,
            refs: ReferenceData::default(),
            projects: BoardProjects::default(),
            issues: IssueStore::new(),
            blacklist: Blacklist::default(),
            filters: BoardFilters::new(),
            swimlane: None,
            issue_table: None,
            swimlane_table: None,
            total_issues_by_state: Vec::new(),
            visible_issues_by_state: Vec::new(),
        }
    }

    /// Replaces the whole board with a snapshot document
    pub fn deserialize_snapshot(&mut self, input: &Value) -> Result<()> {
        let snapshot = SnapshotInput::deserialize(input)?;
        self.load_snapshot(snapshot)
    }

    /// Replaces the whole board with a parsed snapshot.
    ///
    /// Everything is built aside first, so a snapshot that fails leaves the
    /// previous board untouched. Filters, swimlane selection and lane
    /// visibility survive.
    pub fn load_snapshot(&mut self, snapshot: SnapshotInput) -> Result<()> {
        let board_states: Vec<String> =
            snapshot.states.iter().map(|s| s.name().to_string()).collect();
        let mut projects = BoardProjects::from_input(board_states, &snapshot.projects)?;

        let mut refs = ReferenceData {
            assignees: Registry::from_entries(snapshot.assignees),
            priorities: Registry::from_entries(snapshot.priorities),
            issue_types: Registry::from_entries(snapshot.issue_types),
            components: Registry::from_entries(
                snapshot.components.into_iter().map(MultiSelectValue::new),
            ),
            labels: Registry::from_entries(snapshot.labels.into_iter().map(MultiSelectValue::new)),
            fix_versions: Registry::from_entries(
                snapshot.fix_versions.into_iter().map(MultiSelectValue::new),
            ),
            ..ReferenceData::default()
        };
        for (name, values) in snapshot.custom {
            refs.extend_custom_field(&name, values);
        }

        let blacklist = snapshot
            .blacklist
            .as_ref()
            .map(Blacklist::from_input)
            .unwrap_or_default();

        let mut issues = IssueStore::new();
        let mut arrival: Vec<String> = Vec::new();
        for (key, input) in &snapshot.issues {
            if blacklist.contains_issue(key) {
                debug!(issue = %key, "skipping blacklisted issue");
                continue;
            }
            let Some(project) = projects.project_for_key(key) else {
                warn!(issue = %key, "issue does not belong to a main project, skipping");
                continue;
            };
            if let Some(issue) = Issue::from_snapshot(input, &refs, project) {
                arrival.push(issue.key.clone());
                issues.insert(issue);
            }
        }

        for project in projects.main_projects_mut() {
            let code = project.code.clone();
            project.clear_issue_lists();
            project.retain_ranked(|key| issues.contains(key));
            let arrived = arrival
                .iter()
                .filter(|k| issues.get(k).is_some_and(|i| i.project_code == code));
            for key in arrived {
                project.ensure_ranked(key);
            }
            let ranked = project.ranked_issue_keys().to_vec();
            for key in &ranked {
                if let Some(issue) = issues.get(key) {
                    project.push_to_state(key, issue.state);
                }
            }
        }

        info!(
            view = snapshot.view,
            issues = issues.len(),
            projects = projects.main_codes().count(),
            blacklisted = blacklist.issues.len(),
            "deserialized board snapshot"
        );

        self.view = snapshot.view;
        self.refs = refs;
        self.projects = projects;
        self.issues = issues;
        self.blacklist = blacklist;
        self.initialized = true;
        self.resolve_swimlane();
        self.rebuild();
        Ok(())
    }

    /// Selects a swimlane facet by name, or the flat view with `None`.
    ///
    /// An unknown name falls back to the flat view. Returns whether the board
    /// is now lanewise.
    pub fn set_swimlane(&mut self, name: Option<&str>) -> bool {
        self.swimlane_request = name.map(str::to_string);
        self.resolve_swimlane();
        self.rebuild();
        self.mode() == BoardMode::Lanewise
    }

    fn resolve_swimlane(&mut self) {
        self.swimlane = self.swimlane_request.as_deref().and_then(|name| {
            let facet = SwimlaneFacet::resolve(name, &self.refs);
            if facet.is_none() && self.initialized {
                warn!(swimlane = %name, "unknown swimlane, falling back to flat view");
            }
            facet
        });
    }

    pub fn set_filters(&mut self, filters: BoardFilters) {
        self.filters = filters;
        self.rebuild();
    }

    pub fn filters(&self) -> &BoardFilters {
        &self.filters
    }

    /// Flips the user visibility of a lane. Returns the new visibility, or
    /// `None` when no such lane is shown.
    pub fn toggle_swimlane_visibility(&mut self, name: &str) -> Option<bool> {
        let lane = self
            .swimlane_table
            .as_mut()?
            .lanes
            .iter_mut()
            .find(|lane| lane.header.name == name)?;
        lane.visible = !lane.visible;
        Some(lane.visible)
    }

    /// Recomputes the active view from the store
    pub(crate) fn rebuild(&mut self) {
        if !self.initialized {
            return;
        }

        let previous_visibility: Option<HashMap<Option<String>, bool>> = self
            .swimlane_table
            .take()
            .filter(|table| Some(&table.facet) == self.swimlane.as_ref())
            .map(|table| {
                table
                    .lanes
                    .into_iter()
                    .map(|lane| (lane.header.value, lane.visible))
                    .collect()
            });

        for issue in self.issues.iter_mut() {
            issue.filtered = self.filters.filter_issue(issue, &self.projects);
        }

        let flat = self.build_issue_table();
        self.total_issues_by_state = flat.columns.iter().map(Vec::len).collect();
        self.visible_issues_by_state = flat.visible_counts.clone();

        match self.swimlane.clone() {
            None => {
                self.issue_table = Some(flat);
                self.swimlane_table = None;
            }
            Some(facet) => {
                let mut table = self.build_swimlane_table(facet);
                if let Some(previous) = previous_visibility {
                    for lane in &mut table.lanes {
                        lane.visible = previous.get(&lane.header.value).copied().unwrap_or(true);
                    }
                }
                self.issue_table = None;
                self.swimlane_table = Some(table);
            }
        }

        debug!(
            view = self.view,
            mode = ?self.mode(),
            total = self.total_issues_by_state.iter().sum::<usize>(),
            "rebuilt board projection"
        );
    }

    /// Visits every issue on the board column by column, owner project first
    fn for_each_card(&self, mut visit: impl FnMut(usize, &Issue)) {
        for board_index in 0..self.projects.board_states().len() {
            for project in self.projects.main_projects() {
                for key in project.issue_keys_for_board_state(board_index) {
                    if let Some(issue) = self.issues.get(key) {
                        visit(board_index, issue);
                    }
                }
            }
        }
    }

    fn build_issue_table(&self) -> IssueTable {
        let mut table = IssueTable::with_states(self.projects.board_states().len());
        self.for_each_card(|board_index, issue| {
            table.columns[board_index].push(issue.key.clone());
            if !issue.filtered {
                table.visible_counts[board_index] += 1;
            }
        });
        table
    }

    fn build_swimlane_table(&self, facet: SwimlaneFacet) -> SwimlaneTable {
        let state_count = self.projects.board_states().len();
        let indexer = SwimlaneIndexer::new(
            &facet,
            &self.refs,
            &self.projects,
            &self.config.none_lane_name,
        );

        let mut lanes: Vec<Swimlane> = indexer
            .lanes()
            .into_iter()
            .map(|header| Swimlane {
                filtered: indexer.filter(&header, &self.filters),
                header,
                table: IssueTable::with_states(state_count),
                visible: true,
            })
            .collect();

        self.for_each_card(|board_index, issue| {
            for lane_index in indexer.swimlane_index(issue) {
                if let Some(lane) = lanes.get_mut(lane_index) {
                    lane.table.columns[board_index].push(issue.key.clone());
                    if !issue.filtered {
                        lane.table.visible_counts[board_index] += 1;
                    }
                }
            }
        });

        SwimlaneTable { facet, lanes }
    }

    /// Keys in the target column the moving issue may be dropped before
    pub fn valid_move_before_issues(
        &self,
        moving_key: &str,
        target_board_state: usize,
    ) -> Vec<String> {
        let Some(moving) = self.issues.get(moving_key) else {
            return Vec::new();
        };
        let Some(project) = self.projects.main_project(&moving.project_code) else {
            return Vec::new();
        };
        let matcher = self
            .swimlane
            .clone()
            .map(|facet| SwimlaneMatcher::new(facet, moving));
        let column = project
            .issue_keys_for_board_state(target_board_state)
            .iter()
            .filter_map(|key| self.issues.get(key));
        project.valid_move_before_issues(column, matcher.as_ref(), moving, target_board_state)
    }

    pub fn mode(&self) -> BoardMode {
        match (self.initialized, &self.swimlane) {
            (false, _) => BoardMode::Uninitialized,
            (true, None) => BoardMode::Flat,
            (true, Some(_)) => BoardMode::Lanewise,
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn view(&self) -> u64 {
        self.view
    }

    /// The flat grid; `None` while a swimlane is active
    pub fn issue_table(&self) -> Option<&IssueTable> {
        self.issue_table.as_ref()
    }

    /// The lane grid; `None` while the board is flat
    pub fn swimlane_table(&self) -> Option<&SwimlaneTable> {
        self.swimlane_table.as_ref()
    }

    pub fn swimlane(&self) -> Option<&SwimlaneFacet> {
        self.swimlane.as_ref()
    }

    /// Cards per board column, filtered or not
    pub fn total_issues_by_state(&self) -> &[usize] {
        &self.total_issues_by_state
    }

    /// Cards per board column not hidden by the filters
    pub fn visible_issues_by_state(&self) -> &[usize] {
        &self.visible_issues_by_state
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    pub fn issue(&self, key: &str) -> Option<&Issue> {
        self.issues.get(key)
    }

    pub fn issue_store(&self) -> &IssueStore {
        &self.issues
    }

    pub fn reference_data(&self) -> &ReferenceData {
        &self.refs
    }

    pub fn projects(&self) -> &BoardProjects {
        &self.projects
    }

    pub fn board_states(&self) -> &[String] {
        self.projects.board_states()
    }

    pub fn board_project_codes(&self) -> Vec<&str> {
        self.projects.main_codes().collect()
    }

    pub fn ranked_issue_keys(&self, project: &str) -> Option<&[String]> {
        self.projects
            .main_project(project)
            .map(|p| p.ranked_issue_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::{Facet, FacetFilter};
    use serde_json::json;

    fn snapshot() -> Value {
        json!({
            "view": 1,
            "states": ["S1", "S2", "S3", "S4"],
            "priorities": [{"name": "high"}, {"name": "low"}],
            "issue-types": [{"name": "bug"}],
            "assignees": [
                {"key": "kabir", "name": "Kabir Khan"},
                {"key": "brian", "name": "Brian"}
            ],
            "components": ["C1", "C2"],
            "projects": {
                "owner": "TDP",
                "main": {
                    "TDP": {"ranked": ["TDP-1", "TDP-2", "TDP-3"]},
                    "TBG": {"state-links": {"S3": "X", "S4": "Y"}, "ranked": ["TBG-1"]}
                }
            },
            "issues": {
                "TDP-1": {"key": "TDP-1", "state": 0, "priority": 0, "assignee": 0,
                          "components": [0]},
                "TDP-2": {"key": "TDP-2", "state": 0, "priority": 1},
                "TDP-3": {"key": "TDP-3", "state": 2, "priority": 0, "assignee": 1,
                          "components": [0, 1]},
                "TBG-1": {"key": "TBG-1", "state": 0, "priority": 1, "assignee": 0}
            }
        })
    }

    fn board() -> BoardData {
        let mut board = BoardData::default();
        board.deserialize_snapshot(&snapshot()).unwrap();
        board
    }

    #[test]
    fn test_uninitialized_until_snapshot() {
        let mut board = BoardData::default();
        assert_eq!(board.mode(), BoardMode::Uninitialized);
        assert!(board.issue_table().is_none());
        assert!(!board.set_swimlane(Some("assignee")));

        board.deserialize_snapshot(&snapshot()).unwrap();
        assert_eq!(board.mode(), BoardMode::Lanewise);
    }

    #[test]
    fn test_flat_table_in_project_then_rank_order() {
        let board = board();
        let table = board.issue_table().unwrap();
        assert_eq!(
            table.columns,
            vec![
                vec!["TDP-1".to_string(), "TDP-2".to_string()],
                vec![],
                vec!["TDP-3".to_string(), "TBG-1".to_string()],
                vec![],
            ]
        );
        assert_eq!(board.total_issues_by_state(), &[2, 0, 2, 0]);
        assert!(board.swimlane_table().is_none());
        assert_eq!(board.board_project_codes(), vec!["TDP", "TBG"]);
    }

    #[test]
    fn test_filters_mark_issues_and_counts() {
        let mut board = board();
        board.set_filters(BoardFilters::new().with(Facet::Priority, FacetFilter::of(["high"])));

        let table = board.issue_table().unwrap();
        assert_eq!(table.visible_counts, vec![1, 0, 1, 0]);
        assert!(board.issue("TDP-2").unwrap().filtered);
        assert!(!board.issue("TDP-1").unwrap().filtered);
        assert_eq!(board.total_issues_by_state(), &[2, 0, 2, 0]);

        board.set_swimlane(Some("priority"));
        assert_eq!(board.visible_issues_by_state(), &[1, 0, 1, 0]);
    }

    #[test]
    fn test_swimlane_table_places_multi_valued_issues_in_each_lane() {
        let mut board = board();
        assert!(board.set_swimlane(Some("component")));
        assert!(board.issue_table().is_none());

        let table = board.swimlane_table().unwrap();
        let c1 = table.lane("C1").unwrap();
        let c2 = table.lane("C2").unwrap();
        let none = table.lane("None").unwrap();
        assert_eq!(c1.table.columns[0], vec!["TDP-1"]);
        assert_eq!(c1.table.columns[2], vec!["TDP-3"]);
        assert_eq!(c2.table.columns[2], vec!["TDP-3"]);
        assert_eq!(none.table.columns[0], vec!["TDP-2"]);
        assert_eq!(none.table.columns[2], vec!["TBG-1"]);
    }

    #[test]
    fn test_unknown_swimlane_falls_back_to_flat() {
        let mut board = board();
        assert!(!board.set_swimlane(Some("colour")));
        assert_eq!(board.mode(), BoardMode::Flat);
        assert!(board.issue_table().is_some());
    }

    #[test]
    fn test_lane_filtered_flag() {
        let mut board = board();
        board.set_swimlane(Some("assignee"));
        board.set_filters(BoardFilters::new().with(Facet::Assignee, FacetFilter::of(["brian"])));

        let table = board.swimlane_table().unwrap();
        assert!(table.lane("kabir").unwrap().filtered);
        assert!(!table.lane("brian").unwrap().filtered);
        assert!(table.lane("None").unwrap().filtered);
    }

    #[test]
    fn test_visibility_survives_rebuild_and_resets_on_facet_change() {
        let mut board = board();
        board.set_swimlane(Some("assignee"));
        assert_eq!(board.toggle_swimlane_visibility("kabir"), Some(false));
        assert_eq!(board.toggle_swimlane_visibility("nobody"), None);

        board.set_filters(BoardFilters::new());
        assert!(!board.swimlane_table().unwrap().lane("kabir").unwrap().visible);

        board.set_swimlane(Some("assignee"));
        assert!(!board.swimlane_table().unwrap().lane("kabir").unwrap().visible);

        board.set_swimlane(Some("priority"));
        board.set_swimlane(Some("assignee"));
        assert!(board.swimlane_table().unwrap().lane("kabir").unwrap().visible);
    }

    #[test]
    fn test_move_before_respects_project_filter_and_lane() {
        let mut board = board();
        assert_eq!(board.valid_move_before_issues("TDP-3", 0), vec!["TDP-1", "TDP-2"]);
        assert!(board.valid_move_before_issues("TBG-1", 0).is_empty());
        assert!(board.valid_move_before_issues("NOPE-1", 0).is_empty());

        board.set_swimlane(Some("assignee"));
        assert!(board.valid_move_before_issues("TDP-3", 0).is_empty());

        board.set_swimlane(Some("priority"));
        assert_eq!(board.valid_move_before_issues("TDP-3", 0), vec!["TDP-1"]);

        board.set_swimlane(None);
        board.set_filters(BoardFilters::new().with(Facet::Priority, FacetFilter::of(["high"])));
        assert_eq!(board.valid_move_before_issues("TDP-3", 0), vec!["TDP-1"]);
    }

    #[test]
    fn test_failed_snapshot_keeps_previous_board() {
        let mut board = board();
        let before = board.clone();
        let mut bad = snapshot();
        bad["projects"]["owner"] = json!("MISSING");

        assert!(board.deserialize_snapshot(&bad).is_err());
        assert_eq!(board, before);
    }

    #[test]
    fn test_value_lane_named_like_none_lane_keeps_own_visibility() {
        let mut doc = snapshot();
        doc["assignees"] = json!([
            {"key": "kabir", "name": "Kabir Khan"},
            {"key": "None", "name": "Nobody"}
        ]);
        let mut board = BoardData::default();
        board.deserialize_snapshot(&doc).unwrap();
        board.set_swimlane(Some("assignee"));

        assert_eq!(board.toggle_swimlane_visibility("None"), Some(false));
        board.set_filters(BoardFilters::new());

        let lanes = &board.swimlane_table().unwrap().lanes;
        let value_lane = lanes.iter().find(|l| l.header.value.as_deref() == Some("None")).unwrap();
        let none_lane = lanes.iter().find(|l| l.header.value.is_none()).unwrap();
        assert!(!value_lane.visible);
        assert!(none_lane.visible);
    }

    #[test]
    fn test_shared_state_link_shows_issue_once() {
        let mut doc = snapshot();
        doc["projects"]["main"]["TBG"]["state-links"] = json!({"S3": "X", "S4": "X"});
        let mut board = BoardData::default();
        board.deserialize_snapshot(&doc).unwrap();

        let table = board.issue_table().unwrap();
        assert_eq!(table.columns[2], vec!["TDP-3", "TBG-1"]);
        assert!(table.columns[3].is_empty());
        let total: usize = board.total_issues_by_state().iter().sum();
        assert_eq!(total, board.issue_store().len());
    }

    #[test]
    fn test_ranked_keys_exclude_blacklisted() {
        let mut doc = snapshot();
        doc["blacklist"] = json!({"issues": ["TDP-2"]});
        let mut board = BoardData::default();
        board.deserialize_snapshot(&doc).unwrap();

        assert_eq!(board.ranked_issue_keys("TDP").unwrap(), &["TDP-1", "TDP-3"]);
        assert!(board.issue("TDP-2").is_none());
        assert!(board.blacklist().contains_issue("TDP-2"));
        assert!(board.ranked_issue_keys("XYZ").is_none());
    }
}
