use crate::domain::issue::Issue;
use crate::domain::registry::{ParallelTask, Registry};
use crate::domain::swimlane::SwimlaneMatcher;
use crate::error::{BoardError, Result};
use crate::wire::{LinkedProjectInput, MainProjectInput, ProjectsInput};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Returns the project code of an issue key (`TDP-12` -> `TDP`)
pub fn project_code_for_key(key: &str) -> &str {
    key.rsplit_once('-').map(|(code, _)| code).unwrap_or(key)
}

/// A project whose issues appear as cards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainProject {
    pub code: String,
    pub colour: Option<String>,
    own_states: Vec<String>,
    board_states: Vec<String>,
    own_to_board: Vec<Option<usize>>,
    board_to_own: Vec<Option<usize>>,
    ranked: Vec<String>,
    state_keys: Vec<Vec<String>>,
    parallel_tasks: Registry<ParallelTask>,
}

impl MainProject {
    /// The owner project: its own states are the board states
    pub fn owner(
        code: impl Into<String>,
        board_states: &[String],
        input: &MainProjectInput,
    ) -> Self {
        let identity: Vec<Option<usize>> = (0..board_states.len()).map(Some).collect();
        Self::build(
            code.into(),
            input,
            board_states.to_vec(),
            board_states.to_vec(),
            identity.clone(),
            identity,
        )
    }

    /// Any other main project, mapped through its state links
    pub fn linked_through_states(
        code: impl Into<String>,
        board_states: &[String],
        input: &MainProjectInput,
    ) -> Self {
        let own_states = input.states.clone().unwrap_or_else(|| {
            let mut linked: Vec<String> = Vec::new();
            for own in board_states
                .iter()
                .filter_map(|board| input.state_links.get(board).cloned().flatten())
            {
                if !linked.contains(&own) {
                    linked.push(own);
                }
            }
            linked
        });

        let mut own_to_board = vec![None; own_states.len()];
        let mut board_to_own = vec![None; board_states.len()];
        for (board_index, board_state) in board_states.iter().enumerate() {
            let Some(Some(own_state)) = input.state_links.get(board_state) else {
                continue;
            };
            let Some(own_index) = own_states.iter().position(|s| s == own_state) else {
                continue;
            };
            // An own state feeds exactly one column: the first board state linking to it
            if own_to_board[own_index].is_none() {
                own_to_board[own_index] = Some(board_index);
                board_to_own[board_index] = Some(own_index);
            }
        }

        Self::build(
            code.into(),
            input,
            own_states,
            board_states.to_vec(),
            own_to_board,
            board_to_own,
        )
    }

    fn build(
        code: String,
        input: &MainProjectInput,
        own_states: Vec<String>,
        board_states: Vec<String>,
        own_to_board: Vec<Option<usize>>,
        board_to_own: Vec<Option<usize>>,
    ) -> Self {
        let state_keys = vec![Vec::new(); own_states.len()];
        Self {
            code,
            colour: input.colour.clone(),
            own_states,
            board_states,
            own_to_board,
            board_to_own,
            ranked: input.ranked.clone(),
            state_keys,
            parallel_tasks: Registry::from_entries(input.parallel_tasks.iter().cloned()),
        }
    }

    pub fn is_valid_state(&self, own_state: &str) -> bool {
        self.own_states.iter().any(|s| s == own_state)
    }

    /// Maps one of the project's own state names to the board state it is shown in
    pub fn map_state_string_to_board(&self, own_state: &str) -> Option<&str> {
        let own_index = self.own_state_index_for_name(own_state)?;
        let board_index = self.board_state_index_for_own(own_index)?;
        self.board_states.get(board_index).map(String::as_str)
    }

    /// Own state index shown in the given board state, if the project has one there
    pub fn own_state_index(&self, board_state: &str) -> Option<usize> {
        let board_index = self.board_states.iter().position(|s| s == board_state)?;
        self.board_to_own.get(board_index).copied().flatten()
    }

    pub fn own_state_index_for_name(&self, own_state: &str) -> Option<usize> {
        self.own_states.iter().position(|s| s == own_state)
    }

    pub fn own_state_name(&self, own_index: usize) -> Option<&str> {
        self.own_states.get(own_index).map(String::as_str)
    }

    pub fn board_state_index_for_own(&self, own_index: usize) -> Option<usize> {
        self.own_to_board.get(own_index).copied().flatten()
    }

    pub fn own_states(&self) -> &[String] {
        &self.own_states
    }

    pub fn ranked_issue_keys(&self) -> &[String] {
        &self.ranked
    }

    /// Issue keys in an own state, in rank order
    pub fn issue_keys_for_own_state(&self, own_index: usize) -> &[String] {
        self.state_keys
            .get(own_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Issue keys this project contributes to a board column, in rank order
    pub fn issue_keys_for_board_state(&self, board_index: usize) -> &[String] {
        match self.board_to_own.get(board_index).copied().flatten() {
            Some(own_index) => self.issue_keys_for_own_state(own_index),
            None => &[],
        }
    }

    pub fn parallel_tasks(&self) -> &Registry<ParallelTask> {
        &self.parallel_tasks
    }

    /// Issues in the target column the moving issue may be placed before.
    ///
    /// Only visible issues of this project qualify, and when a swimlane is
    /// active only those sharing a lane with the moving issue.
    pub fn valid_move_before_issues<'a>(
        &self,
        column: impl IntoIterator<Item = &'a Issue>,
        matcher: Option<&SwimlaneMatcher>,
        moving: &Issue,
        target_board_state: usize,
    ) -> Vec<String> {
        if self.board_to_own.get(target_board_state).copied().flatten().is_none() {
            return Vec::new();
        }
        column
            .into_iter()
            .filter(|issue| issue.project_code == self.code)
            .filter(|issue| issue.key != moving.key && !issue.filtered)
            .filter(|issue| matcher.map_or(true, |m| m.matches(issue)))
            .map(|issue| issue.key.clone())
            .collect()
    }

    pub(crate) fn clear_issue_lists(&mut self) {
        self.state_keys.iter_mut().for_each(Vec::clear);
    }

    pub(crate) fn push_to_state(&mut self, key: &str, own_index: usize) {
        if let Some(keys) = self.state_keys.get_mut(own_index) {
            keys.push(key.to_string());
        }
    }

    pub(crate) fn remove_from_states(&mut self, keys: &HashSet<String>) {
        for state in &mut self.state_keys {
            state.retain(|k| !keys.contains(k));
        }
    }

    pub(crate) fn remove_from_ranking(&mut self, keys: &HashSet<String>) {
        self.ranked.retain(|k| !keys.contains(k));
    }

    /// Appends the key to the ranking unless it is already ranked
    pub(crate) fn ensure_ranked(&mut self, key: &str) {
        if !self.ranked.iter().any(|k| k == key) {
            self.ranked.push(key.to_string());
        }
    }

    pub(crate) fn retain_ranked(&mut self, keep: impl Fn(&str) -> bool) {
        self.ranked.retain(|k| keep(k));
    }

    /// Moves a key to a target position in the current ranking
    pub(crate) fn rerank(&mut self, key: &str, index: usize) {
        self.ranked.retain(|k| k != key);
        let index = index.min(self.ranked.len());
        self.ranked.insert(index, key.to_string());
    }

    /// Re-sorts every per-state list into rank order
    pub(crate) fn sort_states_by_rank(&mut self) {
        let positions: HashMap<&str, usize> = self
            .ranked
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();
        for state in &mut self.state_keys {
            state.sort_by_key(|k| positions.get(k.as_str()).copied().unwrap_or(usize::MAX));
        }
    }
}

/// A project referenced only through linked issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedProject {
    pub code: String,
    pub states: Vec<String>,
}

impl LinkedProject {
    pub fn new(code: impl Into<String>, input: &LinkedProjectInput) -> Self {
        Self {
            code: code.into(),
            states: input.states.clone(),
        }
    }

    pub fn state_name(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(String::as_str)
    }
}

/// Every project known to the board, owner first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardProjects {
    owner: String,
    board_states: Vec<String>,
    main: Vec<MainProject>,
    linked: IndexMap<String, LinkedProject>,
}

impl BoardProjects {
    pub fn from_input(board_states: Vec<String>, input: &ProjectsInput) -> Result<Self> {
        let owner_input = input.main.get(&input.owner).ok_or_else(|| {
            BoardError::InvalidSnapshot(format!(
                "owner project {} is not one of the main projects",
                input.owner
            ))
        })?;

        let mut main = vec![MainProject::owner(&input.owner, &board_states, owner_input)];
        for (code, project) in &input.main {
            if code != &input.owner {
                main.push(MainProject::linked_through_states(
                    code,
                    &board_states,
                    project,
                ));
            }
        }

        let linked = input
            .linked
            .iter()
            .map(|(code, project)| (code.clone(), LinkedProject::new(code, project)))
            .collect();

        Ok(Self {
            owner: input.owner.clone(),
            board_states,
            main,
            linked,
        })
    }

    pub fn owner_code(&self) -> &str {
        &self.owner
    }

    pub fn board_states(&self) -> &[String] {
        &self.board_states
    }

    pub fn main_codes(&self) -> impl Iterator<Item = &str> {
        self.main.iter().map(|p| p.code.as_str())
    }

    pub fn main_projects(&self) -> impl Iterator<Item = &MainProject> {
        self.main.iter()
    }

    pub(crate) fn main_projects_mut(&mut self) -> impl Iterator<Item = &mut MainProject> {
        self.main.iter_mut()
    }

    pub fn main_project(&self, code: &str) -> Option<&MainProject> {
        self.main.iter().find(|p| p.code == code)
    }

    pub(crate) fn main_project_mut(&mut self, code: &str) -> Option<&mut MainProject> {
        self.main.iter_mut().find(|p| p.code == code)
    }

    pub fn linked_project(&self, code: &str) -> Option<&LinkedProject> {
        self.linked.get(code)
    }

    /// The main project an issue key belongs to
    pub fn project_for_key(&self, key: &str) -> Option<&MainProject> {
        self.main_project(project_code_for_key(key))
    }
}
