use crate::wire::BlacklistInput;
use serde::Serialize;
use std::collections::BTreeSet;

/// Names the server could not reconcile.
///
/// Blacklisted issue keys are kept out of the issue store; the other entries
/// are bookkeeping shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Blacklist {
    pub states: BTreeSet<String>,
    pub priorities: BTreeSet<String>,
    pub issue_types: BTreeSet<String>,
    pub issues: BTreeSet<String>,
}

impl Blacklist {
    pub fn from_input(input: &BlacklistInput) -> Self {
        let mut blacklist = Self::default();
        blacklist.merge(input);
        blacklist
    }

    /// Accumulates additions and drops removed issues
    pub fn merge(&mut self, input: &BlacklistInput) {
        self.states.extend(input.states.iter().cloned());
        self.priorities.extend(input.priorities.iter().cloned());
        self.issue_types.extend(input.issue_types.iter().cloned());
        self.issues.extend(input.issues.iter().cloned());
        for key in &input.removed_issues {
            self.issues.remove(key);
        }
    }

    pub fn contains_issue(&self, key: &str) -> bool {
        self.issues.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
            && self.priorities.is_empty()
            && self.issue_types.is_empty()
            && self.issues.is_empty()
    }
}
