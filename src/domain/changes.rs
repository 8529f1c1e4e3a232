use crate::domain::board::BoardData;
use crate::domain::issue::Issue;
use crate::domain::project::project_code_for_key;
use crate::domain::registry::MultiSelectValue;
use crate::error::{BoardError, Result};
use crate::wire::{ChangeSetEnvelope, ChangeSetInput};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What a change-set did to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSetStats {
    pub view: u64,
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub reranked: usize,
    /// Entries referring to issues the board does not hold
    pub skipped: usize,
}

impl BoardData {
    /// Applies a change-set document, `{"changes": {...}}`
    pub fn apply_change_set(&mut self, input: &Value) -> Result<ChangeSetStats> {
        if !self.initialized {
            return Err(BoardError::NotInitialized);
        }
        let envelope = ChangeSetEnvelope::deserialize(input)?;
        self.apply_changes(envelope.changes)
    }

    /// Applies a parsed change-set. Entries naming unknown issues are logged
    /// and skipped; they never abort the rest of the change-set.
    pub fn apply_changes(&mut self, changes: ChangeSetInput) -> Result<ChangeSetStats> {
        if !self.initialized {
            return Err(BoardError::NotInitialized);
        }
        if self.config().warn_on_view_gap && changes.view != self.view + 1 {
            warn!(
                current = self.view,
                incoming = changes.view,
                "change-set view is not the next view"
            );
        }

        let mut stats = ChangeSetStats {
            view: changes.view,
            ..ChangeSetStats::default()
        };

        self.refs.assignees.extend_from(changes.assignees);
        self.refs
            .components
            .extend_from(changes.components.into_iter().map(MultiSelectValue::new));
        self.refs
            .labels
            .extend_from(changes.labels.into_iter().map(MultiSelectValue::new));
        self.refs
            .fix_versions
            .extend_from(changes.fix_versions.into_iter().map(MultiSelectValue::new));
        for (name, values) in changes.custom {
            self.refs.extend_custom_field(&name, values);
        }

        let issue_changes = changes.issues.unwrap_or_default();

        // 1. Keys leaving their columns: removed outright, or moving state
        let mut removed: HashSet<String> = issue_changes.delete.iter().cloned().collect();
        for key in &issue_changes.delete {
            if !self.issues.contains(key) {
                warn!(issue = %key, "delete for unknown issue, skipping");
                stats.skipped += 1;
            }
        }
        if let Some(blacklist) = &changes.blacklist {
            removed.extend(blacklist.issues.iter().cloned());
            removed.extend(blacklist.removed_issues.iter().cloned());
            self.blacklist.merge(blacklist);
        }

        let moved: HashSet<String> = issue_changes
            .update
            .iter()
            .filter(|update| !removed.contains(&update.key))
            .filter_map(|update| {
                let issue = self.issues.get(&update.key)?;
                let project = self.projects.main_project(&issue.project_code)?;
                let state = project.own_state_index_for_name(update.state.as_deref()?)?;
                (state != issue.state).then(|| update.key.clone())
            })
            .collect();

        // 2. Pull them out of the per-state lists
        let leaving: HashSet<String> = removed.union(&moved).cloned().collect();
        for project in self.projects.main_projects_mut() {
            project.remove_from_states(&leaving);
            project.remove_from_ranking(&removed);
        }
        for key in &removed {
            if self.issues.remove(key).is_some() {
                stats.deleted += 1;
            }
        }

        // 3. Field updates on surviving issues
        for update in &issue_changes.update {
            if removed.contains(&update.key) {
                debug!(issue = %update.key, "ignoring update for removed issue");
                continue;
            }
            let Some(issue) = self.issues.get_mut(&update.key) else {
                warn!(issue = %update.key, "update for unknown issue, skipping");
                stats.skipped += 1;
                continue;
            };
            let Some(project) = self.projects.main_project(&issue.project_code) else {
                warn!(issue = %update.key, "update for issue outside the main projects, skipping");
                stats.skipped += 1;
                continue;
            };
            issue.apply_update(update, &self.refs, project);
            stats.updated += 1;
        }
        for key in &moved {
            if let Some(issue) = self.issues.get(key) {
                let state = issue.state;
                if let Some(project) = self.projects.main_project_mut(&issue.project_code) {
                    project.push_to_state(key, state);
                }
            }
        }

        // 4. New issues
        for input in &issue_changes.new {
            // A key deleted earlier in the same change-set may come back here
            if self.blacklist.contains_issue(&input.key) {
                warn!(issue = %input.key, "new issue is blacklisted, skipping");
                stats.skipped += 1;
                continue;
            }
            let Some(project) = self.projects.project_for_key(&input.key) else {
                warn!(issue = %input.key, "new issue outside the main projects, skipping");
                stats.skipped += 1;
                continue;
            };
            let Some(issue) = Issue::from_new(input, &self.refs, project) else {
                stats.skipped += 1;
                continue;
            };

            let (code, state) = (issue.project_code.clone(), issue.state);
            if self.issues.insert(issue).is_some() {
                warn!(issue = %input.key, "new issue replaces an existing one");
            }
            if let Some(project) = self.projects.main_project_mut(&code) {
                project.remove_from_states(&HashSet::from([input.key.clone()]));
                project.push_to_state(&input.key, state);
                project.ensure_ranked(&input.key);
            }
            stats.added += 1;
        }

        // 5. Ranks, as target positions in the already-mutated lists
        for (code, entries) in &changes.rank {
            let Some(project) = self.projects.main_project_mut(code) else {
                warn!(project = %code, "rank change for unknown project, skipping");
                continue;
            };
            for entry in entries {
                if project_code_for_key(&entry.key) != code.as_str() {
                    warn!(
                        issue = %entry.key,
                        project = %code,
                        "rank entry for another project's issue, skipping"
                    );
                    stats.skipped += 1;
                    continue;
                }
                if !self.issues.contains(&entry.key) {
                    warn!(
                        issue = %entry.key,
                        project = %code,
                        "rank entry for absent issue, skipping"
                    );
                    stats.skipped += 1;
                    continue;
                }
                project.rerank(&entry.key, entry.index);
                stats.reranked += 1;
            }
        }
        for project in self.projects.main_projects_mut() {
            project.sort_states_by_rank();
        }

        // 6. Column membership may have shifted
        self.issues.invalidate_board_states();

        self.view = changes.view;
        info!(
            view = stats.view,
            added = stats.added,
            updated = stats.updated,
            deleted = stats.deleted,
            reranked = stats.reranked,
            skipped = stats.skipped,
            "applied change-set"
        );
        self.rebuild();
        Ok(stats)
    }
}
