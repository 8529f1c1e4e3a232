pub mod change_set;
pub mod snapshot;

pub use change_set::{
    ChangeSetEnvelope, ChangeSetInput, IssueChangesInput, IssueUpdateInput, NewIssueInput,
    RankEntry,
};
pub use snapshot::{
    BlacklistInput, LinkedIssueInput, LinkedProjectInput, MainProjectInput, ProjectsInput,
    SnapshotInput, SnapshotIssueInput, StateEntry,
};
