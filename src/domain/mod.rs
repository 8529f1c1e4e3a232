pub mod blacklist;
pub mod board;
pub mod changes;
pub mod filter;
pub mod issue;
pub mod project;
pub mod registry;
pub mod swimlane;

pub use blacklist::Blacklist;
pub use board::{BoardData, BoardMode, IssueTable, Swimlane, SwimlaneTable};
pub use changes::ChangeSetStats;
pub use filter::{BoardFilters, Facet, FacetFilter};
pub use issue::{Issue, IssueStore, LinkedIssue};
pub use project::{BoardProjects, LinkedProject, MainProject};
pub use registry::{Registry, RegistryEntry};
pub use swimlane::{LaneHeader, SwimlaneFacet, SwimlaneIndexer, SwimlaneMatcher};
