//! # Board Sync Core
//!
//! Board projection and incremental synchronization for kanban boards built
//! over issues from several source projects.
//!
//! [`BoardData`] ingests a full snapshot, keeps indexed reference data and
//! an issue store, and derives either a flat state-column grid or a swimlane
//! grid filtered by [`BoardFilters`]. Change-sets pushed by a server are
//! applied in arrival order, preserving user-local state such as collapsed
//! swimlanes. The engine is synchronous; [`feed`] adapts async delivery.

pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod wire;

// Re-export commonly used types
pub use config::BoardConfig;
pub use domain::{
    blacklist::Blacklist,
    board::{BoardData, BoardMode, IssueTable, Swimlane, SwimlaneTable},
    changes::ChangeSetStats,
    filter::{BoardFilters, Facet, FacetFilter},
    issue::Issue,
    swimlane::{SwimlaneFacet, SwimlaneMatcher},
};
pub use error::{BoardError, Result};
pub use feed::{drive, ChangeFeed};
