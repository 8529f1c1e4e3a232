use crate::{domain::BoardData, error::Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

pub mod channel_feed;
pub mod directory_feed;

pub use channel_feed::ChannelFeed;
pub use directory_feed::DirectoryFeed;

/// Source of change-set documents, delivered one at a time in arrival order
#[async_trait]
pub trait ChangeFeed: Send {
    /// Returns the next change-set, or `None` once the feed is exhausted
    async fn next_change_set(&mut self) -> Result<Option<Value>>;
}

/// Applies every change-set from the feed to the board, strictly in the
/// order received, and returns how many were applied.
///
/// Each change-set is applied to completion before the next one is pulled.
pub async fn drive<F: ChangeFeed + ?Sized>(board: &mut BoardData, feed: &mut F) -> Result<usize> {
    let mut applied = 0;
    while let Some(change_set) = feed.next_change_set().await? {
        let stats = board.apply_change_set(&change_set)?;
        debug!(view = stats.view, "change-set delivered");
        applied += 1;
    }
    Ok(applied)
}
