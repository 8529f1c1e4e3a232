use crate::{error::Result, feed::ChangeFeed};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Feed backed by an in-process channel, e.g. filled from a socket callback
pub struct ChannelFeed {
    receiver: mpsc::Receiver<Value>,
}

impl ChannelFeed {
    pub fn new(receiver: mpsc::Receiver<Value>) -> Self {
        Self { receiver }
    }

    /// Creates a bounded channel and the feed reading from it
    pub fn channel(capacity: usize) -> (mpsc::Sender<Value>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn next_change_set(&mut self) -> Result<Option<Value>> {
        Ok(self.receiver.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_channel_feed_preserves_order() {
        let (sender, mut feed) = ChannelFeed::channel(4);
        sender.send(json!({"changes": {"view": 1}})).await.unwrap();
        sender.send(json!({"changes": {"view": 2}})).await.unwrap();
        drop(sender);

        let first = feed.next_change_set().await.unwrap().unwrap();
        let second = feed.next_change_set().await.unwrap().unwrap();
        assert_eq!(first["changes"]["view"], 1);
        assert_eq!(second["changes"]["view"], 2);
        assert!(feed.next_change_set().await.unwrap().is_none());
    }
}
