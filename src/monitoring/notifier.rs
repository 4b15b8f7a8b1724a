//! Notification sinks for detected price changes.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::PriceChange;

/// Delivery target for price change events.
///
/// Fire-and-forget from the engine's perspective: implementations log their
/// own delivery failures and the engine never retries a notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, change: &PriceChange);
}

/// Sink that writes changes to the application log. Used by the daemon
/// binary, where the messaging front-end runs out of process.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, change: &PriceChange) {
        info!(
            user_id = change.user_id,
            url = %change.url,
            "price changed for {}: {} -> {}",
            change.name,
            change.old_price,
            change.new_price
        );
    }
}

/// Sink that forwards changes to an in-process front-end over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<PriceChange>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::Sender<PriceChange>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, change: &PriceChange) {
        if let Err(err) = self.sender.send(change.clone()).await {
            warn!("dropping price change notification for {}: {err}", change.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_change() -> PriceChange {
        PriceChange {
            user_id: 7,
            product_id: 1,
            name: "Widget".to_string(),
            url: "https://www.amazon.de/dp/x".to_string(),
            new_price: "24,99 €".to_string(),
            old_price: "19,99 €".to_string(),
            observed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn channel_notifier_forwards_changes() {
        let (sender, mut receiver) = mpsc::channel(4);
        let notifier = ChannelNotifier::new(sender);

        notifier.notify(&sample_change()).await;

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.new_price, "24,99 €");
        assert_eq!(received.old_price, "19,99 €");
    }

    #[tokio::test]
    async fn channel_notifier_survives_closed_receiver() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let notifier = ChannelNotifier::new(sender);

        // Must not panic or block.
        notifier.notify(&sample_change()).await;
    }
}
