//! Wall-clock ticker backed by the tokio timer.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Ticker;

/// Sleeps on the tokio runtime timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTicker;

#[async_trait]
impl Ticker for TokioTicker {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
