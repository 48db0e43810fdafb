use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Failed to start player for {asset}: {reason}")]
    StartFailed { asset: String, reason: String },
    #[error("Failed to stop player for {asset}: {reason}")]
    StopFailed { asset: String, reason: String },
}

/// Video playback collaborator.
///
/// Implementations own the player processes; the station only asks for
/// assets to be shown for a bounded time on a display layer.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Show `asset_id` from `start_offset` for `duration` on `layer`
    async fn play(
        &self,
        asset_id: &str,
        start_offset: Duration,
        duration: Duration,
        layer: u8,
    ) -> Result<(), PlaybackError>;

    /// Stop `asset_id` early if it is still showing
    async fn stop(&self, asset_id: &str) -> Result<(), PlaybackError>;
}
