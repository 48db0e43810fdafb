use std::time::Duration;

use async_trait::async_trait;
use domain::playback::{Playback, PlaybackError};
use tracing::info;

/// Playback backend for stations without a display: logs what would be shown
#[derive(Debug, Default, Clone)]
pub struct LoggingPlayback;

#[async_trait]
impl Playback for LoggingPlayback {
    async fn play(
        &self,
        asset_id: &str,
        start_offset: Duration,
        duration: Duration,
        layer: u8,
    ) -> Result<(), PlaybackError> {
        info!(
            asset = %asset_id,
            offset_secs = start_offset.as_secs_f64(),
            duration_secs = duration.as_secs_f64(),
            layer,
            "🎬 Play"
        );
        Ok(())
    }

    async fn stop(&self, asset_id: &str) -> Result<(), PlaybackError> {
        info!(asset = %asset_id, "⏹️ Stop");
        Ok(())
    }
}
