use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::MediaError;

/// Default grace period before a silent video source is reported.
pub const DEFAULT_NO_DATA_TIMEOUT_MS: u64 = 5000;

/// Configuration for a track manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Debounce before a "no data" video condition raises a notification (default: 5000).
    pub no_data_timeout_ms: u64,

    /// Timeout forwarded to the engine when creating local tracks (None = engine default).
    pub local_track_timeout_ms: Option<u64>,

    /// Specific microphone device ID, or None for system default.
    pub mic_device_id: Option<String>,

    /// Specific camera device ID, or None for system default.
    pub camera_device_id: Option<String>,

    /// Ignore unmute requests until a user interaction was recorded (default: false).
    pub require_user_interaction_for_unmute: bool,

    /// Run no-data detection on remote tracks too (default: false).
    pub monitor_remote_tracks: bool,
}

impl MediaConfig {
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.no_data_timeout_ms == 0 {
            return Err(MediaError::ConfigurationFailed(
                "no-data timeout must be positive".into(),
            ));
        }
        if self.local_track_timeout_ms == Some(0) {
            return Err(MediaError::ConfigurationFailed(
                "local track timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, MediaError> {
        let config: MediaConfig = serde_json::from_str(json)
            .map_err(|e| MediaError::ConfigurationFailed(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn no_data_timeout(&self) -> Duration {
        Duration::from_millis(self.no_data_timeout_ms)
    }

    pub fn local_track_timeout(&self) -> Option<Duration> {
        self.local_track_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            no_data_timeout_ms: DEFAULT_NO_DATA_TIMEOUT_MS,
            local_track_timeout_ms: None,
            mic_device_id: None,
            camera_device_id: None,
            require_user_interaction_for_unmute: false,
            monitor_remote_tracks: false,
        }
    }
}
