use std::time::Duration;

use crate::models::error::{DeviceError, MediaError};
use crate::models::track::{MediaType, TrackId};
use crate::traits::mixer_graph::MixerGraph;

/// Parameters for a local track creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrackRequest {
    pub media_types: Vec<MediaType>,
    pub device_id: Option<String>,
    pub timeout: Option<Duration>,
}

/// Operations issued to the conferencing engine.
///
/// Asynchronous operations only *issue* the request; their outcome arrives
/// later through the engine event stream (`TrackAdded`,
/// `LocalTrackCreationFailed`, `TrackUpdated`, `TrackMuteUnmuteFailed`).
pub trait ConferenceEngine: Send + Sync {
    /// Start capturing new local tracks.
    fn create_local_tracks(&self, request: &LocalTrackRequest) -> Result<(), DeviceError>;

    /// Create a fresh mixing primitive for the audio mixer effect.
    fn create_audio_mixer_graph(&self) -> Result<Box<dyn MixerGraph>, MediaError>;

    /// Mute or unmute local video, which may stop capture entirely.
    fn set_video_muted(&self, track_id: &TrackId, muted: bool) -> Result<(), DeviceError>;
}
