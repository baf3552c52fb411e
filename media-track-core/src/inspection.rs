//! Shortcuts for test harnesses and debugging consoles.
//!
//! Everything here goes through the public `TrackManager` API; nothing
//! reaches into component state directly.

use crate::models::error::MediaError;
use crate::models::track::{MediaType, StreamingStatus, TrackFilter, TrackSnapshot, VideoType};
use crate::session::manager::TrackManager;
use crate::session::mute::MuteOutcome;

pub fn audio_mute(manager: &mut TrackManager) -> Result<MuteOutcome, MediaError> {
    manager.set_muted(None, MediaType::Audio, true, false)
}

pub fn audio_unmute(manager: &mut TrackManager) -> Result<MuteOutcome, MediaError> {
    manager.set_muted(None, MediaType::Audio, false, true)
}

pub fn video_mute(manager: &mut TrackManager) -> Result<MuteOutcome, MediaError> {
    manager.set_muted(None, MediaType::Video, true, false)
}

pub fn video_unmute(manager: &mut TrackManager) -> Result<MuteOutcome, MediaError> {
    manager.set_muted(None, MediaType::Video, false, true)
}

/// Logical mute state of the local audio track, if there is one.
pub fn local_audio_muted(manager: &TrackManager) -> Option<bool> {
    manager
        .list_tracks(&TrackFilter::local(MediaType::Audio).with_pending())
        .first()
        .map(|track| track.muted)
}

/// Whether `participant` currently sends video that actually arrives.
pub fn is_remote_video_received(manager: &TrackManager, participant: &str) -> bool {
    manager
        .list_tracks(&TrackFilter::participant(participant))
        .into_iter()
        .any(|track| {
            !track.local
                && track.is_video()
                && !track.muted
                && !track.ended
                && track.receiving_data
                && track.streaming_status == StreamingStatus::Active
        })
}

pub fn remote_video_type(manager: &TrackManager, participant: &str) -> Option<VideoType> {
    manager
        .list_tracks(&TrackFilter::participant(participant))
        .into_iter()
        .find(|track| !track.local && track.is_video())
        .and_then(|track| track.video_type)
}

/// Every registered track, placeholders included, as JSON.
pub fn snapshot(manager: &TrackManager) -> Result<serde_json::Value, serde_json::Error> {
    let tracks: Vec<TrackSnapshot> = manager
        .list_tracks(&TrackFilter::default().with_pending())
        .into_iter()
        .map(|track| track.snapshot())
        .collect();
    serde_json::to_value(tracks)
}
