use super::track::{MediaType, NativeHandle, StreamingStatus, TrackId, TrackInfo, TrackPatch, VideoType};

/// Track fields the engine owns. Liveness, effect and lifecycle bookkeeping
/// stay out of reach of engine updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackUpdate {
    pub participant_id: Option<String>,
    pub video_type: Option<VideoType>,
    pub muted: Option<bool>,
    pub streaming_status: Option<StreamingStatus>,
}

impl TrackUpdate {
    pub fn muted(muted: bool) -> Self {
        Self {
            muted: Some(muted),
            ..Self::default()
        }
    }
}

impl From<TrackUpdate> for TrackPatch {
    fn from(update: TrackUpdate) -> Self {
        TrackPatch {
            participant_id: update.participant_id,
            video_type: update.video_type,
            muted: update.muted,
            streaming_status: update.streaming_status,
            ..TrackPatch::default()
        }
    }
}

/// Events emitted by the conferencing engine, one per occurrence.
///
/// For a given track id the engine delivers `TrackAdded` before any other
/// event referencing it.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    TrackAdded {
        info: TrackInfo,
        native: NativeHandle,
    },
    TrackRemoved {
        track_id: TrackId,
    },
    /// Includes mute flag changes initiated remotely and completions of
    /// locally issued video mutes.
    TrackUpdated {
        track_id: TrackId,
        update: TrackUpdate,
    },
    TrackMuteUnmuteFailed {
        track_id: TrackId,
        attempted_muted: bool,
    },
    TrackNoDataFromSource {
        track_id: TrackId,
    },
    TrackReceivingData {
        track_id: TrackId,
    },
    TrackStreamingStatusChanged {
        track_id: TrackId,
        status: StreamingStatus,
    },
    TrackAudioLevelChanged {
        track_id: TrackId,
        level: f32,
    },
    /// The source ended on its own, e.g. screen sharing stopped by the user.
    TrackStopped {
        track_id: TrackId,
    },
    /// A `create_local_tracks` request could not be fulfilled.
    LocalTrackCreationFailed {
        media_types: Vec<MediaType>,
        reason: String,
    },
}

impl EngineEvent {
    /// Track the event refers to, if it refers to exactly one.
    pub fn track_id(&self) -> Option<&TrackId> {
        match self {
            Self::TrackAdded { info, .. } => Some(&info.id),
            Self::TrackRemoved { track_id }
            | Self::TrackUpdated { track_id, .. }
            | Self::TrackMuteUnmuteFailed { track_id, .. }
            | Self::TrackNoDataFromSource { track_id }
            | Self::TrackReceivingData { track_id }
            | Self::TrackStreamingStatusChanged { track_id, .. }
            | Self::TrackAudioLevelChanged { track_id, .. }
            | Self::TrackStopped { track_id } => Some(track_id),
            Self::LocalTrackCreationFailed { .. } => None,
        }
    }
}
