use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::effect_state::EffectState;
use super::notification::NotificationId;
use crate::traits::native_track::NativeTrack;

/// Stable track identifier, unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generated id for a local placeholder awaiting its device result.
    pub(crate) fn placeholder() -> Self {
        Self(format!("pending-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => f.write_str("audio"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Video source kind. Only meaningful for video tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoType {
    Camera,
    Desktop,
}

/// Receipt health of a track as classified by the conferencing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingStatus {
    #[default]
    Active,
    Inactive,
    Interrupted,
}

/// Kind of processing effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    AudioMixer,
    Custom(String),
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioMixer => f.write_str("audio-mixer"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Reference to an effect attached to a local track.
///
/// The effect object itself is owned by the effect pipeline; the track only
/// carries this descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectDescriptor {
    pub instance_id: uuid::Uuid,
    pub kind: EffectKind,
    pub state: EffectState,
}

/// Identifier of a single-shot timer in the session timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimerId(pub(crate) u64);

/// No-data bookkeeping for a track.
///
/// At most one of the two fields is set: a timer exists only until it fires,
/// and a notification id exists only after it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LivenessInfo {
    pub no_data_timer: Option<TimerId>,
    pub notification: Option<NotificationId>,
}

impl LivenessInfo {
    pub fn pending(timer: TimerId) -> Self {
        Self {
            no_data_timer: Some(timer),
            notification: None,
        }
    }

    pub fn notified(notification: NotificationId) -> Self {
        Self {
            no_data_timer: None,
            notification: Some(notification),
        }
    }
}

/// Shared reference to the engine's capture/render primitive.
#[derive(Clone)]
pub struct NativeHandle(Arc<dyn NativeTrack>);

impl NativeHandle {
    pub fn new(track: Arc<dyn NativeTrack>) -> Self {
        Self(track)
    }

    /// Whether both handles refer to the same underlying primitive.
    pub fn same_as(&self, other: &NativeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn track(&self) -> &Arc<dyn NativeTrack> {
        &self.0
    }
}

impl std::ops::Deref for NativeHandle {
    type Target = dyn NativeTrack;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("media_type", &self.0.media_type())
            .field("source", &self.0.source_stream().id())
            .finish()
    }
}

/// Track description delivered by the engine on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: TrackId,
    pub participant_id: Option<String>,
    pub media_type: MediaType,
    pub video_type: Option<VideoType>,
    pub local: bool,
    pub muted: bool,
}

impl TrackInfo {
    pub fn local(id: impl Into<TrackId>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            participant_id: Some("local".into()),
            media_type,
            video_type: (media_type == MediaType::Video).then_some(VideoType::Camera),
            local: true,
            muted: false,
        }
    }

    pub fn remote(id: impl Into<TrackId>, participant_id: &str, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            participant_id: Some(participant_id.to_string()),
            media_type,
            video_type: (media_type == MediaType::Video).then_some(VideoType::Camera),
            local: false,
            muted: false,
        }
    }
}

/// One audio or video signal, local (captured) or remote (received).
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub participant_id: Option<String>,
    pub media_type: MediaType,
    pub video_type: Option<VideoType>,
    pub local: bool,
    pub muted: bool,
    pub streaming_status: StreamingStatus,
    /// `None` while a local track is still waiting for its device result.
    pub native: Option<NativeHandle>,
    pub effects_chain: Vec<EffectDescriptor>,
    pub liveness: LivenessInfo,
    pub receiving_data: bool,
    pub audio_level: f32,
    pub ended: bool,
}

impl Track {
    pub fn from_info(info: TrackInfo, native: NativeHandle) -> Self {
        Self {
            id: info.id,
            participant_id: info.participant_id,
            media_type: info.media_type,
            video_type: info.video_type,
            local: info.local,
            muted: info.muted,
            streaming_status: StreamingStatus::Active,
            native: Some(native),
            effects_chain: Vec::new(),
            liveness: LivenessInfo::default(),
            receiving_data: true,
            audio_level: 0.0,
            ended: false,
        }
    }

    /// Local placeholder that exists until the engine delivers the device result.
    pub fn pending_local(media_type: MediaType, muted: bool) -> Self {
        Self {
            id: TrackId::placeholder(),
            participant_id: None,
            media_type,
            video_type: (media_type == MediaType::Video).then_some(VideoType::Camera),
            local: true,
            muted,
            streaming_status: StreamingStatus::Active,
            native: None,
            effects_chain: Vec::new(),
            liveness: LivenessInfo::default(),
            receiving_data: false,
            audio_level: 0.0,
            ended: false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.native.is_none()
    }

    pub fn is_audio(&self) -> bool {
        self.media_type == MediaType::Audio
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    pub fn is_desktop(&self) -> bool {
        self.is_video() && self.video_type == Some(VideoType::Desktop)
    }

    pub fn running_effect(&self) -> Option<&EffectDescriptor> {
        self.effects_chain.iter().find(|e| e.state == EffectState::Running)
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            id: self.id.clone(),
            participant_id: self.participant_id.clone(),
            media_type: self.media_type,
            video_type: self.video_type,
            local: self.local,
            muted: self.muted,
            pending: self.is_pending(),
            streaming_status: self.streaming_status,
            receiving_data: self.receiving_data,
            audio_level: self.audio_level,
            effects: self.effects_chain.clone(),
            no_data_notification: self.liveness.notification,
        }
    }
}

/// Serializable view of a track for inspection and logging.
#[derive(Debug, Clone, Serialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub participant_id: Option<String>,
    pub media_type: MediaType,
    pub video_type: Option<VideoType>,
    pub local: bool,
    pub muted: bool,
    pub pending: bool,
    pub streaming_status: StreamingStatus,
    pub receiving_data: bool,
    pub audio_level: f32,
    pub effects: Vec<EffectDescriptor>,
    pub no_data_notification: Option<NotificationId>,
}

/// Partial update applied through the registry.
#[derive(Debug, Clone, Default)]
pub struct TrackPatch {
    pub participant_id: Option<String>,
    pub video_type: Option<VideoType>,
    pub muted: Option<bool>,
    pub streaming_status: Option<StreamingStatus>,
    pub effects_chain: Option<Vec<EffectDescriptor>>,
    pub liveness: Option<LivenessInfo>,
    pub receiving_data: Option<bool>,
    pub audio_level: Option<f32>,
    pub ended: Option<bool>,
}

impl TrackPatch {
    pub fn muted(muted: bool) -> Self {
        Self {
            muted: Some(muted),
            ..Self::default()
        }
    }

    pub fn streaming_status(status: StreamingStatus) -> Self {
        Self {
            streaming_status: Some(status),
            ..Self::default()
        }
    }

    pub fn liveness(liveness: LivenessInfo) -> Self {
        Self {
            liveness: Some(liveness),
            ..Self::default()
        }
    }

    pub fn effects_chain(chain: Vec<EffectDescriptor>) -> Self {
        Self {
            effects_chain: Some(chain),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, track: &mut Track) {
        if let Some(participant_id) = self.participant_id {
            track.participant_id = Some(participant_id);
        }
        if let Some(video_type) = self.video_type {
            track.video_type = Some(video_type);
        }
        if let Some(muted) = self.muted {
            track.muted = muted;
        }
        if let Some(status) = self.streaming_status {
            track.streaming_status = status;
        }
        if let Some(chain) = self.effects_chain {
            track.effects_chain = chain;
        }
        if let Some(liveness) = self.liveness {
            track.liveness = liveness;
        }
        if let Some(receiving) = self.receiving_data {
            track.receiving_data = receiving;
        }
        if let Some(level) = self.audio_level {
            track.audio_level = level.clamp(0.0, 1.0);
        }
        if let Some(ended) = self.ended {
            track.ended = ended;
        }
    }
}

/// Selection criteria for listing tracks. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    pub local: Option<bool>,
    pub media_type: Option<MediaType>,
    pub participant_id: Option<String>,
    pub include_pending: bool,
}

impl TrackFilter {
    pub fn local(media_type: MediaType) -> Self {
        Self {
            local: Some(true),
            media_type: Some(media_type),
            ..Self::default()
        }
    }

    pub fn participant(participant_id: &str) -> Self {
        Self {
            participant_id: Some(participant_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_pending(mut self) -> Self {
        self.include_pending = true;
        self
    }

    pub fn matches(&self, track: &Track) -> bool {
        if !self.include_pending && track.is_pending() {
            return false;
        }
        if self.local.is_some_and(|local| local != track.local) {
            return false;
        }
        if self.media_type.is_some_and(|media_type| media_type != track.media_type) {
            return false;
        }
        if let Some(ref participant) = self.participant_id {
            if track.participant_id.as_deref() != Some(participant.as_str()) {
                return false;
            }
        }
        true
    }
}
