use thiserror::Error;

use super::track::{EffectKind, TrackId};

/// Failures reported by capture devices or the conferencing engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not available")]
    NotAvailable,

    #[error("permission denied")]
    PermissionDenied,

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("timeout")]
    Timeout,
}

/// Errors surfaced by track management operations.
///
/// Every variant is recovered at the component that detects it; none of them
/// leaves the registry in an inconsistent state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("duplicate track: {0}")]
    DuplicateTrack(TrackId),

    #[error("track {0} is still waiting for its device")]
    TrackPending(TrackId),

    #[error("failed to set muted={attempted} on track {track_id}: {reason}")]
    MuteFailed {
        track_id: TrackId,
        attempted: bool,
        reason: String,
    },

    #[error("effect {kind} is not applicable to track {track_id}")]
    EffectNotApplicable { track_id: TrackId, kind: EffectKind },

    #[error("effect {kind} failed to start: {reason}")]
    EffectStartFailed { kind: EffectKind, reason: String },

    #[error("effect {kind} terminated on track {track_id}: {reason}")]
    EffectTerminated {
        track_id: TrackId,
        kind: EffectKind,
        reason: String,
    },

    #[error("no data from source on track {0}")]
    NoDataTimeout(TrackId),

    #[error("invalid effect input: {0}")]
    InvalidEffectInput(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("event loop is closed")]
    EventLoopClosed,
}
