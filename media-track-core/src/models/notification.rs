use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::track::{EffectKind, MediaType, TrackId};

/// Identifier of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(uuid::Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotificationKind {
    /// The source kept sending nothing past the debounce.
    NoDataFromSource { media_type: MediaType },
    /// A mute or unmute was rejected and the logical flag reverted.
    MuteFailed { attempted: bool },
    /// A running effect died; the track is transmitting its plain source.
    EffectTerminated { effect: EffectKind },
    /// Local track creation failed.
    DeviceCreationFailed { media_type: MediaType },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub track_id: Option<TrackId>,
    pub kind: NotificationKind,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(track_id: Option<TrackId>, kind: NotificationKind) -> Self {
        Self {
            id: NotificationId::new(),
            track_id,
            kind,
            raised_at: Utc::now(),
        }
    }
}
