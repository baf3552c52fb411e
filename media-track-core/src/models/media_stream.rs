use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::track::MediaType;

/// Opaque handle to a flowing media signal.
///
/// Clones share the same `enabled` flag, so disabling one clone silences the
/// signal for every consumer holding it.
#[derive(Clone)]
pub struct MediaStream {
    id: Arc<str>,
    media_type: MediaType,
    enabled: Arc<AtomicBool>,
}

impl MediaStream {
    pub fn new(media_type: MediaType) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), media_type)
    }

    pub fn with_id(id: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: Arc::from(id.into()),
            media_type,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaStream {}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("media_type", &self.media_type)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
