use crate::models::effect_state::EffectState;
use crate::models::error::MediaError;
use crate::models::media_stream::MediaStream;
use crate::models::track::{EffectKind, Track, TrackId};

/// A processing unit attachable to one local track at a time.
///
/// The pipeline guarantees `start` and `stop` never overlap for a track and
/// that `is_enabled` is consulted before any side effect.
pub trait StreamEffect: Send {
    fn kind(&self) -> EffectKind;

    fn state(&self) -> EffectState;

    /// Whether this effect can run on `track`. Must not have side effects.
    fn is_enabled(&self, track: &Track) -> bool;

    /// Begin processing `input`; returns the stream the track should send instead.
    fn start(&mut self, input: MediaStream) -> Result<MediaStream, MediaError>;

    /// Stop processing and release inputs. Idempotent.
    fn stop(&mut self);

    /// Silence the signal this effect controls without muting the track.
    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Whether this effect consumes the signal of another track.
    fn depends_on(&self, _track_id: &TrackId) -> bool {
        false
    }

    /// `Err(reason)` once a running effect can no longer produce output.
    fn health(&self) -> Result<(), String> {
        Ok(())
    }
}
