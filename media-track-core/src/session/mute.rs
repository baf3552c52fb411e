use std::collections::HashMap;
use std::sync::Arc;

use crate::models::config::MediaConfig;
use crate::models::error::MediaError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::track::{MediaType, Track, TrackFilter, TrackId, TrackPatch};
use crate::registry::TrackRegistry;
use crate::traits::engine::{ConferenceEngine, LocalTrackRequest};
use crate::traits::notifier::NotificationSink;

/// What a `set_muted` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteOutcome {
    /// The native handle reflects the new state.
    Applied,
    /// An engine mute request was issued; completion arrives as an event.
    InFlight,
    /// A request was already in flight; its follow-up target was replaced.
    Superseded,
    /// No device yet; the state is applied when the track materializes.
    Deferred,
    /// No device yet; creation was requested and the state is pending.
    CreationRequested,
    /// Nothing to do.
    NoOp,
    /// Unmute ignored until a user interaction has been recorded.
    InteractionRequired,
}

#[derive(Debug, Clone)]
struct VideoMuteOp {
    track_id: TrackId,
    target: bool,
    prior: bool,
    next: Option<bool>,
}

/// Reconciles the logical mute intent with the capture device.
///
/// Audio toggles the native handle's enabled flag directly. Video goes
/// through the engine, which may stop capture entirely, so at most one video
/// request is outstanding and later calls only replace its follow-up target.
pub struct MuteController {
    engine: Arc<dyn ConferenceEngine>,
    notifier: Arc<dyn NotificationSink>,
    config: MediaConfig,
    pending: HashMap<MediaType, bool>,
    video_op: Option<VideoMuteOp>,
    user_interacted: bool,
}

impl MuteController {
    pub fn new(engine: Arc<dyn ConferenceEngine>, notifier: Arc<dyn NotificationSink>, config: MediaConfig) -> Self {
        Self {
            engine,
            notifier,
            config,
            pending: HashMap::new(),
            video_op: None,
            user_interacted: false,
        }
    }

    pub fn set_muted(
        &mut self,
        registry: &mut TrackRegistry,
        track_id: Option<&TrackId>,
        media_type: MediaType,
        muted: bool,
        ensure_track: bool,
    ) -> Result<MuteOutcome, MediaError> {
        if !muted && self.config.require_user_interaction_for_unmute && !self.user_interacted {
            log::info!("Unmute of {} ignored until the user interacts", media_type);
            return Ok(MuteOutcome::InteractionRequired);
        }

        let target = match track_id {
            Some(id) => {
                let track = registry.get(id).ok_or_else(|| MediaError::UnknownTrack(id.clone()))?;
                if !track.local || track.media_type != media_type {
                    return Err(MediaError::MuteFailed {
                        track_id: id.clone(),
                        attempted: muted,
                        reason: format!("not a local {} track", media_type),
                    });
                }
                Some(track.clone())
            }
            None => registry.find_local(media_type, true).cloned(),
        };

        match target {
            None if !ensure_track => Ok(MuteOutcome::NoOp),
            None if muted => {
                self.pending.insert(media_type, true);
                log::debug!("No local {} track, muted state deferred", media_type);
                Ok(MuteOutcome::Deferred)
            }
            None => self.request_creation(registry, media_type, muted),
            Some(track) if track.is_pending() => {
                self.pending.insert(media_type, muted);
                registry.patch(&track.id, TrackPatch::muted(muted));
                Ok(MuteOutcome::Deferred)
            }
            Some(track) => match media_type {
                MediaType::Audio => self.apply_audio(registry, &track, muted, false),
                MediaType::Video => self.apply_video(registry, &track, muted),
            },
        }
    }

    pub fn record_user_interaction(&mut self) {
        self.user_interacted = true;
    }

    pub fn pending_for(&self, media_type: MediaType) -> Option<bool> {
        self.pending.get(&media_type).copied()
    }

    /// Target of the outstanding video mute request for `track_id`, if any.
    pub fn in_flight(&self, track_id: &TrackId) -> Option<bool> {
        self.video_op
            .as_ref()
            .filter(|op| op.track_id == *track_id)
            .map(|op| op.next.unwrap_or(op.target))
    }

    /// A real local track materialized: drop placeholders of its media type
    /// and apply the pending mute state exactly once. Desktop shares never
    /// stand in for a requested camera.
    pub fn on_local_track_added(
        &mut self,
        registry: &mut TrackRegistry,
        track_id: &TrackId,
    ) -> Result<Option<MuteOutcome>, MediaError> {
        let Some(track) = registry
            .get(track_id)
            .filter(|t| t.local && !t.is_pending() && !t.is_desktop())
            .cloned()
        else {
            return Ok(None);
        };
        remove_placeholders(registry, track.media_type);

        let Some(desired) = self.pending.remove(&track.media_type) else {
            return Ok(None);
        };
        log::debug!("Applying deferred muted={} to {} track {}", desired, track.media_type, track.id);
        let outcome = match track.media_type {
            MediaType::Audio => self.apply_audio(registry, &track, desired, true)?,
            MediaType::Video if track.muted == desired => MuteOutcome::NoOp,
            MediaType::Video => self.apply_video(registry, &track, desired)?,
        };
        Ok(Some(outcome))
    }

    /// The engine reported the muted flag of a track, possibly completing
    /// the outstanding video request. Issues the superseding target if one
    /// was recorded meanwhile.
    pub fn on_muted_changed(&mut self, registry: &mut TrackRegistry, track_id: &TrackId, muted: bool) -> Option<MediaError> {
        let op = self.video_op.take_if(|op| op.track_id == *track_id && op.target == muted)?;
        match op.next {
            Some(next) if next != muted => {
                log::debug!("Video mute on {} completed, issuing superseding muted={}", track_id, next);
                registry.patch(track_id, TrackPatch::muted(next));
                self.issue_video(registry, track_id, next, muted).err()
            }
            _ => {
                log::debug!("Video mute on {} completed (muted={})", track_id, muted);
                None
            }
        }
    }

    /// Revert the logical flag after the engine rejected a mute change.
    pub fn on_mute_failed(&mut self, registry: &mut TrackRegistry, track_id: &TrackId, attempted: bool) -> Option<MediaError> {
        let revert_to = match self.video_op.take_if(|op| op.track_id == *track_id) {
            Some(op) => op.prior,
            None => !attempted,
        };
        registry.get(track_id)?;
        registry.patch(track_id, TrackPatch::muted(revert_to));
        Some(self.mute_failed(track_id, attempted, "rejected by engine".into()))
    }

    /// Local track creation failed: drop the pending state for those media types.
    pub fn on_creation_failed(
        &mut self,
        registry: &mut TrackRegistry,
        media_types: &[MediaType],
        reason: &str,
    ) -> Vec<Notification> {
        media_types
            .iter()
            .map(|&media_type| {
                self.pending.remove(&media_type);
                remove_placeholders(registry, media_type);
                log::error!("Failed to create local {} track: {}", media_type, reason);
                let notification = Notification::new(None, NotificationKind::DeviceCreationFailed { media_type });
                self.notifier.raise(&notification);
                notification
            })
            .collect()
    }

    /// Discard the outstanding request of a track that is being removed.
    pub fn forget(&mut self, track: &Track) {
        if self.video_op.take_if(|op| op.track_id == track.id).is_some() {
            log::debug!("Discarding in-flight video mute of removed track {}", track.id);
        }
    }

    fn request_creation(
        &mut self,
        registry: &mut TrackRegistry,
        media_type: MediaType,
        muted: bool,
    ) -> Result<MuteOutcome, MediaError> {
        let device_id = match media_type {
            MediaType::Audio => self.config.mic_device_id.clone(),
            MediaType::Video => self.config.camera_device_id.clone(),
        };
        let request = LocalTrackRequest {
            media_types: vec![media_type],
            device_id,
            timeout: self.config.local_track_timeout(),
        };

        if let Err(e) = self.engine.create_local_tracks(&request) {
            self.on_creation_failed(registry, &[media_type], &e.to_string());
            return Err(e.into());
        }
        self.pending.insert(media_type, muted);
        registry.add(Track::pending_local(media_type, muted))?;
        log::info!("Requested local {} track creation", media_type);
        Ok(MuteOutcome::CreationRequested)
    }

    fn apply_audio(
        &mut self,
        registry: &mut TrackRegistry,
        track: &Track,
        muted: bool,
        force: bool,
    ) -> Result<MuteOutcome, MediaError> {
        let Some(ref native) = track.native else {
            return Err(MediaError::TrackPending(track.id.clone()));
        };
        if !force && track.muted == muted && native.is_enabled() != muted {
            return Ok(MuteOutcome::NoOp);
        }

        registry.patch(&track.id, TrackPatch::muted(muted));
        match native.set_enabled(!muted) {
            Ok(()) => Ok(MuteOutcome::Applied),
            Err(e) => {
                registry.patch(&track.id, TrackPatch::muted(track.muted));
                Err(self.mute_failed(&track.id, muted, e.to_string()))
            }
        }
    }

    fn apply_video(&mut self, registry: &mut TrackRegistry, track: &Track, muted: bool) -> Result<MuteOutcome, MediaError> {
        if let Some(op) = self.video_op.as_mut().filter(|op| op.track_id == track.id) {
            if op.target == muted && op.next.is_none() {
                return Ok(MuteOutcome::InFlight);
            }
            op.next = (op.target != muted).then_some(muted);
            log::debug!("Video mute on {} in flight, follow-up target now muted={}", track.id, muted);
            registry.patch(&track.id, TrackPatch::muted(muted));
            return Ok(MuteOutcome::Superseded);
        }
        if track.muted == muted {
            return Ok(MuteOutcome::NoOp);
        }

        registry.patch(&track.id, TrackPatch::muted(muted));
        self.issue_video(registry, &track.id, muted, track.muted)
    }

    fn issue_video(
        &mut self,
        registry: &mut TrackRegistry,
        track_id: &TrackId,
        muted: bool,
        prior: bool,
    ) -> Result<MuteOutcome, MediaError> {
        match self.engine.set_video_muted(track_id, muted) {
            Ok(()) => {
                self.video_op = Some(VideoMuteOp {
                    track_id: track_id.clone(),
                    target: muted,
                    prior,
                    next: None,
                });
                Ok(MuteOutcome::InFlight)
            }
            Err(e) => {
                registry.patch(track_id, TrackPatch::muted(prior));
                Err(self.mute_failed(track_id, muted, e.to_string()))
            }
        }
    }

    fn mute_failed(&self, track_id: &TrackId, attempted: bool, reason: String) -> MediaError {
        let error = MediaError::MuteFailed {
            track_id: track_id.clone(),
            attempted,
            reason,
        };
        log::error!("{}", error);
        self.notifier.raise(&Notification::new(
            Some(track_id.clone()),
            NotificationKind::MuteFailed { attempted },
        ));
        error
    }
}

fn remove_placeholders(registry: &mut TrackRegistry, media_type: MediaType) {
    let placeholders: Vec<TrackId> = registry
        .list(&TrackFilter::local(media_type).with_pending())
        .into_iter()
        .filter(|track| track.is_pending())
        .map(|track| track.id.clone())
        .collect();
    for id in placeholders {
        registry.remove(&id);
    }
}
