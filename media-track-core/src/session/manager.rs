use std::sync::Arc;
use std::time::Instant;

use crate::effects::audio_mixer::AudioMixerEffect;
use crate::models::config::MediaConfig;
use crate::models::error::MediaError;
use crate::models::event::{EngineEvent, TrackUpdate};
use crate::models::notification::Notification;
use crate::models::track::{
    EffectDescriptor, EffectKind, MediaType, StreamingStatus, Track, TrackFilter, TrackId, TrackPatch,
};
use crate::registry::subscription::{Subscription, TrackChange};
use crate::registry::TrackRegistry;
use crate::session::liveness::LivenessMonitor;
use crate::session::mute::{MuteController, MuteOutcome};
use crate::session::pipeline::{EffectPipeline, EffectTermination};
use crate::session::timers::Clock;
use crate::traits::effect::StreamEffect;
use crate::traits::engine::ConferenceEngine;
use crate::traits::notifier::NotificationSink;
use crate::traits::observer::RegistryObserver;

/// Track lifecycle orchestrator.
///
/// Owns the registry and every component that reacts to it. All engine
/// events, user commands and timer callbacks go through `&mut self`, so each
/// one runs to completion before the next is looked at.
///
/// ```text
/// [Engine events] ─→ handle_event ─→ [TrackRegistry] ─→ observer / subscriptions
///                                         ↑   ↑   ↑
///                 [LivenessMonitor] ──────┘   │   └────── [MuteController] ←─ set_muted
///                 run_due_timers              │
///                                     [EffectPipeline] ←─ attach_effect / detach_effect
/// ```
pub struct TrackManager {
    config: MediaConfig,
    engine: Arc<dyn ConferenceEngine>,
    registry: TrackRegistry,
    liveness: LivenessMonitor,
    pipeline: EffectPipeline,
    mute: MuteController,
}

impl TrackManager {
    pub fn new(
        config: MediaConfig,
        engine: Arc<dyn ConferenceEngine>,
        notifier: Arc<dyn NotificationSink>,
        observer: Arc<dyn RegistryObserver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MediaError> {
        config.validate()?;

        let liveness = LivenessMonitor::new(
            config.no_data_timeout(),
            config.monitor_remote_tracks,
            clock,
            Arc::clone(&notifier),
        );
        let pipeline = EffectPipeline::new(Arc::clone(&notifier));
        let mute = MuteController::new(Arc::clone(&engine), notifier, config.clone());

        Ok(Self {
            config,
            engine,
            registry: TrackRegistry::new(observer),
            liveness,
            pipeline,
            mute,
        })
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Apply one engine event.
    ///
    /// The registry is consistent whatever the result; an `Err` reports a
    /// condition that was already recovered (reverted mute, terminated
    /// effect, duplicate track) and has been surfaced as a notification
    /// where applicable.
    pub fn handle_event(&mut self, event: EngineEvent) -> Result<(), MediaError> {
        match event {
            EngineEvent::TrackAdded { info, native } => self.on_track_added(Track::from_info(info, native)),
            EngineEvent::TrackRemoved { track_id } => self.remove_track(&track_id),
            EngineEvent::TrackUpdated { track_id, update } => self.on_track_updated(&track_id, update),
            EngineEvent::TrackMuteUnmuteFailed {
                track_id,
                attempted_muted,
            } => match self.mute.on_mute_failed(&mut self.registry, &track_id, attempted_muted) {
                Some(e) => Err(e),
                None => Ok(()),
            },
            EngineEvent::TrackNoDataFromSource { track_id } => {
                self.liveness.on_no_data(&mut self.registry, &track_id);
                Ok(())
            }
            EngineEvent::TrackReceivingData { track_id } => {
                self.liveness.on_receiving(&mut self.registry, &track_id);
                Ok(())
            }
            EngineEvent::TrackStreamingStatusChanged { track_id, status } => {
                self.registry.patch(&track_id, TrackPatch::streaming_status(status));
                Ok(())
            }
            EngineEvent::TrackAudioLevelChanged { track_id, level } => {
                let patch = TrackPatch {
                    audio_level: Some(level),
                    ..TrackPatch::default()
                };
                self.registry.patch(&track_id, patch);
                Ok(())
            }
            EngineEvent::TrackStopped { track_id } => self.on_track_stopped(&track_id),
            EngineEvent::LocalTrackCreationFailed { media_types, reason } => {
                self.mute.on_creation_failed(&mut self.registry, &media_types, &reason);
                Ok(())
            }
        }
    }

    fn on_track_added(&mut self, track: Track) -> Result<(), MediaError> {
        let id = track.id.clone();
        let local = track.local;
        let participant = track.participant_id.clone();
        self.registry.add(track)?;

        if local {
            log::info!("Local track {} added", id);
            self.mute.on_local_track_added(&mut self.registry, &id)?;
        } else if let Some(participant) = participant {
            self.log_participant_tracks(&participant);
        }
        Ok(())
    }

    fn on_track_updated(&mut self, track_id: &TrackId, update: TrackUpdate) -> Result<(), MediaError> {
        let muted = update.muted;
        let Some(track) = self.registry.patch(track_id, update.into()) else {
            return Ok(());
        };
        let local = track.local;
        let participant = track.participant_id.clone();

        match (muted, local) {
            (Some(muted), true) => match self.mute.on_muted_changed(&mut self.registry, track_id, muted) {
                Some(e) => Err(e),
                None => Ok(()),
            },
            (Some(_), false) => {
                if let Some(participant) = participant {
                    self.log_participant_tracks(&participant);
                }
                Ok(())
            }
            (None, _) => Ok(()),
        }
    }

    fn on_track_stopped(&mut self, track_id: &TrackId) -> Result<(), MediaError> {
        let patch = TrackPatch {
            ended: Some(true),
            ..TrackPatch::default()
        };
        if self.registry.patch(track_id, patch).is_none() {
            return Ok(());
        }
        log::info!("Track {} stopped by its source", track_id);
        let mut terminations: Vec<EffectTermination> = self
            .pipeline
            .terminate_on(&mut self.registry, track_id, format!("input track {} went away", track_id))
            .into_iter()
            .collect();
        terminations.extend(self.pipeline.terminate_dependents(&mut self.registry, track_id));
        first_error(terminations)
    }

    /// Remove a track. Its liveness timer, notification, effect and in-flight
    /// mute request are all released before the entity is dropped.
    pub fn remove_track(&mut self, track_id: &TrackId) -> Result<(), MediaError> {
        let liveness = &mut self.liveness;
        let pipeline = &mut self.pipeline;
        let mute = &mut self.mute;
        let removed = self.registry.remove_with(track_id, |track| {
            liveness.release(track);
            pipeline.teardown(track);
            mute.forget(track);
        });
        let Some(track) = removed else {
            return Ok(());
        };

        if track.local {
            log::info!("Local track {} removed", track_id);
        } else if let Some(ref participant) = track.participant_id {
            self.log_participant_tracks(participant);
        }
        first_error(self.pipeline.terminate_dependents(&mut self.registry, track_id))
    }

    pub fn get_track(&self, track_id: &TrackId) -> Option<&Track> {
        self.registry.get(track_id)
    }

    pub fn list_tracks(&self, filter: &TrackFilter) -> Vec<&Track> {
        self.registry.list(filter)
    }

    pub fn streaming_status(&self, track_id: &TrackId) -> Option<StreamingStatus> {
        self.registry.get(track_id).map(|track| track.streaming_status)
    }

    pub fn running_effect(&self, track_id: &TrackId) -> Option<EffectKind> {
        self.pipeline.running_kind(track_id)
    }

    /// Listen to changes of one track for as long as both the track and the
    /// returned `Subscription` live.
    pub fn subscribe(
        &self,
        track_id: &TrackId,
        listener: impl Fn(&TrackChange) + Send + Sync + 'static,
    ) -> Result<Subscription, MediaError> {
        self.registry.subscribe(track_id, listener)
    }

    /// Set the mute intent of the local track of `media_type`, or of
    /// `track_id` when given. With `ensure_track`, a missing track is
    /// requested from the engine and the state applied once it exists.
    pub fn set_muted(
        &mut self,
        track_id: Option<&TrackId>,
        media_type: MediaType,
        muted: bool,
        ensure_track: bool,
    ) -> Result<MuteOutcome, MediaError> {
        self.mute
            .set_muted(&mut self.registry, track_id, media_type, muted, ensure_track)
    }

    pub fn record_user_interaction(&mut self) {
        self.mute.record_user_interaction();
    }

    pub fn mute_in_flight(&self, track_id: &TrackId) -> Option<bool> {
        self.mute.in_flight(track_id)
    }

    /// Build an audio mixer that mixes `secondary` into whatever track it is attached to.
    pub fn create_audio_mixer(&self, secondary: &TrackId) -> Result<AudioMixerEffect, MediaError> {
        let track = self
            .registry
            .get(secondary)
            .ok_or_else(|| MediaError::UnknownTrack(secondary.clone()))?;
        AudioMixerEffect::new(track, Arc::clone(&self.engine))
    }

    pub fn attach_effect(
        &mut self,
        track_id: &TrackId,
        effect: Box<dyn StreamEffect>,
    ) -> Result<EffectDescriptor, MediaError> {
        self.pipeline.attach(&mut self.registry, track_id, effect)
    }

    pub fn detach_effect(&mut self, track_id: &TrackId) -> bool {
        self.pipeline.detach(&mut self.registry, track_id)
    }

    /// Mute the signal the running effect controls. Returns false without an effect.
    pub fn set_effect_muted(&mut self, track_id: &TrackId, muted: bool) -> bool {
        self.pipeline.set_effect_muted(track_id, muted)
    }

    pub fn is_effect_muted(&self, track_id: &TrackId) -> Option<bool> {
        self.pipeline.is_effect_muted(track_id)
    }

    /// Terminate every running effect that lost one of its inputs.
    pub fn check_effects(&mut self) -> Vec<EffectTermination> {
        self.pipeline.check_health(&mut self.registry)
    }

    pub fn run_due_timers(&mut self) -> Vec<Notification> {
        self.liveness.run_due(&mut self.registry)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.liveness.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.liveness.pending_timers()
    }

    fn log_participant_tracks(&self, participant: &str) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let summary: Vec<String> = self
            .registry
            .list(&TrackFilter::participant(participant))
            .into_iter()
            .map(|track| format!("{}:{}:muted={}", track.id, track.media_type, track.muted))
            .collect();
        log::debug!("Tracks for participant {}: [{}]", participant, summary.join(", "));
    }
}

fn first_error(terminations: Vec<EffectTermination>) -> Result<(), MediaError> {
    match terminations.into_iter().next() {
        Some(termination) => Err(termination.error),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::models::notification::NotificationKind;
    use crate::models::track::{NativeHandle, TrackInfo, VideoType};
    use crate::session::timers::ManualClock;
    use crate::test_support::{
        CountingEffect, EffectProbe, FakeEngine, FakeTrack, RecordingNotifier, RecordingObserver,
    };
    use crate::traits::native_track::NativeTrack;

    struct Harness {
        manager: TrackManager,
        clock: ManualClock,
        engine: Arc<FakeEngine>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with_observer(observer: Arc<dyn RegistryObserver>) -> Harness {
        let clock = ManualClock::new();
        let engine = Arc::new(FakeEngine::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = TrackManager::new(
            MediaConfig::default(),
            engine.clone(),
            notifier.clone(),
            observer,
            Arc::new(clock.clone()),
        )
        .unwrap();
        Harness {
            manager,
            clock,
            engine,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with_observer(Arc::new(RecordingObserver::default()))
    }

    fn added(info: TrackInfo, native: NativeHandle) -> EngineEvent {
        EngineEvent::TrackAdded { info, native }
    }

    fn add_local(h: &mut Harness, id: &str, native: &Arc<FakeTrack>) {
        let info = TrackInfo::local(id, native.media_type());
        h.manager.handle_event(added(info, native.handle())).unwrap();
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = MediaConfig {
            no_data_timeout_ms: 0,
            ..MediaConfig::default()
        };
        let result = TrackManager::new(
            config,
            Arc::new(FakeEngine::default()),
            Arc::new(RecordingNotifier::default()),
            Arc::new(RecordingObserver::default()),
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(result, Err(MediaError::ConfigurationFailed(_))));
    }

    #[test]
    fn duplicate_track_added_is_rejected() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());

        let mut info = TrackInfo::local("mic", MediaType::Audio);
        info.muted = true;
        let result = h.manager.handle_event(added(info, FakeTrack::audio().handle()));

        assert_eq!(result, Err(MediaError::DuplicateTrack("mic".into())));
        assert!(!h.manager.get_track(&"mic".into()).unwrap().muted);
    }

    #[test]
    fn events_for_unknown_tracks_are_ignored() {
        let mut h = harness();
        let ghost: TrackId = "ghost".into();

        for event in [
            EngineEvent::TrackUpdated {
                track_id: ghost.clone(),
                update: TrackUpdate::muted(true),
            },
            EngineEvent::TrackRemoved { track_id: ghost.clone() },
            EngineEvent::TrackNoDataFromSource { track_id: ghost.clone() },
            EngineEvent::TrackReceivingData { track_id: ghost.clone() },
            EngineEvent::TrackStopped { track_id: ghost.clone() },
            EngineEvent::TrackMuteUnmuteFailed {
                track_id: ghost.clone(),
                attempted_muted: true,
            },
        ] {
            assert_eq!(h.manager.handle_event(event), Ok(()));
        }
        assert!(h.manager.registry().is_empty());
        assert!(h.notifier.raised().is_empty());
    }

    #[test]
    fn video_recovering_within_debounce_never_notifies() {
        let mut h = harness();
        add_local(&mut h, "t1", &FakeTrack::video());
        let t1: TrackId = "t1".into();

        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: t1.clone() })
            .unwrap();
        h.clock.advance(ms(4000));
        assert!(h.manager.run_due_timers().is_empty());
        h.manager
            .handle_event(EngineEvent::TrackReceivingData { track_id: t1.clone() })
            .unwrap();

        h.clock.advance(ms(5000));
        assert!(h.manager.run_due_timers().is_empty());
        assert!(h.notifier.raised().is_empty());
        assert_eq!(h.manager.pending_timers(), 0);
        assert!(h.manager.get_track(&t1).unwrap().receiving_data);
    }

    #[test]
    fn stalled_video_notifies_and_removal_dismisses() {
        let mut h = harness();
        add_local(&mut h, "t2", &FakeTrack::video());
        let t2: TrackId = "t2".into();

        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: t2.clone() })
            .unwrap();
        assert_eq!(h.manager.next_deadline(), Some(h.clock.now() + ms(5000)));
        h.clock.advance(ms(5000));
        let raised = h.manager.run_due_timers();
        assert_eq!(raised.len(), 1);
        assert_eq!(
            raised[0].kind,
            NotificationKind::NoDataFromSource {
                media_type: MediaType::Video
            }
        );

        h.clock.advance(ms(1000));
        h.manager
            .handle_event(EngineEvent::TrackRemoved { track_id: t2.clone() })
            .unwrap();

        assert_eq!(h.notifier.dismissed(), vec![raised[0].id]);
        assert!(h.manager.get_track(&t2).is_none());
    }

    #[test]
    fn engine_update_keeps_no_data_notification_owned() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());
        let cam: TrackId = "cam".into();
        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: cam.clone() })
            .unwrap();
        h.clock.advance(ms(5000));
        let raised = h.manager.run_due_timers();

        h.manager
            .handle_event(EngineEvent::TrackUpdated {
                track_id: cam.clone(),
                update: TrackUpdate {
                    video_type: Some(VideoType::Camera),
                    ..TrackUpdate::default()
                },
            })
            .unwrap();
        h.manager.handle_event(EngineEvent::TrackRemoved { track_id: cam }).unwrap();

        assert_eq!(h.notifier.dismissed(), vec![raised[0].id]);
    }

    #[test]
    fn remote_no_data_is_ignored_by_default() {
        let mut h = harness();
        let info = TrackInfo::remote("r1", "alice", MediaType::Video);
        h.manager.handle_event(added(info, FakeTrack::video().handle())).unwrap();

        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: "r1".into() })
            .unwrap();
        h.clock.advance(ms(10_000));

        assert_eq!(h.manager.pending_timers(), 0);
        assert!(h.manager.run_due_timers().is_empty());
        assert!(h.notifier.raised().is_empty());
    }

    #[test]
    fn no_timer_fires_after_removal() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());
        let cam: TrackId = "cam".into();
        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: cam.clone() })
            .unwrap();

        h.manager.handle_event(EngineEvent::TrackRemoved { track_id: cam }).unwrap();
        h.clock.advance(ms(10_000));

        assert!(h.manager.run_due_timers().is_empty());
        assert_eq!(h.manager.next_deadline(), None);
        assert!(h.notifier.raised().is_empty());
    }

    #[test]
    fn audio_no_data_clears_notification_immediately() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());
        let mic: TrackId = "mic".into();

        h.manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: mic.clone() })
            .unwrap();

        assert_eq!(h.manager.pending_timers(), 0);
        assert!(!h.manager.get_track(&mic).unwrap().receiving_data);
        assert!(h.notifier.raised().is_empty());
    }

    /// Checks, at the moment the registry drops the track, that its
    /// resources were already released.
    struct ReleaseCheck {
        notifier: Arc<RecordingNotifier>,
        probe: Arc<EffectProbe>,
        released_before_drop: AtomicBool,
    }

    impl RegistryObserver for ReleaseCheck {
        fn on_track_added(&self, _track: &Track) {}

        fn on_track_updated(&self, _track: &Track) {}

        fn on_track_removed(&self, _track: &Track) {
            let released = self.notifier.dismissed().len() == 1 && self.probe.stops.load(Ordering::SeqCst) == 1;
            self.released_before_drop.store(released, Ordering::SeqCst);
        }
    }

    #[test]
    fn removal_releases_notification_and_effect_before_drop() {
        let clock = ManualClock::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let probe = Arc::new(EffectProbe::default());
        let check = Arc::new(ReleaseCheck {
            notifier: notifier.clone(),
            probe: probe.clone(),
            released_before_drop: AtomicBool::new(false),
        });
        let mut manager = TrackManager::new(
            MediaConfig::default(),
            Arc::new(FakeEngine::default()),
            notifier.clone(),
            check.clone(),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let cam: TrackId = "cam".into();
        manager
            .handle_event(added(TrackInfo::local("cam", MediaType::Video), FakeTrack::video().handle()))
            .unwrap();
        manager
            .attach_effect(&cam, Box::new(CountingEffect::new("blur", &probe)))
            .unwrap();
        manager
            .handle_event(EngineEvent::TrackNoDataFromSource { track_id: cam.clone() })
            .unwrap();
        clock.advance(ms(5000));
        assert_eq!(manager.run_due_timers().len(), 1);

        manager.handle_event(EngineEvent::TrackRemoved { track_id: cam }).unwrap();

        assert!(check.released_before_drop.load(Ordering::SeqCst));
        assert_eq!(notifier.dismissed().len(), 1);
        assert_eq!(probe.stops.load(Ordering::SeqCst), 1);
        assert_eq!(manager.pending_timers(), 0);
    }

    #[test]
    fn unmute_creates_missing_audio_track() {
        let mut h = harness();

        let outcome = h.manager.set_muted(None, MediaType::Audio, false, true).unwrap();
        assert_eq!(outcome, MuteOutcome::CreationRequested);
        assert_eq!(h.engine.create_count(), 1);

        h.clock.advance(ms(200));
        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);

        let tracks = h.manager.list_tracks(&TrackFilter::local(MediaType::Audio).with_pending());
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, TrackId::from("mic"));
        assert!(!tracks[0].muted);
        assert!(mic.is_enabled());
    }

    #[test]
    fn deferred_mute_is_applied_once() {
        let mut h = harness();

        let outcome = h.manager.set_muted(None, MediaType::Audio, true, true).unwrap();
        assert_eq!(outcome, MuteOutcome::Deferred);
        assert_eq!(h.engine.create_count(), 0);

        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);

        assert!(h.manager.get_track(&"mic".into()).unwrap().muted);
        assert!(!mic.is_enabled());
        assert_eq!(mic.enable_calls(), 1);
    }

    #[test]
    fn creation_failure_event_drops_placeholder() {
        let mut h = harness();
        h.manager.set_muted(None, MediaType::Video, false, true).unwrap();
        assert_eq!(h.manager.registry().len(), 1);

        h.manager
            .handle_event(EngineEvent::LocalTrackCreationFailed {
                media_types: vec![MediaType::Video],
                reason: "camera in use".into(),
            })
            .unwrap();

        assert!(h.manager.registry().is_empty());
        assert_eq!(
            h.notifier.raised()[0].kind,
            NotificationKind::DeviceCreationFailed {
                media_type: MediaType::Video
            }
        );
    }

    #[test]
    fn video_mute_completes_through_track_updated() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());
        let cam: TrackId = "cam".into();

        assert_eq!(
            h.manager.set_muted(None, MediaType::Video, true, false).unwrap(),
            MuteOutcome::InFlight
        );
        h.manager
            .handle_event(EngineEvent::TrackUpdated {
                track_id: cam.clone(),
                update: TrackUpdate::muted(true),
            })
            .unwrap();

        assert_eq!(h.manager.mute_in_flight(&cam), None);
        assert!(h.manager.get_track(&cam).unwrap().muted);
    }

    #[test]
    fn video_mute_failure_event_reverts() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());
        let cam: TrackId = "cam".into();
        h.manager.set_muted(None, MediaType::Video, true, false).unwrap();

        let result = h.manager.handle_event(EngineEvent::TrackMuteUnmuteFailed {
            track_id: cam.clone(),
            attempted_muted: true,
        });

        assert!(matches!(result, Err(MediaError::MuteFailed { attempted: true, .. })));
        assert!(!h.manager.get_track(&cam).unwrap().muted);
        assert_eq!(
            h.notifier.raised()[0].kind,
            NotificationKind::MuteFailed { attempted: true }
        );
    }

    #[test]
    fn in_flight_mute_of_removed_track_is_discarded() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());
        let cam: TrackId = "cam".into();
        h.manager.set_muted(None, MediaType::Video, true, false).unwrap();

        h.manager
            .handle_event(EngineEvent::TrackRemoved { track_id: cam.clone() })
            .unwrap();
        h.manager
            .handle_event(EngineEvent::TrackUpdated {
                track_id: cam.clone(),
                update: TrackUpdate::muted(true),
            })
            .unwrap();

        assert_eq!(h.manager.mute_in_flight(&cam), None);
        assert!(h.manager.registry().is_empty());
    }

    #[test]
    fn audio_mixer_on_video_secondary_fails_without_side_effects() {
        let mut h = harness();
        add_local(&mut h, "cam", &FakeTrack::video());

        let result = h.manager.create_audio_mixer(&"cam".into());

        assert!(matches!(result, Err(MediaError::InvalidEffectInput(_))));
        assert_eq!(h.manager.registry().len(), 1);
        assert_eq!(h.engine.probe.graphs_created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn audio_mixer_on_video_track_is_not_applicable() {
        let mut h = harness();
        add_local(&mut h, "music", &FakeTrack::audio());
        add_local(&mut h, "cam", &FakeTrack::video());
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();

        let result = h.manager.attach_effect(&"cam".into(), Box::new(mixer));

        assert!(matches!(result, Err(MediaError::EffectNotApplicable { .. })));
        assert!(h.manager.get_track(&"cam".into()).unwrap().effects_chain.is_empty());
    }

    #[test]
    fn reattach_stops_prior_effect_first() {
        let mut h = harness();
        add_local(&mut h, "a", &FakeTrack::audio());
        let a: TrackId = "a".into();
        let probe = Arc::new(EffectProbe::default());

        h.manager
            .attach_effect(&a, Box::new(CountingEffect::new("first", &probe)))
            .unwrap();
        h.manager
            .attach_effect(&a, Box::new(CountingEffect::new("second", &probe)))
            .unwrap();

        assert_eq!(probe.events(), vec!["start:first", "stop:first", "start:second"]);
        assert_eq!(probe.starts.load(Ordering::SeqCst) - probe.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.manager.get_track(&a).unwrap().effects_chain.len(), 1);
    }

    #[test]
    fn mixer_terminates_when_secondary_track_goes_away() {
        let mut h = harness();
        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);
        add_local(&mut h, "music", &FakeTrack::audio());
        let mic_id: TrackId = "mic".into();

        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&mic_id, Box::new(mixer)).unwrap();
        assert_eq!(h.manager.running_effect(&mic_id), Some(EffectKind::AudioMixer));
        assert_ne!(mic.outgoing(), mic.source_stream());

        let result = h.manager.handle_event(EngineEvent::TrackRemoved {
            track_id: "music".into(),
        });

        assert!(matches!(result, Err(MediaError::EffectTerminated { .. })));
        assert_eq!(h.manager.running_effect(&mic_id), None);
        assert!(h.manager.get_track(&mic_id).unwrap().effects_chain.is_empty());
        assert_eq!(mic.outgoing(), mic.source_stream());
        assert_eq!(
            h.notifier.raised()[0].kind,
            NotificationKind::EffectTerminated {
                effect: EffectKind::AudioMixer
            }
        );
    }

    #[test]
    fn stopped_source_ends_track_and_dependent_effects() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());
        add_local(&mut h, "music", &FakeTrack::audio());
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&"mic".into(), Box::new(mixer)).unwrap();

        let result = h.manager.handle_event(EngineEvent::TrackStopped {
            track_id: "music".into(),
        });

        assert!(result.is_err());
        assert!(h.manager.get_track(&"music".into()).unwrap().ended);
        assert_eq!(h.manager.running_effect(&"mic".into()), None);
    }

    #[test]
    fn stopped_primary_terminates_its_mixer() {
        let mut h = harness();
        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);
        add_local(&mut h, "music", &FakeTrack::audio());
        let mic_id: TrackId = "mic".into();
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&mic_id, Box::new(mixer)).unwrap();

        mic.set_live(false);
        let result = h.manager.handle_event(EngineEvent::TrackStopped { track_id: mic_id.clone() });

        assert!(matches!(result, Err(MediaError::EffectTerminated { .. })));
        assert_eq!(h.manager.running_effect(&mic_id), None);
        assert!(h.manager.get_track(&mic_id).unwrap().effects_chain.is_empty());
        assert_eq!(mic.outgoing(), mic.source_stream());
        assert_eq!(h.notifier.raised().len(), 1);
    }

    #[test]
    fn health_check_catches_dead_primary() {
        let mut h = harness();
        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);
        add_local(&mut h, "music", &FakeTrack::audio());
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&"mic".into(), Box::new(mixer)).unwrap();

        mic.set_live(false);
        let terminated = h.manager.check_effects();

        assert_eq!(terminated.len(), 1);
        assert_eq!(h.manager.running_effect(&"mic".into()), None);
    }

    #[test]
    fn detach_while_effect_muted_restores_enabled_source() {
        let mut h = harness();
        let mic = FakeTrack::audio();
        add_local(&mut h, "mic", &mic);
        add_local(&mut h, "music", &FakeTrack::audio());
        let mic_id: TrackId = "mic".into();
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&mic_id, Box::new(mixer)).unwrap();
        h.manager.set_effect_muted(&mic_id, true);
        assert!(!mic.source_stream().is_enabled());

        assert!(h.manager.detach_effect(&mic_id));

        assert!(!h.manager.get_track(&mic_id).unwrap().muted);
        assert_eq!(mic.outgoing(), mic.source_stream());
        assert!(mic.outgoing().is_enabled());
    }

    #[test]
    fn health_check_terminates_failed_mixer() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());
        add_local(&mut h, "music", &FakeTrack::audio());
        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&"mic".into(), Box::new(mixer)).unwrap();
        assert!(h.manager.check_effects().is_empty());

        h.engine.probe.fail_with("graph underrun");
        let terminated = h.manager.check_effects();

        assert_eq!(terminated.len(), 1);
        assert_eq!(h.manager.running_effect(&"mic".into()), None);
    }

    #[test]
    fn effect_mute_forwards_to_mixer() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());
        add_local(&mut h, "music", &FakeTrack::audio());
        let mic: TrackId = "mic".into();
        assert!(!h.manager.set_effect_muted(&mic, true));

        let mixer = h.manager.create_audio_mixer(&"music".into()).unwrap();
        h.manager.attach_effect(&mic, Box::new(mixer)).unwrap();

        assert!(h.manager.set_effect_muted(&mic, true));
        assert_eq!(h.manager.is_effect_muted(&mic), Some(true));
        assert!(!h.manager.get_track(&mic).unwrap().muted);
    }

    #[test]
    fn remote_state_is_mirrored() {
        let mut h = harness();
        let mut info = TrackInfo::remote("r1", "alice", MediaType::Video);
        info.video_type = Some(VideoType::Desktop);
        h.manager.handle_event(added(info, FakeTrack::video().handle())).unwrap();
        let r1: TrackId = "r1".into();

        h.manager
            .handle_event(EngineEvent::TrackStreamingStatusChanged {
                track_id: r1.clone(),
                status: StreamingStatus::Interrupted,
            })
            .unwrap();
        h.manager
            .handle_event(EngineEvent::TrackUpdated {
                track_id: r1.clone(),
                update: TrackUpdate::muted(true),
            })
            .unwrap();

        assert_eq!(h.manager.streaming_status(&r1), Some(StreamingStatus::Interrupted));
        let track = h.manager.get_track(&r1).unwrap();
        assert!(track.muted);
        assert!(track.is_desktop());
        assert_eq!(h.manager.list_tracks(&TrackFilter::participant("alice")).len(), 1);
    }

    #[test]
    fn audio_level_is_clamped() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());

        h.manager
            .handle_event(EngineEvent::TrackAudioLevelChanged {
                track_id: "mic".into(),
                level: 1.7,
            })
            .unwrap();

        assert_eq!(h.manager.get_track(&"mic".into()).unwrap().audio_level, 1.0);
    }

    #[test]
    fn subscriptions_end_with_the_track() {
        let mut h = harness();
        add_local(&mut h, "mic", &FakeTrack::audio());
        let mic: TrackId = "mic".into();
        let updates = Arc::new(AtomicUsize::new(0));
        let removed = Arc::new(Mutex::new(Vec::new()));

        let subscription = {
            let updates = updates.clone();
            let removed = removed.clone();
            h.manager
                .subscribe(&mic, move |change| match change {
                    TrackChange::Updated(_) => {
                        updates.fetch_add(1, Ordering::SeqCst);
                    }
                    TrackChange::Removed(id) => removed.lock().push(id.clone()),
                })
                .unwrap()
        };

        h.manager.set_muted(None, MediaType::Audio, true, false).unwrap();
        h.manager
            .handle_event(EngineEvent::TrackRemoved { track_id: mic.clone() })
            .unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(*removed.lock(), vec![mic.clone()]);
        assert!(!subscription.is_active());
        assert_eq!(h.manager.registry().subscription_count(&mic), 0);
    }
}
