//! Test doubles for the collaborator traits.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::effect_state::EffectState;
use crate::models::error::{DeviceError, MediaError};
use crate::models::media_stream::MediaStream;
use crate::models::notification::{Notification, NotificationId};
use crate::models::track::{EffectKind, MediaType, NativeHandle, Track, TrackId};
use crate::traits::effect::StreamEffect;
use crate::traits::engine::{ConferenceEngine, LocalTrackRequest};
use crate::traits::mixer_graph::MixerGraph;
use crate::traits::native_track::NativeTrack;
use crate::traits::notifier::NotificationSink;
use crate::traits::observer::RegistryObserver;

pub struct FakeTrack {
    media_type: MediaType,
    source: MediaStream,
    outgoing: Mutex<Option<MediaStream>>,
    enabled: AtomicBool,
    live: AtomicBool,
    fail_enable: AtomicBool,
    pub enable_calls: AtomicUsize,
}

impl FakeTrack {
    pub fn new(media_type: MediaType) -> Arc<Self> {
        Arc::new(Self {
            media_type,
            source: MediaStream::new(media_type),
            outgoing: Mutex::new(None),
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
            fail_enable: AtomicBool::new(false),
            enable_calls: AtomicUsize::new(0),
        })
    }

    pub fn audio() -> Arc<Self> {
        Self::new(MediaType::Audio)
    }

    pub fn video() -> Arc<Self> {
        Self::new(MediaType::Video)
    }

    pub fn handle(self: &Arc<Self>) -> NativeHandle {
        NativeHandle::new(self.clone())
    }

    /// What the track currently transmits.
    pub fn outgoing(&self) -> MediaStream {
        self.outgoing.lock().clone().unwrap_or_else(|| self.source.clone())
    }

    pub fn fail_enable(&self, fail: bool) {
        self.fail_enable.store(fail, Ordering::SeqCst);
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    pub fn enable_calls(&self) -> usize {
        self.enable_calls.load(Ordering::SeqCst)
    }
}

impl NativeTrack for FakeTrack {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn source_stream(&self) -> MediaStream {
        self.source.clone()
    }

    fn set_outgoing_stream(&self, stream: Option<MediaStream>) -> Result<(), DeviceError> {
        *self.outgoing.lock() = stream;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), DeviceError> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_enable.load(Ordering::SeqCst) {
            return Err(DeviceError::Rejected("device busy".into()));
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Shared view into every graph a `FakeEngine` hands out.
#[derive(Default)]
pub struct GraphProbe {
    pub graphs_created: AtomicUsize,
    pub starts: AtomicUsize,
    pub resets: AtomicUsize,
    pub fail_start: AtomicBool,
    pub failure: Mutex<Option<String>>,
    inputs: Mutex<Vec<MediaStream>>,
}

impl GraphProbe {
    pub fn inputs(&self) -> Vec<MediaStream> {
        self.inputs.lock().clone()
    }

    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock() = Some(reason.to_string());
    }
}

pub struct FakeGraph {
    probe: Arc<GraphProbe>,
    running: bool,
}

impl MixerGraph for FakeGraph {
    fn add_input(&mut self, stream: MediaStream) -> Result<(), MediaError> {
        self.probe.inputs.lock().push(stream);
        Ok(())
    }

    fn start(&mut self) -> Result<MediaStream, MediaError> {
        if self.probe.fail_start.load(Ordering::SeqCst) {
            return Err(MediaError::InvalidEffectInput("graph refused to start".into()));
        }
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.running = true;
        Ok(MediaStream::new(MediaType::Audio))
    }

    fn reset(&mut self) {
        self.probe.resets.fetch_add(1, Ordering::SeqCst);
        self.probe.inputs.lock().clear();
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn failure(&self) -> Option<String> {
        self.probe.failure.lock().clone()
    }
}

#[derive(Default)]
pub struct FakeEngine {
    pub probe: Arc<GraphProbe>,
    pub create_requests: Mutex<Vec<LocalTrackRequest>>,
    pub video_mutes: Mutex<Vec<(TrackId, bool)>>,
    pub fail_create: AtomicBool,
    pub fail_video_mute: AtomicBool,
}

impl FakeEngine {
    pub fn create_count(&self) -> usize {
        self.create_requests.lock().len()
    }

    pub fn video_mutes(&self) -> Vec<(TrackId, bool)> {
        self.video_mutes.lock().clone()
    }
}

impl ConferenceEngine for FakeEngine {
    fn create_local_tracks(&self, request: &LocalTrackRequest) -> Result<(), DeviceError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied);
        }
        self.create_requests.lock().push(request.clone());
        Ok(())
    }

    fn create_audio_mixer_graph(&self) -> Result<Box<dyn MixerGraph>, MediaError> {
        self.probe.graphs_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeGraph {
            probe: Arc::clone(&self.probe),
            running: false,
        }))
    }

    fn set_video_muted(&self, track_id: &TrackId, muted: bool) -> Result<(), DeviceError> {
        if self.fail_video_mute.load(Ordering::SeqCst) {
            return Err(DeviceError::NotAvailable);
        }
        self.video_mutes.lock().push((track_id.clone(), muted));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    raised: Mutex<Vec<Notification>>,
    dismissed: Mutex<Vec<NotificationId>>,
}

impl RecordingNotifier {
    pub fn raised(&self) -> Vec<Notification> {
        self.raised.lock().clone()
    }

    pub fn dismissed(&self) -> Vec<NotificationId> {
        self.dismissed.lock().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn raise(&self, notification: &Notification) {
        self.raised.lock().push(notification.clone());
    }

    fn dismiss(&self, id: NotificationId) {
        self.dismissed.lock().push(id);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    added: AtomicUsize,
    updated: AtomicUsize,
    removed: AtomicUsize,
}

impl RecordingObserver {
    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

impl RegistryObserver for RecordingObserver {
    fn on_track_added(&self, _track: &Track) {
        self.added.fetch_add(1, Ordering::SeqCst);
    }

    fn on_track_updated(&self, _track: &Track) {
        self.updated.fetch_add(1, Ordering::SeqCst);
    }

    fn on_track_removed(&self, _track: &Track) {
        self.removed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Ordered log of effect transitions shared by several `CountingEffect`s.
#[derive(Default)]
pub struct EffectProbe {
    pub events: Mutex<Vec<String>>,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl EffectProbe {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// Effect that records every start and stop.
pub struct CountingEffect {
    pub name: &'static str,
    probe: Arc<EffectProbe>,
    state: EffectState,
    muted: bool,
    pub applicable: bool,
    pub fail_start: bool,
    pub depends_on: Option<TrackId>,
    pub unhealthy: Arc<Mutex<Option<String>>>,
}

impl CountingEffect {
    pub fn new(name: &'static str, probe: &Arc<EffectProbe>) -> Self {
        Self {
            name,
            probe: Arc::clone(probe),
            state: EffectState::Idle,
            muted: false,
            applicable: true,
            fail_start: false,
            depends_on: None,
            unhealthy: Arc::new(Mutex::new(None)),
        }
    }
}

impl StreamEffect for CountingEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::Custom("counting".into())
    }

    fn state(&self) -> EffectState {
        self.state
    }

    fn is_enabled(&self, _track: &Track) -> bool {
        self.applicable
    }

    fn start(&mut self, input: MediaStream) -> Result<MediaStream, MediaError> {
        if self.fail_start {
            return Err(MediaError::EffectStartFailed {
                kind: self.kind(),
                reason: "camera busy".into(),
            });
        }
        if !self.state.can_start() {
            return Err(MediaError::EffectStartFailed {
                kind: self.kind(),
                reason: "already running".into(),
            });
        }
        self.state = EffectState::Running;
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.probe.events.lock().push(format!("start:{}", self.name));
        Ok(MediaStream::with_id(format!("{}-out", self.name), input.media_type()))
    }

    fn stop(&mut self) {
        if self.state.is_running() {
            self.state = EffectState::Stopped;
            self.probe.stops.fetch_add(1, Ordering::SeqCst);
            self.probe.events.lock().push(format!("stop:{}", self.name));
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn depends_on(&self, track_id: &TrackId) -> bool {
        self.depends_on.as_ref() == Some(track_id)
    }

    fn health(&self) -> Result<(), String> {
        match self.unhealthy.lock().clone() {
            Some(reason) if self.state.is_running() => Err(reason),
            _ => Ok(()),
        }
    }
}
