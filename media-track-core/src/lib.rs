//! # media-track-core
//!
//! Lifecycle management for local and remote media tracks of a conferencing
//! client: registry, mute intent reconciliation, no-data detection and
//! processing effects on outgoing audio.
//!
//! The conferencing engine (transport, signaling, capture devices) plugs in
//! through the `ConferenceEngine` and `NativeTrack` traits; UI notifications
//! go out through `NotificationSink`.
//!
//! ## Architecture
//!
//! ```text
//! media-track-core (this crate)
//! ├── traits/       ← ConferenceEngine, NativeTrack, MixerGraph, StreamEffect, NotificationSink, RegistryObserver
//! ├── models/       ← Track, TrackPatch, EngineEvent, TrackUpdate, MediaError, MediaConfig, Notification, MediaStream
//! ├── registry/     ← TrackRegistry, Subscription
//! ├── session/      ← TrackManager, LivenessMonitor, EffectPipeline, MuteController, EventLoop, timers
//! ├── effects/      ← AudioMixerEffect
//! ├── processing/   ← SoftwareMixerGraph, SampleMixer, RingBuffer
//! └── inspection    ← mute shortcuts and JSON snapshots for test harnesses
//! ```

pub mod effects;
pub mod inspection;
pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use effects::audio_mixer::AudioMixerEffect;
pub use models::config::MediaConfig;
pub use models::effect_state::EffectState;
pub use models::error::{DeviceError, MediaError};
pub use models::event::{EngineEvent, TrackUpdate};
pub use models::media_stream::MediaStream;
pub use models::notification::{Notification, NotificationId, NotificationKind};
pub use models::track::{
    EffectDescriptor, EffectKind, MediaType, NativeHandle, StreamingStatus, Track, TrackFilter, TrackId, TrackInfo,
    TrackPatch, TrackSnapshot, VideoType,
};
pub use processing::software_mixer::{MixLevels, MixerFeeder, SoftwareMixerGraph};
pub use registry::subscription::{Subscription, TrackChange};
pub use registry::TrackRegistry;
pub use session::driver::{EventLoop, EventLoopHandle};
pub use session::liveness::LivenessState;
pub use session::manager::TrackManager;
pub use session::mute::MuteOutcome;
pub use session::pipeline::EffectTermination;
pub use session::timers::{Clock, ManualClock, SystemClock};
pub use traits::effect::StreamEffect;
pub use traits::engine::{ConferenceEngine, LocalTrackRequest};
pub use traits::mixer_graph::MixerGraph;
pub use traits::native_track::NativeTrack;
pub use traits::notifier::NotificationSink;
pub use traits::observer::{NoopObserver, RegistryObserver};
