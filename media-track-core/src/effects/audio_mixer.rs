use std::sync::Arc;

use crate::models::effect_state::EffectState;
use crate::models::error::MediaError;
use crate::models::media_stream::MediaStream;
use crate::models::track::{EffectKind, MediaType, NativeHandle, Track, TrackId};
use crate::traits::effect::StreamEffect;
use crate::traits::engine::ConferenceEngine;
use crate::traits::mixer_graph::MixerGraph;

/// Mixes a secondary local audio track into the outgoing signal of the track
/// it is attached to.
///
/// The secondary track is fixed at construction; the primary signal is
/// handed over by the pipeline on `start`. Effect-level mute silences the
/// primary input inside the mix and leaves the secondary source alone.
pub struct AudioMixerEffect {
    secondary_id: TrackId,
    secondary: NativeHandle,
    engine: Arc<dyn ConferenceEngine>,
    graph: Option<Box<dyn MixerGraph>>,
    primary_input: Option<MediaStream>,
    muted: bool,
    state: EffectState,
}

impl AudioMixerEffect {
    /// Fails without creating anything unless `secondary` is a materialized audio track.
    pub fn new(secondary: &Track, engine: Arc<dyn ConferenceEngine>) -> Result<Self, MediaError> {
        if secondary.media_type != MediaType::Audio {
            return Err(MediaError::InvalidEffectInput(format!(
                "audio mixer needs an audio track, {} is {}",
                secondary.id, secondary.media_type
            )));
        }
        let native = secondary
            .native
            .clone()
            .ok_or_else(|| MediaError::TrackPending(secondary.id.clone()))?;

        Ok(Self {
            secondary_id: secondary.id.clone(),
            secondary: native,
            engine,
            graph: None,
            primary_input: None,
            muted: false,
            state: EffectState::Idle,
        })
    }

    pub fn secondary_track(&self) -> &TrackId {
        &self.secondary_id
    }

    fn start_failed(&self, reason: impl ToString) -> MediaError {
        MediaError::EffectStartFailed {
            kind: EffectKind::AudioMixer,
            reason: reason.to_string(),
        }
    }

    fn build_graph(&self, primary: &MediaStream) -> Result<(Box<dyn MixerGraph>, MediaStream), MediaError> {
        let mut graph = self
            .engine
            .create_audio_mixer_graph()
            .map_err(|e| self.start_failed(e))?;

        match wire(graph.as_mut(), &self.secondary, primary) {
            Ok(mixed) => Ok((graph, mixed)),
            Err(e) => {
                graph.reset();
                Err(self.start_failed(e))
            }
        }
    }
}

fn wire(graph: &mut dyn MixerGraph, secondary: &NativeHandle, primary: &MediaStream) -> Result<MediaStream, MediaError> {
    graph.add_input(secondary.source_stream())?;
    graph.add_input(primary.clone())?;
    graph.start()
}

impl StreamEffect for AudioMixerEffect {
    fn kind(&self) -> EffectKind {
        EffectKind::AudioMixer
    }

    fn state(&self) -> EffectState {
        self.state
    }

    fn is_enabled(&self, track: &Track) -> bool {
        let primary_is_audio = track.media_type == MediaType::Audio
            && track
                .native
                .as_ref()
                .map_or(true, |native| native.media_type() == MediaType::Audio);
        primary_is_audio && self.secondary.media_type() == MediaType::Audio
    }

    fn start(&mut self, input: MediaStream) -> Result<MediaStream, MediaError> {
        if !self.state.can_start() {
            return Err(self.start_failed("mixer already running"));
        }
        if input.media_type() != MediaType::Audio {
            return Err(self.start_failed(format!("primary stream {} is not audio", input.id())));
        }

        let (graph, mixed) = self.build_graph(&input)?;
        input.set_enabled(!self.muted);

        self.graph = Some(graph);
        self.primary_input = Some(input);
        self.state = EffectState::Running;
        log::debug!("Audio mixer started, mixing {} into {}", self.secondary_id, mixed.id());
        Ok(mixed)
    }

    fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }
        if let Some(mut graph) = self.graph.take() {
            graph.reset();
        }
        if let Some(primary) = self.primary_input.take() {
            primary.set_enabled(true);
        }
        self.state = EffectState::Stopped;
        log::debug!("Audio mixer stopped");
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(ref primary) = self.primary_input {
            primary.set_enabled(!muted);
        }
    }

    fn is_muted(&self) -> bool {
        match self.primary_input {
            Some(ref primary) => !primary.is_enabled(),
            None => self.muted,
        }
    }

    fn depends_on(&self, track_id: &TrackId) -> bool {
        self.secondary_id == *track_id
    }

    fn health(&self) -> Result<(), String> {
        if !self.state.is_running() {
            return Ok(());
        }
        if !self.secondary.is_live() {
            return Err(format!("secondary input {} lost", self.secondary_id));
        }
        match self.graph.as_ref().and_then(|graph| graph.failure()) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}
