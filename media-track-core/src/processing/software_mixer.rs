use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::MediaError;
use crate::models::media_stream::MediaStream;
use crate::models::track::MediaType;
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::sample_mixer::SampleMixer;
use crate::traits::mixer_graph::MixerGraph;

/// Seconds of audio buffered per input before the oldest samples are dropped.
const INPUT_BUFFER_SECS: f64 = 2.0;

/// Output level of the last pulled block (0.0–1.0).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixLevels {
    pub rms: f32,
    pub peak: f32,
}

struct MixerInput {
    stream: MediaStream,
    buffer: RingBuffer,
}

struct GraphState {
    mixer: SampleMixer,
    inputs: Vec<MixerInput>,
    output: Option<MediaStream>,
    failure: Option<String>,
    levels: MixLevels,
}

/// In-process `MixerGraph` for engines without a native mixer.
///
/// ```text
/// [capture A] → feeder.push → [RingBuffer A] ─┐
///                                             ├→ sum enabled inputs → clamp → pull()
/// [capture B] → feeder.push → [RingBuffer B] ─┘
/// ```
/// Inputs whose stream is disabled are drained but not summed, which is how
/// an effect mutes one side of the mix.
pub struct SoftwareMixerGraph {
    state: Arc<Mutex<GraphState>>,
}

/// Producer side of a `SoftwareMixerGraph`, safe to move to capture threads.
#[derive(Clone)]
pub struct MixerFeeder {
    state: Arc<Mutex<GraphState>>,
}

impl SoftwareMixerGraph {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(GraphState {
                mixer: SampleMixer::new(sample_rate),
                inputs: Vec::new(),
                output: None,
                failure: None,
                levels: MixLevels::default(),
            })),
        }
    }

    pub fn feeder(&self) -> MixerFeeder {
        MixerFeeder {
            state: Arc::clone(&self.state),
        }
    }

    /// Mix the next `frames` samples. Returns an empty block while the graph
    /// is not running, and silence while the output stream is disabled.
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        let mut state = self.state.lock();
        let output_enabled = match (&state.output, &state.failure) {
            (Some(output), None) => output.is_enabled(),
            _ => return Vec::new(),
        };

        let mut mixed = vec![0.0f32; frames];
        let mut scratch = vec![0.0f32; frames];
        for input in state.inputs.iter_mut() {
            if !input.stream.is_enabled() {
                input.buffer.skip(frames);
                continue;
            }
            scratch.fill(0.0);
            let read = input.buffer.pop_into(&mut scratch);
            SampleMixer::accumulate(&mut mixed[..read], &scratch[..read]);
        }
        SampleMixer::clamp(&mut mixed);
        if !output_enabled {
            mixed.fill(0.0);
        }

        state.levels = MixLevels {
            rms: SampleMixer::rms_level(&mixed),
            peak: SampleMixer::peak_level(&mixed),
        };
        mixed
    }

    pub fn levels(&self) -> MixLevels {
        self.state.lock().levels
    }

    pub fn input_count(&self) -> usize {
        self.state.lock().inputs.len()
    }
}

impl MixerFeeder {
    /// Deliver captured samples for the input carrying `stream_id`.
    pub fn push(&self, stream_id: &str, samples: &[f32], sample_rate: f64) {
        let mut state = self.state.lock();
        let resampled = state.mixer.resample(samples, sample_rate);
        if let Some(input) = state.inputs.iter_mut().find(|i| i.stream.id() == stream_id) {
            input.buffer.push(&resampled);
        }
    }

    /// Report that the device behind `stream_id` went away.
    pub fn mark_lost(&self, stream_id: &str) {
        let mut state = self.state.lock();
        if state.inputs.iter().any(|i| i.stream.id() == stream_id) && state.failure.is_none() {
            log::error!("Mixer input {} lost", stream_id);
            state.failure = Some(format!("input {} lost", stream_id));
        }
    }
}

impl MixerGraph for SoftwareMixerGraph {
    fn add_input(&mut self, stream: MediaStream) -> Result<(), MediaError> {
        let mut state = self.state.lock();
        if state.output.is_some() {
            return Err(MediaError::InvalidEffectInput("mixer graph already started".into()));
        }
        if stream.media_type() != MediaType::Audio {
            return Err(MediaError::InvalidEffectInput(format!(
                "stream {} is not audio",
                stream.id()
            )));
        }
        let capacity = (state.mixer.sample_rate * INPUT_BUFFER_SECS) as usize;
        state.inputs.push(MixerInput {
            stream,
            buffer: RingBuffer::new(capacity),
        });
        Ok(())
    }

    fn start(&mut self) -> Result<MediaStream, MediaError> {
        let mut state = self.state.lock();
        if state.output.is_some() {
            return Err(MediaError::InvalidEffectInput("mixer graph already started".into()));
        }
        if state.inputs.is_empty() {
            return Err(MediaError::InvalidEffectInput("mixer graph has no inputs".into()));
        }
        let output = MediaStream::new(MediaType::Audio);
        state.output = Some(output.clone());
        Ok(output)
    }

    fn reset(&mut self) {
        let mut state = self.state.lock();
        state.inputs.clear();
        state.output = None;
        state.failure = None;
        state.levels = MixLevels::default();
    }

    fn is_running(&self) -> bool {
        let state = self.state.lock();
        state.output.is_some() && state.failure.is_none()
    }

    fn failure(&self) -> Option<String> {
        self.state.lock().failure.clone()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn started_graph() -> (SoftwareMixerGraph, MediaStream, MediaStream, MediaStream) {
        let mut graph = SoftwareMixerGraph::new(48000.0);
        let mic = MediaStream::with_id("mic", MediaType::Audio);
        let music = MediaStream::with_id("music", MediaType::Audio);
        graph.add_input(music.clone()).unwrap();
        graph.add_input(mic.clone()).unwrap();
        let output = graph.start().unwrap();
        (graph, mic, music, output)
    }

    #[test]
    fn mixes_enabled_inputs() {
        let (graph, _, _, _) = started_graph();
        let feeder = graph.feeder();
        feeder.push("mic", &[0.25, 0.25], 48000.0);
        feeder.push("music", &[0.5, -0.5], 48000.0);

        let out = graph.pull(2);
        assert_relative_eq!(out[0], 0.75);
        assert_relative_eq!(out[1], -0.25);
    }

    #[test]
    fn disabled_input_is_drained_not_summed() {
        let (graph, mic, _, _) = started_graph();
        let feeder = graph.feeder();
        feeder.push("mic", &[0.25, 0.25], 48000.0);
        feeder.push("music", &[0.5, 0.5], 48000.0);

        mic.set_enabled(false);
        let out = graph.pull(2);
        assert_relative_eq!(out[0], 0.5);

        mic.set_enabled(true);
        feeder.push("music", &[0.1], 48000.0);
        let out = graph.pull(1);
        assert_relative_eq!(out[0], 0.1);
    }

    #[test]
    fn underrun_pads_with_silence_and_sum_is_clamped() {
        let (graph, _, _, _) = started_graph();
        let feeder = graph.feeder();
        feeder.push("mic", &[0.9], 48000.0);
        feeder.push("music", &[0.9], 48000.0);

        let out = graph.pull(3);
        assert_eq!(out, vec![1.0, 0.0, 0.0]);
        assert_relative_eq!(graph.levels().peak, 1.0);
    }

    #[test]
    fn lost_input_fails_the_graph() {
        let (mut graph, _, _, _) = started_graph();
        graph.feeder().mark_lost("music");

        assert!(!graph.is_running());
        assert!(graph.failure().unwrap().contains("music"));
        assert!(graph.pull(4).is_empty());

        graph.reset();
        assert!(graph.failure().is_none());
        assert_eq!(graph.input_count(), 0);
    }

    #[test]
    fn rejects_video_input_and_double_start() {
        let mut graph = SoftwareMixerGraph::new(48000.0);
        assert!(graph.add_input(MediaStream::new(MediaType::Video)).is_err());
        assert!(graph.start().is_err());

        graph.add_input(MediaStream::new(MediaType::Audio)).unwrap();
        graph.start().unwrap();
        assert!(graph.start().is_err());
        assert!(graph.add_input(MediaStream::new(MediaType::Audio)).is_err());
    }

    #[test]
    fn disabled_output_pulls_silence() {
        let (graph, _, _, output) = started_graph();
        graph.feeder().push("mic", &[0.4], 48000.0);
        output.set_enabled(false);

        assert_eq!(graph.pull(1), vec![0.0]);
    }
}
