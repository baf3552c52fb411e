/// Pure-math helpers for mixing mono f32 audio.
///
/// All operations work on `&[f32]` buffers normalized to `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SampleMixer {
    pub sample_rate: f64,
}

impl SampleMixer {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    /// Add `input` into `acc` sample by sample. Extra input samples are ignored.
    pub fn accumulate(acc: &mut [f32], input: &[f32]) {
        for (a, s) in acc.iter_mut().zip(input) {
            *a += *s;
        }
    }

    /// Clamp a summed buffer back into the normalized range.
    pub fn clamp(samples: &mut [f32]) {
        for s in samples.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    /// Linear-interpolation resample from `source_rate` to the mixer rate.
    /// Returns the input unchanged when rates match.
    pub fn resample(&self, samples: &[f32], source_rate: f64) -> Vec<f32> {
        if samples.is_empty() || source_rate <= 0.0 || (source_rate - self.sample_rate).abs() < 0.01 {
            return samples.to_vec();
        }

        let step = source_rate / self.sample_rate;
        let out_len = (samples.len() as f64 / step) as usize;
        let last = samples.len() - 1;

        (0..out_len)
            .map(|i| {
                let pos = i as f64 * step;
                let idx = pos as usize;
                if idx >= last {
                    return samples[last];
                }
                let frac = (pos - idx as f64) as f32;
                samples[idx] + (samples[idx + 1] - samples[idx]) * frac
            })
            .collect()
    }

    pub fn rms_level(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let energy: f32 = samples.iter().map(|s| s * s).sum();
        (energy / samples.len() as f32).sqrt()
    }

    pub fn peak_level(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}
