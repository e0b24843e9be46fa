use crate::error::{Result, SpectrogramError};

/// Fully decoded, deinterleaved audio. Immutable once built.
#[derive(Clone, Debug)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Build a buffer from per-channel sample vectors.
    ///
    /// Rejects zero channels, a zero sample rate, ragged channel lengths and
    /// non-finite samples instead of coercing them.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(SpectrogramError::Decode("PCM buffer has no channels".into()));
        }
        if sample_rate == 0 {
            return Err(SpectrogramError::Decode("PCM buffer has a zero sample rate".into()));
        }

        let len = channels[0].len();
        for (idx, channel) in channels.iter().enumerate() {
            if channel.len() != len {
                return Err(SpectrogramError::Decode(format!(
                    "channel {} has {} samples, expected {}",
                    idx,
                    channel.len(),
                    len
                )));
            }
            if let Some(pos) = channel.iter().position(|s| !s.is_finite()) {
                return Err(SpectrogramError::Decode(format!(
                    "channel {} has a non-finite sample at index {}",
                    idx, pos
                )));
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Split interleaved frames (`L R L R ...`) into channels.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(SpectrogramError::Decode("PCM buffer has no channels".into()));
        }
        if samples.len() % channel_count != 0 {
            return Err(SpectrogramError::Decode(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, idx: usize) -> Option<&[f32]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }
}
