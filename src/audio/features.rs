use serde::Serialize;

use super::pcm::PcmBuffer;
use super::quantize::ChannelDbRange;
use super::remap::{remap, SpectrogramMatrix};
use crate::config::AnalysisConfig;
use crate::error::{Result, SpectrogramError};

/// Quantized intensities of one channel, block-major / bin-minor:
/// byte `block * stride + bin` is bin `bin` at tick `block`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChannelFrequencyBuffer(Vec<u8>);

impl ChannelFrequencyBuffer {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Intensities of one tick, `stride` bytes long.
    pub fn block(&self, tick: usize, stride: usize) -> Option<&[u8]> {
        let start = tick.checked_mul(stride)?;
        self.0.get(start..start.checked_add(stride)?)
    }

    pub fn mean_intensity(&self) -> f32 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.iter().map(|&b| b as f64).sum::<f64>() as f32 / self.0.len() as f32
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

/// Everything a renderer needs to draw one heatmap per channel.
#[derive(Clone, Debug, Serialize)]
pub struct WaveformAnalysisResult {
    pub channels: Vec<ChannelFrequencyBuffer>,
    pub channel_db_ranges: Vec<ChannelDbRange>,
    /// Bins per tick, `fft_resolution / 2`.
    pub stride: usize,
    pub tick_count: usize,
    /// Nyquist frequency in Hz.
    pub max_freq: f32,
    /// Seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub processor_buffer_size: usize,
}

impl WaveformAnalysisResult {
    /// Package finished channel buffers with their metadata.
    ///
    /// Every buffer must hold exactly `tick_count * stride` bytes and there must
    /// be one dB range per channel.
    pub fn assemble(
        pcm: &PcmBuffer,
        config: &AnalysisConfig,
        channels: Vec<ChannelFrequencyBuffer>,
        channel_db_ranges: Vec<ChannelDbRange>,
    ) -> Result<Self> {
        let stride = config.stride();
        let tick_count = config.tick_count(pcm.len());
        let expected = tick_count
            .checked_mul(stride)
            .ok_or_else(|| SpectrogramError::Processing("buffer size overflows usize".into()))?;

        if channels.len() != pcm.channel_count() || channel_db_ranges.len() != channels.len() {
            return Err(SpectrogramError::Processing(format!(
                "{} buffers and {} dB ranges for {} channels",
                channels.len(),
                channel_db_ranges.len(),
                pcm.channel_count()
            )));
        }
        if let Some((idx, buf)) = channels.iter().enumerate().find(|(_, b)| b.len() != expected) {
            return Err(SpectrogramError::Processing(format!(
                "channel {} buffer holds {} bytes, expected {}",
                idx,
                buf.len(),
                expected
            )));
        }

        Ok(Self {
            channels,
            channel_db_ranges,
            stride,
            tick_count,
            max_freq: pcm.sample_rate() as f32 / 2.0,
            duration: pcm.duration(),
            sample_rate: pcm.sample_rate(),
            processor_buffer_size: config.processor_buffer_size,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Row-major (bin × tick) matrix of one channel.
    pub fn matrix(&self, channel: usize) -> Result<SpectrogramMatrix> {
        let buffer = self.channels.get(channel).ok_or_else(|| {
            SpectrogramError::Processing(format!(
                "channel {} out of range ({} channels)",
                channel,
                self.channels.len()
            ))
        })?;
        remap(buffer.as_slice(), self.stride, self.tick_count)
    }

    /// Lower edge of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.max_freq / self.stride as f32
    }

    /// Start of `tick` in seconds.
    pub fn tick_time(&self, tick: usize) -> f64 {
        tick as f64 * self.processor_buffer_size as f64 / self.sample_rate as f64
    }

    /// Average level of a channel, converted back to dB.
    pub fn mean_decibels(&self, channel: usize) -> Option<f32> {
        let buffer = self.channels.get(channel)?;
        let range = self.channel_db_ranges.get(channel)?;
        let mean = buffer.mean_intensity();
        Some(range.min_decibels + mean / 255.0 * range.span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(len: usize, channels: usize) -> PcmBuffer {
        PcmBuffer::new(vec![vec![0.0; len]; channels], 48_000).unwrap()
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            fft_resolution: 64,
            processor_buffer_size: 16,
            ..Default::default()
        }
    }

    #[test]
    fn assembles_metadata() {
        let config = small_config();
        let pcm = pcm(40, 2);
        let buffers = vec![ChannelFrequencyBuffer::new(vec![7; 3 * 32]); 2];
        let result =
            WaveformAnalysisResult::assemble(&pcm, &config, buffers, config.db_ranges(2).unwrap())
                .unwrap();

        assert_eq!(result.stride, 32);
        assert_eq!(result.tick_count, 3);
        assert_eq!(result.max_freq, 24_000.0);
        assert!((result.duration - 40.0 / 48_000.0).abs() < 1e-12);
        assert_eq!(result.channel_count(), 2);
        assert_eq!(result.bin_frequency(16), 12_000.0);
        assert!((result.tick_time(3) - 0.001).abs() < 1e-12);
        assert!(result.tick_time(usize::MAX).is_finite());
        assert!((result.mean_decibels(0).unwrap() - (-100.0 + 7.0 / 255.0 * 70.0)).abs() < 1e-4);
    }

    #[test]
    fn rejects_wrong_buffer_length() {
        let config = small_config();
        let pcm = pcm(40, 1);
        let buffers = vec![ChannelFrequencyBuffer::new(vec![0; 3 * 32 - 1])];
        let result =
            WaveformAnalysisResult::assemble(&pcm, &config, buffers, config.db_ranges(1).unwrap());
        assert!(matches!(result, Err(SpectrogramError::Processing(_))));
    }

    #[test]
    fn rejects_missing_channel() {
        let config = small_config();
        let pcm = pcm(16, 2);
        let buffers = vec![ChannelFrequencyBuffer::new(vec![0; 32])];
        let result =
            WaveformAnalysisResult::assemble(&pcm, &config, buffers, config.db_ranges(1).unwrap());
        assert!(matches!(result, Err(SpectrogramError::Processing(_))));
    }

    #[test]
    fn block_view() {
        let buf = ChannelFrequencyBuffer::new(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(buf.block(1, 2).unwrap(), &[3, 4]);
        assert!(buf.block(3, 2).is_none());
        assert!(buf.block(usize::MAX, 2).is_none());
    }

    #[test]
    fn matrix_for_unknown_channel_fails() {
        let config = small_config();
        let pcm = pcm(16, 1);
        let result = WaveformAnalysisResult::assemble(
            &pcm,
            &config,
            vec![ChannelFrequencyBuffer::new(vec![0; 32])],
            config.db_ranges(1).unwrap(),
        )
        .unwrap();
        assert_eq!(result.matrix(0).unwrap().rows().len(), 32);
        assert!(result.matrix(1).is_err());
    }
}
