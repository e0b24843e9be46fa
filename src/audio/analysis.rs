use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::features::{ChannelFrequencyBuffer, WaveformAnalysisResult};
use super::pcm::PcmBuffer;
use super::quantize::{quantize, ChannelDbRange};
use crate::config::AnalysisConfig;
use crate::error::{Result, SpectrogramError};

/// Level reported for bins with no energy, so silence stays finite through smoothing.
/// Lowered to the channel's `min_decibels` when that sits below it.
pub const MAGNITUDE_FLOOR_DB: f32 = -200.0;

/// Analyze every channel of `pcm`. See [`analyze_with_progress`].
pub fn analyze(pcm: &PcmBuffer, config: &AnalysisConfig) -> Result<WaveformAnalysisResult> {
    analyze_with_progress(pcm, config, |_| {})
}

/// Run the block-wise spectral analysis over all channels.
///
/// Channels run on the rayon pool, each with its own smoothing state and
/// output buffer; blocks run in order within a channel. `on_channel_done`
/// receives the index of each channel as it finishes. Either every channel
/// completes or the first error is returned.
pub fn analyze_with_progress<F>(
    pcm: &PcmBuffer,
    config: &AnalysisConfig,
    on_channel_done: F,
) -> Result<WaveformAnalysisResult>
where
    F: Fn(usize) + Sync,
{
    config.validate()?;
    let db_ranges = config.db_ranges(pcm.channel_count())?;

    let stride = config.stride();
    let tick_count = config.tick_count(pcm.len());
    log::info!(
        "Analyzing {} channel(s): {} ticks x {} bins (fft={}, hop={}, smoothing={:.2}, window={:?})",
        pcm.channel_count(),
        tick_count,
        stride,
        config.fft_resolution,
        config.processor_buffer_size,
        config.smoothing_time_constant,
        config.window
    );

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(config.fft_resolution);
    let window = config.window.coefficients(config.fft_resolution);

    let channels = pcm
        .channels()
        .par_iter()
        .zip(db_ranges.par_iter())
        .enumerate()
        .map(|(idx, (samples, range))| {
            let mut analyzer = ChannelAnalyzer::new(
                Arc::clone(&fft),
                &window,
                config.smoothing_time_constant,
                *range,
            );
            let buffer = analyzer.run(samples, config.processor_buffer_size, tick_count)?;
            log::debug!(
                "Channel {}: {} bytes, mean intensity {:.1}",
                idx,
                buffer.len(),
                buffer.mean_intensity()
            );
            on_channel_done(idx);
            Ok(buffer)
        })
        .collect::<Result<Vec<_>>>()?;

    let result = WaveformAnalysisResult::assemble(pcm, config, channels, db_ranges)?;
    log::info!(
        "Analysis complete: {:.2}s of audio, max frequency {:.0} Hz",
        result.duration,
        result.max_freq
    );
    Ok(result)
}

/// Per-bin exponential smoothing carried from block to block.
#[derive(Clone, Debug)]
pub struct SmoothingState {
    time_constant: f32,
    values: Vec<f32>,
    primed: bool,
}

impl SmoothingState {
    pub fn new(bins: usize, time_constant: f32) -> Self {
        Self {
            time_constant,
            values: vec![0.0; bins],
            primed: false,
        }
    }

    /// Fold one block of dB values into the state and return the smoothed block.
    /// The first block passes through unchanged.
    pub fn apply(&mut self, current: &[f32]) -> &[f32] {
        debug_assert_eq!(current.len(), self.values.len());
        if self.primed {
            let tc = self.time_constant;
            for (state, &cur) in self.values.iter_mut().zip(current) {
                *state = tc * *state + (1.0 - tc) * cur;
            }
        } else {
            self.values.copy_from_slice(current);
            self.primed = true;
        }
        &self.values
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Spectral analysis of one channel, block after block.
struct ChannelAnalyzer<'a> {
    fft: Arc<dyn Fft<f32>>,
    window: &'a [f32],
    range: ChannelDbRange,
    smoothing: SmoothingState,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    decibels: Vec<f32>,
}

impl<'a> ChannelAnalyzer<'a> {
    fn new(
        fft: Arc<dyn Fft<f32>>,
        window: &'a [f32],
        smoothing_time_constant: f32,
        range: ChannelDbRange,
    ) -> Self {
        let size = window.len();
        let bins = size / 2;
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            window,
            range,
            smoothing: SmoothingState::new(bins, smoothing_time_constant),
            spectrum: vec![Complex::new(0.0, 0.0); size],
            scratch,
            decibels: vec![0.0; bins],
        }
    }

    fn run(&mut self, samples: &[f32], hop: usize, tick_count: usize) -> Result<ChannelFrequencyBuffer> {
        let stride = self.decibels.len();
        let len = tick_count
            .checked_mul(stride)
            .ok_or_else(|| SpectrogramError::Processing("output size overflows usize".into()))?;

        let mut out = Vec::new();
        out.try_reserve_exact(len).map_err(|e| {
            SpectrogramError::Processing(format!("cannot allocate {} byte channel buffer: {}", len, e))
        })?;
        out.resize(len, 0u8);

        for (block, chunk) in out.chunks_exact_mut(stride).enumerate() {
            self.analyze_block(samples, (block + 1).saturating_mul(hop), chunk);
        }

        Ok(ChannelFrequencyBuffer::new(out))
    }

    /// Spectrum of the `fft_resolution` samples ending at `end`, smoothed and
    /// quantized into `out`. Positions outside the signal read as zero.
    fn analyze_block(&mut self, samples: &[f32], end: usize, out: &mut [u8]) {
        let size = self.spectrum.len();
        for (i, (slot, &w)) in self.spectrum.iter_mut().zip(self.window).enumerate() {
            let sample = end
                .saturating_add(i)
                .checked_sub(size)
                .and_then(|pos| samples.get(pos))
                .copied()
                .unwrap_or(0.0);
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let norm = 1.0 / size as f32;
        let floor = MAGNITUDE_FLOOR_DB.min(self.range.min_decibels);
        for (db, bin) in self.decibels.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() * norm;
            *db = (20.0 * magnitude.log10()).max(floor);
        }

        let smoothed = self.smoothing.apply(&self.decibels);
        for (byte, &db) in out.iter_mut().zip(smoothed) {
            *byte = quantize(db, &self.range);
        }
    }
}
