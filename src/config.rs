use serde::Deserialize;
use std::path::Path;

use crate::audio::quantize::{ChannelDbRange, DEFAULT_MAX_DECIBELS, DEFAULT_MIN_DECIBELS};
use crate::error::{Result, SpectrogramError};

pub const MIN_FFT_RESOLUTION: usize = 32;

/// Settings file layout (`spectrograph.toml`).
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of one analysis run. Fixed once the run starts.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    /// FFT size; a power of two, at least 32. Produces `fft_resolution / 2` bins.
    #[serde(default = "default_fft_resolution")]
    pub fft_resolution: usize,
    /// Block-to-block smoothing factor in `[0, 1)`.
    #[serde(default = "default_smoothing_time_constant")]
    pub smoothing_time_constant: f32,
    /// Samples advanced per block (one time tick).
    #[serde(default = "default_processor_buffer_size")]
    pub processor_buffer_size: usize,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
    /// Per-channel overrides of the dB range. Empty means every channel uses
    /// `min_decibels..max_decibels`.
    #[serde(default)]
    pub channels: Vec<ChannelDbRange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub pretty: bool,
    #[serde(default)]
    pub include_matrices: bool,
    #[serde(default)]
    pub lower_half: bool,
}

/// Analysis window applied before the FFT.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Hann,
    Blackman,
    Rectangular,
}

impl WindowKind {
    /// Periodic window of `size` points (phase `2*pi*i/size`).
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size <= 1 {
            return vec![1.0; size];
        }
        match self {
            WindowKind::Rectangular => vec![1.0; size],
            WindowKind::Hann => (0..size)
                .map(|i| {
                    let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                    0.5 * (1.0 - phase.cos())
                })
                .collect(),
            WindowKind::Blackman => (0..size)
                .map(|i| {
                    let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                    0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                })
                .collect(),
        }
    }
}

impl std::str::FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" => Ok(WindowKind::Hann),
            "blackman" => Ok(WindowKind::Blackman),
            "rectangular" | "rect" | "none" => Ok(WindowKind::Rectangular),
            other => Err(format!("unknown window '{}'", other)),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_resolution: default_fft_resolution(),
            smoothing_time_constant: default_smoothing_time_constant(),
            processor_buffer_size: default_processor_buffer_size(),
            window: WindowKind::default(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
            channels: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Frequency bins per block.
    pub fn stride(&self) -> usize {
        self.fft_resolution / 2
    }

    /// Number of blocks needed to cover `len` samples; the last one is zero-padded.
    pub fn tick_count(&self, len: usize) -> usize {
        len.div_ceil(self.processor_buffer_size)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fft_resolution < MIN_FFT_RESOLUTION || !self.fft_resolution.is_power_of_two() {
            return Err(SpectrogramError::Configuration(format!(
                "fft_resolution must be a power of two >= {}, got {}",
                MIN_FFT_RESOLUTION, self.fft_resolution
            )));
        }
        if self.processor_buffer_size == 0 {
            return Err(SpectrogramError::Configuration(
                "processor_buffer_size must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(SpectrogramError::Configuration(format!(
                "smoothing_time_constant must be in [0, 1), got {}",
                self.smoothing_time_constant
            )));
        }
        ChannelDbRange::new(self.min_decibels, self.max_decibels)?;
        for range in &self.channels {
            range.validate()?;
        }
        Ok(())
    }

    /// Resolve the dB range of every channel for a buffer with `channel_count` channels.
    pub fn db_ranges(&self, channel_count: usize) -> Result<Vec<ChannelDbRange>> {
        if self.channels.is_empty() {
            let range = ChannelDbRange::new(self.min_decibels, self.max_decibels)?;
            return Ok(vec![range; channel_count]);
        }
        if self.channels.len() != channel_count {
            return Err(SpectrogramError::Configuration(format!(
                "{} per-channel dB ranges configured for {} channels",
                self.channels.len(),
                channel_count
            )));
        }
        for range in &self.channels {
            range.validate()?;
        }
        Ok(self.channels.clone())
    }
}

fn default_fft_resolution() -> usize { 4096 }
fn default_smoothing_time_constant() -> f32 { 0.1 }
fn default_processor_buffer_size() -> usize { 2048 }
fn default_min_decibels() -> f32 { DEFAULT_MIN_DECIBELS }
fn default_max_decibels() -> f32 { DEFAULT_MAX_DECIBELS }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_settings() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.fft_resolution, 4096);
        assert_eq!(cfg.processor_buffer_size, 2048);
        assert!((cfg.smoothing_time_constant - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.window, WindowKind::Hann);
        assert_eq!(cfg.stride(), 2048);
        cfg.validate().unwrap();
    }

    #[test]
    fn tick_count_is_ceiling() {
        let cfg = AnalysisConfig {
            processor_buffer_size: 512,
            ..Default::default()
        };
        assert_eq!(cfg.tick_count(0), 0);
        assert_eq!(cfg.tick_count(1), 1);
        assert_eq!(cfg.tick_count(512), 1);
        assert_eq!(cfg.tick_count(513), 2);
        assert_eq!(cfg.tick_count(4096), 8);
        for len in 0..3000 {
            assert_eq!(cfg.tick_count(len), (len + 511) / 512);
        }
    }

    #[test]
    fn rejects_bad_fft_resolution() {
        for fft_resolution in [0, 16, 100, 3000, 4095] {
            let cfg = AnalysisConfig {
                fft_resolution,
                ..Default::default()
            };
            assert!(
                matches!(cfg.validate(), Err(SpectrogramError::Configuration(_))),
                "fft_resolution = {}",
                fft_resolution
            );
        }
        let cfg = AnalysisConfig {
            fft_resolution: 32,
            ..Default::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_zero_buffer_size() {
        let cfg = AnalysisConfig {
            processor_buffer_size: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(SpectrogramError::Configuration(_))));
    }

    #[test]
    fn rejects_smoothing_outside_unit_interval() {
        for smoothing_time_constant in [-0.1, 1.0, 1.5, f32::NAN] {
            let cfg = AnalysisConfig {
                smoothing_time_constant,
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "smoothing = {}", smoothing_time_constant);
        }
        let cfg = AnalysisConfig {
            smoothing_time_constant: 0.0,
            ..Default::default()
        };
        cfg.validate().unwrap();
    }

    #[test]
    fn per_channel_ranges_must_match_channel_count() {
        let cfg = AnalysisConfig {
            channels: vec![ChannelDbRange::default(); 2],
            ..Default::default()
        };
        assert_eq!(cfg.db_ranges(2).unwrap().len(), 2);
        assert!(matches!(cfg.db_ranges(1), Err(SpectrogramError::Configuration(_))));

        let shared = AnalysisConfig::default().db_ranges(3).unwrap();
        assert_eq!(shared, vec![ChannelDbRange::default(); 3]);
    }

    #[test]
    fn parses_toml_sections() {
        let cfg: Config = toml::from_str(
            r#"
            [analysis]
            fft_resolution = 1024
            window = "blackman"

            [[analysis.channels]]
            min_decibels = -120.0
            max_decibels = -20.0

            [output]
            pretty = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.fft_resolution, 1024);
        assert_eq!(cfg.analysis.processor_buffer_size, 2048);
        assert_eq!(cfg.analysis.window, WindowKind::Blackman);
        assert_eq!(cfg.analysis.channels[0].min_decibels, -120.0);
        assert!(cfg.output.pretty);
        assert!(!cfg.output.include_matrices);
    }

    #[test]
    fn window_shapes() {
        let hann = WindowKind::Hann.coefficients(64);
        assert!(hann[0].abs() < 1e-6);
        assert!((hann[32] - 1.0).abs() < 1e-6);
        assert!((hann[1] - hann[63]).abs() < 1e-6);
        assert!(hann.iter().all(|&w| (0.0..=1.0).contains(&w)));
        assert_eq!(WindowKind::Rectangular.coefficients(8), vec![1.0; 8]);
        let blackman = WindowKind::Blackman.coefficients(64);
        assert!((blackman[32] - 1.0).abs() < 1e-5);
        assert_eq!("Blackman".parse::<WindowKind>().unwrap(), WindowKind::Blackman);
        assert!("kaiser".parse::<WindowKind>().is_err());
    }

    #[test]
    fn degenerate_window_sizes_are_finite() {
        for kind in [WindowKind::Hann, WindowKind::Blackman, WindowKind::Rectangular] {
            assert!(kind.coefficients(0).is_empty());
            assert_eq!(kind.coefficients(1), vec![1.0]);
            assert!(kind.coefficients(2).iter().all(|w| w.is_finite()));
        }
    }
}
