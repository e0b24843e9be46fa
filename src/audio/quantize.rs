use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrogramError};

/// Default analyser floor/ceiling in dB.
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

/// Decibel domain that byte 0 and byte 255 stand for on one channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelDbRange {
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for ChannelDbRange {
    fn default() -> Self {
        Self {
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
        }
    }
}

impl ChannelDbRange {
    pub fn new(min_decibels: f32, max_decibels: f32) -> Result<Self> {
        let range = Self {
            min_decibels,
            max_decibels,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min_decibels.is_finite() || !self.max_decibels.is_finite() {
            return Err(SpectrogramError::Configuration(format!(
                "decibel range [{}, {}] must be finite",
                self.min_decibels, self.max_decibels
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(SpectrogramError::Configuration(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !self.span().is_finite() {
            return Err(SpectrogramError::Configuration(format!(
                "decibel range [{}, {}] is too wide",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    pub fn span(&self) -> f32 {
        self.max_decibels - self.min_decibels
    }

    pub fn quantize(&self, db: f32) -> u8 {
        quantize(db, self)
    }

    pub fn dequantize(&self, intensity: u8) -> f32 {
        dequantize(intensity, self)
    }
}

/// Map a decibel value onto `0..=255`, clamping outside the range.
///
/// NaN lands on 0.
pub fn quantize(db: f32, range: &ChannelDbRange) -> u8 {
    let scaled = 255.0 * (db - range.min_decibels) / range.span();
    if scaled.is_nan() {
        return 0;
    }
    scaled.round().clamp(0.0, 255.0) as u8
}

/// Inverse of [`quantize`], up to one quantization step.
pub fn dequantize(intensity: u8, range: &ChannelDbRange) -> f32 {
    range.min_decibels + (intensity as f32 / 255.0) * range.span()
}
