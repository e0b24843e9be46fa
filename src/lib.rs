//! Offline spectrogram analysis.
//!
//! Decoded PCM goes in, one quantized `u8` intensity buffer per channel comes
//! out, ready to be remapped into a (frequency bin × time tick) heatmap.

pub mod audio;
pub mod config;
pub mod error;

pub use audio::analysis::{analyze, analyze_with_progress};
pub use audio::features::{ChannelFrequencyBuffer, WaveformAnalysisResult};
pub use audio::pcm::PcmBuffer;
pub use audio::quantize::ChannelDbRange;
pub use audio::remap::{remap, SpectrogramMatrix};
pub use config::{AnalysisConfig, WindowKind};
pub use error::{Result, SpectrogramError};
