use clap::Parser;
use std::path::PathBuf;

use spectrograph::WindowKind;

#[derive(Parser, Debug)]
#[command(name = "spectrograph", about = "Per-channel spectrogram data from an audio file")]
pub struct Cli {
    /// Input audio file or http(s) URL (WAV, MP3, FLAC, OGG)
    pub input: String,

    /// Output JSON file ("-" for stdout)
    #[arg(short, long, default_value = "spectrogram.json")]
    pub output: PathBuf,

    /// Config file (defaults to spectrograph.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// FFT size, a power of two >= 32
    #[arg(long, default_value_t = 4096)]
    pub fft_resolution: usize,

    /// Smoothing between consecutive blocks (0.0 <= t < 1.0)
    #[arg(long, default_value_t = 0.1)]
    pub smoothing: f32,

    /// Samples advanced per block
    #[arg(long, default_value_t = 2048)]
    pub buffer_size: usize,

    /// Analysis window (hann, blackman, rectangular)
    #[arg(long, default_value = "hann")]
    pub window: WindowKind,

    /// Level mapped to intensity 0
    #[arg(long, default_value_t = -100.0, allow_hyphen_values = true)]
    pub min_db: f32,

    /// Level mapped to intensity 255
    #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
    pub max_db: f32,

    /// Write remapped (bin x tick) matrices instead of flat buffers
    #[arg(long)]
    pub matrices: bool,

    /// Only export the lower half of the frequency bins
    #[arg(long)]
    pub lower_half: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}
