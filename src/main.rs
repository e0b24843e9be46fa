mod cli;
mod export;
mod fetch;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

use cli::Cli;
use export::ExportOptions;
use spectrograph::audio::decode;
use spectrograph::config::{self, Config};
use spectrograph::{AnalysisConfig, WindowKind};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config path, or auto-detect spectrograph.toml / user config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("spectrograph.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("spectrograph").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("spectrograph").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let file_config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Some(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            None => {
                log::warn!("Failed to load config from {}", path.display());
                Config::default()
            }
        },
        None => Config::default(),
    };

    let (analysis, export_opts) = merge(&cli, file_config);
    analysis.validate().context("Invalid analysis settings")?;

    log::info!("spectrograph - offline spectrogram analysis");
    log::info!("Input: {}", cli.input);
    log::info!("Output: {}", cli.output.display());

    // 1. Load and decode
    let pcm = if fetch::is_url(&cli.input) {
        let bytes = fetch::fetch_audio(&cli.input)?;
        decode::decode_bytes(bytes, fetch::url_extension(&cli.input))
            .with_context(|| format!("Failed to decode {}", cli.input))?
    } else {
        let path = Path::new(&cli.input);
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        decode::decode_file(path).with_context(|| format!("Failed to decode {}", path.display()))?
    };

    // 2. Analyze
    let pb = ProgressBar::new(pcm.channel_count() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} channels")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );
    let result = spectrograph::analyze_with_progress(&pcm, &analysis, |_| pb.inc(1))
        .context("Spectrogram analysis failed")?;
    pb.finish_and_clear();

    for idx in 0..result.channel_count() {
        if let Some(mean_db) = result.mean_decibels(idx) {
            let range = &result.channel_db_ranges[idx];
            log::info!(
                "Channel {}: mean level {:.1} dB (range {:.0}..{:.0} dB)",
                idx,
                mean_db,
                range.min_decibels,
                range.max_decibels
            );
        }
    }

    // 3. Hand off to the renderer
    export::write(&result, &cli.output, export_opts)?;

    log::info!("Done! {} channel(s), {} ticks x {} bins", result.channel_count(), result.tick_count, result.stride);
    Ok(())
}

/// Config values apply only where the CLI is still at its default.
fn merge(cli: &Cli, cfg: Config) -> (AnalysisConfig, ExportOptions) {
    let mut analysis = cfg.analysis;
    if cli.fft_resolution != 4096 { analysis.fft_resolution = cli.fft_resolution; }
    if cli.smoothing != 0.1 { analysis.smoothing_time_constant = cli.smoothing; }
    if cli.buffer_size != 2048 { analysis.processor_buffer_size = cli.buffer_size; }
    if cli.window != WindowKind::Hann { analysis.window = cli.window; }
    if cli.min_db != -100.0 { analysis.min_decibels = cli.min_db; }
    if cli.max_db != -30.0 { analysis.max_decibels = cli.max_db; }
    if (cli.min_db != -100.0 || cli.max_db != -30.0) && !analysis.channels.is_empty() {
        log::info!("--min-db/--max-db given, ignoring per-channel dB ranges from config");
        analysis.channels.clear();
    }

    let export_opts = ExportOptions {
        matrices: cli.matrices || cfg.output.include_matrices,
        lower_half: cli.lower_half || cfg.output.lower_half,
        pretty: cli.pretty || cfg.output.pretty,
    };
    (analysis, export_opts)
}
