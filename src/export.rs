use anyhow::{Context, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use spectrograph::{ChannelDbRange, WaveformAnalysisResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub matrices: bool,
    pub lower_half: bool,
    pub pretty: bool,
}

/// JSON handed to the heatmap renderer.
#[derive(Serialize)]
struct ExportDocument<'a> {
    stride: usize,
    tick_count: usize,
    /// Rows actually present per channel (`stride`, or `stride / 2` with `lower_half`).
    rows: usize,
    max_freq: f32,
    /// Top of the exported frequency axis.
    display_max_freq: f32,
    duration: f64,
    sample_rate: u32,
    channels: Vec<ExportChannel<'a>>,
}

#[derive(Serialize)]
struct ExportChannel<'a> {
    db_range: &'a ChannelDbRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Cow<'a, [u8]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<Vec<Vec<u8>>>,
}

pub fn to_json(result: &WaveformAnalysisResult, opts: ExportOptions) -> Result<String> {
    let rows = if opts.lower_half {
        result.stride / 2
    } else {
        result.stride
    };

    let mut channels = Vec::with_capacity(result.channel_count());
    for (idx, (buffer, range)) in result
        .channels
        .iter()
        .zip(&result.channel_db_ranges)
        .enumerate()
    {
        let channel = if opts.matrices {
            let matrix = result
                .matrix(idx)
                .with_context(|| format!("Failed to remap channel {}", idx))?;
            ExportChannel {
                db_range: range,
                data: None,
                matrix: Some(matrix.rows_below(rows).to_vec()),
            }
        } else if opts.lower_half {
            // Flat layout keeps its block-major order; drop the upper bins of every block.
            let data: Vec<u8> = buffer
                .as_slice()
                .chunks_exact(result.stride.max(1))
                .flat_map(|block| block[..rows].iter().copied())
                .collect();
            ExportChannel {
                db_range: range,
                data: Some(Cow::Owned(data)),
                matrix: None,
            }
        } else {
            ExportChannel {
                db_range: range,
                data: Some(Cow::Borrowed(buffer.as_slice())),
                matrix: None,
            }
        };
        channels.push(channel);
    }

    let doc = ExportDocument {
        stride: result.stride,
        tick_count: result.tick_count,
        rows,
        max_freq: result.max_freq,
        display_max_freq: result.bin_frequency(rows),
        duration: result.duration,
        sample_rate: result.sample_rate,
        channels,
    };

    let json = if opts.pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(json)
}

pub fn write(result: &WaveformAnalysisResult, path: &Path, opts: ExportOptions) -> Result<()> {
    let json = to_json(result, opts)?;
    if path == Path::new("-") {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectrograph::{analyze, AnalysisConfig, PcmBuffer};

    fn silent_result() -> WaveformAnalysisResult {
        let config = AnalysisConfig {
            fft_resolution: 32,
            processor_buffer_size: 8,
            ..Default::default()
        };
        let pcm = PcmBuffer::new(vec![vec![0.0; 24]; 2], 8_000).unwrap();
        analyze(&pcm, &config).unwrap()
    }

    #[test]
    fn flat_export_keeps_every_byte() {
        let result = silent_result();
        let json = to_json(&result, ExportOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stride"], 16);
        assert_eq!(value["tick_count"], 3);
        assert_eq!(value["rows"], 16);
        let channels = value["channels"].as_array().unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0]["data"].as_array().unwrap().len(), 48);
        assert!(channels[0].get("matrix").is_none());
        assert_eq!(channels[1]["db_range"]["min_decibels"], -100.0);
    }

    #[test]
    fn matrix_export_lower_half() {
        let result = silent_result();
        let opts = ExportOptions {
            matrices: true,
            lower_half: true,
            pretty: true,
        };
        let value: serde_json::Value = serde_json::from_str(&to_json(&result, opts).unwrap()).unwrap();
        assert_eq!(value["rows"], 8);
        assert_eq!(value["display_max_freq"], 2000.0);
        let matrix = value["channels"][0]["matrix"].as_array().unwrap();
        assert_eq!(matrix.len(), 8);
        assert_eq!(matrix[0].as_array().unwrap().len(), 3);
    }

    #[test]
    fn flat_export_lower_half_trims_each_block() {
        let result = silent_result();
        let opts = ExportOptions {
            lower_half: true,
            ..Default::default()
        };
        let value: serde_json::Value = serde_json::from_str(&to_json(&result, opts).unwrap()).unwrap();
        assert_eq!(value["channels"][1]["data"].as_array().unwrap().len(), 3 * 8);
    }
}
