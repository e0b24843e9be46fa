use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::pcm::PcmBuffer;
use crate::error::{Result, SpectrogramError};

/// Decode an audio file into per-channel PCM.
pub fn decode_file(path: &Path) -> Result<PcmBuffer> {
    let file = std::fs::File::open(path).map_err(|e| {
        SpectrogramError::Decode(format!("failed to open {}: {}", path.display(), e))
    })?;
    let ext = path.extension().and_then(|e| e.to_str());
    decode_source(Box::new(file), ext)
}

/// Decode an in-memory encoded file (e.g. a download).
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<PcmBuffer> {
    decode_source(Box::new(Cursor::new(bytes)), extension)
}

fn decode_source(source: Box<dyn MediaSource>, extension: Option<&str>) -> Result<PcmBuffer> {
    let mss = MediaSourceStream::new(source, Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SpectrogramError::Decode("no audio tracks found".into()))?;

    let track_id = track.id;
    let mut channel_count = track.codec_params.channels.map_or(0, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SpectrogramError::Decode("unknown sample rate".into()))?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut channels: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if channels.is_empty() {
            // Some containers only report the layout on the first decoded packet.
            channel_count = spec.channels.count();
            channels = vec![Vec::new(); channel_count];
        } else if spec.channels.count() != channel_count {
            return Err(SpectrogramError::Decode(format!(
                "channel count changed mid-stream: {} -> {}",
                channel_count,
                spec.channels.count()
            )));
        }

        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} undecodable packet(s)", skipped);
    }

    let pcm = PcmBuffer::new(channels, sample_rate)?;
    log::info!(
        "Decoded audio: {} channel(s), {} samples, {}Hz, {:.1}s",
        pcm.channel_count(),
        pcm.len(),
        pcm.sample_rate(),
        pcm.duration()
    );
    Ok(pcm)
}
