// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Decoding of uploaded clip bytes into in-memory sample data.
//!
//! Clips are decoded fully into memory for zero-latency triggering and
//! resampled to the engine rate up front, so playback never transcodes.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

/// Why a payload could not be turned into playable audio.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized audio container: {0}")]
    UnknownFormat(SymphoniaError),

    #[error("no decodable audio track")]
    NoAudioTrack,

    #[error("audio track does not declare a sample rate")]
    MissingSampleRate,

    #[error("codec error: {0}")]
    Codec(SymphoniaError),

    #[error("stream contained no audio frames")]
    EmptyStream,
}

/// A fully decoded clip. The interleaved sample data sits behind an `Arc` so
/// every voice playing the clip shares one allocation.
#[derive(Clone)]
pub struct DecodedClip {
    /// Interleaved f32 samples.
    data: Arc<Vec<f32>>,
    /// Number of channels in the clip.
    channel_count: u16,
    /// Sample rate of the decoded data.
    sample_rate: u32,
}

impl DecodedClip {
    pub(crate) fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedClip {
        DecodedClip {
            data: Arc::new(data),
            channel_count,
            sample_rate,
        }
    }

    /// Gets the shared interleaved sample data.
    pub fn data(&self) -> &Arc<Vec<f32>> {
        &self.data
    }

    /// Gets the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Gets the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channel_count.max(1) as usize
    }

    /// Clip duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Memory held by the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for DecodedClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedClip")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// Decodes payload bytes into a clip at the target sample rate.
///
/// The file name, when known, provides an extension hint to the format
/// probe. Any supported container/codec goes; the caller decides what was
/// admissible before the bytes got here.
pub fn decode_bytes(
    bytes: &[u8],
    name_hint: Option<&str>,
    target_sample_rate: u32,
) -> Result<DecodedClip, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = name_hint
        .and_then(|name| Path::new(name).extension())
        .and_then(|extension| extension.to_str())
    {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::UnknownFormat)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let source_sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::MissingSampleRate)?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;

    let mut channel_count: u16 = 0;
    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            // End of the in-memory stream.
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Codec(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A malformed packet is skippable; anything else is fatal.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "Skipping malformed packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Codec(e)),
        };

        let spec = *decoded.spec();
        if channel_count == 0 {
            channel_count = spec.channels.count() as u16;
        }
        let mut sample_buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buffer.samples());
    }

    if samples.is_empty() || channel_count == 0 {
        return Err(DecodeError::EmptyStream);
    }

    let (samples, sample_rate) = if source_sample_rate != target_sample_rate {
        debug!(
            source_rate = source_sample_rate,
            target_rate = target_sample_rate,
            "Resampling clip"
        );
        (
            resample(&samples, channel_count, source_sample_rate, target_sample_rate),
            target_sample_rate,
        )
    } else {
        (samples, source_sample_rate)
    };

    Ok(DecodedClip::new(samples, channel_count, sample_rate))
}

/// Resamples interleaved samples with linear interpolation. Plenty for drum
/// hits and one-shots; clips are short and decoded once.
fn resample(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let idx0 = source_frame * channels + channel;
            let idx1 = (source_frame + 1) * channels + channel;

            let s0 = samples.get(idx0).copied().unwrap_or(0.0);
            let s1 = samples.get(idx1).copied().unwrap_or(s0);

            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}
