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

//! The audio engine: one per process. Owns the output stream (opened lazily
//! on the first render, torn down only by an explicit shutdown), the mixer,
//! and the decode cache.
//!
//! The cache maps pad ids to decoded clips. Entries appear on the first
//! trigger of a pad with a custom payload and disappear only through
//! [`AudioEngine::invalidate`]; there is no eviction beyond that.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::decode::{self, DecodeError, DecodedClip};
use super::mixer::AudioMixer;
use super::voice::{Voice, VoiceSource};
use super::{Device, OutputHandle};

enum OutputState {
    /// No stream yet; the next render opens one.
    Idle,
    /// The stream is running.
    Open(Box<dyn OutputHandle>),
    /// Shut down. The stream is never re-created.
    Closed,
}

/// The process-wide audio engine.
pub struct AudioEngine {
    /// The output device the stream opens against.
    device: Arc<dyn Device>,
    /// The mixer the output stream pulls from.
    mixer: Arc<AudioMixer>,
    /// Lazily opened output stream.
    output: Mutex<OutputState>,
    /// Decoded clips by pad id.
    cache: Mutex<HashMap<String, DecodedClip>>,
}

impl AudioEngine {
    /// Creates an engine for the given device. No stream is opened until the
    /// first render.
    pub fn new(device: Arc<dyn Device>) -> AudioEngine {
        let mixer = Arc::new(AudioMixer::new(device.channel_count(), device.sample_rate()));
        AudioEngine {
            device,
            mixer,
            output: Mutex::new(OutputState::Idle),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Gets the engine's output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    /// Returns the cached clip for the pad, or decodes the payload, caches
    /// it under the pad id, and returns it. On failure nothing is cached and
    /// the pad stays silently non-playable until its payload is replaced.
    pub fn get_or_decode(
        &self,
        pad_id: &str,
        payload: &[u8],
        name_hint: Option<&str>,
    ) -> Result<DecodedClip, DecodeError> {
        let mut cache = self.cache.lock();
        if let Some(clip) = cache.get(pad_id) {
            debug!(pad = pad_id, "Using cached clip");
            return Ok(clip.clone());
        }

        let clip = decode::decode_bytes(payload, name_hint, self.sample_rate())?;
        info!(
            pad = pad_id,
            channels = clip.channel_count(),
            duration_ms = (clip.duration_secs() * 1000.0) as u64,
            memory_kb = clip.memory_size() / 1024,
            "Clip decoded"
        );
        cache.insert(pad_id.to_string(), clip.clone());
        Ok(clip)
    }

    /// Drops any cached clip for the pad. Must be called whenever the pad's
    /// payload changes, including when it is cleared.
    pub fn invalidate(&self, pad_id: &str) {
        if self.cache.lock().remove(pad_id).is_some() {
            debug!(pad = pad_id, "Dropped cached clip");
        }
    }

    /// Starts playback of a sub-range of the clip at the given gain. The
    /// range is clamped to the clip; the gain is applied exactly as given.
    /// Concurrent renders are independent, with no voice stealing and no
    /// upper bound.
    pub fn render(
        &self,
        clip: &DecodedClip,
        offset_secs: f64,
        duration_secs: f64,
        gain: f32,
    ) -> Voice {
        self.ensure_output();
        let source = VoiceSource::from_clip(clip, offset_secs, duration_secs, gain);
        let frames = source.remaining_frames();
        let voice = self.mixer.add_voice(source);
        debug!(
            voice = voice.id(),
            offset_secs, duration_secs, gain, frames, "Voice started"
        );
        voice
    }

    /// Plays a synthesized mono buffer at the engine rate through the same
    /// output path as clip voices.
    pub fn play_buffer(&self, samples: Vec<f32>) -> Voice {
        self.ensure_output();
        self.mixer
            .add_voice(VoiceSource::from_mono_buffer(samples, 1.0))
    }

    /// Tears the output stream down. The engine stays usable for cache
    /// operations but never renders audibly again; meant to be called once
    /// at process exit.
    pub fn shutdown(&self) {
        let mut output = self.output.lock();
        if let OutputState::Open(handle) = std::mem::replace(&mut *output, OutputState::Closed) {
            handle.stop();
            info!("Audio output closed");
        }
    }

    /// Opens the output stream on first use. A failed open is logged and
    /// retried on the next render; a shutdown engine stays closed.
    fn ensure_output(&self) {
        let mut output = self.output.lock();
        if !matches!(*output, OutputState::Idle) {
            return;
        }
        match self.device.open_output(self.mixer.clone()) {
            Ok(handle) => {
                info!(device = %self.device, "Audio output opened");
                *output = OutputState::Open(handle);
            }
            Err(e) => {
                error!(device = %self.device, error = %e, "Failed to open audio output");
            }
        }
    }

    /// The mixer, for state assertions in tests.
    #[cfg(test)]
    pub fn mixer(&self) -> &Arc<AudioMixer> {
        &self.mixer
    }

    /// Number of cached clips.
    #[cfg(test)]
    pub fn cached_clip_count(&self) -> usize {
        self.cache.lock().len()
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("device", &self.device.to_string())
            .field("cached_clips", &self.cache.lock().len())
            .field("active_voices", &self.mixer.active_voice_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock;
    use crate::config;
    use crate::testutil::audio_test_utils::{generate_sine, mono_wav_bytes};

    fn test_engine() -> AudioEngine {
        let device = mock::Device::get("mock", &config::Audio::default());
        AudioEngine::new(Arc::new(device))
    }

    fn wav_payload(duration_secs: f32) -> Vec<u8> {
        let samples = generate_sine(440.0, 0.5, 44100, duration_secs);
        mono_wav_bytes(44100, &samples)
    }

    #[test]
    fn test_get_or_decode_caches_by_pad_id() {
        let engine = test_engine();
        let payload = wav_payload(0.25);

        let first = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();
        let second = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();

        // The cached clip shares the same sample allocation.
        assert!(Arc::ptr_eq(first.data(), second.data()));
        assert_eq!(engine.cached_clip_count(), 1);
    }

    #[test]
    fn test_invalidate_forces_a_fresh_decode() {
        let engine = test_engine();
        let payload = wav_payload(0.25);

        let first = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();
        engine.invalidate("p1");
        assert_eq!(engine.cached_clip_count(), 0);

        let second = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();
        assert!(!Arc::ptr_eq(first.data(), second.data()));
    }

    #[test]
    fn test_failed_decode_caches_nothing() {
        let engine = test_engine();
        let garbage = vec![0u8; 64];

        assert!(engine.get_or_decode("p1", &garbage, None).is_err());
        assert_eq!(engine.cached_clip_count(), 0);

        // A good payload for the same pad decodes fine afterwards.
        let payload = wav_payload(0.1);
        assert!(engine.get_or_decode("p1", &payload, Some("a.wav")).is_ok());
    }

    #[test]
    fn test_render_opens_output_lazily_and_shutdown_closes_it() {
        let device = mock::Device::get("mock", &config::Audio::default());
        let engine = AudioEngine::new(Arc::new(device.clone()));
        assert!(!device.is_open());

        let payload = wav_payload(0.25);
        let clip = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();
        // Decoding alone does not open the output.
        assert!(!device.is_open());

        engine.render(&clip, 0.0, clip.duration_secs(), 0.8);
        assert!(device.is_open());
        assert_eq!(engine.mixer().active_voice_count(), 1);

        engine.shutdown();
        assert!(!device.is_open());

        // After shutdown the output is never re-created.
        engine.render(&clip, 0.0, clip.duration_secs(), 0.8);
        assert!(!device.is_open());
    }

    #[test]
    fn test_render_applies_trim_window() {
        let engine = test_engine();
        let payload = wav_payload(1.0);
        let clip = engine.get_or_decode("p1", &payload, Some("a.wav")).unwrap();

        engine.render(&clip, 0.25, 0.5, 1.0);
        let frames = engine.mixer().voice_frame_counts();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], (0.5 * 44100.0) as usize);
    }
}
