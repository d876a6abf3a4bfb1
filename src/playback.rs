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

//! Trigger dispatch: turns a pad into sound.
//!
//! Triggering is fire-and-forget. Nothing is returned, nothing is surfaced
//! to the caller, and overlapping triggers for the same pad are independent.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::activity::ActivityTracker;
use crate::audio::AudioEngine;
use crate::pads::Pad;
use crate::registry::PadRegistry;
use crate::synth;

/// Composes trim, gain, and voice parameters and hands them to the engine.
pub struct PlaybackScheduler {
    engine: Arc<AudioEngine>,
    registry: Arc<RwLock<PadRegistry>>,
    activity: ActivityTracker,
}

impl PlaybackScheduler {
    /// Creates a new scheduler.
    pub fn new(
        engine: Arc<AudioEngine>,
        registry: Arc<RwLock<PadRegistry>>,
        activity: ActivityTracker,
    ) -> PlaybackScheduler {
        PlaybackScheduler {
            engine,
            registry,
            activity,
        }
    }

    /// Triggers a pad by id. An unknown id is a silent no-op: the pad list
    /// may have changed between the input event and now.
    pub fn trigger_pad(&self, pad_id: &str) {
        // Snapshot the pad so the registry lock is not held while decoding.
        let pad = self.registry.read().lookup(pad_id).cloned();
        match pad {
            Some(pad) => self.trigger(&pad),
            None => debug!(pad = pad_id, "Pad not found, ignoring trigger"),
        }
    }

    /// Triggers a pad snapshot: custom clip when a payload is present,
    /// synthesis otherwise, and the activity mark in every case.
    pub fn trigger(&self, pad: &Pad) {
        if let Some(payload) = pad.audio_payload() {
            match self
                .engine
                .get_or_decode(pad.id(), payload, pad.audio_file_name())
            {
                Ok(clip) => {
                    let offset = pad.trim_start().unwrap_or(0.0);
                    let duration = match pad.trim_end() {
                        Some(trim_end) => trim_end - offset,
                        None => clip.duration_secs() - offset,
                    };
                    self.engine.render(&clip, offset, duration, pad.volume());
                }
                // The pad is silently non-playable until its payload is
                // replaced.
                Err(e) => debug!(pad = pad.id(), error = %e, "Clip not playable"),
            }
        } else {
            synth::synthesize(pad.name(), &self.engine);
        }

        self.activity.mark(pad.id());
    }

    /// Gets the activity tracker driving the pad pulse.
    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock;
    use crate::config;
    use crate::pads::Pad;
    use crate::testutil::audio_test_utils::{generate_sine, mono_wav_bytes};
    use tempfile::tempdir;

    fn test_scheduler() -> (PlaybackScheduler, Arc<AudioEngine>) {
        let device = mock::Device::get("mock", &config::Audio::default());
        let engine = Arc::new(AudioEngine::new(Arc::new(device)));
        let store = tempdir().unwrap();
        let registry = Arc::new(RwLock::new(PadRegistry::open(store.path())));
        let scheduler =
            PlaybackScheduler::new(engine.clone(), registry, ActivityTracker::new());
        (scheduler, engine)
    }

    fn wav_payload(duration_secs: f32) -> Vec<u8> {
        let samples = generate_sine(440.0, 0.5, 44100, duration_secs);
        mono_wav_bytes(44100, &samples)
    }

    #[tokio::test]
    async fn test_trigger_composes_trim_and_gain() {
        let (scheduler, engine) = test_scheduler();

        // trimStart 2.0, trimEnd 5.0 on a 10s clip: offset 2.0, duration 3.0.
        let pad = Pad::new(
            "p1",
            'K',
            "Clip",
            1,
            Some(wav_payload(10.0)),
            0.8,
            Some(2.0),
            Some(5.0),
        );
        scheduler.trigger(&pad);

        let frames = engine.mixer().voice_frame_counts();
        assert_eq!(frames, vec![3 * 44100]);
        assert!(scheduler.activity().is_active("p1"));
    }

    #[tokio::test]
    async fn test_trigger_without_trim_plays_to_end() {
        let (scheduler, engine) = test_scheduler();

        let pad = Pad::new("p1", 'K', "Clip", 1, Some(wav_payload(1.0)), 0.8, None, None);
        scheduler.trigger(&pad);

        assert_eq!(engine.mixer().voice_frame_counts(), vec![44100]);
    }

    #[tokio::test]
    async fn test_trigger_with_only_trim_start() {
        let (scheduler, engine) = test_scheduler();

        let pad = Pad::new(
            "p1",
            'K',
            "Clip",
            1,
            Some(wav_payload(1.0)),
            0.8,
            Some(0.25),
            None,
        );
        scheduler.trigger(&pad);

        assert_eq!(
            engine.mixer().voice_frame_counts(),
            vec![(0.75 * 44100.0) as usize]
        );
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_silent_but_still_marks() {
        let (scheduler, engine) = test_scheduler();

        let pad = Pad::new("p1", 'K', "Clip", 1, Some(vec![0u8; 64]), 0.8, None, None);
        scheduler.trigger(&pad);

        assert_eq!(engine.mixer().active_voice_count(), 0);
        assert_eq!(engine.cached_clip_count(), 0);
        // The activity mark is unconditional.
        assert!(scheduler.activity().is_active("p1"));
    }

    #[tokio::test]
    async fn test_payloadless_pad_synthesizes_by_name() {
        let (scheduler, engine) = test_scheduler();

        let pad = Pad::new("p1", 'K', "Kick", 1, None, 0.8, None, None);
        scheduler.trigger(&pad);

        // The kick recipe is a 0.5s one-shot at the engine rate.
        assert_eq!(
            engine.mixer().voice_frame_counts(),
            vec![(0.5 * 44100.0) as usize]
        );
        assert_eq!(engine.cached_clip_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pad_id_is_a_no_op() {
        let (scheduler, engine) = test_scheduler();

        scheduler.trigger_pad("no-such-pad");
        assert_eq!(engine.mixer().active_voice_count(), 0);
        assert!(!scheduler.activity().is_active("no-such-pad"));
    }

    #[tokio::test]
    async fn test_trigger_pad_uses_the_registry() {
        let (scheduler, engine) = test_scheduler();

        // Default pad "1" is the Kick.
        scheduler.trigger_pad("1");
        assert_eq!(
            engine.mixer().voice_frame_counts(),
            vec![(0.5 * 44100.0) as usize]
        );
        assert!(scheduler.activity().is_active("1"));
    }

    #[tokio::test]
    async fn test_overlapping_triggers_are_independent() {
        let (scheduler, engine) = test_scheduler();

        let pad = Pad::new("p1", 'K', "Clip", 1, Some(wav_payload(1.0)), 0.8, None, None);
        scheduler.trigger(&pad);
        scheduler.trigger(&pad);
        scheduler.trigger(&pad);

        assert_eq!(engine.mixer().active_voice_count(), 3);
        // One decode served all three.
        assert_eq!(engine.cached_clip_count(), 1);
    }
}
