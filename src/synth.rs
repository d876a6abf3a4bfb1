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

//! Procedural percussion for pads without a custom clip.
//!
//! Each pad name maps (case-insensitively) to one fixed recipe; anything
//! unrecognized falls back to a short default tone. Recipes render a mono
//! buffer at the engine rate and play it through the normal voice path, so
//! every trigger is an independent one-shot that ends on its own.

use std::f32::consts::TAU;

use rand::Rng;
use tracing::debug;

use crate::audio::voice::Voice;
use crate::audio::AudioEngine;

/// Every envelope decays to this level; exponential ramps cannot reach zero.
const ENVELOPE_FLOOR: f32 = 0.01;

/// Peak level for the plain oscillator recipes.
const TONE_LEVEL: f32 = 0.5;

/// Basic oscillator shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// A fixed synthesis recipe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Recipe {
    /// Sine sweep from 150 Hz with a matching amplitude decay.
    Kick,
    /// White noise through a high-pass, with an amplitude decay.
    Noise {
        cutoff_hz: f32,
        start_level: f32,
        duration_secs: f32,
    },
    /// An oscillator with the standard decay envelope.
    Tone {
        waveform: Waveform,
        frequency_hz: f32,
        duration_secs: f32,
    },
    /// An oscillator at a constant level, no envelope.
    Steady {
        waveform: Waveform,
        frequency_hz: f32,
        duration_secs: f32,
    },
}

/// Selects the recipe for a pad name, case-insensitively. Unmatched names
/// get the default tone.
pub(crate) fn recipe_for(name: &str) -> Recipe {
    match name.to_lowercase().as_str() {
        "kick" => Recipe::Kick,
        "snare" | "clap" => Recipe::Noise {
            cutoff_hz: 1000.0,
            start_level: 1.0,
            duration_secs: 0.2,
        },
        "hi-hat" | "crash" => Recipe::Noise {
            cutoff_hz: 5000.0,
            start_level: 0.3,
            duration_secs: 0.1,
        },
        "tom" => Recipe::Steady {
            waveform: Waveform::Sine,
            frequency_hz: 100.0,
            duration_secs: 0.3,
        },
        "bass" => Recipe::Tone {
            waveform: Waveform::Sawtooth,
            frequency_hz: 55.0,
            duration_secs: 0.4,
        },
        "synth" => Recipe::Tone {
            waveform: Waveform::Square,
            frequency_hz: 440.0,
            duration_secs: 0.3,
        },
        "fx" => Recipe::Tone {
            waveform: Waveform::Triangle,
            frequency_hz: 880.0,
            duration_secs: 0.5,
        },
        _ => Recipe::Tone {
            waveform: Waveform::Sine,
            frequency_hz: 440.0,
            duration_secs: 0.2,
        },
    }
}

/// Synthesizes the sound for a pad name and plays it through the engine.
pub fn synthesize(name: &str, engine: &AudioEngine) -> Voice {
    let samples = render(recipe_for(name), engine.sample_rate());
    debug!(name, frames = samples.len(), "Synthesizing pad sound");
    engine.play_buffer(samples)
}

/// Renders a recipe into a mono buffer at the given rate.
pub(crate) fn render(recipe: Recipe, sample_rate: u32) -> Vec<f32> {
    match recipe {
        Recipe::Kick => kick(sample_rate),
        Recipe::Noise {
            cutoff_hz,
            start_level,
            duration_secs,
        } => noise_burst(sample_rate, cutoff_hz, start_level, duration_secs),
        Recipe::Tone {
            waveform,
            frequency_hz,
            duration_secs,
        } => tone_burst(sample_rate, waveform, frequency_hz, duration_secs),
        Recipe::Steady {
            waveform,
            frequency_hz,
            duration_secs,
        } => steady_tone(sample_rate, waveform, frequency_hz, duration_secs),
    }
}

fn frames_for(sample_rate: u32, duration_secs: f32) -> usize {
    (sample_rate as f32 * duration_secs) as usize
}

/// Exponential ramp from `from` to `to` over a normalized progress in [0, 1].
fn exponential_ramp(from: f32, to: f32, progress: f32) -> f32 {
    from * (to / from).powf(progress)
}

/// The kick: a sine whose frequency sweeps exponentially from 150 Hz toward
/// zero while the amplitude decays from full scale, over half a second.
fn kick(sample_rate: u32) -> Vec<f32> {
    let frames = frames_for(sample_rate, 0.5);
    let mut samples = Vec::with_capacity(frames);
    let mut phase = 0.0f32;
    for i in 0..frames {
        let progress = i as f32 / frames as f32;
        let frequency = exponential_ramp(150.0, ENVELOPE_FLOOR, progress);
        phase = (phase + frequency / sample_rate as f32).fract();
        let amplitude = exponential_ramp(1.0, ENVELOPE_FLOOR, progress);
        samples.push((TAU * phase).sin() * amplitude);
    }
    samples
}

/// Uniform white noise in [-1, 1), high-passed, with an exponential decay
/// from `start_level`.
fn noise_burst(
    sample_rate: u32,
    cutoff_hz: f32,
    start_level: f32,
    duration_secs: f32,
) -> Vec<f32> {
    let frames = frames_for(sample_rate, duration_secs);
    let mut rng = rand::thread_rng();
    let mut samples: Vec<f32> = (0..frames).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

    high_pass(&mut samples, sample_rate, cutoff_hz);

    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= exponential_ramp(start_level, ENVELOPE_FLOOR, i as f32 / frames as f32);
    }
    samples
}

/// An oscillator with the standard decaying envelope.
fn tone_burst(
    sample_rate: u32,
    waveform: Waveform,
    frequency_hz: f32,
    duration_secs: f32,
) -> Vec<f32> {
    let frames = frames_for(sample_rate, duration_secs);
    let mut samples = Vec::with_capacity(frames);
    for i in 0..frames {
        let phase = (i as f32 * frequency_hz / sample_rate as f32).fract();
        let amplitude =
            exponential_ramp(TONE_LEVEL, ENVELOPE_FLOOR, i as f32 / frames as f32);
        samples.push(oscillator(waveform, phase) * amplitude);
    }
    samples
}

/// An oscillator at a flat level for the whole duration.
fn steady_tone(
    sample_rate: u32,
    waveform: Waveform,
    frequency_hz: f32,
    duration_secs: f32,
) -> Vec<f32> {
    let frames = frames_for(sample_rate, duration_secs);
    let mut samples = Vec::with_capacity(frames);
    for i in 0..frames {
        let phase = (i as f32 * frequency_hz / sample_rate as f32).fract();
        samples.push(oscillator(waveform, phase) * TONE_LEVEL);
    }
    samples
}

/// One oscillator sample for a phase in [0, 1).
fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 4.0 * (phase - (phase + 0.5).floor()).abs() - 1.0,
    }
}

/// In-place RBJ high-pass biquad at Q = 1/sqrt(2).
fn high_pass(samples: &mut [f32], sample_rate: u32, cutoff_hz: f32) {
    let omega = TAU * cutoff_hz / sample_rate as f32;
    let (sin_omega, cos_omega) = omega.sin_cos();
    let alpha = sin_omega / (2.0 * std::f32::consts::FRAC_1_SQRT_2);

    let b0 = (1.0 + cos_omega) / 2.0;
    let b1 = -(1.0 + cos_omega);
    let b2 = (1.0 + cos_omega) / 2.0;
    let a0 = 1.0 + alpha;
    let a1 = -2.0 * cos_omega;
    let a2 = 1.0 - alpha;

    let (mut x1, mut x2, mut y1, mut y2) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
    for sample in samples.iter_mut() {
        let x0 = *sample;
        let y0 = (b0 * x0 + b1 * x1 + b2 * x2 - a1 * y1 - a2 * y2) / a0;
        x2 = x1;
        x1 = x0;
        y2 = y1;
        y1 = y0;
        *sample = y0;
    }
}
