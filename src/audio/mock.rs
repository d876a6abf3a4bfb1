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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::info;

use crate::audio::mixer::AudioMixer;
use crate::config;

/// A mock output device. Doesn't pull any frames; voices queue in the mixer
/// untouched, which keeps tests deterministic and lets the soundboard run on
/// machines without audio hardware.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    channel_count: u16,
    is_open: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, config: &config::Audio) -> Device {
        Device {
            name: name.to_string(),
            sample_rate: config.sample_rate().unwrap_or(44100),
            channel_count: 2,
            is_open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true while the output is open.
    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::Relaxed)
    }
}

impl crate::audio::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channel_count(&self) -> u16 {
        self.channel_count
    }

    fn open_output(
        &self,
        _: Arc<AudioMixer>,
    ) -> Result<Box<dyn crate::audio::OutputHandle>, Box<dyn Error>> {
        info!(device = self.name, "Opening mock output");
        self.is_open.store(true, Ordering::Relaxed);
        Ok(Box::new(Handle {
            is_open: self.is_open.clone(),
        }))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct Handle {
    is_open: Arc<AtomicBool>,
}

impl crate::audio::OutputHandle for Handle {
    fn stop(self: Box<Self>) {
        self.is_open.store(false, Ordering::Relaxed);
    }
}
