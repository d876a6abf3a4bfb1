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
    sync::{mpsc, Arc},
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use crate::audio::mixer::AudioMixer;
use crate::config;

/// A small wrapper around a cpal::Device, carrying the negotiated output
/// shape so the engine can build its mixer before the stream exists.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The host the device belongs to.
    host_name: String,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The stream configuration used when the output opens.
    stream_config: cpal::StreamConfig,
}

impl Device {
    /// Gets the device selected by the audio configuration, falling back to
    /// the host's default output device when no name is configured.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();

        let device = match config.device() {
            Some(name) => host
                .output_devices()?
                .find(|device| device.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| format!("no output device named {}", name))?,
            None => host
                .default_output_device()
                .ok_or("no default output device")?,
        };
        let name = device.name()?;

        let supported = device.default_output_config()?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(format!(
                "device {} does not support f32 output (format is {})",
                name,
                supported.sample_format()
            )
            .into());
        }

        let sample_rate = config
            .sample_rate()
            .unwrap_or_else(|| supported.sample_rate());
        let buffer_size = config
            .buffer_size()
            .map(cpal::BufferSize::Fixed)
            .unwrap_or(cpal::BufferSize::Default);
        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate,
            buffer_size,
        };

        Ok(Device {
            name,
            host_name: host.id().name().to_string(),
            device,
            stream_config,
        })
    }

    /// Lists the output devices known to cpal.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        let host = cpal::default_host();

        let mut devices = Vec::new();
        for device in host.output_devices()? {
            let name = device.name()?;
            match device.default_output_config() {
                Ok(config) => devices.push(format!(
                    "{} (Channels={}) ({})",
                    name,
                    config.channels(),
                    host.id().name()
                )),
                Err(_) => devices.push(format!("{} ({})", name, host.id().name())),
            }
        }

        Ok(devices)
    }
}

impl crate::audio::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate
    }

    fn channel_count(&self) -> u16 {
        self.stream_config.channels
    }

    /// Opens the output stream on a dedicated thread. cpal streams are not
    /// Send, so the thread owns the stream for its whole life and drops it
    /// when the stop signal arrives.
    fn open_output(
        &self,
        mixer: Arc<AudioMixer>,
    ) -> Result<Box<dyn crate::audio::OutputHandle>, Box<dyn Error>> {
        let device = self.device.clone();
        let stream_config = self.stream_config.clone();
        let device_name = self.name.clone();

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let join = thread::spawn(move || {
            let span = span!(Level::INFO, "audio output");
            let _enter = span.enter();

            let stream = match device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| mixer.fill(data),
                |err| error!(error = %err, "Audio output stream error"),
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
            let _ = ready_tx.send(Ok(()));
            info!(device = device_name, "Output stream started");

            // Hold the stream until shutdown; an error on the channel means
            // the handle was dropped without stop, which also ends us.
            let _ = stop_rx.recv();
            drop(stream);
            info!(device = device_name, "Output stream stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = join.join();
                return Err(e.into());
            }
            Err(_) => return Err("audio output thread exited before starting".into()),
        }

        Ok(Box::new(Handle {
            stop_tx,
            join: Some(join),
        }))
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<crate::audio::mock::Device>, Box<dyn Error>> {
        Err("not a mock device".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.stream_config.channels, self.host_name
        )
    }
}

struct Handle {
    stop_tx: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl crate::audio::OutputHandle for Handle {
    fn stop(mut self: Box<Self>) {
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!("Audio output thread panicked during shutdown");
            }
        }
    }
}
