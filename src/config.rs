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

//! Application configuration, read from an optional YAML file. Every field
//! has a default so the soundboard runs with no config at all.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The audio section of the configuration.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct Audio {
    /// The output device name. Unset selects the default output device;
    /// names starting with "mock" select the mock device.
    device: Option<String>,

    /// Output sample rate override in Hz.
    sample_rate: Option<u32>,

    /// Output buffer size override in frames.
    buffer_size: Option<u32>,
}

impl Audio {
    /// Gets the configured device name.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Gets the sample rate override.
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Gets the buffer size override.
    pub fn buffer_size(&self) -> Option<u32> {
        self.buffer_size
    }
}

/// The soundboard configuration.
#[derive(Deserialize, Clone, Serialize, Debug, Default)]
pub struct Config {
    /// Audio output settings.
    #[serde(default)]
    audio: Audio,

    /// Directory holding the durable pad store. Defaults to
    /// `$HOME/.padboard`, or the working directory without a home.
    store_dir: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from the given YAML file, or the defaults
    /// when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Config, Box<dyn Error>> {
        match path {
            Some(path) => Ok(serde_yml::from_str(&fs::read_to_string(path)?)?),
            None => Ok(Config::default()),
        }
    }

    /// Gets the audio settings.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Gets the pad store directory.
    pub fn store_dir(&self) -> PathBuf {
        if let Some(store_dir) = &self.store_dir {
            return store_dir.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".padboard"),
            None => PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_without_a_file() {
        let config = Config::load(None).unwrap();
        assert!(config.audio().device().is_none());
        assert!(config.audio().sample_rate().is_none());
        assert!(config.audio().buffer_size().is_none());
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
audio:
  device: mock-device
  sample_rate: 48000
  buffer_size: 256
store_dir: /tmp/padboard-test
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.audio().device(), Some("mock-device"));
        assert_eq!(config.audio().sample_rate(), Some(48000));
        assert_eq!(config.audio().buffer_size(), Some(256));
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/padboard-test"));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "audio:\n  device: mock\n").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.audio().device(), Some("mock"));
        assert!(config.audio().sample_rate().is_none());
    }
}
