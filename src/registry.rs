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

//! The durable pad registry.
//!
//! The pad list lives as a JSON record under a fixed storage key. A missing
//! or malformed record is never an error: the built-in default set takes its
//! place, matching what a first run looks like.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::audio::AudioEngine;
use crate::pads::{self, Pad, PadUpdate};

/// The fixed storage key the durable record lives under.
pub const STORAGE_KEY: &str = "soundboard-pads";

/// Owns the pad list and its durable copy.
pub struct PadRegistry {
    /// Path of the durable record.
    path: PathBuf,
    /// The current pad list.
    pads: Vec<Pad>,
}

impl PadRegistry {
    /// Opens the registry stored in the given directory, substituting the
    /// default set when the record is absent or malformed.
    pub fn open(store_dir: &Path) -> PadRegistry {
        let path = store_dir.join(format!("{}.json", STORAGE_KEY));
        let pads = match Self::read(&path) {
            Ok(pads) => {
                debug!(path = ?path, pads = pads.len(), "Pad store loaded");
                pads
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Using default pads");
                pads::default_pads()
            }
        };
        PadRegistry { path, pads }
    }

    fn read(path: &Path) -> Result<Vec<Pad>, Box<dyn Error>> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Gets the current pad list, in order.
    pub fn pads(&self) -> &[Pad] {
        &self.pads
    }

    /// Looks a pad up by id.
    pub fn lookup(&self, pad_id: &str) -> Option<&Pad> {
        self.pads.iter().find(|pad| pad.id() == pad_id)
    }

    /// Applies a partial update to a pad and persists the list. An update
    /// touching the audio payload drops the engine's cached decode for the
    /// pad before anything else happens.
    pub fn update(
        &mut self,
        engine: &AudioEngine,
        pad_id: &str,
        update: PadUpdate,
    ) -> Result<(), Box<dyn Error>> {
        if update.touches_payload() {
            engine.invalidate(pad_id);
        }

        let pad = self
            .pads
            .iter_mut()
            .find(|pad| pad.id() == pad_id)
            .ok_or_else(|| format!("no pad with id {}", pad_id))?;
        pad.apply(update);
        self.persist()
    }

    /// Restores the built-in default set and persists it, dropping every
    /// cached decode.
    pub fn reset(&mut self, engine: &AudioEngine) -> Result<(), Box<dyn Error>> {
        for pad in &self.pads {
            engine.invalidate(pad.id());
        }
        self.pads = pads::default_pads();
        self.persist()
    }

    fn persist(&self) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.pads)?)?;
        debug!(path = ?self.path, "Pad store written");
        Ok(())
    }
}

impl std::fmt::Debug for PadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PadRegistry")
            .field("path", &self.path)
            .field("pads", &self.pads.len())
            .finish()
    }
}
