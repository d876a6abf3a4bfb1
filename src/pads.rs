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

//! The pad data model: one pad combines a key binding, a display name, an
//! optional custom audio clip, and playback parameters.

use serde::{Deserialize, Serialize};

/// A single configured trigger unit.
///
/// The durable record uses camelCase field names; the audio payload is stored
/// base64-encoded. A pad without a payload synthesizes its sound from its
/// name on trigger.
#[derive(Deserialize, Clone, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Pad {
    /// Opaque identifier, unique within a pad set.
    id: String,

    /// The bound key. Matching is case-insensitive; uniqueness across pads
    /// is not enforced.
    key: char,

    /// Display label. Selects the synthesis recipe (case-insensitively) when
    /// no custom clip is set.
    name: String,

    /// Presentation color tag (1-9). Not consumed by the engine.
    color: u8,

    /// Encoded bytes of a user-supplied clip.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    audio_payload: Option<Vec<u8>>,

    /// Original file name of the uploaded clip, kept as a decode format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio_file_name: Option<String>,

    /// Playback gain. Nominally [0, 1] but deliberately not clamped here;
    /// whatever is stored is passed through to the gain stage.
    volume: f32,

    /// Trim region start in seconds into the decoded clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trim_start: Option<f64>,

    /// Trim region end in seconds. Unset means play to the end of the clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    trim_end: Option<f64>,
}

impl Pad {
    /// Gets the pad identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the bound key.
    pub fn key(&self) -> char {
        self.key
    }

    /// Returns true if the given key matches this pad's binding,
    /// case-insensitively.
    pub fn matches_key(&self, key: char) -> bool {
        self.key.eq_ignore_ascii_case(&key)
    }

    /// Gets the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the presentation color tag.
    pub fn color(&self) -> u8 {
        self.color
    }

    /// Gets the custom clip bytes, if any.
    pub fn audio_payload(&self) -> Option<&[u8]> {
        self.audio_payload.as_deref()
    }

    /// Gets the uploaded file name, if any.
    pub fn audio_file_name(&self) -> Option<&str> {
        self.audio_file_name.as_deref()
    }

    /// Gets the playback gain.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Gets the trim region start in seconds.
    pub fn trim_start(&self) -> Option<f64> {
        self.trim_start
    }

    /// Gets the trim region end in seconds.
    pub fn trim_end(&self) -> Option<f64> {
        self.trim_end
    }

    /// Applies a partial update. Fields absent from the update are left
    /// untouched; `volume` is stored as given, without clamping.
    pub fn apply(&mut self, update: PadUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(key) = update.key {
            self.key = key;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(volume) = update.volume {
            self.volume = volume;
        }
        if let Some(audio_payload) = update.audio_payload {
            self.audio_payload = audio_payload;
        }
        if let Some(audio_file_name) = update.audio_file_name {
            self.audio_file_name = audio_file_name;
        }
        if let Some(trim_start) = update.trim_start {
            self.trim_start = trim_start;
        }
        if let Some(trim_end) = update.trim_end {
            self.trim_end = trim_end;
        }
    }
}

/// A partial pad update. The clearable fields (`audio_payload`,
/// `audio_file_name`, `trim_start`, `trim_end`) are doubly optional: the
/// outer `None` means "leave alone", `Some(None)` means "clear".
#[derive(Clone, Debug, Default)]
pub struct PadUpdate {
    pub name: Option<String>,
    pub key: Option<char>,
    pub color: Option<u8>,
    pub volume: Option<f32>,
    pub audio_payload: Option<Option<Vec<u8>>>,
    pub audio_file_name: Option<Option<String>>,
    pub trim_start: Option<Option<f64>>,
    pub trim_end: Option<Option<f64>>,
}

impl PadUpdate {
    /// Returns true if this update replaces or clears the audio payload, in
    /// which case any cached decode for the pad must be dropped.
    pub fn touches_payload(&self) -> bool {
        self.audio_payload.is_some()
    }
}

/// The built-in nine pad default set.
pub fn default_pads() -> Vec<Pad> {
    const DEFAULTS: [(&str, char, &str, u8); 9] = [
        ("1", '1', "Kick", 1),
        ("2", '2', "Snare", 2),
        ("3", '3', "Hi-Hat", 3),
        ("4", 'Q', "Clap", 4),
        ("5", 'W', "Tom", 5),
        ("6", 'E', "Crash", 6),
        ("7", 'A', "Bass", 7),
        ("8", 'S', "Synth", 8),
        ("9", 'D', "FX", 9),
    ];

    DEFAULTS
        .iter()
        .map(|&(id, key, name, color)| Pad {
            id: id.to_string(),
            key,
            name: name.to_string(),
            color,
            audio_payload: None,
            audio_file_name: None,
            volume: 0.8,
            trim_start: None,
            trim_end: None,
        })
        .collect()
}

/// Serde adapter storing optional byte blobs as base64 strings.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
impl Pad {
    /// Creates a pad directly (test only).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        key: char,
        name: &str,
        color: u8,
        audio_payload: Option<Vec<u8>>,
        volume: f32,
        trim_start: Option<f64>,
        trim_end: Option<f64>,
    ) -> Pad {
        Pad {
            id: id.to_string(),
            key,
            name: name.to_string(),
            color,
            audio_payload,
            audio_file_name: None,
            volume,
            trim_start,
            trim_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pads() {
        let pads = default_pads();
        assert_eq!(pads.len(), 9);

        let ids: Vec<&str> = pads.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9"]);

        let keys: Vec<char> = pads.iter().map(|p| p.key()).collect();
        assert_eq!(keys, vec!['1', '2', '3', 'Q', 'W', 'E', 'A', 'S', 'D']);

        for pad in &pads {
            assert!((pad.volume() - 0.8).abs() < f32::EPSILON);
            assert!(pad.audio_payload().is_none());
            assert!(pad.trim_start().is_none());
            assert!(pad.trim_end().is_none());
        }
    }

    #[test]
    fn test_key_matching_is_case_insensitive() {
        let pads = default_pads();
        let clap = &pads[3];
        assert!(clap.matches_key('Q'));
        assert!(clap.matches_key('q'));
        assert!(!clap.matches_key('X'));
    }

    #[test]
    fn test_durable_record_field_names() {
        let mut pads = default_pads();
        pads[0].apply(PadUpdate {
            audio_payload: Some(Some(vec![1, 2, 3])),
            audio_file_name: Some(Some("hit.wav".to_string())),
            trim_start: Some(Some(0.5)),
            ..Default::default()
        });

        let json = serde_json::to_string(&pads[0]).unwrap();
        assert!(json.contains("\"audioPayload\""));
        assert!(json.contains("\"audioFileName\""));
        assert!(json.contains("\"trimStart\""));
        // Payload is base64, not a byte array.
        assert!(json.contains("\"AQID\""));

        let restored: Pad = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.audio_payload(), Some(&[1u8, 2, 3][..]));
        assert_eq!(restored.audio_file_name(), Some("hit.wav"));
        assert_eq!(restored.trim_start(), Some(0.5));
    }

    #[test]
    fn test_apply_clears_doubly_optional_fields() {
        let mut pad = Pad::new("p", 'K', "Kick", 1, Some(vec![9; 4]), 0.8, Some(1.0), Some(2.0));

        pad.apply(PadUpdate {
            audio_payload: Some(None),
            trim_start: Some(None),
            trim_end: Some(None),
            ..Default::default()
        });

        assert!(pad.audio_payload().is_none());
        assert!(pad.trim_start().is_none());
        assert!(pad.trim_end().is_none());
        // Untouched fields survive.
        assert_eq!(pad.name(), "Kick");
    }

    #[test]
    fn test_volume_is_not_clamped() {
        let mut pad = Pad::new("p", 'K', "Kick", 1, None, 0.8, None, None);
        pad.apply(PadUpdate {
            volume: Some(2.5),
            ..Default::default()
        });
        assert!((pad.volume() - 2.5).abs() < f32::EPSILON);

        pad.apply(PadUpdate {
            volume: Some(-1.0),
            ..Default::default()
        });
        assert!((pad.volume() + 1.0).abs() < f32::EPSILON);
    }
}
