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

//! Upload validation for custom pad clips.
//!
//! Checks run in order: declared type, size, byte signature. Passing all
//! three does not guarantee the bytes decode; the engine's decode attempt is
//! the final arbiter and reports its own error.

/// Maximum accepted payload size.
pub const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Accepted MIME subtypes, with or without the `audio/` prefix.
const ALLOWED_SUBTYPES: [&str; 5] = ["mpeg", "wav", "mp3", "wave", "x-wav"];

/// Reasons an upload is refused before it reaches the engine.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported audio type: {0}")]
    WrongMimeType(String),

    #[error("file is {0} bytes, above the 5 MiB limit")]
    TooLarge(usize),

    #[error("bytes carry neither an MP3 nor a WAV signature")]
    BadSignature,
}

/// Validates raw upload bytes against the declared MIME type.
pub fn validate(bytes: &[u8], declared_type: &str) -> Result<(), ValidationError> {
    let subtype = declared_type
        .strip_prefix("audio/")
        .unwrap_or(declared_type);
    if !ALLOWED_SUBTYPES
        .iter()
        .any(|allowed| subtype.eq_ignore_ascii_case(allowed))
    {
        return Err(ValidationError::WrongMimeType(declared_type.to_string()));
    }

    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::TooLarge(bytes.len()));
    }

    if !has_mp3_signature(bytes) && !has_wav_signature(bytes) {
        return Err(ValidationError::BadSignature);
    }

    Ok(())
}

/// An ID3 tag at offset 0, or an MPEG frame sync: 0xFF followed by a byte
/// with the top three bits set.
fn has_mp3_signature(bytes: &[u8]) -> bool {
    if bytes.starts_with(b"ID3") {
        return true;
    }
    matches!(bytes, [0xff, second, ..] if second & 0xe0 == 0xe0)
}

/// A RIFF container declaring the WAVE form: `RIFF` at offset 0 and `WAVE`
/// at offset 8.
fn has_wav_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_header() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&[0x24, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"WAVE");
        bytes
    }

    #[test]
    fn test_declared_type_allow_list() {
        let bytes = wav_header();
        for declared in ["audio/mpeg", "audio/wav", "audio/mp3", "audio/wave", "audio/x-wav"] {
            assert_eq!(Ok(()), validate(&bytes, declared), "{declared}");
        }
        // Bare subtypes are accepted too.
        assert_eq!(Ok(()), validate(&bytes, "wav"));

        assert_eq!(
            Err(ValidationError::WrongMimeType("audio/ogg".to_string())),
            validate(&bytes, "audio/ogg")
        );
        assert_eq!(
            Err(ValidationError::WrongMimeType("text/plain".to_string())),
            validate(&bytes, "text/plain")
        );
    }

    #[test]
    fn test_size_limit() {
        let mut bytes = wav_header();
        bytes.resize(MAX_PAYLOAD_BYTES, 0);
        assert_eq!(Ok(()), validate(&bytes, "audio/wav"));

        bytes.push(0);
        assert_eq!(
            Err(ValidationError::TooLarge(MAX_PAYLOAD_BYTES + 1)),
            validate(&bytes, "audio/wav")
        );
    }

    #[test]
    fn test_mp3_signatures() {
        let mut id3 = b"ID3".to_vec();
        id3.resize(64, 0);
        assert_eq!(Ok(()), validate(&id3, "audio/mpeg"));

        // Frame sync: 0xFF then top three bits set.
        assert_eq!(Ok(()), validate(&[0xff, 0xfb, 0x90, 0x00], "audio/mpeg"));
        assert_eq!(Ok(()), validate(&[0xff, 0xe0], "audio/mpeg"));

        // Second byte missing the sync bits.
        assert_eq!(
            Err(ValidationError::BadSignature),
            validate(&[0xff, 0x1b, 0x90, 0x00], "audio/mpeg")
        );
    }

    #[test]
    fn test_wav_signature_needs_both_markers() {
        let mut bytes = b"RIFF\x00\x00\x00\x00JUNK".to_vec();
        assert_eq!(Err(ValidationError::BadSignature), validate(&bytes, "audio/wav"));

        bytes[8..12].copy_from_slice(b"WAVE");
        assert_eq!(Ok(()), validate(&bytes, "audio/wav"));
    }

    #[test]
    fn test_riff_wave_blob_accepted_end_to_end() {
        // RIFF....WAVE with arbitrary chunk size bytes, padded to 1000 bytes.
        let mut bytes = wav_header();
        bytes.resize(1000, 0xab);
        assert_eq!(Ok(()), validate(&bytes, "audio/wav"));
    }

    #[test]
    fn test_all_zero_blob_rejected_with_bad_signature() {
        let bytes = vec![0u8; 1000];
        assert_eq!(Err(ValidationError::BadSignature), validate(&bytes, "audio/wav"));
    }

    #[test]
    fn test_checks_run_in_order() {
        // Wrong type wins over a bad signature.
        assert_eq!(
            Err(ValidationError::WrongMimeType("audio/flac".to_string())),
            validate(&[0u8; 4], "audio/flac")
        );
        // Size wins over a bad signature.
        let zeros = vec![0u8; MAX_PAYLOAD_BYTES + 1];
        assert_eq!(
            Err(ValidationError::TooLarge(MAX_PAYLOAD_BYTES + 1)),
            validate(&zeros, "audio/wav")
        );
    }
}
