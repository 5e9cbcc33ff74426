//! Byte-to-text decoding with lossy recovery.
//!
//! Documents arrive from the object store as raw bytes of unknown encoding.
//! [`decode`] tries UTF-8 first; when the bytes are not valid UTF-8 it falls
//! back to a single-byte (ISO-8859-1) reading, which maps every byte to the
//! code point of the same value and therefore cannot fail. Every such code
//! point is representable in UTF-8, so the re-encode step that would drop
//! unrepresentable characters has nothing to drop: decoding never aborts the
//! pipeline, and the worst case is mojibake rather than missing text.
//!
//! The fallback is flagged on the returned [`Decoded`] value so callers can
//! log or surface the degradation.

/// Text produced by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text.
    pub text: String,
    /// `true` when the input was not valid UTF-8 and the single-byte
    /// fallback was used. Characters may not match the source encoding.
    pub lossy: bool,
}

/// Decode raw document bytes into text.
///
/// Pure function of its input; never fails.
///
/// # Example
///
/// ```rust
/// use blob_reindex::decode::decode;
///
/// let ok = decode("héllo".as_bytes());
/// assert_eq!(ok.text, "héllo");
/// assert!(!ok.lossy);
///
/// let legacy = decode(&[0x63, 0x61, 0x66, 0xE9]); // "café" in Latin-1
/// assert_eq!(legacy.text, "café");
/// assert!(legacy.lossy);
/// ```
pub fn decode(raw: &[u8]) -> Decoded {
    match std::str::from_utf8(raw) {
        Ok(text) => Decoded {
            text: text.to_string(),
            lossy: false,
        },
        Err(_) => Decoded {
            text: latin1_to_string(raw),
            lossy: true,
        },
    }
}

/// Single-byte decoding: each byte becomes `char::from(byte)` (U+0000..=U+00FF).
fn latin1_to_string(raw: &[u8]) -> String {
    raw.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_passes_through() {
        let d = decode("line1\nline2 — ünïcödé 🚀\n".as_bytes());
        assert_eq!(d.text, "line1\nline2 — ünïcödé 🚀\n");
        assert!(!d.lossy);
    }

    #[test]
    fn test_empty_bytes() {
        let d = decode(b"");
        assert_eq!(d.text, "");
        assert!(!d.lossy);
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_single_byte() {
        // 0xFF is never valid in UTF-8.
        let d = decode(&[b'a', 0xFF, b'b']);
        assert!(d.lossy);
        assert_eq!(d.text, "a\u{FF}b");
        assert_eq!(d.text.chars().count(), 3);
    }

    #[test]
    fn test_fallback_keeps_one_char_per_byte() {
        let raw: Vec<u8> = (0u8..=255).collect();
        let d = decode(&raw);
        assert!(d.lossy);
        assert_eq!(d.text.chars().count(), 256);
        for (i, c) in d.text.chars().enumerate() {
            assert_eq!(c as u32, i as u32);
        }
    }

    #[test]
    fn test_truncated_multibyte_sequence() {
        // First two bytes of a three-byte sequence ("€" = E2 82 AC).
        let d = decode(&[b'x', 0xE2, 0x82]);
        assert!(d.lossy);
        assert_eq!(d.text, "x\u{E2}\u{82}");
    }

    #[test]
    fn test_utf8_bom_is_preserved() {
        let d = decode(&[0xEF, 0xBB, 0xBF, b'h', b'i']);
        assert!(!d.lossy);
        assert_eq!(d.text, "\u{FEFF}hi");
    }
}
