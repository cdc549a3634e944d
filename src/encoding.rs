//! Text encoding inference and decoding.
//!
//! A statistical detector guesses an encoding from the first
//! [`SNIFF_BYTES`] of a file. The guess is only trusted above
//! [`CONFIDENCE_THRESHOLD`]; decoding then cascades from the guess to UTF-8
//! before a file is declared binary.

use std::borrow::Cow;

/// Maximum number of bytes handed to the detector.
pub const SNIFF_BYTES: usize = 10 * 1024;

/// Guesses at or below this confidence are discarded.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// A detector's guess for a byte buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingGuess {
    /// Charset label as reported by the detector.
    pub name: String,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f32,
}

/// Statistical charset detection.
pub trait EncodingDetector: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> Option<EncodingGuess>;
}

/// Detector backed by the `chardet` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChardetDetector;

impl EncodingDetector for ChardetDetector {
    fn detect(&self, bytes: &[u8]) -> Option<EncodingGuess> {
        let (charset, confidence, _language) = chardet::detect(&bytes.to_vec());
        if charset.is_empty() {
            return None;
        }
        Some(EncodingGuess {
            name: chardet::charset2encoding(&charset).to_string(),
            confidence,
        })
    }
}

/// Decoded file text together with the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: String,
}

/// Encoding resolution and the decoding cascade.
pub struct EncodingResolver {
    detector: Box<dyn EncodingDetector>,
    threshold: f32,
}

impl Default for EncodingResolver {
    fn default() -> Self {
        Self::new(Box::new(ChardetDetector))
    }
}

impl std::fmt::Debug for EncodingResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodingResolver")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl EncodingResolver {
    /// Use a specific detector with the default threshold.
    pub fn new(detector: Box<dyn EncodingDetector>) -> Self {
        Self {
            detector,
            threshold: CONFIDENCE_THRESHOLD,
        }
    }

    /// Lowercased encoding name if the detector is confident enough.
    /// Only the first [`SNIFF_BYTES`] of `prefix` are inspected.
    pub fn resolve(&self, prefix: &[u8]) -> Option<String> {
        let sample = &prefix[..prefix.len().min(SNIFF_BYTES)];
        let guess = self.detector.detect(sample)?;
        if guess.confidence > self.threshold && !guess.name.is_empty() {
            Some(guess.name.to_lowercase())
        } else {
            None
        }
    }

    /// Decode `bytes`: resolved encoding first, then UTF-8. `None` means
    /// neither worked and the caller should treat the bytes as binary.
    pub fn decode(&self, bytes: &[u8], resolved: Option<&str>) -> Option<Decoded> {
        if let Some(name) = resolved {
            if let Some(text) = decode_with_label(bytes, name) {
                return Some(Decoded {
                    text,
                    encoding: name.to_string(),
                });
            }
        }

        std::str::from_utf8(bytes).ok().map(|text| Decoded {
            text: text.to_string(),
            encoding: "utf-8".to_string(),
        })
    }

    /// [`resolve`](Self::resolve) on the prefix followed by
    /// [`decode`](Self::decode).
    pub fn resolve_and_decode(&self, bytes: &[u8]) -> Option<Decoded> {
        let resolved = self.resolve(bytes);
        self.decode(bytes, resolved.as_deref())
    }
}

/// Strict decode with a WHATWG label; unknown labels and malformed input
/// both yield `None`.
fn decode_with_label(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())?;
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}
