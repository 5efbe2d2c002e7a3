//! Decoding of fixed-size C strings embedded in shared memory records.
//!
//! The plugin copies names straight out of the game, so the bytes can be
//! UTF-8, Windows-1252 (common for Scandinavian driver and server names), or
//! garbage left behind by a crashed writer. Decoding never fails: each
//! strategy is tried in order and the last one always produces something.

use std::borrow::Cow;
use tracing::warn;

/// Code points for bytes 0x80..=0x9F in Windows-1252. `None` marks the five
/// bytes the code page leaves undefined.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Which decoding strategy produced a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Windows1252,
    /// UTF-8 with invalid sequences dropped.
    Utf8Lossy,
}

/// Decode a null-terminated byte buffer into text with trailing whitespace trimmed.
///
/// Bytes after the first NUL are ignored. See [`decode_c_string_with_encoding`]
/// to learn which fallback was taken.
pub fn decode_c_string(buffer: &[u8]) -> String {
    decode_c_string_with_encoding(buffer).0
}

/// Decode a null-terminated byte buffer, reporting the encoding that succeeded.
pub fn decode_c_string_with_encoding(buffer: &[u8]) -> (String, Encoding) {
    let bytes = until_nul(buffer);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.trim_end().to_owned(), Encoding::Utf8);
    }

    if let Some(text) = decode_windows_1252(bytes) {
        return (text.trim_end().to_owned(), Encoding::Windows1252);
    }

    warn!(len = bytes.len(), "String is neither UTF-8 nor Windows-1252, dropping invalid bytes");
    (utf8_dropping_invalid(bytes).trim_end().to_owned(), Encoding::Utf8Lossy)
}

/// The prefix of `buffer` before the first NUL byte (or all of it).
fn until_nul(buffer: &[u8]) -> &[u8] {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    &buffer[..end]
}

/// Strict Windows-1252 decode; `None` if any byte is undefined in the code page.
fn decode_windows_1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)],
            _ => Some(char::from(b)),
        })
        .collect()
}

fn utf8_dropping_invalid(bytes: &[u8]) -> Cow<'_, str> {
    let mut chunks = bytes.utf8_chunks();
    match chunks.next() {
        Some(first) if first.invalid().is_empty() => Cow::Borrowed(first.valid()),
        Some(first) => {
            let mut text = String::with_capacity(bytes.len());
            text.push_str(first.valid());
            for chunk in chunks {
                text.push_str(chunk.valid());
            }
            Cow::Owned(text)
        }
        None => Cow::Borrowed(""),
    }
}
