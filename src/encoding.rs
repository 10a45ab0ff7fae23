//! Text encodings used to turn captured output bytes into lines.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How raw output bytes are decoded into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEncoding {
    /// Strict UTF-8. Lines that are not valid UTF-8 are rejected.
    #[default]
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
    /// ISO-8859-1: each byte is the code point of the same value.
    Latin1,
}

/// A line could not be decoded with the configured encoding.
#[derive(Debug, Error)]
#[error("invalid {encoding} data: {source}")]
pub struct DecodeError {
    pub encoding: LineEncoding,
    #[source]
    pub source: std::str::Utf8Error,
}

#[derive(Debug, Error)]
#[error("unknown encoding '{0}' (expected utf8, utf8-lossy or latin1)")]
pub struct UnknownEncoding(pub String);

impl LineEncoding {
    /// Decode one line of output.
    pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            LineEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|source| DecodeError {
                    encoding: self,
                    source,
                }),
            LineEncoding::Utf8Lossy => Ok(String::from_utf8_lossy(bytes).into_owned()),
            LineEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    /// Encode text for writing to the child's input.
    ///
    /// Characters outside Latin-1 are sent as `?`.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            LineEncoding::Utf8 | LineEncoding::Utf8Lossy => text.as_bytes().to_vec(),
            LineEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

impl fmt::Display for LineEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEncoding::Utf8 => "utf8",
            LineEncoding::Utf8Lossy => "utf8-lossy",
            LineEncoding::Latin1 => "latin1",
        })
    }
}

impl FromStr for LineEncoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(LineEncoding::Utf8),
            "utf8-lossy" | "utf-8-lossy" | "lossy" => Ok(LineEncoding::Utf8Lossy),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(LineEncoding::Latin1),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_utf8_rejects_malformed() {
        assert_eq!(LineEncoding::Utf8.decode("héllo".as_bytes()).unwrap(), "héllo");
        assert!(LineEncoding::Utf8.decode(b"bad \xff byte").is_err());
    }

    #[test]
    fn test_lossy_replaces_malformed() {
        let text = LineEncoding::Utf8Lossy.decode(b"bad \xff byte").unwrap();
        assert_eq!(text, "bad \u{FFFD} byte");
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        assert_eq!(LineEncoding::Latin1.decode(b"caf\xe9").unwrap(), "café");
        assert_eq!(LineEncoding::Latin1.encode("café€"), b"caf\xe9?");
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("UTF-8".parse::<LineEncoding>().unwrap(), LineEncoding::Utf8);
        assert_eq!(
            "utf8-lossy".parse::<LineEncoding>().unwrap(),
            LineEncoding::Utf8Lossy
        );
        assert_eq!(
            "iso-8859-1".parse::<LineEncoding>().unwrap(),
            LineEncoding::Latin1
        );
        assert!("ebcdic".parse::<LineEncoding>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for enc in [LineEncoding::Utf8, LineEncoding::Utf8Lossy, LineEncoding::Latin1] {
            assert_eq!(enc.to_string().parse::<LineEncoding>().unwrap(), enc);
        }
    }
}
