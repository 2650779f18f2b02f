//! Rendering helpers for captured data and byte counts

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

const BYTE_UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// How captured chunks are rendered by the log sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// Do not render chunk contents, only their length
    None,
    /// Lossy UTF-8
    #[default]
    Text,
    /// Lowercase space separated hex
    Hex,
    Both,
}

impl CaptureFormat {
    pub fn shows_text(self) -> bool {
        matches!(self, CaptureFormat::Text | CaptureFormat::Both)
    }

    pub fn shows_hex(self) -> bool {
        matches!(self, CaptureFormat::Hex | CaptureFormat::Both)
    }
}

impl FromStr for CaptureFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CaptureFormat::None),
            "text" => Ok(CaptureFormat::Text),
            "hex" => Ok(CaptureFormat::Hex),
            "both" => Ok(CaptureFormat::Both),
            other => bail!("unknown capture format '{}', expected none, text, hex or both", other),
        }
    }
}

/// Render bytes as `"47 45 54"`
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Render bytes as text, replacing invalid UTF-8 and escaping control characters
pub fn render_text(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for c in String::from_utf8_lossy(data).chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}

/// Human readable byte count using 1024 based units
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, BYTE_UNITS[0])
    } else {
        format!("{:.2} {}", value, BYTE_UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(b"GET"), "47 45 54");
        assert_eq!(hex_dump(&[0x00, 0x0a, 0xff]), "00 0a ff");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render_text(b"GET /\r\n"), "GET /\\r\\n");
        assert_eq!(render_text(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(u64::MAX), "16.00 EB");
    }

    #[test]
    fn test_capture_format_parse() {
        assert_eq!("HEX".parse::<CaptureFormat>().unwrap(), CaptureFormat::Hex);
        assert_eq!("both".parse::<CaptureFormat>().unwrap(), CaptureFormat::Both);
        assert!("binary".parse::<CaptureFormat>().is_err());

        assert!(CaptureFormat::Both.shows_text() && CaptureFormat::Both.shows_hex());
        assert!(!CaptureFormat::None.shows_text() && !CaptureFormat::None.shows_hex());
    }
}
