//! Character sets for CSV exports.
//!
//! Spreadsheet software commonly expects Windows-1252, so that is the
//! default. Characters the target set cannot represent are dropped.

use std::fmt;
use std::str::FromStr;

use evolugrid_common::error::WireError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    Utf8,
    Latin1,
    #[default]
    Windows1252,
}

/// Code points for bytes 0x80..=0x9F in Windows-1252. Zero marks an
/// unassigned byte.
const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030,
    0x0160, 0x2039, 0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D,
    0x2022, 0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E,
    0x0178,
];

fn cp1252_byte(c: char) -> Option<u8> {
    let cp = c as u32;
    match cp {
        0..=0x7F | 0xA0..=0xFF => Some(cp as u8),
        _ => CP1252_HIGH
            .iter()
            .position(|&x| x != 0 && x as u32 == cp)
            .map(|i| 0x80 + i as u8),
    }
}

impl Charset {
    /// Canonical label, as used in a `Content-Type` header.
    pub fn label(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Windows1252 => "Windows-1252",
        }
    }

    /// Transcode text, silently dropping anything unmappable.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Latin1 => text
                .chars()
                .filter_map(|c| u8::try_from(c as u32).ok())
                .collect(),
            Charset::Windows1252 => text.chars().filter_map(cp1252_byte).collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Charset {
    type Err = WireError;

    /// Accepts the usual aliases. A trailing `//IGNORE` or `//TRANSLIT` is
    /// tolerated; dropping is always the behavior.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.split("//").next().unwrap_or(s).trim();
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "UTF8" => Ok(Charset::Utf8),
            "ISO88591" | "LATIN1" => Ok(Charset::Latin1),
            "WINDOWS1252" | "CP1252" => Ok(Charset::Windows1252),
            _ => Err(WireError::UnsupportedEncoding(s.to_string())),
        }
    }
}
