use std::fmt;

use serde::Deserialize;

/// Transport scheme used to reach the server.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// Response format requested through the `FORMAT` clause.
///
/// Only [`Format::Json`] is decoded; the other variants exist so that a
/// configuration naming them is accepted and then rejected with
/// [`ClickHouseError::UnsupportedFormat`](crate::ClickHouseError::UnsupportedFormat).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Format {
    #[default]
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "JSONCompact")]
    JsonCompact,
    #[serde(rename = "JSONEachRow")]
    JsonEachRow,
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "TabSeparated")]
    TabSeparated,
}

impl Format {
    /// The token placed after `FORMAT` in query text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::JsonCompact => "JSONCompact",
            Self::JsonEachRow => "JSONEachRow",
            Self::Csv => "CSV",
            Self::TabSeparated => "TabSeparated",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response compression negotiated with the server.
///
/// Parsing is lenient: any unrecognised value means [`Compression::None`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Deflate,
    /// Decoded by the client rather than the transport.
    Brotli,
}

impl Compression {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// `Accept-Encoding` token, if any.
    pub fn encoding_token(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("gzip"),
            Self::Deflate => Some("deflate"),
            Self::Brotli => Some("br"),
        }
    }
}

impl From<&str> for Compression {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            "br" | "brotli" => Self::Brotli,
            _ => Self::None,
        }
    }
}

impl From<String> for Compression {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
