use std::fmt;
use std::str::FromStr;

use relay_core::ConfigError;

use crate::connectors::{CONVERSION_UPLOAD_KIND, INLINE_KIND, JSON_FILE_KIND, LOG_KIND};
use crate::replay::REPLAY_KIND;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Inline,
    JsonFile,
    Replay,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Inline, SourceKind::JsonFile, SourceKind::Replay];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Inline => INLINE_KIND,
            SourceKind::JsonFile => JSON_FILE_KIND,
            SourceKind::Replay => REPLAY_KIND,
        }
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownConnector {
                role: "source",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationKind {
    ConversionUpload,
    Log,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 2] = [DestinationKind::ConversionUpload, DestinationKind::Log];

    pub fn as_str(&self) -> &'static str {
        match self {
            DestinationKind::ConversionUpload => CONVERSION_UPLOAD_KIND,
            DestinationKind::Log => LOG_KIND,
        }
    }
}

impl FromStr for DestinationKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DestinationKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownConnector {
                role: "destination",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
