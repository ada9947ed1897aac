//! Supported OFX revisions.

use std::{fmt, str::FromStr};

use super::serialize::Syntax;
use crate::error::ConvertError;

/// A revision of the OFX standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OfxVersion {
    /// 1.0.2
    #[default]
    V102,
    /// 1.0.3
    V103,
    /// 1.5.1
    V151,
    /// 1.6.0
    V160,
    /// 2.0.0
    V200,
    /// 2.0.1
    V201,
    /// 2.0.2
    V202,
    /// 2.0.3
    V203,
    /// 2.1.0
    V210,
    /// 2.1.1
    V211,
    /// 2.2.0
    V220,
}

impl OfxVersion {
    /// Every supported revision, oldest first.
    pub const ALL: [OfxVersion; 11] = [
        Self::V102,
        Self::V103,
        Self::V151,
        Self::V160,
        Self::V200,
        Self::V201,
        Self::V202,
        Self::V203,
        Self::V210,
        Self::V211,
        Self::V220,
    ];

    /// Version as written in the OFX header, e.g. `"102"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V102 => "102",
            Self::V103 => "103",
            Self::V151 => "151",
            Self::V160 => "160",
            Self::V200 => "200",
            Self::V201 => "201",
            Self::V202 => "202",
            Self::V203 => "203",
            Self::V210 => "210",
            Self::V211 => "211",
            Self::V220 => "220",
        }
    }

    /// Syntax family: SGML for 1.x, XML for 2.x.
    #[must_use]
    pub const fn syntax(&self) -> Syntax {
        match self {
            Self::V102 | Self::V103 | Self::V151 | Self::V160 => Syntax::Legacy,
            _ => Syntax::Modern,
        }
    }

    /// Accepted version strings.
    #[must_use]
    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::as_str).collect()
    }
}

impl fmt::Display for OfxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfxVersion {
    type Err = ConvertError;

    /// Parses `"102"` or the dotted `"1.0.2"`.
    ///
    /// ```
    /// use file2ofx_core::ofx::OfxVersion;
    ///
    /// assert_eq!("1.0.2".parse::<OfxVersion>().unwrap(), OfxVersion::V102);
    /// assert_eq!("220".parse::<OfxVersion>().unwrap(), OfxVersion::V220);
    /// assert!("2.3".parse::<OfxVersion>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        let compact = if parts.len() == 3 && parts.iter().all(|p| p.len() == 1) {
            parts.concat()
        } else {
            trimmed.to_string()
        };

        Self::ALL.into_iter().find(|v| v.as_str() == compact).ok_or_else(|| {
            ConvertError::UnsupportedVersion {
                requested: s.to_string(),
                supported: Self::supported(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        for version in OfxVersion::ALL {
            let legacy = version.as_str().starts_with('1');
            assert_eq!(version.syntax() == Syntax::Legacy, legacy, "{version}");
        }
    }

    #[test]
    fn test_default_is_102() {
        assert_eq!(OfxVersion::default(), OfxVersion::V102);
    }

    #[test]
    fn test_unsupported_lists_every_version() {
        let err = "999".parse::<OfxVersion>().unwrap_err();
        match err {
            ConvertError::UnsupportedVersion { requested, supported } => {
                assert_eq!(requested, "999");
                assert_eq!(supported.len(), 11);
                assert_eq!(supported[0], "102");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!("".parse::<OfxVersion>().is_err());
        assert!("1.0.2.0".parse::<OfxVersion>().is_err());
    }
}
