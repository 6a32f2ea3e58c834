//! Textual filter descriptions, as used on the command line and in the config file.
//!
//! | Spec                 | Filter                              |
//! |----------------------|-------------------------------------|
//! | `chomp`              | [`Chomp`]                           |
//! | `from`               | [`FromEscape`]                      |
//! | `crlf-encode`        | [`Crlf`] encode                     |
//! | `crlf-encode-dots`   | [`Crlf`] encode with dot stuffing   |
//! | `crlf-decode`        | [`Crlf`] decode                     |
//! | `crlf-decode-dots`   | [`Crlf`] decode with dot unstuffing |
//! | `strip-header:Name`  | [`StripHeader`] for `Name`          |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{AnyFilter, Chomp, Crlf, CrlfDirection, Filter, FilterKind, FromEscape, StripHeader};
use crate::error::FilterError;

/// One filter in a chain, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterSpec {
    Chomp,
    From,
    Crlf { direction: CrlfDirection, dots: bool },
    StripHeader(String),
}

impl FilterSpec {
    /// Build a fresh filter instance for this spec.
    pub fn build(&self) -> AnyFilter {
        let kind = match self {
            Self::Chomp => FilterKind::from(Chomp::new()),
            Self::From => FilterKind::from(FromEscape::new()),
            Self::Crlf { direction, dots } => FilterKind::from(Crlf::new(*direction, *dots)),
            Self::StripHeader(name) => FilterKind::from(StripHeader::new(name)),
        };
        Filter::new(kind)
    }
}

impl FromStr for FilterSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(name) = s.strip_prefix("strip-header:") {
            let name = name.trim();
            if name.is_empty() || name.contains(':') || name.contains(char::is_whitespace) {
                return Err(FilterError::InvalidFilterSpec(format!(
                    "bad header name in '{s}'"
                )));
            }
            return Ok(Self::StripHeader(name.to_string()));
        }

        let spec = match s {
            "chomp" => Self::Chomp,
            "from" => Self::From,
            "crlf-encode" => Self::Crlf {
                direction: CrlfDirection::Encode,
                dots: false,
            },
            "crlf-encode-dots" => Self::Crlf {
                direction: CrlfDirection::Encode,
                dots: true,
            },
            "crlf-decode" => Self::Crlf {
                direction: CrlfDirection::Decode,
                dots: false,
            },
            "crlf-decode-dots" => Self::Crlf {
                direction: CrlfDirection::Decode,
                dots: true,
            },
            other => {
                return Err(FilterError::InvalidFilterSpec(format!(
                    "unknown filter '{other}'"
                )))
            }
        };
        Ok(spec)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chomp => f.write_str("chomp"),
            Self::From => f.write_str("from"),
            Self::Crlf { direction, dots } => {
                let direction = match direction {
                    CrlfDirection::Encode => "encode",
                    CrlfDirection::Decode => "decode",
                };
                write!(f, "crlf-{direction}")?;
                if *dots {
                    f.write_str("-dots")?;
                }
                Ok(())
            }
            Self::StripHeader(name) => write!(f, "strip-header:{name}"),
        }
    }
}

impl TryFrom<String> for FilterSpec {
    type Error = FilterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FilterSpec> for String {
    fn from(spec: FilterSpec) -> Self {
        spec.to_string()
    }
}
