use core::{fmt, str::FromStr};

use crate::{ConfigError, Error, Result};

/// The integral type of an entity's identifier attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IdentifierType {
    /// 16-bit signed.
    Short,
    /// 32-bit signed.
    Integer,
    /// 64-bit signed.
    #[default]
    Long,
}

impl IdentifierType {
    /// Narrows a raw generated value to this type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentifierOverflow`] if `raw` is out of range.
    pub fn coerce(self, raw: i64) -> Result<IdentifierValue> {
        let overflow = || Error::IdentifierOverflow {
            value: raw,
            target: self,
        };
        Ok(match self {
            Self::Short => IdentifierValue::Short(i16::try_from(raw).map_err(|_| overflow())?),
            Self::Integer => IdentifierValue::Integer(i32::try_from(raw).map_err(|_| overflow())?),
            Self::Long => IdentifierValue::Long(raw),
        })
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
        })
    }
}

impl FromStr for IdentifierType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" | "i16" => Ok(Self::Short),
            "integer" | "int" | "i32" => Ok(Self::Integer),
            "long" | "i64" => Ok(Self::Long),
            _ => Err(ConfigError::invalid(
                "identifier_type",
                s,
                "expected one of short, integer, long",
            )),
        }
    }
}

/// A generated identifier, typed to match its attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum IdentifierValue {
    Short(i16),
    Integer(i32),
    Long(i64),
}

impl IdentifierValue {
    /// Widens the value back to `i64`.
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Short(v) => v as i64,
            Self::Integer(v) => v as i64,
            Self::Long(v) => v,
        }
    }

    pub const fn identifier_type(self) -> IdentifierType {
        match self {
            Self::Short(_) => IdentifierType::Short,
            Self::Integer(_) => IdentifierType::Integer,
            Self::Long(_) => IdentifierType::Long,
        }
    }
}

impl From<IdentifierValue> for i64 {
    fn from(value: IdentifierValue) -> Self {
        value.as_i64()
    }
}

impl fmt::Display for IdentifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}
