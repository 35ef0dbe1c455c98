//! String-keyed generator configuration.
//!
//! Generators are configured from a flat map of parameters, the same shape an
//! annotation or XML mapping would produce. [`Params`] stores the raw strings;
//! the typed getters turn malformed values into [`ConfigError`]s so
//! misconfiguration fails at boot instead of on first use.

use core::str::FromStr;
use std::collections::BTreeMap;

use crate::ConfigError;

/// Name of the sequence backing a sequence-style generator.
pub const SEQUENCE_PARAM: &str = "sequence_name";
/// Default for [`SEQUENCE_PARAM`].
pub const DEF_SEQUENCE_NAME: &str = "id_sequence";

/// Name of the table backing a table generator.
pub const TABLE_PARAM: &str = "table_name";
/// Default for [`TABLE_PARAM`].
pub const DEF_TABLE_NAME: &str = "id_generators";

/// Column holding the next value.
pub const VALUE_COLUMN_PARAM: &str = "value_column_name";
/// Default for [`VALUE_COLUMN_PARAM`].
pub const DEF_VALUE_COLUMN: &str = "next_val";

/// Column holding the segment key of a table generator row.
pub const SEGMENT_COLUMN_PARAM: &str = "segment_column_name";
/// Accepted alias of [`SEGMENT_COLUMN_PARAM`].
pub const PK_COLUMN_PARAM: &str = "pk_column_name";
/// Default for [`SEGMENT_COLUMN_PARAM`].
pub const DEF_SEGMENT_COLUMN: &str = "sequence_name";

/// Which row (segment) of the table a generator uses.
pub const SEGMENT_VALUE_PARAM: &str = "segment_value";
/// Default for [`SEGMENT_VALUE_PARAM`].
pub const DEF_SEGMENT_VALUE: &str = "default";
/// Length of the segment column, used by schema export.
pub const SEGMENT_LENGTH_PARAM: &str = "segment_value_length";
/// Default for [`SEGMENT_LENGTH_PARAM`].
pub const DEF_SEGMENT_LENGTH: u32 = 255;

/// Default the segment value to the entity table instead of
/// [`DEF_SEGMENT_VALUE`].
pub const PREFER_SEGMENT_PER_ENTITY_PARAM: &str = "prefer_entity_table_as_segment_value";
/// The table of the entity the generator serves.
pub const TARGET_TABLE_PARAM: &str = "target_table";

/// Starting raw value of the backing structure.
pub const INITIAL_PARAM: &str = "initial_value";
/// Default for [`INITIAL_PARAM`].
pub const DEFAULT_INITIAL_VALUE: i64 = 1;

/// Block size per physical access.
pub const INCREMENT_PARAM: &str = "increment_size";
/// Default for [`INCREMENT_PARAM`].
pub const DEFAULT_INCREMENT_SIZE: i64 = 1;

/// Optimizer strategy name.
pub const OPT_PARAM: &str = "optimizer";
/// Pick `pooled-lo` instead of `pooled` when no optimizer is named.
pub const PREFER_POOLED_LO_PARAM: &str = "prefer_pooled_values_lo";

/// Use a table even when the database supports sequences.
pub const FORCE_TABLE_PARAM: &str = "force_table_use";

/// Bound on the optimistic update loop of table structures.
pub const RETRY_LIMIT_PARAM: &str = "optimistic_retry_limit";
/// Default for [`RETRY_LIMIT_PARAM`].
pub const DEFAULT_RETRY_LIMIT: u32 = 64;

/// Schema qualifier for unqualified structure names.
pub const SCHEMA_PARAM: &str = "schema";
/// Catalog qualifier for unqualified structure names.
pub const CATALOG_PARAM: &str = "catalog";

/// Raw generator parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> Option<String> {
        self.0.insert(key.into(), value.to_string())
    }

    /// Returns the trimmed value of `key`; blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// # Errors
    ///
    /// [`ConfigError::MissingParameter`] if `key` is absent or blank.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingParameter(key.to_owned()))
    }

    /// Parses `key` if present.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] if the value does not parse.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        self.get(key)
            .map(|raw| raw.parse::<T>().map_err(|e| ConfigError::invalid(key, raw, e.to_string())))
            .transpose()
    }

    /// Like [`Self::parse`] with a fallback for absent keys.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] if the value does not parse.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        Ok(self.parse(key)?.unwrap_or(default))
    }

    /// Reads a `true`/`false` flag.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidParameter`] for anything else.
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(ConfigError::invalid(key, raw, "expected `true` or `false`")),
        }
    }

    /// Qualifies `name` with the `catalog` / `schema` parameters unless it
    /// already contains a `.`.
    pub fn qualify(&self, name: &str) -> String {
        if name.contains('.') {
            return name.to_owned();
        }
        [self.get(CATALOG_PARAM), self.get(SCHEMA_PARAM), Some(name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        params.extend(iter);
        params
    }
}

impl<K: Into<String>, V: ToString> Extend<(K, V)> for Params {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
