use core::{fmt, str::FromStr};

use crate::{
    ConfigError, HiLoOptimizer, LegacyHiLoOptimizer, NoopOptimizer, Optimizer, PooledLoOptimizer,
    PooledOptimizer,
};

/// The optimization strategies a generator can be configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum OptimizerDescriptor {
    /// One physical access per identifier.
    None,
    /// The stored value is a block number, multiplied locally.
    HiLo,
    /// Block numbers with `increment_size + 1` values per block.
    LegacyHiLo,
    /// The stored value is the high end of the block.
    Pooled,
    /// The stored value is the low end of the block.
    PooledLo,
}

impl OptimizerDescriptor {
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::HiLo,
        Self::LegacyHiLo,
        Self::Pooled,
        Self::PooledLo,
    ];

    /// The name used in the `optimizer` parameter.
    pub const fn external_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::HiLo => "hilo",
            Self::LegacyHiLo => "legacy-hilo",
            Self::Pooled => "pooled",
            Self::PooledLo => "pooled-lo",
        }
    }

    pub const fn is_pooled(self) -> bool {
        matches!(self, Self::Pooled | Self::PooledLo)
    }

    /// The strategy used when none is configured: `none` for blocks of one,
    /// otherwise `pooled` (or `pooled-lo` if preferred).
    pub const fn implicit(increment_size: i64, prefer_pooled_lo: bool) -> Self {
        if increment_size <= 1 {
            Self::None
        } else if prefer_pooled_lo {
            Self::PooledLo
        } else {
            Self::Pooled
        }
    }
}

impl fmt::Display for OptimizerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.external_name())
    }
}

impl FromStr for OptimizerDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.external_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownStrategy(name.to_owned()))
    }
}

/// Builds the optimizer for `descriptor`.
///
/// `initial_value` is the explicitly configured initial value, if any; the
/// pooled strategy uses it to recognize a freshly created sequence.
///
/// # Errors
///
/// [`ConfigError::InvalidParameter`] if `increment_size < 1` for any strategy
/// other than `none`.
pub fn build_optimizer(
    descriptor: OptimizerDescriptor,
    increment_size: i64,
    initial_value: Option<i64>,
) -> Result<Optimizer, ConfigError> {
    if descriptor != OptimizerDescriptor::None && increment_size < 1 {
        return Err(ConfigError::invalid(
            crate::config::INCREMENT_PARAM,
            increment_size,
            format!("the {descriptor} optimizer needs an increment size of at least 1"),
        ));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(optimizer = %descriptor, increment_size, ?initial_value, "building optimizer");

    Ok(match descriptor {
        OptimizerDescriptor::None => Optimizer::None(NoopOptimizer::new(increment_size)),
        OptimizerDescriptor::HiLo => Optimizer::HiLo(HiLoOptimizer::new(increment_size)),
        OptimizerDescriptor::LegacyHiLo => {
            Optimizer::LegacyHiLo(LegacyHiLoOptimizer::new(increment_size))
        }
        OptimizerDescriptor::Pooled => {
            Optimizer::Pooled(PooledOptimizer::new(increment_size, initial_value))
        }
        OptimizerDescriptor::PooledLo => Optimizer::PooledLo(PooledLoOptimizer::new(increment_size)),
    })
}
