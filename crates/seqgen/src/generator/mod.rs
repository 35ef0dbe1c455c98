mod access;
mod interface;
mod sequence_style;
mod table;
#[cfg(test)]
mod tests;

use access::StructureAccess;
pub use interface::*;
pub use sequence_style::*;
pub use table::*;

use crate::{ConfigError, OptimizerDescriptor, Params, config};

/// Settings shared by both generator kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub descriptor: OptimizerDescriptor,
    pub increment_size: i64,
    pub initial_value: i64,
    /// `initial_value` as configured, `None` if the default applies.
    pub explicit_initial_value: Option<i64>,
    pub retry_limit: u32,
}

impl TryFrom<&Params> for OptimizerSettings {
    type Error = ConfigError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        let increment_size = params.parse_or(config::INCREMENT_PARAM, config::DEFAULT_INCREMENT_SIZE)?;
        let explicit_initial_value = params.parse::<i64>(config::INITIAL_PARAM)?;

        let descriptor = match params.get(config::OPT_PARAM) {
            Some(name) => name.parse()?,
            None => OptimizerDescriptor::implicit(
                increment_size,
                params.flag(config::PREFER_POOLED_LO_PARAM, false)?,
            ),
        };

        let retry_limit = params.parse_or(config::RETRY_LIMIT_PARAM, config::DEFAULT_RETRY_LIMIT)?;
        if retry_limit == 0 {
            return Err(ConfigError::invalid(
                config::RETRY_LIMIT_PARAM,
                retry_limit,
                "at least one attempt is required",
            ));
        }

        Ok(Self {
            descriptor,
            increment_size,
            initial_value: explicit_initial_value.unwrap_or(config::DEFAULT_INITIAL_VALUE),
            explicit_initial_value,
            retry_limit,
        })
    }
}
