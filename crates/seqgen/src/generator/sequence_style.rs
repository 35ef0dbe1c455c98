use crate::{
    Capabilities, ConfigError, DatabaseStructure, IdentifierGenerator, IdentifierType,
    IdentifierValue, LockedOptimizer, OptimizerDescriptor, OptimizerSettings, Params, Result,
    SchemaObject, SequenceStructure, Session, TableStructure, build_optimizer, config,
};

use super::StructureAccess;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Typed parameters of a [`SequenceStyleGenerator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceStyleConfig {
    /// Sequence name, qualified with `catalog` / `schema` when given. Also the
    /// table name when falling back to a table.
    pub sequence_name: String,
    /// Value column of the fallback table.
    pub value_column: String,
    pub force_table_use: bool,
    pub optimizer: OptimizerSettings,
}

impl TryFrom<&Params> for SequenceStyleConfig {
    type Error = ConfigError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        let mut optimizer = OptimizerSettings::try_from(params)?;

        if optimizer.descriptor == OptimizerDescriptor::None && optimizer.increment_size > 1 {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                increment_size = optimizer.increment_size,
                "optimizer `none` configured with an increment size above 1; using 1"
            );
            optimizer.increment_size = 1;
        }

        Ok(Self {
            sequence_name: params.qualify(params.get_or(config::SEQUENCE_PARAM, config::DEF_SEQUENCE_NAME)),
            value_column: params
                .get_or(config::VALUE_COLUMN_PARAM, config::DEF_VALUE_COLUMN)
                .to_owned(),
            force_table_use: params.flag(config::FORCE_TABLE_PARAM, false)?,
            optimizer,
        })
    }
}

/// Draws identifiers from a database sequence, or from a single-row table
/// where sequences are unavailable.
///
/// # Example
/// ```
/// use seqgen::{
///     Capabilities, IdentifierGenerator, IdentifierType, IdentifierValue, MemoryDatabase, Params,
///     SequenceStyleGenerator, Session,
/// };
///
/// let params = Params::new()
///     .with("sequence_name", "order_seq")
///     .with("increment_size", 10)
///     .with("optimizer", "hilo");
/// let generator =
///     SequenceStyleGenerator::configure(IdentifierType::Long, &params, &Capabilities::default())
///         .unwrap();
///
/// let db = MemoryDatabase::new();
/// db.create_all(&generator.schema_objects()).unwrap();
///
/// let session = Session::new(&db);
/// assert_eq!(generator.generate(&session).unwrap(), IdentifierValue::Long(1));
/// assert_eq!(generator.generate(&session).unwrap(), IdentifierValue::Long(2));
/// assert_eq!(generator.times_accessed(), 1);
/// ```
#[derive(Debug)]
pub struct SequenceStyleGenerator {
    identifier_type: IdentifierType,
    structure: DatabaseStructure,
    optimizer: LockedOptimizer,
}

impl SequenceStyleGenerator {
    /// Builds the generator from already validated settings.
    ///
    /// # Errors
    ///
    /// Anything [`build_optimizer`] rejects.
    pub fn from_config(
        identifier_type: IdentifierType,
        config: &SequenceStyleConfig,
        capabilities: &Capabilities,
    ) -> Result<Self, ConfigError> {
        let settings = &config.optimizer;
        let optimizer = build_optimizer(
            settings.descriptor,
            settings.increment_size,
            settings.explicit_initial_value,
        )?;
        let applies = optimizer.applies_increment_size_to_source_values();

        let structure = if config.force_table_use || !capabilities.supports_sequences {
            #[cfg(feature = "tracing")]
            tracing::info!(
                name = %config.sequence_name,
                forced = config.force_table_use,
                "using a table in place of a sequence"
            );
            DatabaseStructure::Table(
                TableStructure::new(
                    config.sequence_name.as_str(),
                    config.value_column.as_str(),
                    None,
                    settings.initial_value,
                    settings.increment_size,
                    applies,
                )
                .with_retry_limit(settings.retry_limit),
            )
        } else {
            DatabaseStructure::Sequence(SequenceStructure::new(
                config.sequence_name.as_str(),
                settings.initial_value,
                settings.increment_size,
                applies,
            ))
        };

        Ok(Self {
            identifier_type,
            structure,
            optimizer: LockedOptimizer::new(optimizer),
        })
    }

    pub fn identifier_type(&self) -> IdentifierType {
        self.identifier_type
    }

    pub fn optimizer(&self) -> &LockedOptimizer {
        &self.optimizer
    }

    pub fn database_structure(&self) -> &DatabaseStructure {
        &self.structure
    }

    /// Physical accesses made so far.
    pub fn times_accessed(&self) -> u64 {
        self.structure.times_accessed()
    }
}

impl IdentifierGenerator for SequenceStyleGenerator {
    fn configure(
        identifier_type: IdentifierType,
        params: &Params,
        capabilities: &Capabilities,
    ) -> Result<Self, ConfigError> {
        Self::from_config(identifier_type, &SequenceStyleConfig::try_from(params)?, capabilities)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(generator = %self.generator_key())))]
    fn generate(&self, session: &Session<'_>) -> Result<IdentifierValue> {
        let mut access = StructureAccess {
            structure: &self.structure,
            session: *session,
        };
        let raw = self.optimizer.try_generate(&mut access)?;
        self.identifier_type.coerce(raw)
    }

    fn generator_key(&self) -> &str {
        self.structure.name()
    }

    fn schema_objects(&self) -> Vec<SchemaObject> {
        vec![self.structure.schema_object()]
    }
}
