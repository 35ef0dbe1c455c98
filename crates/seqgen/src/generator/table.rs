use crate::{
    Capabilities, ConfigError, DatabaseStructure, IdentifierGenerator, IdentifierType,
    IdentifierValue, LockedOptimizer, OptimizerSettings, Params, Result, SchemaObject, SegmentKey,
    Session, TableStructure, build_optimizer, config,
};

use super::StructureAccess;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Typed parameters of a [`TableGenerator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableGeneratorConfig {
    /// Qualified with `catalog` / `schema` when given.
    pub table_name: String,
    pub value_column: String,
    pub segment_column: String,
    pub segment_value: String,
    pub segment_length: u32,
    pub optimizer: OptimizerSettings,
}

impl TableGeneratorConfig {
    /// The segment value used when none is configured explicitly.
    fn default_segment_value(params: &Params) -> Result<String, ConfigError> {
        let per_entity = params.flag(config::PREFER_SEGMENT_PER_ENTITY_PARAM, false)?;
        Ok(if per_entity {
            params.require(config::TARGET_TABLE_PARAM)?.to_owned()
        } else {
            config::DEF_SEGMENT_VALUE.to_owned()
        })
    }
}

impl TryFrom<&Params> for TableGeneratorConfig {
    type Error = ConfigError;

    fn try_from(params: &Params) -> Result<Self, Self::Error> {
        let table_name = params.qualify(params.get_or(config::TABLE_PARAM, config::DEF_TABLE_NAME));
        let segment_column = params
            .get(config::SEGMENT_COLUMN_PARAM)
            .or_else(|| params.get(config::PK_COLUMN_PARAM))
            .unwrap_or(config::DEF_SEGMENT_COLUMN)
            .to_owned();

        let segment_value = match params.get(config::SEGMENT_VALUE_PARAM) {
            Some(value) => value.to_owned(),
            None => {
                let value = Self::default_segment_value(params)?;
                #[cfg(feature = "tracing")]
                tracing::info!(
                    table = %table_name,
                    column = %segment_column,
                    segment = %value,
                    "no explicit segment value for id generator, using default"
                );
                value
            }
        };

        let segment_length = params.parse_or(config::SEGMENT_LENGTH_PARAM, config::DEF_SEGMENT_LENGTH)?;
        if segment_length == 0 || segment_value.chars().count() > segment_length as usize {
            return Err(ConfigError::invalid(
                config::SEGMENT_LENGTH_PARAM,
                segment_length,
                format!("segment value `{segment_value}` does not fit"),
            ));
        }

        Ok(Self {
            table_name,
            value_column: params
                .get_or(config::VALUE_COLUMN_PARAM, config::DEF_VALUE_COLUMN)
                .to_owned(),
            segment_column,
            segment_value,
            segment_length,
            optimizer: OptimizerSettings::try_from(params)?,
        })
    }
}

/// Draws identifiers from one row of a shared generator table.
///
/// Each generator owns the row keyed by its segment value; the row is created
/// on first use. Updates are optimistic (`where value = <read value>`) and
/// retried when another process got there first.
#[derive(Debug)]
pub struct TableGenerator {
    identifier_type: IdentifierType,
    structure: DatabaseStructure,
    optimizer: LockedOptimizer,
}

impl TableGenerator {
    /// Builds the generator from already validated settings.
    ///
    /// # Errors
    ///
    /// Anything [`build_optimizer`] rejects.
    pub fn from_config(
        identifier_type: IdentifierType,
        config: &TableGeneratorConfig,
    ) -> Result<Self, ConfigError> {
        let settings = &config.optimizer;
        let optimizer = build_optimizer(
            settings.descriptor,
            settings.increment_size,
            settings.explicit_initial_value,
        )?;

        let structure = TableStructure::new(
            config.table_name.as_str(),
            config.value_column.as_str(),
            Some(SegmentKey {
                column: config.segment_column.clone(),
                value: config.segment_value.clone(),
                length: config.segment_length,
            }),
            settings.initial_value,
            settings.increment_size,
            optimizer.applies_increment_size_to_source_values(),
        )
        .with_retry_limit(settings.retry_limit);

        Ok(Self {
            identifier_type,
            structure: DatabaseStructure::Table(structure),
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

    pub fn segment_value(&self) -> &str {
        match &self.structure {
            DatabaseStructure::Table(table) => table.segment().map_or("", |s| s.value.as_str()),
            DatabaseStructure::Sequence(_) => "",
        }
    }

    /// Physical accesses to the generator table so far.
    pub fn table_access_count(&self) -> u64 {
        self.structure.times_accessed()
    }
}

impl IdentifierGenerator for TableGenerator {
    fn configure(
        identifier_type: IdentifierType,
        params: &Params,
        _capabilities: &Capabilities,
    ) -> Result<Self, ConfigError> {
        Self::from_config(identifier_type, &TableGeneratorConfig::try_from(params)?)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(segment = %self.segment_value())))]
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
