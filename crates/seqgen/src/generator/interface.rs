use crate::{Capabilities, ConfigError, IdentifierType, IdentifierValue, Params, Result, SchemaObject, Session};

/// A configured identifier generator bound to one entity's identifier.
///
/// Generators are immutable after [`Self::configure`] and shared across
/// threads; every call to [`Self::generate`] may run concurrently.
pub trait IdentifierGenerator: Send + Sync {
    /// Reads `params` and builds the generator.
    ///
    /// Misconfiguration is reported here, never deferred to the first
    /// `generate` call.
    fn configure(
        identifier_type: IdentifierType,
        params: &Params,
        capabilities: &Capabilities,
    ) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Returns the next identifier
    fn generate(&self, session: &Session<'_>) -> Result<IdentifierValue>;

    /// Name of the store object this generator draws from. Generators with
    /// the same key share a counter.
    fn generator_key(&self) -> &str;

    /// The objects that must exist before the first `generate` call.
    fn schema_objects(&self) -> Vec<SchemaObject>;
}
