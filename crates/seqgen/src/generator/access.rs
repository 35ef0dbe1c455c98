use crate::{AccessCallback, DatabaseStructure, Result, Session};

/// Connects an optimizer to a structure for the duration of one `generate`.
pub(crate) struct StructureAccess<'s, 'a> {
    pub(crate) structure: &'s DatabaseStructure,
    pub(crate) session: Session<'a>,
}

impl AccessCallback for StructureAccess<'_, '_> {
    fn next_value(&mut self) -> Result<i64> {
        self.structure.next_value(&self.session)
    }

    fn tenant_identifier(&self) -> Option<&str> {
        self.session.tenant_identifier()
    }
}
