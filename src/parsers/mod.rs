use crate::{
    Composition, MassTable,
    errors::{ElemassError, InvalidFormulaKind, Result},
};

mod flat;
mod nested;

// NOTE: Both scanners below index into the formula byte-by-byte, so non-ASCII text is rejected up front
pub(crate) fn formula(table: &MassTable, text: &str) -> Result<Composition> {
    if !text.is_ascii() {
        return Err(Box::new(ElemassError::invalid_formula(
            text,
            InvalidFormulaKind::NonAscii,
        )));
    }
    if text.contains(['(', ')']) {
        nested::formula(table, text)
    } else {
        flat::formula(table, text)
    }
}

// Module Tests ========================================================================================================
