use std::sync::LazyLock;

use regex::Regex;

use crate::{
    Composition, IsotopeLabel, MassTable,
    errors::{ElemassError, InvalidFormulaKind, Result},
};

// NOTE: The first regex validates the whole formula, and the second pulls out one atom at a time. Both follow the
// same grammar:
//   Formula = { Atom } ;
//   Atom = Symbol , [ "[" , Mass Number , "]" ] , [ Count ] ;
//   Symbol = uppercase letter , { lowercase letter } ;
//   Count = [ "-" ] , digit , { digit } ;
static FLAT_FORMULA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Z][a-z]*(?:\[\d+\])?(?:-?\d+)?)*$").unwrap());
static FLAT_ATOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z][a-z]*)(?:\[(\d+)\])?(-?\d+)?").unwrap());

pub(super) fn formula(table: &MassTable, text: &str) -> Result<Composition> {
    if !FLAT_FORMULA.is_match(text) {
        return Err(Box::new(ElemassError::invalid_formula(
            text,
            InvalidFormulaKind::Grammar,
        )));
    }

    let mut composition = Composition::default();
    for atom in FLAT_ATOM.captures_iter(text) {
        let symbol = &atom[1];
        if !table.contains_element(symbol) {
            return Err(Box::new(ElemassError::unknown_element(symbol)));
        }
        let label = match atom.get(2) {
            Some(digits) => {
                let mass_number = digits.as_str().parse().map_err(|_| {
                    ElemassError::invalid_formula(text, InvalidFormulaKind::IsotopeTag)
                })?;
                IsotopeLabel::new_isotope(symbol, mass_number)
            }
            None => IsotopeLabel::new(symbol),
        };
        let count = match atom.get(3) {
            Some(digits) => digits
                .as_str()
                .parse()
                .map_err(|_| ElemassError::invalid_formula(text, InvalidFormulaKind::AtomCount))?,
            None => 1,
        };
        composition
            .checked_accumulate(label, count)
            .ok_or_else(|| ElemassError::invalid_formula(text, InvalidFormulaKind::CountOverflow))?;
    }
    Ok(composition)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use crate::{MassTable, errors::ElemassError, testing_tools::composition};

    use super::*;

    static TABLE: LazyLock<MassTable> = LazyLock::new(MassTable::default);

    #[test]
    fn parse_simple_formulae() {
        let parse = |text| formula(&TABLE, text).unwrap();
        assert_eq!(parse("H2O"), composition(&[("H", 2), ("O", 1)]));
        assert_eq!(
            parse("C6H12O6"),
            composition(&[("C", 6), ("H", 12), ("O", 6)])
        );
        assert_eq!(parse("NaCl"), composition(&[("Na", 1), ("Cl", 1)]));
        // Atoms can come in any order, and a count of 1 can be spelled out
        assert_eq!(parse("O1H2"), composition(&[("H", 2), ("O", 1)]));
        assert!(parse("").is_empty());
    }

    #[test]
    fn parse_negative_counts() {
        let water_loss = formula(&TABLE, "H-2O-1").unwrap();
        assert_eq!(water_loss, composition(&[("H", -2), ("O", -1)]));
    }

    #[test]
    fn repeated_atoms_accumulate() {
        assert_eq!(
            formula(&TABLE, "HOH").unwrap(),
            composition(&[("H", 2), ("O", 1)])
        );
        // Counts that cancel out drop their atom entirely
        assert!(formula(&TABLE, "HH-1").unwrap().is_empty());
    }

    #[test]
    fn parse_isotope_tags() {
        assert_eq!(
            formula(&TABLE, "C[13]2C3").unwrap(),
            composition(&[("C[13]", 2), ("C", 3)])
        );
        assert_eq!(formula(&TABLE, "O[18]").unwrap(), composition(&[("O[18]", 1)]));
        // A mass number of 0 means "unspecified"
        assert_eq!(formula(&TABLE, "C[0]4").unwrap(), composition(&[("C", 4)]));
    }

    #[test]
    fn unknown_elements_are_rejected() {
        let error = *formula(&TABLE, "Xx2").unwrap_err();
        assert!(matches!(
            error,
            ElemassError::UnknownElement { ref symbol } if symbol == "Xx"
        ));
    }

    #[test]
    fn malformed_formulae_are_rejected() {
        for text in ["h2O", "2HO", "H2O ", "H+", "H2O-", "[13]C"] {
            let error = *formula(&TABLE, text).unwrap_err();
            assert!(matches!(
                error,
                ElemassError::InvalidFormula {
                    kind: InvalidFormulaKind::Grammar,
                    ..
                }
            ));
        }
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let parse_error = |text| {
            let error = *formula(&TABLE, text).unwrap_err();
            match error {
                ElemassError::InvalidFormula { kind, .. } => kind,
                other => panic!("expected an invalid formula error, got {other:?}"),
            }
        };
        // Mass numbers are u32s and counts are i32s
        assert_eq!(
            parse_error("H[4294967296]"),
            InvalidFormulaKind::IsotopeTag
        );
        assert_eq!(parse_error("H2147483648"), InvalidFormulaKind::AtomCount);
        assert_eq!(
            parse_error("H2147483647H1"),
            InvalidFormulaKind::CountOverflow
        );
    }
}
