use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use miette::Diagnostic;
use thiserror::Error;

use crate::{Charge, MassNumber};

pub type Result<T, E = Box<ElemassError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum ElemassError {
    #[error("the formula {formula:?} {kind}")]
    #[diagnostic(help("double-check the formula for typos and unmatched parentheses"))]
    InvalidFormula {
        formula: String,
        kind: InvalidFormulaKind,
    },

    #[error("the element {symbol:?} could not be found in the supplied mass table")]
    #[diagnostic(help("double-check for typos, or add {symbol:?} to the mass table"))]
    UnknownElement { symbol: String },

    #[error("the isotope {symbol}[{mass_number}] could not be found in the supplied mass table")]
    #[diagnostic(help("the mass table only lists these isotopes of {symbol}: {found}"))]
    UnknownIsotope {
        symbol: String,
        mass_number: MassNumber,
        found: String,
    },

    #[error("the charge argument ({given:+}) is ambiguous when the composition already stores protons ({stored:+})")]
    #[diagnostic(help("drop the charge argument to use the stored proton count, or pass a charge of 0 to ignore it"))]
    AmbiguousCharge { stored: Charge, given: Charge },
}

impl ElemassError {
    pub(crate) fn invalid_formula(formula: &str, kind: InvalidFormulaKind) -> Self {
        let formula = formula.to_owned();

        Self::InvalidFormula { formula, kind }
    }

    pub(crate) fn unknown_element(symbol: &str) -> Self {
        let symbol = symbol.to_owned();

        Self::UnknownElement { symbol }
    }

    pub(crate) fn unknown_isotope(
        symbol: &str,
        mass_number: MassNumber,
        known: impl IntoIterator<Item = MassNumber>,
    ) -> Self {
        let symbol = symbol.to_owned();
        let found = known.into_iter().sorted_unstable().join(", ");

        Self::UnknownIsotope {
            symbol,
            mass_number,
            found,
        }
    }

    pub(crate) fn ambiguous_charge(stored: Charge, given: Charge) -> Self {
        Self::AmbiguousCharge { stored, given }
    }
}

/// Pins down which rule of the formula grammar a rejected formula broke
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InvalidFormulaKind {
    Grammar,
    UnbalancedParenthesis,
    AtomCount,
    GroupCoefficient,
    IsotopeTag,
    DanglingCount,
    CountOverflow,
    NonAscii,
}

impl Display for InvalidFormulaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Grammar => "does not match the formula grammar",
            Self::UnbalancedParenthesis => "has unbalanced parentheses",
            Self::AtomCount => "contains an invalid atom count",
            Self::GroupCoefficient => "contains an invalid group coefficient",
            Self::IsotopeTag => "contains an invalid isotope tag",
            Self::DanglingCount => "contains a count with nothing to multiply",
            Self::CountOverflow => "contains counts too large to represent",
            Self::NonAscii => "contains non-ASCII characters",
        })
    }
}

// Module Tests ========================================================================================================
