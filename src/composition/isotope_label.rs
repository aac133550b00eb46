use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Serialize, Serializer};

use crate::{
    IsotopeLabel, MassNumber,
    errors::{ElemassError, InvalidFormulaKind},
};

impl IsotopeLabel {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            mass_number: None,
        }
    }

    // NOTE: A mass number of 0 stands for "unspecified", so `new_isotope("C", 0)` is the same as `new("C")`
    pub fn new_isotope(element: impl Into<String>, mass_number: u32) -> Self {
        Self {
            element: element.into(),
            mass_number: MassNumber::new(mass_number),
        }
    }

    // The pseudo-element tracking adducted protons (and with them, charge)
    pub fn proton() -> Self {
        Self::new("H+")
    }

    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    #[must_use]
    pub const fn mass_number(&self) -> Option<MassNumber> {
        self.mass_number
    }
}

impl FromStr for IsotopeLabel {
    type Err = Box<ElemassError>;

    // NOTE: This scan is lenient: brackets may be unterminated or misplaced, and only non-numeric bracket contents
    // are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut element = String::new();
        let mut digits = String::new();
        let mut in_brackets = false;
        for c in s.chars() {
            match c {
                '[' => in_brackets = true,
                ']' => in_brackets = false,
                c if in_brackets => digits.push(c),
                c => element.push(c),
            }
        }

        let mass_number = if digits.is_empty() {
            None
        } else {
            let mass_number = digits
                .parse()
                .map_err(|_| ElemassError::invalid_formula(s, InvalidFormulaKind::IsotopeTag))?;
            MassNumber::new(mass_number)
        };

        Ok(Self {
            element,
            mass_number,
        })
    }
}

impl Display for IsotopeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element)?;
        if let Some(mass_number) = self.mass_number {
            write!(f, "[{mass_number}]")?;
        }
        Ok(())
    }
}

impl Serialize for IsotopeLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// Module Tests ========================================================================================================
