//! Parsing, manipulation, and mass calculation of chemical formulae

pub mod errors;
pub mod tables;

mod composition;
mod parsers;
#[cfg(test)]
mod testing_tools;

// Standard Library Imports
use std::{cell::Cell, num::NonZeroU32};

// External Crate Imports
use ahash::HashMap;
use rust_decimal::Decimal;
use serde::Serialize;

pub use composition::calculate_mass;
pub use errors::{ElemassError, Result};
pub use tables::MassTable;

use tables::TableId;

/// A collection of isotope labels and their signed counts, as parsed from a chemical formula like `"C6H12O6"` or
/// `"C[13]2C3H8"`
#[derive(Debug, Default)]
pub struct Composition {
    counts: HashMap<IsotopeLabel, Count>,
    cache: MassCache,
}

// ---------------------------------------------------------------------------------------------------------------------

// NOTE: Counts are signed so that a composition can also describe a chemical loss (like the H2O given up during a
// condensation reaction) without needing a separate wrapper type
pub type Count = i32;

pub type Charge = i32;

/// An element symbol with an optional mass number: `C` refers to carbon of any isotope, whilst `C[13]` is carbon-13
/// specifically
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct IsotopeLabel {
    element: String,
    mass_number: Option<MassNumber>,
}

// NOTE: A mass number of 0 means "unspecified" and is modelled as `None` wherever it could appear, so the numbers
// stored here are always non-zero
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct MassNumber(NonZeroU32);

/// Selects which mass is looked up for labels without an explicit mass number
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize)]
pub enum MassMode {
    /// The mass of each element's most abundant isotope
    #[default]
    Monoisotopic,
    /// The abundance-weighted mean mass over each element's naturally occurring isotopes
    Average,
}

// ---------------------------------------------------------------------------------------------------------------------

// NOTE: `Cell` lets cached masses be written through `&self`, but it also makes compositions `!Sync`. They are built
// for single-threaded use, so hand a `Clone` to any code running on another thread
#[derive(Debug, Default)]
struct MassCache(Cell<Option<CachedMass>>);

#[derive(Clone, Copy, Debug)]
struct CachedMass {
    mode: MassMode,
    charge: Charge,
    table: TableId,
    mass: Decimal,
}
