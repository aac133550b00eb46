// Standard Library Imports
use std::{
    ops::Deref,
    str::FromStr,
    sync::{
        LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

// External Crate Imports
use ahash::HashMap;
use itertools::Itertools;
use knus::{
    Decode, DecodeScalar,
    ast::{self, Integer, Literal, Radix, TypeName},
    decode::{Context, Kind},
    errors::{DecodeError, ExpectedType},
    span::Spanned,
    traits::ErrorSpan,
};
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

// Local Crate Imports
use crate::{
    IsotopeLabel, MassMode, MassNumber,
    errors::{ElemassError, Result},
};

/// The mass table compiled into this crate, covering the elements of biochemistry along with the `H+` proton entry
/// used for charge bookkeeping
pub const DEFAULT_KDL: &str = include_str!("../../data/mass_table.kdl");

// Public API ==========================================================================================================

/// Maps element symbols to their isotopes' masses and natural abundances
#[derive(Clone, Debug)]
pub struct MassTable {
    id: TableId,
    elements: HashMap<String, ElementDescription>,
    symbols: Vec<String>,
}

impl MassTable {
    pub fn from_kdl(file_name: impl AsRef<str>, text: impl AsRef<str>) -> miette::Result<Self> {
        let parsed: MassTableKdl = knus::parse(file_name.as_ref(), text.as_ref())?;
        let mut elements = HashMap::default();
        for element in parsed.elements {
            let (symbol, description) = ElementEntry::try_from(element)?;
            if elements.insert(symbol.clone(), description).is_some() {
                return Err(MassTableError::DuplicateElement { symbol }.into());
            }
        }
        // Symbols are matched longest-first, so that (for example) a trailing "Se" is never misread as sulfur
        let symbols = elements
            .keys()
            .cloned()
            .sorted_unstable_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)))
            .collect();
        Ok(Self {
            id: TableId::next(),
            elements,
            symbols,
        })
    }

    /// A lazily built, shared copy of the default table, used by [`Composition::mass`](crate::Composition::mass)
    pub fn builtin() -> &'static Self {
        static BUILTIN: LazyLock<MassTable> = LazyLock::new(MassTable::default);
        &BUILTIN
    }

    #[must_use]
    pub fn contains_element(&self, symbol: impl AsRef<str>) -> bool {
        self.elements.contains_key(symbol.as_ref())
    }
}

impl Default for MassTable {
    // NOTE: `DEFAULT_KDL` is compiled into this crate and covered by the tests in this module, so this `unwrap()`
    // can never actually panic
    fn default() -> Self {
        Self::from_kdl("mass_table.kdl", DEFAULT_KDL).unwrap()
    }
}

// NOTE: Equality ignores `id`: two tables with the same entries return the same masses. Their ids still tell any
// cached masses apart
impl PartialEq for MassTable {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl Eq for MassTable {}

// Crate-Private Lookup Methods ========================================================================================

impl MassTable {
    pub(crate) fn isotope_mass(&self, label: &IsotopeLabel, mode: MassMode) -> Result<Decimal> {
        let element = self
            .elements
            .get(label.element())
            .ok_or_else(|| ElemassError::unknown_element(label.element()))?;
        match (label.mass_number(), mode) {
            (Some(mass_number), _) => {
                let isotope = element.isotopes.get(&mass_number).ok_or_else(|| {
                    ElemassError::unknown_isotope(
                        label.element(),
                        mass_number,
                        element.isotopes.keys().copied(),
                    )
                })?;
                Ok(isotope.relative_mass)
            }
            (None, MassMode::Monoisotopic) => Ok(element.standard_mass),
            (None, MassMode::Average) => Ok(element
                .isotopes
                .values()
                .filter_map(|isotope| isotope.abundance.map(|a| isotope.relative_mass * a))
                .sum()),
        }
    }

    pub(crate) fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub(crate) fn id(&self) -> TableId {
        self.id
    }
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Clone, Eq, PartialEq, Debug)]
struct ElementDescription {
    name: String,
    // The mass used for labels without an explicit mass number, by convention that of the most abundant isotope
    standard_mass: Decimal,
    isotopes: HashMap<MassNumber, Isotope>,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
struct Isotope {
    relative_mass: Decimal,
    abundance: Option<Decimal>,
}

// NOTE: Every table gets a fresh id, so a rebuilt table invalidates any masses cached against its predecessor even
// when their contents match
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct TableId(u64);

impl TableId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct MassTableKdl {
    #[knus(child, unwrap(children))]
    elements: Vec<ElementKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knus(node_name)]
    symbol: ElementSymbolKdl,
    #[knus(argument)]
    name: String,
    #[knus(child, unwrap(argument))]
    mass: DecimalKdl,
    #[knus(children(name = "isotope"))]
    isotopes: Vec<IsotopeKdl>,
}

#[derive(Debug, Decode)]
struct IsotopeKdl {
    #[knus(argument)]
    mass_number: u32,
    #[knus(argument)]
    relative_mass: DecimalKdl,
    #[knus(argument)]
    abundance: Option<DecimalKdl>,
}

// Lossless Parsing of KDL Numbers to Decimal ==========================================================================

#[derive(Debug, Default)]
struct DecimalKdl(Decimal);

impl<S: ErrorSpan> DecodeScalar<S> for DecimalKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        if let Some(t) = type_name {
            ctx.emit_error(DecodeError::TypeName {
                span: t.span().clone(),
                found: Some(t.deref().clone()),
                expected: ExpectedType::no_type(),
                rust_type: "Decimal",
            });
        }
    }

    fn raw_decode(
        value: &Spanned<Literal, S>,
        ctx: &mut Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        match &**value {
            Literal::Decimal(ast::Decimal(s)) | Literal::Int(Integer(Radix::Dec, s)) => {
                let res = if s.contains(['e', 'E']) {
                    Decimal::from_scientific(s)
                } else {
                    Decimal::from_str_exact(s)
                };
                match res {
                    Ok(d) => Ok(Self(d)),
                    Err(e) => {
                        ctx.emit_error(DecodeError::conversion(value, Box::new(e)));
                        Ok(Self::default())
                    }
                }
            }
            unsupported => {
                ctx.emit_error(DecodeError::unsupported(
                    value,
                    format!(
                        "expected a decimal number, found {}",
                        Kind::from(unsupported)
                    ),
                ));
                Ok(Self::default())
            }
        }
    }
}

// Element Symbol Validation ===========================================================================================

#[derive(Debug)]
struct ElementSymbolKdl(String);

impl FromStr for ElementSymbolKdl {
    type Err = InvalidSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chrs = s.chars();
        let valid = chrs.next().is_some_and(|f| f.is_ascii_uppercase()) && {
            let rest = chrs.as_str();
            // A single trailing '+' admits pseudo-elements like the "H+" proton entry
            let rest = rest.strip_suffix('+').unwrap_or(rest);
            rest.chars().all(|c| c.is_ascii_lowercase())
        };
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidSymbolError(s.to_owned()))
        }
    }
}

#[derive(Eq, PartialEq, Debug, Diagnostic, Error)]
#[error(
    "expected an uppercase ASCII letter, then lowercase ASCII letters, then an optional '+', got {0:?}"
)]
struct InvalidSymbolError(String);

// Conversion From Parsed KDL to Internal Representation ===============================================================

type ElementEntry = (String, ElementDescription);

impl TryFrom<ElementKdl> for ElementEntry {
    type Error = MassTableError;

    fn try_from(
        ElementKdl {
            symbol,
            name,
            mass,
            isotopes,
        }: ElementKdl,
    ) -> Result<Self, Self::Error> {
        let symbol = symbol.0;
        if isotopes.is_empty() {
            return Err(MassTableError::NoIsotopes { symbol });
        }
        let mut isotope_map = HashMap::default();
        for IsotopeKdl {
            mass_number,
            relative_mass,
            abundance,
        } in isotopes
        {
            let Some(mass_number) = MassNumber::new(mass_number) else {
                return Err(MassTableError::ZeroMassNumber { symbol });
            };
            let abundance = abundance.map(|a| a.0);
            if let Some(abundance) = abundance {
                if abundance < Decimal::ZERO || abundance > Decimal::ONE {
                    return Err(MassTableError::AbundanceOutOfRange {
                        symbol,
                        mass_number,
                        abundance,
                    });
                }
            }
            let isotope = Isotope {
                relative_mass: relative_mass.0,
                abundance,
            };
            if isotope_map.insert(mass_number, isotope).is_some() {
                return Err(MassTableError::DuplicateIsotope {
                    symbol,
                    mass_number,
                });
            }
        }
        let description = ElementDescription {
            name,
            standard_mass: mass.0,
            isotopes: isotope_map,
        };
        Ok((symbol, description))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
enum MassTableError {
    #[error("the element {symbol:?} appears more than once in the mass table")]
    DuplicateElement { symbol: String },

    #[error("the element {symbol:?} lists no isotopes")]
    #[diagnostic(help("every element needs at least one `isotope` node"))]
    NoIsotopes { symbol: String },

    #[error("the element {symbol:?} lists isotope {mass_number} more than once")]
    DuplicateIsotope {
        symbol: String,
        mass_number: MassNumber,
    },

    #[error("the element {symbol:?} lists an isotope with a mass number of 0")]
    #[diagnostic(help(
        "mass number 0 refers to an element's standard mass, so every isotope needs a positive mass number"
    ))]
    ZeroMassNumber { symbol: String },

    #[error("the abundance of {symbol}-{mass_number} ({abundance}) falls outside of the range 0 to 1")]
    AbundanceOutOfRange {
        symbol: String,
        mass_number: MassNumber,
        abundance: Decimal,
    },
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use knus::Decode;
    use rust_decimal_macros::dec;

    use crate::IsotopeLabel;

    use super::*;

    #[test]
    fn parse_default_mass_table() {
        let table: MassTableKdl = knus::parse("mass_table.kdl", DEFAULT_KDL).unwrap();
        assert_eq!(table.elements.len(), 23); // 22 elements + 1 for the proton
        assert_eq!(table.elements.iter().flat_map(|e| &e.isotopes).count(), 60);
    }

    #[test]
    fn build_default_mass_table() {
        let table = MassTable::from_kdl("mass_table.kdl", DEFAULT_KDL).unwrap();
        assert_eq!(table.elements.len(), 23);
        assert!(table.contains_element("H"));
        assert!(table.contains_element("H+"));
        assert!(table.contains_element("Br"));
        assert!(table.contains_element("Se"));
        assert!(!table.contains_element("Xx"));
        // Two-character symbols sort before their one-character prefixes
        let position = |symbol| table.symbols().iter().position(|s| s == symbol).unwrap();
        assert!(position("H+") < position("H"));
        assert!(position("Se") < position("S"));
    }

    #[test]
    fn equality_ignores_table_ids() {
        let first = MassTable::default();
        let second = MassTable::default();
        assert_ne!(first.id(), second.id());
        assert_eq!(first, second);
    }

    #[test]
    fn lowercase_element_symbol() {
        let kdl = indoc! {r#"
            h "Hydrogen" {
                mass 1.0078
                isotope 1 1.0078 1.0
            }
        "#};
        assert!(knus::parse::<Vec<ElementKdl>>("test", kdl).is_err());
    }

    #[test]
    fn misplaced_plus_in_element_symbol() {
        let kdl = indoc! {r#"
            N+a "Sodium?" {
                mass 22.9898
                isotope 23 22.9898 1.0
            }
        "#};
        assert!(knus::parse::<Vec<ElementKdl>>("test", kdl).is_err());
    }

    #[test]
    fn element_without_isotopes() {
        let kdl = indoc! {r#"
            elements {
                D "Deuterium" {
                    mass 2.0141
                }
            }
        "#};
        let error = MassTable::from_kdl("test", kdl).unwrap_err();
        assert_eq!(error.to_string(), r#"the element "D" lists no isotopes"#);
    }

    #[test]
    fn duplicate_element_entries() {
        let kdl = indoc! {r#"
            elements {
                H "Hydrogen" {
                    mass 1.0078
                    isotope 1 1.0078 1.0
                }
                H "Hydrogen Again" {
                    mass 1.0078
                    isotope 1 1.0078 1.0
                }
            }
        "#};
        let error = MassTable::from_kdl("test", kdl).unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"the element "H" appears more than once in the mass table"#
        );
    }

    #[test]
    fn duplicate_isotope_entries() {
        let kdl = indoc! {r#"
            elements {
                H "Hydrogen" {
                    mass 1.0078
                    isotope 1 1.0078 0.9
                    isotope 1 1.0079 0.1
                }
            }
        "#};
        let error = MassTable::from_kdl("test", kdl).unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"the element "H" lists isotope 1 more than once"#
        );
    }

    #[test]
    fn zero_mass_number_isotope() {
        let kdl = indoc! {r#"
            elements {
                H "Hydrogen" {
                    mass 1.0078
                    isotope 0 1.0078 1.0
                }
            }
        "#};
        let error = MassTable::from_kdl("test", kdl).unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"the element "H" lists an isotope with a mass number of 0"#
        );
    }

    #[test]
    fn out_of_range_abundance() {
        let kdl = indoc! {r#"
            elements {
                H "Hydrogen" {
                    mass 1.0078
                    isotope 1 1.0078 1.5
                }
            }
        "#};
        let error = MassTable::from_kdl("test", kdl).unwrap_err();
        assert_eq!(
            error.to_string(),
            "the abundance of H-1 (1.5) falls outside of the range 0 to 1"
        );
    }

    #[derive(Debug, Decode)]
    struct Lossless(#[knus(argument)] DecimalKdl);

    #[test]
    fn decimal_scientific() {
        let res = knus::parse::<Vec<Lossless>>("test", "lossless 5.485_799_090_65e-4");
        assert_eq!(res.unwrap()[0].0.0, dec!(0.000548579909065));
    }

    #[test]
    fn decimal_from_integer() {
        let res = knus::parse::<Vec<Lossless>>("test", "lossless 12");
        assert_eq!(res.unwrap()[0].0.0, dec!(12));
    }

    #[test]
    fn decimal_lack_of_precision() {
        let res = knus::parse::<Vec<Lossless>>("test", "lossless 1e-42");
        assert!(res.is_err());
    }

    #[test]
    fn decimal_illegal_type() {
        let res = knus::parse::<Vec<Lossless>>("test", "lossless (pi)3.14");
        assert!(res.is_err());
    }

    #[test]
    fn decimal_from_bool() {
        let res = knus::parse::<Vec<Lossless>>("test", "lossless true");
        assert!(res.is_err());
    }

    #[test]
    fn standard_mass_lookups() {
        let table = MassTable::builtin();
        let lookup = |label: &str, mode| table.isotope_mass(&label.parse().unwrap(), mode);
        assert_eq!(
            lookup("H", MassMode::Monoisotopic).unwrap(),
            dec!(1.00782503207)
        );
        assert_eq!(lookup("C", MassMode::Monoisotopic).unwrap(), dec!(12));
        assert_eq!(
            lookup("H+", MassMode::Monoisotopic).unwrap(),
            dec!(1.00727646677)
        );
    }

    #[test]
    fn average_mass_weighting_skips_abundance_free_isotopes() {
        let table = MassTable::builtin();
        let hydrogen = IsotopeLabel::new("H");
        // 1.00782503207 * 0.999885 + 2.0141017778 * 0.000115, with tritium contributing nothing
        assert_eq!(
            table.isotope_mass(&hydrogen, MassMode::Average).unwrap(),
            dec!(1.00794075389575895)
        );
    }

    #[test]
    fn explicit_mass_numbers_ignore_the_mode() {
        let table = MassTable::builtin();
        let deuterium = IsotopeLabel::new_isotope("H", 2);
        assert_eq!(
            table
                .isotope_mass(&deuterium, MassMode::Monoisotopic)
                .unwrap(),
            dec!(2.0141017778)
        );
        assert_eq!(
            table.isotope_mass(&deuterium, MassMode::Average).unwrap(),
            dec!(2.0141017778)
        );
    }

    #[test]
    fn unknown_element_lookup() {
        let table = MassTable::builtin();
        let error = table
            .isotope_mass(&IsotopeLabel::new("Xx"), MassMode::Monoisotopic)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"the element "Xx" could not be found in the supplied mass table"#
        );
    }

    #[test]
    fn unknown_isotope_lookup() {
        let table = MassTable::builtin();
        let error = table
            .isotope_mass(&IsotopeLabel::new_isotope("H", 7), MassMode::Monoisotopic)
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "the isotope H[7] could not be found in the supplied mass table"
        );
        assert_eq!(
            error.help().unwrap().to_string(),
            "the mass table only lists these isotopes of H: 1, 2, 3"
        );
    }
}
