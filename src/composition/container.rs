// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    ops::Index,
};

// External Crate Imports
use itertools::Itertools;
use serde::{Serialize, Serializer};

// Local Crate Imports
use crate::{Composition, Count, IsotopeLabel, MassCache, Result, parsers, tables::MassTable};

// Public API ==========================================================================================================

impl Composition {
    /// Parses a chemical formula, validating every element symbol against `table`
    pub fn new(table: &MassTable, formula: impl AsRef<str>) -> Result<Self> {
        parsers::formula(table, formula.as_ref())
    }

    /// Returns the stored count for `label`, or 0 if the label is absent
    #[must_use]
    pub fn get(&self, label: &IsotopeLabel) -> Count {
        self.counts.get(label).copied().unwrap_or_default()
    }

    /// Sets the count for `label`, removing the label entirely when `count` is 0
    pub fn set(&mut self, label: IsotopeLabel, count: Count) {
        if count == 0 {
            self.counts.remove(&label);
        } else {
            self.counts.insert(label, count);
        }
        self.cache.clear();
    }

    #[must_use]
    pub fn contains(&self, label: &IsotopeLabel) -> bool {
        self.counts.contains_key(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IsotopeLabel, Count)> {
        self.counts.iter().map(|(label, &count)| (label, count))
    }
}

// Equality, Indexing, and Conversion Trait Implementations ============================================================

// NOTE: Clones copy the counts but start with an empty mass cache
impl Clone for Composition {
    fn clone(&self) -> Self {
        Self {
            counts: self.counts.clone(),
            cache: MassCache::default(),
        }
    }
}

// NOTE: Cached masses are derived data, so a composition that's already had its mass calculated is still equal to a
// freshly parsed one with the same counts
impl PartialEq for Composition {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}

impl Eq for Composition {}

// NOTE: Unlike `HashMap`, indexing with an absent label returns 0 instead of panicking
impl Index<&IsotopeLabel> for Composition {
    type Output = Count;

    fn index(&self, label: &IsotopeLabel) -> &Self::Output {
        self.counts.get(label).unwrap_or(&0)
    }
}

impl FromIterator<(IsotopeLabel, Count)> for Composition {
    fn from_iter<I: IntoIterator<Item = (IsotopeLabel, Count)>>(iter: I) -> Self {
        let mut composition = Self::default();
        for (label, count) in iter {
            let total = composition.get(&label) + count;
            composition.set(label, total);
        }
        composition
    }
}

impl<S> From<std::collections::HashMap<IsotopeLabel, Count, S>> for Composition {
    fn from(counts: std::collections::HashMap<IsotopeLabel, Count, S>) -> Self {
        counts.into_iter().collect()
    }
}

// Display and Serialize Trait Implementations =========================================================================

// NOTE: Formatting follows the Hill convention: carbon first, then hydrogen, then everything else alphabetically.
// Compositions without any carbon order all of their labels alphabetically instead
impl Display for Composition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (label, count) in self.hill_ordered() {
            write!(f, "{label}")?;
            if count != 1 {
                write!(f, "{count}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Composition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.hill_ordered())
    }
}

// Crate-Private Helper Methods ========================================================================================

impl Composition {
    // NOTE: Labels of the same element are ordered with the unspecified isotope first, then by ascending mass number
    pub(crate) fn hill_ordered(&self) -> impl Iterator<Item = (&IsotopeLabel, Count)> {
        let has_carbon = self.counts.keys().any(|label| label.element() == "C");
        self.iter().sorted_unstable_by_key(move |&(label, _)| {
            let class = match label.element() {
                "C" if has_carbon => 0_u8,
                "H" if has_carbon => 1,
                _ => 2,
            };
            (class, label.element(), label.mass_number())
        })
    }

    pub(crate) fn checked_accumulate(&mut self, label: IsotopeLabel, count: Count) -> Option<()> {
        let total = self.get(&label).checked_add(count)?;
        self.set(label, total);
        Some(())
    }

    pub(crate) fn checked_merge(&mut self, other: Self) -> Option<()> {
        for (label, count) in other.counts {
            self.checked_accumulate(label, count)?;
        }
        Some(())
    }

    pub(crate) fn checked_scale(&mut self, factor: Count) -> Option<()> {
        for count in self.counts.values_mut() {
            *count = count.checked_mul(factor)?;
        }
        self.counts.retain(|_, &mut count| count != 0);
        self.cache.clear();
        Some(())
    }
}

// Module Tests ========================================================================================================
