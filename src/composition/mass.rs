use rust_decimal::Decimal;

use crate::{
    CachedMass, Charge, Composition, IsotopeLabel, MassCache, MassMode, MassTable,
    errors::{ElemassError, Result},
    tables::TableId,
};

/// Parse `formula` against `table`, then weigh it in one step
pub fn calculate_mass(
    table: &MassTable,
    formula: impl AsRef<str>,
    mode: MassMode,
    charge: Option<Charge>,
) -> Result<Decimal> {
    Composition::new(table, formula)?.calculate_mass(table, mode, charge)
}

// Public API ==========================================================================================================

impl Composition {
    /// Calculate the mass of this composition, looking up isotopes in `table`
    ///
    /// With a non-zero charge, the result is an m/z: the mass of the composition plus `charge` protons, divided by
    /// the (signed) charge. Passing `None` for `charge` falls back on the number of `H+` protons already stored in
    /// the composition, whilst an explicit charge of 0 ignores them entirely. Passing any other explicit charge when
    /// protons are stored is reported as ambiguous, since it's unclear which of the two should win.
    pub fn calculate_mass(
        &self,
        table: &MassTable,
        mode: MassMode,
        charge: Option<Charge>,
    ) -> Result<Decimal> {
        let charge = self.resolve_charge(charge)?;
        if let Some(mass) = self.cache.fetch(mode, charge, table.id()) {
            return Ok(mass);
        }

        let proton = IsotopeLabel::proton();
        let mut mass = Decimal::ZERO;
        let mut saw_protons = false;
        for (label, count) in self.iter() {
            // NOTE: The resolved charge overrides any stored proton count, so that a charge of 0 can neutralise it
            let count = if *label == proton {
                saw_protons = true;
                charge
            } else {
                count
            };
            if count == 0 {
                continue;
            }
            mass += Decimal::from(count) * table.isotope_mass(label, mode)?;
        }
        if !saw_protons && charge != 0 {
            mass += Decimal::from(charge) * table.isotope_mass(&proton, mode)?;
        }
        if charge != 0 {
            mass /= Decimal::from(charge);
        }

        self.cache.store(mode, charge, table.id(), mass);
        Ok(mass)
    }

    pub fn monoisotopic_mass(&self, table: &MassTable) -> Result<Decimal> {
        self.calculate_mass(table, MassMode::Monoisotopic, None)
    }

    pub fn average_mass(&self, table: &MassTable) -> Result<Decimal> {
        self.calculate_mass(table, MassMode::Average, None)
    }

    /// The monoisotopic mass according to the built-in mass table
    pub fn mass(&self) -> Result<Decimal> {
        self.calculate_mass(MassTable::builtin(), MassMode::Monoisotopic, None)
    }

    /// The number of `H+` protons stored in this composition
    #[must_use]
    pub fn charge(&self) -> Charge {
        self.get(&IsotopeLabel::proton())
    }

    fn resolve_charge(&self, charge: Option<Charge>) -> Result<Charge> {
        let stored = self.charge();
        match charge {
            None => Ok(stored),
            Some(given) if given != 0 && stored != 0 => {
                Err(Box::new(ElemassError::ambiguous_charge(stored, given)))
            }
            Some(given) => Ok(given),
        }
    }
}

// Crate-Only Methods ==================================================================================================

impl MassCache {
    pub(crate) fn fetch(&self, mode: MassMode, charge: Charge, table: TableId) -> Option<Decimal> {
        self.0
            .get()
            .filter(|cached| cached.mode == mode && cached.charge == charge && cached.table == table)
            .map(|cached| cached.mass)
    }

    pub(crate) fn store(&self, mode: MassMode, charge: Charge, table: TableId, mass: Decimal) {
        self.0.set(Some(CachedMass {
            mode,
            charge,
            table,
            mass,
        }));
    }

    pub(crate) fn clear(&self) {
        self.0.set(None);
    }
}

// Module Tests ========================================================================================================
