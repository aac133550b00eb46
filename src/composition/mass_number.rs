use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
};

use crate::MassNumber;

impl MassNumber {
    // NOTE: A mass number of 0 means "unspecified", which `IsotopeLabel` models as `None`, so it's unrepresentable here
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for MassNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Module Tests ========================================================================================================
