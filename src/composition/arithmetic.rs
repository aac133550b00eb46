use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::{Composition, Count};

// NOTE: The borrowing impls hold the real logic, with the owned variants below delegating to them, so `a + b`,
// `&a + b`, `a + &b`, and `&a + &b` all work
//
// NOTE: These operators use plain `i32` arithmetic, so overflow follows the usual integer semantics (a panic in
// debug builds, wrapping in release); counts parsed from text are bounds-checked by the parsers before they get here

impl Add for &Composition {
    type Output = Composition;

    fn add(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

impl Sub for &Composition {
    type Output = Composition;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut result = self.clone();
        result -= rhs;
        result
    }
}

impl AddAssign<&Composition> for Composition {
    fn add_assign(&mut self, rhs: &Composition) {
        for (label, count) in rhs.iter() {
            let total = self.get(label) + count;
            if total == 0 {
                self.counts.remove(label);
            } else {
                self.counts.insert(label.clone(), total);
            }
        }
        self.cache.clear();
    }
}

impl SubAssign<&Composition> for Composition {
    fn sub_assign(&mut self, rhs: &Composition) {
        for (label, count) in rhs.iter() {
            let total = self.get(label) - count;
            if total == 0 {
                self.counts.remove(label);
            } else {
                self.counts.insert(label.clone(), total);
            }
        }
        self.cache.clear();
    }
}

impl Mul<Count> for &Composition {
    type Output = Composition;

    fn mul(self, rhs: Count) -> Self::Output {
        self.iter()
            .map(|(label, count)| (label.clone(), count * rhs))
            .collect()
    }
}

impl Mul<&Composition> for Count {
    type Output = Composition;

    fn mul(self, rhs: &Composition) -> Self::Output {
        rhs * self
    }
}

impl Neg for &Composition {
    type Output = Composition;

    fn neg(self) -> Self::Output {
        self.iter()
            .map(|(label, count)| (label.clone(), -count))
            .collect()
    }
}

// Owned-Operand Delegation ============================================================================================

// NOTE: `$op_trait` and `$op_fn` are `tt`s since they have to play the roles of both trait / method names and path
// segments in these impls
macro_rules! owned_op_impls {
    ($($op_trait:tt :: $op_fn:tt),+ $(,)?) => {
        $(
            impl $op_trait for Composition {
                type Output = Composition;

                fn $op_fn(self, rhs: Composition) -> Self::Output {
                    (&self).$op_fn(&rhs)
                }
            }

            impl $op_trait<&Composition> for Composition {
                type Output = Composition;

                fn $op_fn(self, rhs: &Composition) -> Self::Output {
                    (&self).$op_fn(rhs)
                }
            }

            impl $op_trait<Composition> for &Composition {
                type Output = Composition;

                fn $op_fn(self, rhs: Composition) -> Self::Output {
                    self.$op_fn(&rhs)
                }
            }
        )+
    };
}

owned_op_impls!(Add::add, Sub::sub);

macro_rules! owned_op_assign_impls {
    ($($op_trait:tt :: $op_fn:tt),+ $(,)?) => {
        $(
            impl $op_trait for Composition {
                fn $op_fn(&mut self, rhs: Composition) {
                    self.$op_fn(&rhs);
                }
            }
        )+
    };
}

owned_op_assign_impls!(AddAssign::add_assign, SubAssign::sub_assign);

impl Mul<Count> for Composition {
    type Output = Composition;

    fn mul(self, rhs: Count) -> Self::Output {
        &self * rhs
    }
}

impl Mul<Composition> for Count {
    type Output = Composition;

    fn mul(self, rhs: Composition) -> Self::Output {
        &rhs * self
    }
}

impl Neg for Composition {
    type Output = Composition;

    fn neg(self) -> Self::Output {
        -&self
    }
}

// Module Tests ========================================================================================================
