mod arithmetic;
mod container;
mod isotope_label;
mod mass;
mod mass_number;

pub use mass::calculate_mass;
