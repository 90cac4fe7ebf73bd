//! Isotope pattern calculation for molecular formulae

pub mod atoms;
pub mod errors;
pub mod molecule;
pub mod parsers;
pub mod patterns;
pub mod spectrum;
#[cfg(test)]
mod testing_tools;

use std::{collections::BTreeMap, num::NonZeroU32};

// External Crate Imports
use derive_more::{From, Into};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// FIXME: Work on what's publicly exported / part of the API!
pub use atoms::mass_table::MassTable;
pub use errors::{AccuracyWarning, IsochemError, Result};
pub use molecule::{IpMolecule, MoleculeState, config::IpConfig, snapshot::MoleculeSnapshot};
pub use patterns::{IpMethod, bar::GroupMethod, drop::DropMethod};

// NOTE: For the types in this module, 'a lifetimes indicate references to the MassTable

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Composition<'a> {
    atoms: Vec<(Element<'a>, Count)>,
    charge: Option<Charge>,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Element<'a> {
    symbol: &'a str,
    name: &'a str,
    mass_number: Option<MassNumber>,
    weight: Option<Decimal>,
    isotopes: &'a BTreeMap<MassNumber, Isotope>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct Count(NonZeroU32);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct MassNumber(NonZeroU32);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Isotope {
    relative_mass: Decimal,
    abundance: Option<Decimal>,
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Charge(i64);

// ---------------------------------------------------------------------------------------------------------------------

/// A list of `(mass, intensity)` peaks, sorted by ascending mass
///
/// Raw, bar, and Gaussian isotope patterns all share this representation. Masses are either neutral masses (as
/// returned by [`IpMethod::generate`]) or m/z values (as reported by [`IpMolecule`]).
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Pattern {
    masses: Vec<f64>,
    intensities: Vec<f64>,
}

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> Decimal;
    fn average_mass(&self) -> Decimal;
}

pub trait Charged {
    fn charge(&self) -> Charge;
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> Decimal {
                    (**self).monoisotopic_mass()
                }

                fn average_mass(&self) -> Decimal {
                    (**self).average_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);

macro_rules! charged_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Charged> Charged for $ref_type {
                fn charge(&self) -> Charge {
                    (**self).charge()
                }
            }
        )+
    };
}

charged_ref_impls!(&T, &mut T, Box<T>);
