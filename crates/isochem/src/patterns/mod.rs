//! Raw isotope pattern generation, along with the bar and Gaussian patterns built from it

pub mod bar;
mod combinatorial;
pub mod drop;
pub mod gaussian;
mod hybrid;
mod multiplicative;
mod pattern;

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Composition, IsochemError, Pattern, Result};

use self::drop::DropMethod;

/// The strategy used to expand a composition into its raw isotope pattern
///
/// Without a drop method, every strategy produces the same pattern (within the tracked precision), but they scale
/// very differently: `Combinatorial` is fastest for small molecules, `Multiplicative` keeps memory use low for
/// large ones, and `Hybrid` handles very large counts of a single element best.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpMethod {
    #[default]
    #[serde(rename = "combinatorics")]
    Combinatorial,
    Multiplicative,
    Hybrid,
}

impl IpMethod {
    /// Generates the raw isotope pattern of `composition` in neutral mass units, normalized to a maximum of 100
    ///
    /// Isotopologues whose isotope masses, each rounded to `decimal_places`, sum to the same value are merged into a
    /// single peak, and `drop_method` controls which low-intensity peaks are discarded along the way.
    pub fn generate(
        self,
        composition: &Composition,
        decimal_places: u32,
        drop_method: DropMethod,
    ) -> Result<Pattern> {
        let (elements, offset) = split_composition(composition)?;
        log::debug!(
            "generating the {self} isotope pattern of {composition} ({} natural elements)",
            elements.len()
        );

        let mut spectrum = match self {
            Self::Combinatorial => combinatorial::generate(&elements, decimal_places, drop_method),
            Self::Multiplicative => multiplicative::generate(&elements, decimal_places, drop_method),
            Self::Hybrid => hybrid::generate(&elements, decimal_places, drop_method),
        };
        spectrum.shift(offset);

        log::debug!("generated {} raw peaks for {composition}", spectrum.len());
        Ok(spectrum.to_pattern())
    }
}

impl FromStr for IpMethod {
    type Err = Box<IsochemError>;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "combinatorics" | "combinatorial" => Ok(Self::Combinatorial),
            "multiplicative" => Ok(Self::Multiplicative),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(Box::new(IsochemError::InvalidIpMethod(s.to_owned()))),
        }
    }
}

impl Display for IpMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Combinatorial => "combinatorics",
            Self::Multiplicative => "multiplicative",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{name}")
    }
}

// Shared Generator Inputs =============================================================================================

/// An element contributing to the isotope pattern, along with its natural `(mass, abundance)` isotopes
#[derive(Clone, PartialEq, Debug)]
struct NaturalElement<'c> {
    symbol: &'c str,
    count: u32,
    isotopes: Vec<(f64, f64)>,
}

// NOTE: Explicitly labelled isotopes don't broaden the pattern at all, so they're summed into a single mass offset
// that's applied once the natural elements have been expanded
fn split_composition<'c>(composition: &'c Composition) -> Result<(Vec<NaturalElement<'c>>, f64)> {
    let mut elements = Vec::new();
    let mut offset = 0.0;
    for (element, count) in composition.atoms() {
        let count = count.get();
        if let Some(mass) = element.isotope_mass() {
            offset += mass * f64::from(count);
        } else {
            elements.push(NaturalElement {
                symbol: element.symbol(),
                count,
                isotopes: element.natural_isotopes()?,
            });
        }
    }
    Ok((elements, offset))
}

// Module Tests ========================================================================================================
