use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{IsochemError, Pattern, Result};

/// How the mass of a group of unresolved raw peaks is chosen
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMethod {
    /// The intensity-weighted mean of the group's masses
    #[default]
    Weighted,
    /// The midpoint between the group's lightest and heaviest peaks
    Centroid,
}

/// Merges raw peaks that an instrument with the given FWHM couldn't resolve, normalizing the result to 100
///
/// Neighbouring peaks no more than `fwhm / 2` apart end up in the same group, so a chain of close peaks forms a single
/// group even when its ends are further apart than that. The intensity of each group is the sum of its peaks.
#[must_use]
pub fn build_bar(raw: &Pattern, fwhm: f64, group_method: GroupMethod) -> Pattern {
    let window = fwhm / 2.0;
    let mut groups: Vec<Vec<(f64, f64)>> = Vec::new();
    for (mass, intensity) in raw.peaks() {
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|&(last, _)| mass - last <= window) => {
                group.push((mass, intensity));
            }
            _ => groups.push(vec![(mass, intensity)]),
        }
    }

    let bar = groups.iter().map(|group| {
        let intensity: f64 = group.iter().map(|&(_, i)| i).sum();
        let mass = match group_method {
            GroupMethod::Weighted => group.iter().map(|&(m, i)| m * i).sum::<f64>() / intensity,
            GroupMethod::Centroid => {
                let (first, last) = (group[0].0, group[group.len() - 1].0);
                f64::midpoint(first, last)
            }
        };
        (mass, intensity)
    });
    let bar = Pattern::from_peaks(bar).normalized();

    log::debug!(
        "grouped {} raw peaks into {} bars (fwhm = {fwhm:.6})",
        raw.len(),
        bar.len()
    );
    bar
}

impl FromStr for GroupMethod {
    type Err = Box<IsochemError>;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "weighted" => Ok(Self::Weighted),
            "centroid" => Ok(Self::Centroid),
            _ => Err(Box::new(IsochemError::InvalidGroupMethod(s.to_owned()))),
        }
    }
}

impl Display for GroupMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Weighted => "weighted",
            Self::Centroid => "centroid",
        };
        write!(f, "{name}")
    }
}
