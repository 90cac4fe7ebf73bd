use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{IsochemError, Result};

pub const DEFAULT_THRESHOLD: f64 = 0.01;
pub const DEFAULT_NPEAKS: usize = 5000;
pub const DEFAULT_CONSOLIDATE: u32 = 3;

/// How low-intensity peaks are discarded while a raw pattern is generated
///
/// Dropping peaks trades a little accuracy in the far tails of a pattern for bounded running time and memory, which
/// makes it essential for very large molecules. Intensities are always on a 0-100 scale.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropMethod {
    #[default]
    None,
    /// Drops every peak less intense than the threshold
    Threshold(f64),
    /// Keeps only the `n` most intense peaks
    NPeaks(usize),
    /// Merges peaks less intense than `threshold` into their nearest neighbour within `10^-decimal_places`,
    /// dropping those without one
    Consolidate { threshold: f64, decimal_places: u32 },
}

impl DropMethod {
    /// Builds a drop method from a method name and the parameters that were given alongside it
    ///
    /// Only one parameter may be given, and it must match the named method. Without a name, the method is picked by
    /// whichever parameter was given, and without either, nothing is dropped.
    pub fn from_parts(
        method: Option<&str>,
        threshold: Option<f64>,
        npeaks: Option<usize>,
        consolidate: Option<u32>,
    ) -> Result<Self> {
        let given: Vec<_> = [
            threshold.map(|_| "threshold"),
            npeaks.map(|_| "npeaks"),
            consolidate.map(|_| "consolidate"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if given.len() > 1 {
            return Err(Box::new(IsochemError::MutuallyExclusive(given.join(", "))));
        }

        let method = match method {
            Some(method) => method.to_ascii_lowercase(),
            None => given.first().copied().unwrap_or("none").to_owned(),
        };
        if let Some(&parameter) = given.first() {
            if parameter != method {
                return Err(Box::new(IsochemError::MutuallyExclusive(format!(
                    "dropmethod={method}, {parameter}"
                ))));
            }
        }

        let drop_method = match method.as_str() {
            "none" => Self::None,
            "threshold" => Self::Threshold(threshold.unwrap_or(DEFAULT_THRESHOLD)),
            "npeaks" => Self::NPeaks(npeaks.unwrap_or(DEFAULT_NPEAKS)),
            "consolidate" => Self::Consolidate {
                threshold: DEFAULT_THRESHOLD,
                decimal_places: consolidate.unwrap_or(DEFAULT_CONSOLIDATE),
            },
            _ => return Err(Box::new(IsochemError::InvalidDropMethod(method))),
        };
        drop_method.validate()?;
        Ok(drop_method)
    }

    pub(crate) fn validate(self) -> Result<Self> {
        match self {
            // NOTE: Intensities are normalized to a maximum of 100, so any higher threshold would drop every peak
            Self::Threshold(threshold) | Self::Consolidate { threshold, .. }
                if !(threshold > 0.0 && threshold <= 100.0) =>
            {
                Err(Box::new(IsochemError::invalid_parameter(
                    "threshold",
                    &threshold.to_string(),
                    "must be greater than 0 and at most 100",
                )))
            }
            Self::NPeaks(0) => Err(Box::new(IsochemError::invalid_parameter(
                "npeaks",
                "0",
                "at least one peak must be kept",
            ))),
            _ => Ok(self),
        }
    }

    /// The name of this method, as accepted by [`DropMethod::from_parts`]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Threshold(_) => "threshold",
            Self::NPeaks(_) => "npeaks",
            Self::Consolidate { .. } => "consolidate",
        }
    }
}

impl Display for DropMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            Self::None => write!(f, "{name}"),
            Self::Threshold(threshold) => write!(f, "{name}={threshold}"),
            Self::NPeaks(n) => write!(f, "{name}={n}"),
            Self::Consolidate { decimal_places, .. } => write!(f, "{name}={decimal_places}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts() {
        // Nothing given
        assert_eq!(DropMethod::from_parts(None, None, None, None).unwrap(), DropMethod::None);
        assert_eq!(DropMethod::from_parts(Some("None"), None, None, None).unwrap(), DropMethod::None);
        // Methods without parameters use their defaults
        assert_eq!(
            DropMethod::from_parts(Some("threshold"), None, None, None).unwrap(),
            DropMethod::Threshold(0.01)
        );
        assert_eq!(
            DropMethod::from_parts(Some("npeaks"), None, None, None).unwrap(),
            DropMethod::NPeaks(5000)
        );
        assert_eq!(
            DropMethod::from_parts(Some("consolidate"), None, None, None).unwrap(),
            DropMethod::Consolidate {
                threshold: 0.01,
                decimal_places: 3
            }
        );
        // Parameters alone pick their method
        assert_eq!(
            DropMethod::from_parts(None, Some(0.5), None, None).unwrap(),
            DropMethod::Threshold(0.5)
        );
        assert_eq!(
            DropMethod::from_parts(None, None, Some(5), None).unwrap(),
            DropMethod::NPeaks(5)
        );
        assert_eq!(
            DropMethod::from_parts(Some("consolidate"), None, None, Some(2)).unwrap(),
            DropMethod::Consolidate {
                threshold: 0.01,
                decimal_places: 2
            }
        );
    }

    #[test]
    fn from_parts_errors() {
        let error = DropMethod::from_parts(None, Some(0.5), Some(5), None).unwrap_err();
        assert!(matches!(*error, IsochemError::MutuallyExclusive(ref s) if s == "threshold, npeaks"));
        let error = DropMethod::from_parts(Some("npeaks"), Some(0.5), None, None).unwrap_err();
        assert!(matches!(*error, IsochemError::MutuallyExclusive(_)));
        let error = DropMethod::from_parts(Some("sometimes"), None, None, None).unwrap_err();
        assert!(matches!(*error, IsochemError::InvalidDropMethod(ref s) if s == "sometimes"));
        let error = DropMethod::from_parts(None, Some(-1.0), None, None).unwrap_err();
        assert!(matches!(*error, IsochemError::InvalidParameter { .. }));
        let error = DropMethod::from_parts(None, None, Some(0), None).unwrap_err();
        assert!(matches!(*error, IsochemError::InvalidParameter { .. }));
    }

    #[test]
    fn thresholds_stay_within_normalized_intensities() {
        assert_eq!(
            DropMethod::from_parts(None, Some(100.0), None, None).unwrap(),
            DropMethod::Threshold(100.0)
        );
        for threshold in [100.5, 1e6, f64::INFINITY, f64::NAN, 0.0] {
            let error = DropMethod::from_parts(None, Some(threshold), None, None).unwrap_err();
            assert!(matches!(*error, IsochemError::InvalidParameter { ref key, .. } if key == "threshold"));
        }
        let consolidate = DropMethod::Consolidate {
            threshold: 150.0,
            decimal_places: 3,
        };
        assert!(consolidate.validate().is_err());
    }

    #[test]
    fn drop_method_display() {
        assert_eq!(DropMethod::None.to_string(), "none");
        assert_eq!(DropMethod::Threshold(0.5).to_string(), "threshold=0.5");
        assert_eq!(DropMethod::NPeaks(10).to_string(), "npeaks=10");
        assert_eq!(
            DropMethod::Consolidate {
                threshold: 0.01,
                decimal_places: 3
            }
            .to_string(),
            "consolidate=3"
        );
    }
}
