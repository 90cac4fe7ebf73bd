use crate::{Charge, Pattern};

impl Pattern {
    /// Collects `(mass, intensity)` peaks into a pattern, sorting them by mass
    pub fn from_peaks(peaks: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut peaks: Vec<_> = peaks.into_iter().collect();
        peaks.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        let (masses, intensities) = peaks.into_iter().unzip();
        Self {
            masses,
            intensities,
        }
    }

    pub(crate) fn from_sorted(masses: Vec<f64>, intensities: Vec<f64>) -> Self {
        debug_assert_eq!(masses.len(), intensities.len());
        debug_assert!(masses.is_sorted_by(|a, b| a <= b));
        Self {
            masses,
            intensities,
        }
    }

    #[must_use]
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    #[must_use]
    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.masses.iter().copied().zip(self.intensities.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    #[must_use]
    pub fn min_mass(&self) -> Option<f64> {
        self.masses.first().copied()
    }

    #[must_use]
    pub fn max_mass(&self) -> Option<f64> {
        self.masses.last().copied()
    }

    #[must_use]
    pub fn max_intensity(&self) -> Option<f64> {
        self.intensities.iter().copied().reduce(f64::max)
    }

    /// The most intense peak, preferring the lightest of any ties
    #[must_use]
    pub fn base_peak(&self) -> Option<(f64, f64)> {
        self.peaks()
            .reduce(|base, peak| if peak.1 > base.1 { peak } else { base })
    }

    /// The intensity-weighted mean mass, or `None` for patterns without any intensity
    #[must_use]
    pub fn weighted_mean_mass(&self) -> Option<f64> {
        let total: f64 = self.intensities.iter().sum();
        (total > 0.0).then(|| self.peaks().map(|(m, i)| m * i).sum::<f64>() / total)
    }

    /// Rescales the intensities so that the most intense peak is exactly 100
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Some(max) = self.max_intensity().filter(|&max| max > 0.0) {
            for intensity in &mut self.intensities {
                *intensity = *intensity / max * 100.0;
            }
        }
        self
    }

    /// Converts neutral masses into m/z values for the given charge (leaving them unchanged for a charge of 0)
    #[must_use]
    pub fn to_mz(&self, charge: Charge) -> Self {
        Self {
            masses: self.masses.iter().map(|&m| charge.mz(m)).collect(),
            intensities: self.intensities.clone(),
        }
    }

    /// Checks that masses and intensities pair up, and that masses are sorted
    pub(crate) fn is_well_formed(&self) -> bool {
        self.masses.len() == self.intensities.len() && self.masses.is_sorted_by(|a, b| a <= b)
    }
}
