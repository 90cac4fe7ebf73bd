//! A mass-binned accumulator of `(mass, intensity)` peaks, shared by all of the pattern generators

use std::collections::BTreeMap;

use crate::{DropMethod, Pattern};

/// Peaks binned by their mass, rounded to a fixed number of decimal places
///
/// A peak's bin is the sum of the rounded masses of the isotopes it's made from, so which contributions share a bin
/// never depends on the order they were combined in. Every contribution landing in the same bin is merged into a
/// single peak, whose mass is the intensity-weighted mean of the exact (unrounded) contributing masses.
#[derive(Clone, PartialEq, Debug)]
pub struct Spectrum {
    scale: f64,
    peaks: BTreeMap<i64, Peak>,
}

#[derive(Copy, Clone, PartialEq, Debug)]
struct Peak {
    mass: f64,
    intensity: f64,
}

impl Spectrum {
    #[must_use]
    pub fn new(decimal_places: u32) -> Self {
        Self {
            scale: scale(decimal_places),
            peaks: BTreeMap::new(),
        }
    }

    pub fn from_peaks(decimal_places: u32, peaks: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut spectrum = Self::new(decimal_places);
        for (mass, intensity) in peaks {
            spectrum.add(mass, intensity);
        }
        spectrum
    }

    /// Adds `intensity` at `mass`, merging it into any existing peak in the same bin
    ///
    /// Contributions without a positive intensity are ignored.
    pub fn add(&mut self, mass: f64, intensity: f64) {
        self.add_to_bin(self.bin(mass), mass, intensity);
    }

    /// Like [`Spectrum::add`], but into an explicitly chosen `bin` (see [`bin`])
    pub fn add_to_bin(&mut self, bin: i64, mass: f64, intensity: f64) {
        if intensity <= 0.0 || !intensity.is_finite() {
            return;
        }

        self.peaks
            .entry(bin)
            .and_modify(|peak| {
                let total = peak.intensity + intensity;
                peak.mass = peak.mass.mul_add(peak.intensity, mass * intensity) / total;
                peak.intensity = total;
            })
            .or_insert(Peak { mass, intensity });
    }

    /// Moves every peak by `offset`
    ///
    /// Every bin moves by the same amount, so peaks are never merged by a shift.
    pub fn shift(&mut self, offset: f64) {
        if offset == 0.0 {
            return;
        }
        let bin_offset = self.bin(offset);
        self.peaks = std::mem::take(&mut self.peaks)
            .into_iter()
            .map(|(bin, peak)| {
                let mass = peak.mass + offset;
                (bin + bin_offset, Peak { mass, ..peak })
            })
            .collect();
    }

    /// Rescales the intensities so that the most intense peak is exactly 100
    pub fn normalize(&mut self) {
        let max = self.max_intensity();
        if max <= 0.0 {
            return;
        }
        for peak in self.peaks.values_mut() {
            peak.intensity = peak.intensity / max * 100.0;
        }
    }

    /// Drops (or merges away) low-intensity peaks, as described by `method`
    pub fn prune(&mut self, method: DropMethod) {
        let before = self.len();
        match method {
            DropMethod::None => return,
            DropMethod::Threshold(threshold) => self.peaks.retain(|_, peak| peak.intensity >= threshold),
            DropMethod::NPeaks(n) => self.keep_most_intense(n),
            DropMethod::Consolidate {
                threshold,
                decimal_places,
            } => self.consolidate(threshold, decimal_places),
        }
        log::trace!("pruned {} of {before} peaks using {method:?}", before - self.len());
    }

    /// The product of two spectra: masses (and bins) add, while intensities multiply
    #[must_use]
    pub fn convolve(&self, other: &Self) -> Self {
        let mut product = Self {
            scale: self.scale,
            peaks: BTreeMap::new(),
        };
        for (&bin, peak) in &self.peaks {
            for (&other_bin, other_peak) in &other.peaks {
                product.add_to_bin(
                    bin + other_bin,
                    peak.mass + other_peak.mass,
                    peak.intensity * other_peak.intensity,
                );
            }
        }
        product
    }

    /// The `(mass, intensity)` pairs of every peak, in order of increasing mass
    pub fn peaks(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.peaks.values().map(|peak| (peak.mass, peak.intensity))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    #[must_use]
    pub fn to_pattern(&self) -> Pattern {
        Pattern::from_peaks(self.peaks())
    }
}

// Private Helper Methods ==============================================================================================

impl Spectrum {
    fn bin(&self, mass: f64) -> i64 {
        round_to_bin(mass, self.scale)
    }

    fn max_intensity(&self) -> f64 {
        self.peaks
            .values()
            .map(|peak| peak.intensity)
            .fold(0.0, f64::max)
    }

    // NOTE: Ties in intensity are broken in favour of the lower mass
    fn keep_most_intense(&mut self, n: usize) {
        if self.len() <= n {
            return;
        }
        let mut ranked: Vec<_> = self.peaks.iter().map(|(&bin, peak)| (bin, peak.intensity)).collect();
        ranked.sort_by(|(a_bin, a), (b_bin, b)| b.total_cmp(a).then(a_bin.cmp(b_bin)));
        for (bin, _) in ranked.into_iter().skip(n) {
            self.peaks.remove(&bin);
        }
    }

    // NOTE: Weak peaks are visited from weakest to strongest, each one being merged into whichever of its current
    // neighbours is closest, provided that neighbour lies within the consolidation window. Weak peaks with no
    // neighbour in range are dropped, while those that have grown past the threshold by absorbing others are kept.
    fn consolidate(&mut self, threshold: f64, decimal_places: u32) {
        let window = scale(decimal_places).recip();
        let mut peaks: Vec<_> = std::mem::take(&mut self.peaks)
            .into_iter()
            .map(|(bin, peak)| (bin, Some(peak)))
            .collect();

        let mut weak: Vec<_> = peaks
            .iter()
            .enumerate()
            .filter_map(|(i, (_, peak))| peak.filter(|p| p.intensity < threshold).map(|p| (i, p.intensity)))
            .collect();
        weak.sort_by(|(a_index, a), (b_index, b)| a.total_cmp(b).then(a_index.cmp(b_index)));

        for (i, _) in weak {
            let Some(peak) = peaks[i].1 else { continue };
            if peak.intensity >= threshold {
                continue;
            }
            peaks[i].1 = None;

            let lower = (0..i).rev().find(|&j| peaks[j].1.is_some());
            let upper = (i + 1..peaks.len()).find(|&j| peaks[j].1.is_some());
            let nearest = [lower, upper]
                .into_iter()
                .flatten()
                .filter_map(|j| peaks[j].1.map(|neighbour| (j, (neighbour.mass - peak.mass).abs())))
                .filter(|&(_, distance)| distance <= window)
                .min_by(|(_, a), (_, b)| a.total_cmp(b));

            if let Some((j, _)) = nearest {
                if let Some(neighbour) = peaks[j].1.as_mut() {
                    let total = neighbour.intensity + peak.intensity;
                    neighbour.mass = neighbour.mass.mul_add(neighbour.intensity, peak.mass * peak.intensity) / total;
                    neighbour.intensity = total;
                }
            }
        }

        // NOTE: Survivors keep their own bins, so the spectrum's keys stay in mass order
        self.peaks = peaks
            .into_iter()
            .filter_map(|(bin, peak)| peak.map(|peak| (bin, peak)))
            .collect();
    }
}

/// The bin of a single isotope (or any other indivisible mass) tracked to `decimal_places`
///
/// The bin of a combination of isotopes is the sum of their individual bins.
#[must_use]
pub fn bin(mass: f64, decimal_places: u32) -> i64 {
    round_to_bin(mass, scale(decimal_places))
}

// NOTE: Masses are far below 10^6 Da and at most 12 decimal places are tracked, so this never overflows an `i64`
#[allow(clippy::cast_possible_truncation)]
fn round_to_bin(mass: f64, scale: f64) -> i64 {
    (mass * scale).round() as i64
}

fn scale(decimal_places: u32) -> f64 {
    10_f64.powi(i32::try_from(decimal_places).unwrap_or(i32::MAX))
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(spectrum: &Spectrum) -> Vec<(f64, f64)> {
        spectrum.peaks().collect()
    }

    #[test]
    fn add_merges_bins() {
        let mut spectrum = Spectrum::new(2);
        spectrum.add(100.001, 1.0);
        spectrum.add(100.003, 3.0);
        spectrum.add(100.02, 1.0);
        assert_eq!(spectrum.len(), 2);
        let merged = peaks(&spectrum);
        assert!((merged[0].0 - 100.0025).abs() < 1e-9);
        assert!((merged[0].1 - 4.0).abs() < 1e-12);
        assert_eq!(merged[1], (100.02, 1.0));
        // Non-positive intensities are ignored
        spectrum.add(50.0, 0.0);
        spectrum.add(60.0, -1.0);
        spectrum.add(70.0, f64::NAN);
        assert_eq!(spectrum.len(), 2);
    }

    #[test]
    fn shift_and_normalize() {
        let mut spectrum = Spectrum::from_peaks(3, [(1.0, 2.0), (2.0, 8.0), (3.0, 4.0)]);
        spectrum.shift(10.0);
        spectrum.normalize();
        assert_eq!(peaks(&spectrum), [(11.0, 25.0), (12.0, 100.0), (13.0, 50.0)]);
        // Normalizing an empty spectrum does nothing
        let mut empty = Spectrum::new(3);
        empty.normalize();
        assert!(empty.is_empty());
    }

    #[test]
    fn convolution() {
        let chlorine = Spectrum::from_peaks(7, [(34.968_852_682, 0.7576), (36.965_902_602, 0.2424)]);
        let seed = Spectrum::from_peaks(7, [(0.0, 1.0)]);
        let cl2 = seed.convolve(&chlorine).convolve(&chlorine);
        assert_eq!(cl2.len(), 3);
        let cl2 = peaks(&cl2);
        assert!((cl2[0].0 - 69.937_705_364).abs() < 1e-9);
        assert!((cl2[0].1 - 0.7576 * 0.7576).abs() < 1e-12);
        assert!((cl2[1].1 - 2.0 * 0.7576 * 0.2424).abs() < 1e-12);
        assert!((cl2[2].1 - 0.2424 * 0.2424).abs() < 1e-12);
    }

    #[test]
    fn bins_ignore_combination_order() {
        // Rounded separately these isotopes land in bins 100 and 101, but their exact sums all round to 2.01
        let isotopes = [(1.004, 0.5), (1.006, 0.5)];
        let single = Spectrum::from_peaks(2, isotopes);
        let seed = Spectrum::from_peaks(2, [(0.0, 1.0)]);
        let convolved = seed.convolve(&single).convolve(&single);
        let reversed = single.convolve(&seed.convolve(&single));

        let mut enumerated = Spectrum::new(2);
        for (a, p) in isotopes {
            for (b, q) in isotopes {
                enumerated.add_to_bin(bin(a, 2) + bin(b, 2), a + b, p * q);
            }
        }

        for spectrum in [&convolved, &reversed, &enumerated] {
            let spectrum = peaks(spectrum);
            assert_eq!(spectrum.len(), 3);
            assert!((spectrum[0].0 - 2.008).abs() < 1e-12);
            assert!((spectrum[1].0 - 2.010).abs() < 1e-12);
            assert!((spectrum[1].1 - 0.5).abs() < 1e-12);
            assert!((spectrum[2].0 - 2.012).abs() < 1e-12);
        }
        // Shifting moves every bin together, so nothing merges
        let mut shifted = convolved.clone();
        shifted.shift(0.004);
        assert_eq!(shifted.len(), 3);
        assert!((peaks(&shifted)[0].0 - 2.012).abs() < 1e-12);
    }

    #[test]
    fn prune_threshold() {
        let mut spectrum = Spectrum::from_peaks(3, [(1.0, 0.005), (2.0, 0.01), (3.0, 100.0)]);
        spectrum.prune(DropMethod::Threshold(0.01));
        assert_eq!(peaks(&spectrum), [(2.0, 0.01), (3.0, 100.0)]);
        spectrum.prune(DropMethod::None);
        assert_eq!(spectrum.len(), 2);
    }

    #[test]
    fn prune_npeaks() {
        let mut spectrum =
            Spectrum::from_peaks(3, [(1.0, 5.0), (2.0, 50.0), (3.0, 5.0), (4.0, 100.0), (5.0, 1.0)]);
        spectrum.prune(DropMethod::NPeaks(3));
        // The tie between 1.0 and 3.0 goes to the lower mass
        assert_eq!(peaks(&spectrum), [(1.0, 5.0), (2.0, 50.0), (4.0, 100.0)]);
        spectrum.prune(DropMethod::NPeaks(10));
        assert_eq!(spectrum.len(), 3);
    }

    #[test]
    fn prune_consolidate() {
        let consolidate = DropMethod::Consolidate {
            threshold: 1.0,
            decimal_places: 2,
        };
        let mut spectrum = Spectrum::from_peaks(
            6,
            [
                (100.000, 100.0),
                (100.004, 0.5),
                (100.500, 0.2),
                (101.000, 40.0),
                (101.006, 0.1),
                (101.008, 0.3),
            ],
        );
        spectrum.prune(consolidate);
        let consolidated = peaks(&spectrum);
        assert_eq!(consolidated.len(), 2);
        // 100.004 merges into 100.000, while the isolated 100.500 is dropped
        let expected = 100.0f64.mul_add(100.0, 100.004 * 0.5) / 100.5;
        assert!((consolidated[0].0 - expected).abs() < 1e-9);
        assert!((consolidated[0].1 - 100.5).abs() < 1e-12);
        // 101.006 merges into 101.008 first (the nearest neighbour), then the pair merges into 101.000
        assert!((consolidated[1].1 - 40.4).abs() < 1e-12);
        let expected = (101.0 * 40.0 + 101.006 * 0.1 + 101.008 * 0.3) / 40.4;
        assert!((consolidated[1].0 - expected).abs() < 1e-9);
    }
}
