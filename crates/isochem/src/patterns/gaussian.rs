use std::f64::consts::LN_2;

use crate::Pattern;

/// How many FWHMs either side of a peak its curve is evaluated for, beyond which it's below `1e-19` of its height
const CUTOFF_FWHMS: f64 = 4.0;
/// How many FWHMs the mass axis extends beyond the first and last bar peaks
const PADDING_FWHMS: f64 = 2.0;
/// The most points a simulated profile can have, past which its step is coarsened by factors of ten
pub const MAX_POINTS: i64 = 1 << 22;

/// Simulates the profile an instrument with the given FWHM would record, by summing a normal distribution centred on
/// every bar peak, normalized to a maximum of 100
///
/// The mass axis is regularly sampled, with a step one decimal place finer than the FWHM. If that would need more
/// than [`MAX_POINTS`] points, the step is coarsened until it doesn't.
#[must_use]
pub fn build_gaussian(bar: &Pattern, fwhm: f64) -> Pattern {
    let (Some(min), Some(max)) = (bar.min_mass(), bar.max_mass()) else {
        return Pattern::default();
    };
    if !(fwhm.is_finite() && fwhm > 0.0) {
        return Pattern::default();
    }

    let mut places = decimal_places(fwhm);
    let mut scale = 10_f64.powi(places);
    let (mut start, mut end) = axis(min, max, fwhm, scale);
    while end - start >= MAX_POINTS {
        places -= 1;
        scale = 10_f64.powi(places);
        (start, end) = axis(min, max, fwhm, scale);
    }
    if places < decimal_places(fwhm) {
        log::warn!(
            "sampling the gaussian pattern every {} Da, as a step of {} Da would need more than {MAX_POINTS} points",
            scale.recip(),
            10_f64.powi(-decimal_places(fwhm))
        );
    }
    let mass_at = |j: i64| j as f64 / scale;

    let sigma = fwhm / (2.0 * (2.0 * LN_2).sqrt());
    let two_sigma_squared = 2.0 * sigma * sigma;

    let mut intensities = vec![0.0; usize::try_from(end - start + 1).unwrap_or_default()];
    for (mass, height) in bar.peaks() {
        let first = grid_index((CUTOFF_FWHMS.mul_add(-fwhm, mass) * scale).ceil()).max(start);
        let last = grid_index((CUTOFF_FWHMS.mul_add(fwhm, mass) * scale).floor()).min(end);
        for (j, intensity) in (first..=last).zip(intensities.iter_mut().skip(offset(first, start))) {
            let distance = mass_at(j) - mass;
            *intensity += height * (-distance * distance / two_sigma_squared).exp();
        }
    }

    let masses = (start..=end).map(mass_at).collect();
    log::debug!(
        "simulated a gaussian pattern of {} points with a step of {}",
        intensities.len(),
        scale.recip()
    );
    Pattern::from_sorted(masses, intensities).normalized()
}

// NOTE: The first and last grid indices of the mass axis, extending past the outermost bar peaks
fn axis(min: f64, max: f64, fwhm: f64, scale: f64) -> (i64, i64) {
    let start = grid_index((PADDING_FWHMS.mul_add(-fwhm, min) * scale).floor());
    let end = grid_index((PADDING_FWHMS.mul_add(fwhm, max) * scale).ceil());
    (start, end)
}

/// The number of decimal places needed to sample a peak of the given FWHM, never less than zero
#[allow(clippy::cast_possible_truncation)]
fn decimal_places(fwhm: f64) -> i32 {
    (-fwhm.log10()).ceil().max(-1.0) as i32 + 1
}

// NOTE: Grid indices are mass * 10^d, which stays well within an `i64` for any real molecule
#[allow(clippy::cast_possible_truncation)]
fn grid_index(scaled_mass: f64) -> i64 {
    scaled_mass as i64
}

fn offset(j: i64, start: i64) -> usize {
    usize::try_from(j - start).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_resolution() {
        assert_eq!(decimal_places(0.1), 2);
        assert_eq!(decimal_places(0.2), 2);
        assert_eq!(decimal_places(0.0036), 4);
        assert_eq!(decimal_places(1.0), 1);
        assert_eq!(decimal_places(5.0), 1);
        assert_eq!(decimal_places(20.0), 0);
        assert_eq!(decimal_places(50.0), 0);
    }

    #[test]
    fn single_peak() {
        let bar = Pattern::from_peaks([(100.0, 100.0)]);
        let gaussian = build_gaussian(&bar, 0.1);
        let peaks: Vec<_> = gaussian.peaks().collect();
        // The axis runs from 2 FWHM below to 2 FWHM above the peak in steps of 0.01
        assert!((peaks[0].0 - 99.8).abs() < 0.0100001);
        assert!((peaks[peaks.len() - 1].0 - 100.2).abs() < 0.0100001);
        assert!((41..=43).contains(&peaks.len()));
        // The peak is at 100, and the curve is at half height 1/2 FWHM either side
        let at = |mass: f64| {
            peaks
                .iter()
                .find(|(m, _)| (m - mass).abs() < 1e-9)
                .map(|&(_, i)| i)
                .unwrap()
        };
        assert!((at(100.0) - 100.0).abs() < 1e-9);
        assert!((at(99.95) - 50.0).abs() < 1e-6);
        assert!((at(100.05) - 50.0).abs() < 1e-6);
        assert_eq!(gaussian.max_intensity(), Some(100.0));
    }

    #[test]
    fn overlapping_peaks() {
        let bar = Pattern::from_peaks([(100.0, 100.0), (100.05, 100.0)]);
        let gaussian = build_gaussian(&bar, 0.1);
        // Two peaks half a FWHM apart merge into one, with its maximum halfway between them
        let (top, _) = gaussian
            .peaks()
            .fold((0.0, 0.0), |a, b| if b.1 > a.1 { b } else { a });
        assert!((top - 100.02).abs() < 0.011);
        assert_eq!(gaussian.max_intensity(), Some(100.0));
    }

    #[test]
    fn point_count_is_capped() {
        // A FWHM of 1e-9 Da would call for a step of 1e-10 Da, so 10^11 points over these 10 Da
        let bar = Pattern::from_peaks([(100.0, 100.0), (110.0, 50.0)]);
        let gaussian = build_gaussian(&bar, 1e-9);
        assert!(!gaussian.is_empty());
        assert!(gaussian.len() <= MAX_POINTS as usize);
        let masses = gaussian.masses();
        assert!((masses[1] - masses[0] - 1e-5).abs() < 1e-9);
        assert_eq!(gaussian.max_intensity(), Some(100.0));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(build_gaussian(&Pattern::default(), 0.1).is_empty());
        let bar = Pattern::from_peaks([(100.0, 100.0)]);
        assert!(build_gaussian(&bar, 0.0).is_empty());
        assert!(build_gaussian(&bar, f64::NAN).is_empty());
    }
}
