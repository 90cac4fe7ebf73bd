use crate::{DropMethod, spectrum::Spectrum};

use super::NaturalElement;

/// Convolves the pattern one atom at a time, normalizing and pruning after each element
pub(super) fn generate(elements: &[NaturalElement], decimal_places: u32, drop_method: DropMethod) -> Spectrum {
    let mut spectrum = Spectrum::from_peaks(decimal_places, [(0.0, 1.0)]);

    for element in elements {
        let isotopes = Spectrum::from_peaks(decimal_places, element.isotopes.iter().copied());
        for _ in 0..element.count {
            spectrum = spectrum.convolve(&isotopes);
        }
        spectrum.normalize();
        spectrum.prune(drop_method);
        log::trace!(
            "{} peaks after adding {}{}",
            spectrum.len(),
            element.symbol,
            element.count
        );
    }

    spectrum.normalize();
    spectrum
}
