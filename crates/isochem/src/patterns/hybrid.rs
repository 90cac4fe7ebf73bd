use rayon::prelude::*;

use crate::{DropMethod, spectrum::Spectrum};

use super::{NaturalElement, combinatorial::element_combinations};

/// Enumerates each element's own pattern independently (in parallel), then convolves those patterns together from
/// the largest to the smallest, normalizing and pruning after each one
pub(super) fn generate(elements: &[NaturalElement], decimal_places: u32, drop_method: DropMethod) -> Spectrum {
    let mut per_element: Vec<_> = elements
        .par_iter()
        .map(|element| {
            let mut pattern = Spectrum::new(decimal_places);
            for combination in element_combinations(element, decimal_places) {
                pattern.add_to_bin(combination.bin, combination.mass, combination.ln_probability.exp());
            }
            log::trace!(
                "{}{} contributes {} peaks",
                element.symbol,
                element.count,
                pattern.len()
            );
            pattern
        })
        .collect();
    // NOTE: The sort is stable, so elements with patterns of equal length stay in composition order
    per_element.sort_by_key(|pattern| std::cmp::Reverse(pattern.len()));

    let mut spectrum = Spectrum::from_peaks(decimal_places, [(0.0, 1.0)]);
    for pattern in &per_element {
        spectrum = spectrum.convolve(pattern);
        spectrum.normalize();
        spectrum.prune(drop_method);
    }

    spectrum.normalize();
    spectrum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_patterns_are_combined() {
        let elements = [
            NaturalElement {
                symbol: "Br",
                count: 1,
                isotopes: vec![(78.918_337_6, 0.5069), (80.916_289_7, 0.4931)],
            },
            NaturalElement {
                symbol: "C",
                count: 200,
                isotopes: vec![(12.0, 0.9893), (13.003_354_835_07, 0.0107)],
            },
        ];
        let spectrum = generate(&elements, 4, DropMethod::None);
        // Both bromine isotopes combine with every carbon isotopologue that doesn't underflow
        let peaks: Vec<_> = spectrum.peaks().collect();
        assert!(peaks.len() > 201);
        let (_, max) = peaks.iter().copied().fold((0.0, 0.0), |a, b| if b.1 > a.1 { b } else { a });
        assert!((max - 100.0).abs() < 1e-12);
        // With a threshold, only the major peaks survive
        let pruned = generate(&elements, 4, DropMethod::Threshold(0.1));
        assert!(pruned.len() < 40);
    }
}
