use itertools::Itertools;

use crate::{
    DropMethod,
    spectrum::{self, Spectrum},
};

use super::NaturalElement;

/// Enumerates every isotopic composition of the whole molecule at once, normalizing and pruning only at the end
pub(super) fn generate(elements: &[NaturalElement], decimal_places: u32, drop_method: DropMethod) -> Spectrum {
    let mut spectrum = Spectrum::new(decimal_places);

    let per_element: Vec<_> = elements
        .iter()
        .map(|element| element_combinations(element, decimal_places))
        .collect();
    if per_element.is_empty() {
        spectrum.add(0.0, 1.0);
    } else {
        for combination in per_element.iter().map(|c| c.iter()).multi_cartesian_product() {
            let bin: i64 = combination.iter().map(|c| c.bin).sum();
            let mass: f64 = combination.iter().map(|c| c.mass).sum();
            let ln_probability: f64 = combination.iter().map(|c| c.ln_probability).sum();
            spectrum.add_to_bin(bin, mass, ln_probability.exp());
        }
    }

    spectrum.normalize();
    spectrum.prune(drop_method);
    spectrum
}

/// One isotopic composition of a single element
#[derive(Copy, Clone, PartialEq, Debug)]
pub(super) struct Combination {
    /// The sum of the spectrum bins of every picked isotope
    pub bin: i64,
    pub mass: f64,
    pub ln_probability: f64,
}

/// Every distinct way of picking `count` isotopes of a single element
///
/// Each multiset of isotopes is enumerated once, and its probability is the multinomial coefficient (the number of
/// orderings realising it) times the product of the abundances of its isotopes.
pub(super) fn element_combinations(element: &NaturalElement, decimal_places: u32) -> Vec<Combination> {
    let NaturalElement {
        symbol,
        count,
        ref isotopes,
    } = *element;
    let ln_factorials = ln_factorials(count);
    let ln_abundances: Vec<_> = isotopes.iter().map(|&(_, abundance)| abundance.ln()).collect();
    let bins: Vec<_> = isotopes
        .iter()
        .map(|&(mass, _)| spectrum::bin(mass, decimal_places))
        .collect();

    let combinations: Vec<_> = (0..isotopes.len())
        .combinations_with_replacement(count as usize)
        .map(|picks| {
            let mut combination = Combination {
                bin: 0,
                mass: 0.0,
                ln_probability: ln_factorials[count as usize],
            };
            for (isotope, group) in &picks.into_iter().chunk_by(|&i| i) {
                let n = group.count();
                combination.bin += bins[isotope] * n as i64;
                combination.mass += isotopes[isotope].0 * n as f64;
                combination.ln_probability += ln_abundances[isotope] * n as f64 - ln_factorials[n];
            }
            combination
        })
        .collect();

    log::trace!(
        "{symbol}{count} has {} isotope combinations",
        combinations.len()
    );
    combinations
}

// NOTE: `ln(n!)` for every `n` up to and including `max`, built up as a running sum of logarithms
fn ln_factorials(max: u32) -> Vec<f64> {
    let mut ln_factorials = Vec::with_capacity(max as usize + 1);
    ln_factorials.push(0.0);
    let mut sum = 0.0;
    for n in 1..=max {
        sum += f64::from(n).ln();
        ln_factorials.push(sum);
    }
    ln_factorials
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHLORINE: [(f64, f64); 2] = [(34.968_852_682, 0.7576), (36.965_902_602, 0.2424)];

    fn chlorine(count: u32) -> NaturalElement<'static> {
        NaturalElement {
            symbol: "Cl",
            count,
            isotopes: CHLORINE.to_vec(),
        }
    }

    #[test]
    fn factorials() {
        let ln_factorials = ln_factorials(5);
        let factorials: Vec<_> = ln_factorials.iter().map(|f| f.exp().round()).collect();
        assert_eq!(factorials, [1.0, 1.0, 2.0, 6.0, 24.0, 120.0]);
    }

    #[test]
    fn binomial_combinations() {
        // Cl3 has 4 isotopic compositions, with binomial probabilities
        let combinations = element_combinations(&chlorine(3), 7);
        assert_eq!(combinations.len(), 4);
        let (p35, p37) = (CHLORINE[0].1, CHLORINE[1].1);
        let expected = [
            p35.powi(3),
            3.0 * p35.powi(2) * p37,
            3.0 * p35 * p37.powi(2),
            p37.powi(3),
        ];
        for (combination, expected) in combinations.iter().zip(expected) {
            assert!((combination.ln_probability.exp() - expected).abs() < 1e-12);
        }
        let total: f64 = combinations.iter().map(|c| c.ln_probability.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((combinations[3].mass - 3.0 * CHLORINE[1].0).abs() < 1e-9);
        // Bins are built from the rounded mass of each isotope (the rounded total of 110.898 would be 1109)
        assert_eq!(combinations[3].bin, 3 * 369_659_026);
        assert_eq!(element_combinations(&chlorine(3), 1)[3].bin, 1110);
    }

    #[test]
    fn multinomial_combinations() {
        // C(3 + 4 - 1, 4) = 15 ways to pick 4 atoms from 3 isotopes
        let oxygen = NaturalElement {
            symbol: "O",
            count: 4,
            isotopes: vec![
                (15.994_914_619_57, 0.99757),
                (16.999_131_756_5, 0.00038),
                (17.999_159_612_86, 0.00205),
            ],
        };
        let combinations = element_combinations(&oxygen, 7);
        assert_eq!(combinations.len(), 15);
        let total: f64 = combinations.iter().map(|c| c.ln_probability.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn whole_molecule() {
        let spectrum = generate(&[chlorine(2)], 7, DropMethod::None);
        let peaks: Vec<_> = spectrum.peaks().collect();
        assert_eq!(peaks.len(), 3);
        assert!((peaks[0].1 - 100.0).abs() < 1e-12);
        let p = CHLORINE[1].1 / CHLORINE[0].1;
        assert!((peaks[1].1 - 200.0 * p).abs() < 1e-9);
        assert!((peaks[2].1 - 100.0 * p * p).abs() < 1e-9);
        // Without any natural elements, there's a single peak at zero
        let empty = generate(&[], 7, DropMethod::None);
        assert_eq!(empty.peaks().collect::<Vec<_>>(), [(0.0, 100.0)]);
    }
}
