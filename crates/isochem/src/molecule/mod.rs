//! A molecule along with its raw, bar, and simulated (Gaussian) isotope patterns

pub mod config;
pub mod snapshot;

use std::sync::OnceLock;

use rust_decimal::Decimal;
use static_assertions::assert_impl_all;

use crate::{
    AccuracyWarning, Charge, Charged, Composition, MassTable, Massive, Pattern, Result,
    atoms::element::to_f64,
    patterns::{bar::build_bar, gaussian::build_gaussian},
};

use self::config::IpConfig;

/// A molecule whose isotope patterns are calculated as soon as it's built
///
/// The raw and bar patterns are computed eagerly, while the Gaussian pattern is only simulated the first time it's
/// requested. All pattern masses are m/z values for the molecule's charge.
#[derive(Clone, Debug)]
pub struct IpMolecule<'a> {
    formula: String,
    composition: Composition<'a>,
    charge: Charge,
    config: IpConfig,
    fwhm: f64,
    raw: Pattern,
    bar: Pattern,
    gaussian: OnceLock<Pattern>,
    accuracy_warning: Option<AccuracyWarning>,
}

assert_impl_all!(IpMolecule<'static>: Send, Sync);

/// How far along the calculation of a molecule's isotope patterns is
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum MoleculeState {
    Uncomputed,
    RawComputed,
    BarComputed,
    GaussianComputed,
}

// Public API ==========================================================================================================

impl<'a> IpMolecule<'a> {
    pub fn new(table: &'a MassTable, formula: impl AsRef<str>, config: IpConfig) -> Result<Self> {
        let formula = formula.as_ref();
        let composition = Composition::new(table, formula)?;
        Self::compute(formula.to_owned(), composition, config)
    }

    pub fn from_composition(composition: Composition<'a>, config: IpConfig) -> Result<Self> {
        Self::compute(composition.to_string(), composition, config)
    }

    /// Replaces the molecule with one built from `formula`, leaving it untouched if that fails
    pub fn set_formula(&mut self, table: &'a MassTable, formula: impl AsRef<str>) -> Result<()> {
        *self = Self::new(table, formula, self.config)?;
        Ok(())
    }

    /// Replaces the composition of the molecule, leaving it untouched if the new patterns can't be calculated
    pub fn set_composition(&mut self, composition: Composition<'a>) -> Result<()> {
        *self = Self::from_composition(composition, self.config)?;
        Ok(())
    }

    /// Recalculates the molecule's patterns with a new configuration, leaving it untouched if that fails
    pub fn set_config(&mut self, config: IpConfig) -> Result<()> {
        *self = Self::compute(self.formula.clone(), self.composition.clone(), config)?;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> MoleculeState {
        if self.gaussian.get().is_some() {
            MoleculeState::GaussianComputed
        } else {
            MoleculeState::BarComputed
        }
    }

    #[must_use]
    pub fn formula(&self) -> &str {
        &self.formula
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition<'a> {
        &self.composition
    }

    #[must_use]
    pub const fn config(&self) -> &IpConfig {
        &self.config
    }

    /// The full width at half maximum of the simulated instrument's peaks, in m/z
    #[must_use]
    pub const fn fwhm(&self) -> f64 {
        self.fwhm
    }

    #[must_use]
    pub const fn raw_pattern(&self) -> &Pattern {
        &self.raw
    }

    #[must_use]
    pub const fn bar_pattern(&self) -> &Pattern {
        &self.bar
    }

    /// The simulated instrument profile, which is calculated (then cached) the first time it's requested
    pub fn gaussian_pattern(&self) -> &Pattern {
        self.gaussian.get_or_init(|| build_gaussian(&self.bar, self.fwhm))
    }

    /// The intensity-weighted mean m/z of the bar pattern
    #[must_use]
    pub fn estimated_exact_mass(&self) -> f64 {
        self.bar.weighted_mean_mass().unwrap_or_default()
    }

    /// The m/z expected from the standard atomic weights of the molecule's elements
    #[must_use]
    pub fn molecular_weight(&self) -> f64 {
        self.charge.mz(to_f64(self.composition.standard_weight()))
    }

    /// The molecular weight implied by the estimated exact mass
    #[must_use]
    pub fn molecular_weight_estimated(&self) -> f64 {
        self.estimated_exact_mass() * self.charge_multiplier()
    }

    /// The relative difference between the estimated exact mass and the molecular weight
    #[must_use]
    pub fn error(&self) -> f64 {
        let molecular_weight = self.molecular_weight();
        (self.estimated_exact_mass() - molecular_weight) / molecular_weight
    }

    /// The m/z range spanned by the Gaussian pattern: the bar pattern widened by two FWHMs either side
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        let padding = 2.0 * self.fwhm;
        let min = self.bar.min_mass().unwrap_or_default();
        let max = self.bar.max_mass().unwrap_or_default();
        (min - padding, max + padding)
    }

    /// Set when the estimated exact mass strays further from the molecular weight than the critical error allows
    #[must_use]
    pub const fn accuracy_warning(&self) -> Option<&AccuracyWarning> {
        self.accuracy_warning.as_ref()
    }
}

// Massive and Charged Trait Implementations ===========================================================================

// NOTE: Masses are those of the neutral molecule, matching `Composition`
impl Massive for IpMolecule<'_> {
    fn monoisotopic_mass(&self) -> Decimal {
        self.composition.monoisotopic_mass()
    }

    fn average_mass(&self) -> Decimal {
        self.composition.average_mass()
    }
}

impl Charged for IpMolecule<'_> {
    fn charge(&self) -> Charge {
        self.charge
    }
}

// Private Helper Methods ==============================================================================================

impl<'a> IpMolecule<'a> {
    fn compute(formula: String, composition: Composition<'a>, config: IpConfig) -> Result<Self> {
        config.validate()?;
        let charge = composition.formula_charge().unwrap_or(config.charge);

        let raw = config
            .ip_method
            .generate(&composition, config.decimal_places, config.drop_method)?
            .to_mz(charge);
        let fwhm = raw.weighted_mean_mass().unwrap_or_default() / config.resolution;
        let bar = build_bar(&raw, fwhm, config.group_method);

        let mut molecule = Self {
            formula,
            composition,
            charge,
            config,
            fwhm,
            raw,
            bar,
            gaussian: OnceLock::new(),
            accuracy_warning: None,
        };
        molecule.check_accuracy();
        Ok(molecule)
    }

    fn check_accuracy(&mut self) {
        let error = self.error();
        self.accuracy_warning = (error.abs() > self.config.critical_error).then(|| {
            let warning = AccuracyWarning {
                formula: self.formula.clone(),
                error,
                critical_error: self.config.critical_error,
            };
            log::warn!("{warning}");
            warning
        });
    }

    fn charge_multiplier(&self) -> f64 {
        if self.charge.is_zero() {
            1.0
        } else {
            self.charge.abs() as f64
        }
    }
}

// Module Tests ========================================================================================================
