use std::fmt::{self, Display, Formatter};

// External Crate Imports
use rust_decimal::Decimal;

// Local Crate Imports
use super::errors::LookupError;
use crate::{
    Charge, Charged, Composition, Count, Element, MassTable, Massive, Result,
    parsers::{
        errors::{FormulaError, FormulaErrorKind},
        formula::{self, Atom},
    },
};

// Public API ==========================================================================================================

impl<'a> Composition<'a> {
    /// Parses a molecular formula, expanding abbreviations and resolving every element against `table`
    ///
    /// Bracketed groups are multiplied out, repeated elements are merged, and the result is kept in Hill order.
    pub fn new(table: &'a MassTable, formula: impl AsRef<str>) -> Result<Self> {
        let formula = formula.as_ref();
        let parsed = formula::parse(formula)?;

        let mut atoms = Vec::new();
        for (atom, count) in parsed.atoms(formula)? {
            resolve(table, formula, atom, count, &mut atoms)?;
        }
        let atoms = merge(atoms).ok_or_else(|| overflow(formula))?;

        Ok(Self {
            atoms,
            charge: parsed.charge,
        })
    }

    /// Builds an uncharged composition from `(key, count)` pairs, where keys are elements (`C`), isotopes (`13C` or
    /// `[13C]`), or abbreviations
    pub fn from_counts<K: AsRef<str>>(
        table: &'a MassTable,
        counts: impl IntoIterator<Item = (K, u32)>,
    ) -> Result<Self> {
        let mut atoms = Vec::new();
        for (key, count) in counts {
            let key = key.as_ref();
            let multiplier = Count::new(count).ok_or_else(|| {
                FormulaError::new(key, 0, key.len(), FormulaErrorKind::ZeroCount(key.to_owned()))
            })?;

            let parsed = formula::parse(key)?;
            if parsed.charge.is_some() {
                return Err(FormulaError::new(key, 0, key.len(), FormulaErrorKind::UnexpectedCharge).into());
            }
            for (atom, count) in parsed.atoms(key)? {
                let count = count.checked_mul(multiplier).ok_or_else(|| overflow(key))?;
                resolve(table, key, atom, count, &mut atoms)?;
            }
        }

        if atoms.is_empty() {
            return Err(FormulaError::new("", 0, 0, FormulaErrorKind::ExpectedTerm).into());
        }
        let atoms = merge(atoms).ok_or_else(|| overflow(""))?;

        Ok(Self {
            atoms,
            charge: None,
        })
    }

    /// The charge written in the formula itself, if there was one
    #[must_use]
    pub const fn formula_charge(&self) -> Option<Charge> {
        self.charge
    }

    /// Each distinct element or isotope of the composition with its count, keyed as it's displayed (`C` or `[13C]`)
    #[must_use]
    pub fn counts(&self) -> Vec<(String, u32)> {
        self.atoms
            .iter()
            .map(|(element, count)| (element.to_string(), count.get()))
            .collect()
    }

    /// The total number of atoms
    #[must_use]
    pub fn atom_count(&self) -> u64 {
        self.atoms.iter().map(|&(_, count)| u64::from(count.get())).sum()
    }

    /// The sum of standard atomic weights, the basis of molecular weight
    #[must_use]
    pub fn standard_weight(&self) -> Decimal {
        self.mass(Element::standard_weight)
    }

    pub(crate) fn atoms(&self) -> &[(Element<'a>, Count)] {
        &self.atoms
    }
}

// Massive and Charged Trait Implementations ===========================================================================

impl Massive for Composition<'_> {
    fn monoisotopic_mass(&self) -> Decimal {
        self.mass(Element::monoisotopic_mass)
    }

    fn average_mass(&self) -> Decimal {
        self.mass(Element::average_mass)
    }
}

impl Charged for Composition<'_> {
    fn charge(&self) -> Charge {
        self.charge.unwrap_or_default()
    }
}

// Display Trait Implementation ========================================================================================

impl Display for Composition<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (element, count) in &self.atoms {
            write!(f, "{element}{count}")?;
        }

        if let Some(charge) = self.charge {
            write!(f, "{charge}")?;
        }

        Ok(())
    }
}

// Private Helper Functions ============================================================================================

impl<'a> Composition<'a> {
    fn mass(&self, accessor: impl Fn(&Element<'a>) -> Decimal) -> Decimal {
        self.atoms
            .iter()
            .map(|(element, count)| Decimal::from(count.get()) * accessor(element))
            .sum()
    }
}

fn resolve<'a>(
    table: &'a MassTable,
    formula: &str,
    atom: Atom,
    count: Count,
    atoms: &mut Vec<(Element<'a>, Count)>,
) -> Result<(), FormulaError> {
    let lookup_error =
        |error| FormulaError::at(formula, atom.span, FormulaErrorKind::LookupError(Box::new(error)));

    // NOTE: Abbreviations shadow any elements sharing their symbol
    let Some(abbreviation) = table.expand_abbreviation(atom.symbol) else {
        let element = Element::lookup(table, atom.symbol, atom.mass_number).map_err(lookup_error)?;
        atoms.push((element, count));
        return Ok(());
    };

    if let Some(mass_number) = atom.mass_number {
        return Err(lookup_error(LookupError::abbreviation_isotope(
            mass_number,
            atom.symbol,
        )));
    }

    for &(ref symbol, mass_number, n) in &abbreviation.atoms {
        let element = Element::lookup(table, symbol, mass_number).map_err(lookup_error)?;
        let count = n
            .checked_mul(count)
            .ok_or_else(|| FormulaError::at(formula, atom.span, FormulaErrorKind::CountOverflow))?;
        atoms.push((element, count));
    }
    Ok(())
}

fn merge(mut atoms: Vec<(Element<'_>, Count)>) -> Option<Vec<(Element<'_>, Count)>> {
    atoms.sort_by(|(a, _), (b, _)| a.hill_order(b));

    let mut merged: Vec<(Element, Count)> = Vec::with_capacity(atoms.len());
    for (element, count) in atoms {
        match merged.last_mut() {
            Some((last, total)) if *last == element => *total = total.checked_add(count)?,
            _ => merged.push((element, count)),
        }
    }
    Some(merged)
}

fn overflow(formula: &str) -> FormulaError {
    FormulaError::new(formula, 0, formula.len(), FormulaErrorKind::CountOverflow)
}

// Module Tests ========================================================================================================
