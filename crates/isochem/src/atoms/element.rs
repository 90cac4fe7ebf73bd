use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{Element, IsochemError, Isotope, MassNumber, MassTable, Massive, Result};

use super::errors::LookupError;

impl<'a> Element<'a> {
    #[cfg(test)]
    pub(crate) fn new(table: &'a MassTable, symbol: impl AsRef<str>) -> Result<Self, LookupError> {
        Self::lookup(table, symbol, None)
    }

    #[cfg(test)]
    pub(crate) fn new_isotope(
        table: &'a MassTable,
        symbol: impl AsRef<str>,
        mass_number: MassNumber,
    ) -> Result<Self, LookupError> {
        Self::lookup(table, symbol, Some(mass_number))
    }

    pub(crate) fn lookup(
        table: &'a MassTable,
        symbol: impl AsRef<str>,
        mass_number: Option<MassNumber>,
    ) -> Result<Self, LookupError> {
        let symbol = symbol.as_ref();
        let (symbol, description) = table
            .element(symbol)
            .ok_or_else(|| LookupError::element(symbol))?;

        if let Some(mass_number) = mass_number {
            if !description.isotopes.contains_key(&mass_number) {
                return Err(LookupError::isotope(
                    symbol,
                    mass_number,
                    &description.name,
                    &description.isotopes,
                ));
            }
        }

        Ok(Self {
            symbol,
            name: &description.name,
            mass_number,
            weight: description.weight,
            isotopes: &description.isotopes,
        })
    }

    #[must_use]
    pub const fn symbol(&self) -> &'a str {
        self.symbol
    }

    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }

    #[must_use]
    pub const fn is_isotope(&self) -> bool {
        self.mass_number.is_some()
    }

    /// The (f64) exact mass of an explicitly selected isotope, or `None` for natural elements
    pub(crate) fn isotope_mass(&self) -> Option<f64> {
        self.selected_isotope().map(|i| to_f64(i.relative_mass))
    }

    /// The `(mass, abundance)` pairs of every isotope that occurs naturally
    ///
    /// Isotopes with missing or zero abundances are skipped, and an element without any natural isotopes is an error,
    /// since it has no isotope pattern to speak of.
    pub(crate) fn natural_isotopes(&self) -> Result<Vec<(f64, f64)>> {
        let isotopes: Vec<_> = self
            .isotope_abundances()
            .filter(|&(_, abundance)| !abundance.is_zero())
            .map(|(i, abundance)| (to_f64(i.relative_mass), to_f64(abundance)))
            .collect();

        if isotopes.is_empty() {
            let known = self.isotopes.keys().map(ToString::to_string);
            return Err(Box::new(IsochemError::zero_abundance(self.symbol, self.name, known)));
        }
        Ok(isotopes)
    }

    /// The mass used for molecular weights: the standard atomic weight when the mass table has one, falling back to
    /// the abundance-weighted average of the natural isotopes
    pub(crate) fn standard_weight(&self) -> Decimal {
        match (self.selected_isotope(), self.weight) {
            (Some(isotope), _) => isotope.relative_mass,
            (None, Some(weight)) => weight,
            (None, None) => self.average_mass(),
        }
    }

    // NOTE: Carbon and hydrogen come first, then everything else is alphabetical, with natural elements coming before
    // any of their isotopes
    pub(crate) fn hill_order(&self, other: &Self) -> Ordering {
        let rank = |e: &Self| match e.symbol {
            "C" => 0,
            "H" => 1,
            _ => 2,
        };
        rank(self)
            .cmp(&rank(other))
            .then_with(|| self.symbol.cmp(other.symbol))
            .then_with(|| self.mass_number.cmp(&other.mass_number))
    }

    fn selected_isotope(&self) -> Option<&'a Isotope> {
        self.mass_number.and_then(|a| self.isotopes.get(&a))
    }

    fn isotope_abundances(&self) -> impl Iterator<Item = (&'a Isotope, Decimal)> {
        self.isotopes
            .values()
            .filter_map(|i| i.abundance.map(|abundance| (i, abundance)))
    }
}

// SAFETY: `Decimal::to_f64()` always returns `Some` (it rounds rather than failing), so the fallback is never used
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl Display for Element<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let symbol = self.symbol;
        if let Some(mass_number) = self.mass_number {
            write!(f, "[{mass_number}{symbol}]")
        } else {
            write!(f, "{symbol}")
        }
    }
}

// NOTE: Elements borrowed from the same mass table are identified by their symbol and mass number alone
impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.mass_number == other.mass_number
    }
}

impl Eq for Element<'_> {}

impl Hash for Element<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.mass_number.hash(state);
    }
}

// NOTE: Elements without any natural abundance data have neither a monoisotopic nor an average mass, and contribute
// nothing to either (isotope patterns for them are rejected with an error instead)
impl Massive for Element<'_> {
    fn monoisotopic_mass(&self) -> Decimal {
        self.selected_isotope().map_or_else(
            || {
                self.isotope_abundances()
                    .max_by_key(|&(_, abundance)| abundance)
                    .map_or(Decimal::ZERO, |(i, _)| i.relative_mass)
            },
            |i| i.relative_mass,
        )
    }

    fn average_mass(&self) -> Decimal {
        self.selected_isotope().map_or_else(
            || {
                self.isotope_abundances()
                    .map(|(i, abundance)| i.relative_mass * abundance)
                    .sum()
            },
            |i| i.relative_mass,
        )
    }
}
