use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::{Isotope, MassNumber};

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum LookupError {
    #[diagnostic(help("double-check for typos, or add a new entry to the mass table"))]
    #[error("the element or abbreviation {0:?} could not be found in the supplied mass table")]
    Element(String),

    #[diagnostic(help("double-check for typos, or add a new entry to the mass table"))]
    #[error(
        "the isotope \"{0}-{1}\" could not be found in the supplied mass table, though the following {2} \
        isotopes were found: {3}"
    )]
    Isotope(String, MassNumber, String, String),

    #[diagnostic(help("abbreviations stand for a whole group of atoms, so they can't be written as isotopes"))]
    #[error("{1:?} is an abbreviation, but was given the mass number {0}")]
    AbbreviationIsotope(MassNumber, String),
}

impl LookupError {
    pub(crate) fn element(symbol: &str) -> Self {
        Self::Element(symbol.to_owned())
    }

    pub(crate) fn isotope(
        symbol: &str,
        mass_number: MassNumber,
        name: &str,
        isotopes: &BTreeMap<MassNumber, Isotope>,
    ) -> Self {
        Self::Isotope(
            symbol.to_owned(),
            mass_number,
            name.to_owned(),
            display_vec(isotopes.keys()),
        )
    }

    pub(crate) fn abbreviation_isotope(mass_number: MassNumber, symbol: &str) -> Self {
        Self::AbbreviationIsotope(mass_number, symbol.to_owned())
    }
}

// FIXME: Where does this belong?
pub(crate) fn display_vec<I: ToString>(items: impl IntoIterator<Item = I>) -> String {
    let items: Vec<_> = items.into_iter().map(|i| i.to_string()).collect();
    format!("[{}]", items.join(", "))
}
