use miette::Diagnostic;
use thiserror::Error;

use crate::parsers::errors::{FormulaError, FormulaErrorKind};

pub type Result<T, E = Box<IsochemError>> = std::result::Result<T, E>;

// FIXME: Check all of the errors returned from public API are wrapped in this!
#[derive(Debug, Diagnostic, Error)]
pub enum IsochemError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Formula(FormulaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownElement(FormulaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CountOverflow(FormulaError),

    #[diagnostic(help(
        "consider explicitly selecting the isotope to be used in pattern calculations, e.g. {isotope}{symbol}"
    ))]
    #[error(
        "no natural abundance data could be found for {name} ({symbol}), though the following isotopes were found: \
        {isotopes}"
    )]
    ZeroAbundance {
        symbol: String,
        name: String,
        isotope: String,
        isotopes: String,
    },

    #[diagnostic(help("expected one of: combinatorics, multiplicative, hybrid"))]
    #[error("{0:?} is not a valid isotope pattern method")]
    InvalidIpMethod(String),

    #[diagnostic(help("expected one of: none, threshold, npeaks, consolidate"))]
    #[error("{0:?} is not a valid drop method")]
    InvalidDropMethod(String),

    #[diagnostic(help("expected one of: weighted, centroid"))]
    #[error("{0:?} is not a valid grouping method")]
    InvalidGroupMethod(String),

    #[diagnostic(help("only one of threshold, npeaks, or consolidate can be set, matching the chosen drop method"))]
    #[error("the drop parameters {0} are mutually exclusive")]
    MutuallyExclusive(String),

    #[error("invalid value {value:?} for the parameter {key:?}: {reason}")]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },

    #[error("the mass table {name:?} could not be decoded")]
    MassTable {
        name: String,
        #[source]
        source: knuffel::Error,
    },

    #[error("the element {symbol} is invalid: {reason}")]
    InvalidElement { symbol: String, reason: &'static str },

    #[error("the isotope {mass_number} of {symbol} is invalid: {reason}")]
    InvalidIsotope {
        symbol: String,
        mass_number: u32,
        reason: &'static str,
    },

    #[error("the abbreviation {symbol} stands for an invalid formula: {formula:?}")]
    InvalidAbbreviation {
        symbol: String,
        formula: String,
        #[source]
        #[diagnostic_source]
        error: FormulaError,
    },

    #[diagnostic(help("abbreviations can only be written in terms of elements and isotopes, try expanding {nested}"))]
    #[error("the abbreviation {symbol} ({formula}) refers to another abbreviation, {nested}")]
    NestedAbbreviation {
        symbol: String,
        formula: String,
        nested: String,
    },

    #[error("the snapshot could not be restored: {0}")]
    InvalidSnapshot(String),
}

impl IsochemError {
    pub(crate) fn zero_abundance(symbol: &str, name: &str, isotopes: impl IntoIterator<Item = String>) -> Self {
        let isotopes: Vec<_> = isotopes.into_iter().collect();
        let isotope = isotopes.first().cloned().unwrap_or_default();
        let isotopes = format!("[{}]", isotopes.join(", "));
        Self::ZeroAbundance {
            symbol: symbol.to_owned(),
            name: name.to_owned(),
            isotope,
            isotopes,
        }
    }

    pub(crate) fn invalid_parameter(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::InvalidParameter {
            key: key.to_owned(),
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn mass_table(name: &str, source: knuffel::Error) -> Self {
        let name = name.to_owned();

        Self::MassTable { name, source }
    }

    pub(crate) fn invalid_element(symbol: &str, reason: &'static str) -> Self {
        Self::InvalidElement {
            symbol: symbol.to_owned(),
            reason,
        }
    }

    pub(crate) fn invalid_isotope(symbol: &str, mass_number: u32, reason: &'static str) -> Self {
        Self::InvalidIsotope {
            symbol: symbol.to_owned(),
            mass_number,
            reason,
        }
    }

    pub(crate) fn invalid_abbreviation(symbol: &str, formula: &str, error: FormulaError) -> Self {
        Self::InvalidAbbreviation {
            symbol: symbol.to_owned(),
            formula: formula.to_owned(),
            error,
        }
    }

    pub(crate) fn nested_abbreviation(symbol: &str, formula: &str, nested: &str) -> Self {
        Self::NestedAbbreviation {
            symbol: symbol.to_owned(),
            formula: formula.to_owned(),
            nested: nested.to_owned(),
        }
    }
}

impl From<FormulaError> for IsochemError {
    fn from(error: FormulaError) -> Self {
        match error.kind() {
            FormulaErrorKind::LookupError(_) => Self::UnknownElement(error),
            FormulaErrorKind::CountOverflow => Self::CountOverflow(error),
            _ => Self::Formula(error),
        }
    }
}

impl From<FormulaError> for Box<IsochemError> {
    fn from(error: FormulaError) -> Self {
        Box::new(error.into())
    }
}

// Warnings ============================================================================================================

/// Raised when the pattern-derived exact mass of a molecule strays too far from its expected molecular weight
///
/// Some legitimately large molecules accumulate more floating-point error than the default critical error allows,
/// so this is only ever reported, never returned as an error.
#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
#[diagnostic(
    severity(Warning),
    help("this is expected for very large molecules, otherwise try increasing the number of decimal places tracked")
)]
#[error(
    "the estimated exact mass of {formula} deviates from its molecular weight by {:.3} ppm, exceeding the critical \
    error of {:.3} ppm",
    .error * 1e6,
    .critical_error * 1e6
)]
pub struct AccuracyWarning {
    pub formula: String,
    pub error: f64,
    pub critical_error: f64,
}
