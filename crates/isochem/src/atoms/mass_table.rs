// Standard Library Imports
use std::{collections::BTreeMap, ops::Deref, str::FromStr};

// External Crate Imports
use ahash::HashMap;
use knuffel::{
    Decode, DecodeScalar,
    ast::{Literal, TypeName},
    decode::{Context, Kind},
    errors::{DecodeError, ExpectedType},
    span::Spanned,
    traits::ErrorSpan,
};
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

// Local Module Imports
use crate::{
    Count, IsochemError, Isotope, MassNumber, Result,
    parsers::{
        errors::{FormulaError, FormulaErrorKind},
        formula::parse as parse_formula,
    },
};

pub const DEFAULT_KDL: &str = include_str!("../../data/mass_table.kdl");

// Public API ==========================================================================================================

/// Isotope masses, natural abundances, and standard atomic weights, along with any named abbreviations
///
/// Tables are plain values that are passed (by reference) to everything that needs to look up an element. The bundled
/// table is available via [`MassTable::default()`] and can be extended or overridden with [`MassTable::merge()`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MassTable {
    elements: HashMap<String, ElementDescription>,
    abbreviations: HashMap<String, Abbreviation>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct ElementDescription {
    pub(crate) name: String,
    pub(crate) weight: Option<Decimal>,
    pub(crate) isotopes: BTreeMap<MassNumber, Isotope>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct Abbreviation {
    pub(crate) formula: String,
    pub(crate) atoms: Vec<(String, Option<MassNumber>, Count)>,
}

impl MassTable {
    pub fn from_kdl(file_name: impl AsRef<str>, text: impl AsRef<str>) -> Result<Self> {
        let file_name = file_name.as_ref();
        let parsed_table: MassTableKdl = knuffel::parse(file_name, text.as_ref())
            .map_err(|source| IsochemError::mass_table(file_name, source))?;

        let elements = parsed_table
            .elements
            .into_iter()
            .map(ElementEntry::try_from)
            .collect::<Result<_>>()?;
        let abbreviations = parsed_table
            .abbreviations
            .into_iter()
            .map(AbbreviationEntry::try_from)
            .collect::<Result<_>>()?;

        let table = Self {
            elements,
            abbreviations,
        };
        table.validate_abbreviations()?;

        log::debug!(
            "loaded the mass table {file_name:?} with {} elements and {} abbreviations",
            table.elements.len(),
            table.abbreviations.len()
        );
        Ok(table)
    }

    /// Adds the elements and abbreviations of `other` to this table, replacing any that share a symbol
    ///
    /// If the merged abbreviations would refer to other abbreviations, an error is returned and this table is left
    /// unchanged.
    pub fn merge(&mut self, other: Self) -> Result<()> {
        let mut merged = self.clone();
        merged.elements.extend(other.elements);
        merged.abbreviations.extend(other.abbreviations);
        merged.validate_abbreviations()?;

        *self = merged;
        Ok(())
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn contains_element(&self, symbol: &str) -> bool {
        self.elements.contains_key(symbol)
    }

    /// Returns the formula an abbreviation stands for
    #[must_use]
    pub fn abbreviation(&self, symbol: &str) -> Option<&str> {
        self.abbreviations.get(symbol).map(|a| a.formula.as_str())
    }

    pub(crate) fn element(&self, symbol: &str) -> Option<(&str, &ElementDescription)> {
        self.elements
            .get_key_value(symbol)
            .map(|(symbol, description)| (symbol.as_str(), description))
    }

    pub(crate) fn expand_abbreviation(&self, symbol: &str) -> Option<&Abbreviation> {
        self.abbreviations.get(symbol)
    }

    fn validate_abbreviations(&self) -> Result<()> {
        for (symbol, abbreviation) in &self.abbreviations {
            let nested = abbreviation
                .atoms
                .iter()
                .find(|(s, a, _)| a.is_none() && self.abbreviations.contains_key(s));
            if let Some((nested, ..)) = nested {
                return Err(Box::new(IsochemError::nested_abbreviation(
                    symbol,
                    &abbreviation.formula,
                    nested,
                )));
            }
        }
        Ok(())
    }
}

impl Default for MassTable {
    fn default() -> Self {
        // SAFETY: The bundled mass table is checked by the tests in this module
        Self::from_kdl("mass_table.kdl", DEFAULT_KDL).unwrap()
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct MassTableKdl {
    #[knuffel(child, unwrap(children), default)]
    elements: Vec<ElementKdl>,
    #[knuffel(child, unwrap(children), default)]
    abbreviations: Vec<AbbreviationKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knuffel(node_name)]
    symbol: Symbol,
    #[knuffel(argument)]
    name: String,
    #[knuffel(child, unwrap(argument), default)]
    weight: Option<DecimalKdl>,
    #[knuffel(children(name = "isotope"))]
    isotopes: Vec<IsotopeKdl>,
}

#[derive(Debug, Decode)]
struct IsotopeKdl {
    #[knuffel(argument)]
    mass_number: u32,
    #[knuffel(argument)]
    relative_mass: DecimalKdl,
    #[knuffel(argument)]
    abundance: Option<DecimalKdl>,
}

#[derive(Debug, Decode)]
struct AbbreviationKdl {
    #[knuffel(node_name)]
    symbol: Symbol,
    #[knuffel(argument)]
    formula: String,
}

// Lossless Parsing of KDL Numbers to Decimal ==========================================================================

#[derive(Debug, Default)]
struct DecimalKdl(Decimal);

impl<S: ErrorSpan> DecodeScalar<S> for DecimalKdl {
    fn type_check(type_name: &Option<Spanned<TypeName, S>>, ctx: &mut Context<S>) {
        if let Some(t) = type_name {
            ctx.emit_error(DecodeError::TypeName {
                span: t.span().clone(),
                found: Some(t.deref().clone()),
                expected: ExpectedType::no_type(),
                rust_type: "Decimal",
            });
        }
    }

    fn raw_decode(value: &Spanned<Literal, S>, ctx: &mut Context<S>) -> Result<Self, DecodeError<S>> {
        let decimal = match &**value {
            Literal::Int(integer) => i64::try_from(integer)
                .map(Decimal::from)
                .map_err(|e| DecodeError::conversion(value, e)),
            // NOTE: knuffel only exposes decimal literals as `f64`s, but the shortest representation of an `f64` is the
            // original literal whenever that has 15 or fewer significant digits
            Literal::Decimal(decimal) => f64::try_from(decimal)
                .map_err(|e| DecodeError::conversion(value, e))
                .and_then(|float| {
                    Decimal::from_str_exact(&float.to_string()).map_err(|e| DecodeError::conversion(value, e))
                }),
            unsupported => Err(DecodeError::unsupported(
                value,
                format!("expected a decimal number, found {}", Kind::from(unsupported)),
            )),
        };
        decimal.map(Self).or_else(|error| {
            ctx.emit_error(error);
            Ok(Self::default())
        })
    }
}

// Element and Abbreviation Symbol Validation ==========================================================================

#[derive(Debug)]
struct Symbol(String);

impl FromStr for Symbol {
    type Err = InvalidSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_lowercase());
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(InvalidSymbolError(s.to_owned()))
        }
    }
}

#[derive(Eq, PartialEq, Debug, Diagnostic, Error)]
#[error("expected a single uppercase ASCII letter optionally followed by lowercase ASCII letters, got {0:?}")]
struct InvalidSymbolError(String);

// Conversion From Parsed KDL to Internal Representation ===============================================================

type ElementEntry = (String, ElementDescription);

impl TryFrom<ElementKdl> for ElementEntry {
    type Error = Box<IsochemError>;

    fn try_from(
        ElementKdl {
            symbol,
            name,
            weight,
            isotopes,
        }: ElementKdl,
    ) -> Result<Self> {
        if isotopes.is_empty() {
            return Err(Box::new(IsochemError::invalid_element(
                &symbol.0,
                "every element needs at least one isotope",
            )));
        }
        let isotopes = isotopes
            .into_iter()
            .map(|isotope| isotope_entry(&symbol.0, isotope))
            .collect::<Result<_>>()?;
        Ok((
            symbol.0,
            ElementDescription {
                name,
                weight: weight.map(|w| w.0),
                isotopes,
            },
        ))
    }
}

type IsotopeEntry = (MassNumber, Isotope);

fn isotope_entry(
    symbol: &str,
    IsotopeKdl {
        mass_number,
        relative_mass,
        abundance,
    }: IsotopeKdl,
) -> Result<IsotopeEntry> {
    let mass_number = MassNumber::new(mass_number).ok_or_else(|| {
        IsochemError::invalid_isotope(symbol, mass_number, "mass numbers must be positive")
    })?;
    let abundance = abundance.map(|a| a.0);
    if abundance.is_some_and(|a| a.is_sign_negative() || a > Decimal::ONE) {
        let reason = "natural abundances must be between 0 and 1";
        return Err(Box::new(IsochemError::invalid_isotope(
            symbol,
            mass_number.0.get(),
            reason,
        )));
    }
    Ok((
        mass_number,
        Isotope {
            relative_mass: relative_mass.0,
            abundance,
        },
    ))
}

type AbbreviationEntry = (String, Abbreviation);

impl TryFrom<AbbreviationKdl> for AbbreviationEntry {
    type Error = Box<IsochemError>;

    fn try_from(AbbreviationKdl { symbol, formula }: AbbreviationKdl) -> Result<Self> {
        let invalid = |error| IsochemError::invalid_abbreviation(&symbol.0, &formula, error);
        let parsed = parse_formula(&formula).map_err(invalid)?;
        if parsed.charge.is_some() {
            let error = FormulaError::new(&formula, 0, formula.len(), FormulaErrorKind::UnexpectedCharge);
            return Err(Box::new(invalid(error)));
        }
        let atoms = parsed
            .atoms(&formula)
            .map_err(invalid)?
            .into_iter()
            .map(|(atom, count)| (atom.symbol.to_owned(), atom.mass_number, count))
            .collect();
        Ok((symbol.0, Abbreviation { formula, atoms }))
    }
}

// Module Tests ========================================================================================================
