use std::fmt;

use miette::{Diagnostic, LabeledSpan, SourceSpan};
use nom::{
    Finish, IResult, Parser,
    combinator::{all_consuming, complete},
    error::{ErrorKind, ParseError},
};
use thiserror::Error;

use crate::atoms::errors::LookupError;

pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a>>;

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum FormulaErrorKind {
    #[diagnostic(help(
        "formulae are built from elements (like Fe), isotopes (like 13C), and groups in (), [], or {{}} brackets"
    ))]
    #[error("expected an element, an isotope, or a bracketed group")]
    ExpectedTerm,

    #[diagnostic(help(
        "a 0 value doesn't make sense here, if you've mistakenly included a leading zero, like \
        NH02, try just NH2 instead"
    ))]
    #[error("counts cannot start with 0")]
    ExpectedNoLeadingZero,

    #[error("expected an ASCII digit 1-9")]
    ExpectedDigit,

    #[error("expected an element symbol")]
    ExpectedSymbol,

    #[error("expected an uppercase ASCII letter")]
    ExpectedUppercase,

    #[error("expected a lowercase ASCII letter")]
    ExpectedLowercase,

    #[diagnostic(help(
        "you've probably forgotten to close an earlier bracket, or closed it with the wrong kind of bracket"
    ))]
    #[error("expected {0:?} to close the bracketed group")]
    ExpectedClosingBracket(char),

    #[diagnostic(help("remove the charge, abbreviations only describe a fixed group of atoms"))]
    #[error("abbreviations cannot carry a charge")]
    UnexpectedCharge,

    #[diagnostic(help("only positive counts can be given to the atoms of a composition"))]
    #[error("the count of {0:?} must be positive")]
    ZeroCount(String),

    #[diagnostic(help("counts are stored as 32-bit unsigned integers, try splitting up the calculation"))]
    #[error("the number of atoms in this part of the formula overflows a 32-bit integer")]
    CountOverflow,

    #[diagnostic(transparent)]
    #[error(transparent)]
    LookupError(Box<LookupError>),

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(ErrorKind),

    #[diagnostic(help("check the unparsed region for errors, or remove it from the rest of the formula"))]
    #[error("could not interpret the full input as a valid molecular formula")]
    Incomplete,
}

impl FormulaErrorKind {
    fn label(&self) -> Option<String> {
        Some(match self {
            // NOTE: Stuck with this nested match until either `box_patterns` or `deref_patterns` are stabilized.
            Self::LookupError(e) => match **e {
                LookupError::Element(..) => "element not found".to_owned(),
                LookupError::Isotope(..) => "isotope not found".to_owned(),
                LookupError::AbbreviationIsotope(..) => "abbreviation with a mass number".to_owned(),
            },
            Self::ExpectedTerm => "expected an element or group".to_owned(),
            Self::ExpectedUppercase => "expected uppercase".to_owned(),
            Self::ExpectedLowercase => "expected lowercase".to_owned(),
            Self::ExpectedDigit => "expected digit".to_owned(),
            Self::ExpectedSymbol => "expected a symbol".to_owned(),
            Self::ExpectedNoLeadingZero => "expected non-zero".to_owned(),
            Self::ExpectedClosingBracket(c) => format!("expected {c:?}"),
            Self::UnexpectedCharge => "charge".to_owned(),
            Self::ZeroCount(_) => "zero count".to_owned(),
            Self::CountOverflow => "too many atoms".to_owned(),
            Self::Incomplete => "input was valid up until this point".to_owned(),
            Self::NomError(_) => "the region that triggered this bug!".to_owned(),
        })
    }
}

impl From<ErrorKind> for FormulaErrorKind {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// Final Errors ========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("{kind}")]
pub struct FormulaError {
    formula: String,
    span: SourceSpan,
    kind: FormulaErrorKind,
}

impl FormulaError {
    pub(crate) fn new(full_input: &str, offset: usize, length: usize, kind: FormulaErrorKind) -> Self {
        // NOTE: The additional space is added so that Diagnostic labels can point to the end of an input
        let formula = format!("{full_input} ");
        let span = SourceSpan::from(offset..offset + length);
        Self {
            formula,
            span,
            kind,
        }
    }

    /// Builds an error labelling `fragment`, which must be a sub-slice of `full_input`
    pub(crate) fn at(full_input: &str, fragment: &str, kind: FormulaErrorKind) -> Self {
        let base_addr = full_input.as_ptr() as usize;
        let fragment_addr = fragment.as_ptr() as usize;
        debug_assert!(
            (base_addr..=base_addr + full_input.len()).contains(&fragment_addr),
            "tried to get the span of a non-substring!"
        );
        let offset = fragment_addr.saturating_sub(base_addr);
        Self::new(full_input, offset, fragment.len(), kind)
    }

    #[must_use]
    pub const fn kind(&self) -> &FormulaErrorKind {
        &self.kind
    }

    #[must_use]
    pub const fn span(&self) -> SourceSpan {
        self.span
    }
}

impl Diagnostic for FormulaError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.formula)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = self.kind.label();
        Some(Box::new(
            label
                .into_iter()
                .map(|l| LabeledSpan::new_with_span(Some(l), self.span)),
        ))
    }
}

// Intermediate Parser Errors ==========================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LabeledParseError<'a> {
    input: &'a str,
    kind: FormulaErrorKind,
}

impl<'a> LabeledParseError<'a> {
    pub fn new(input: &'a str, kind: FormulaErrorKind) -> Self {
        Self { input, kind }
    }

    fn into_final_error(self, full_input: &str) -> FormulaError {
        let offset = full_input.len().saturating_sub(self.input.len());
        FormulaError::new(full_input, offset, 0, self.kind)
    }
}

impl<'a> ParseError<&'a str> for LabeledParseError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    // NOTE: Of two failed alternatives, report the one that made it furthest through the input
    fn or(self, other: Self) -> Self {
        if other.input.len() < self.input.len() {
            other
        } else {
            self
        }
    }
}

// Error-Labelling Combinators =========================================================================================

pub fn final_parser<'a, O, P>(parser: P) -> impl FnMut(&'a str) -> Result<O, FormulaError>
where
    P: Parser<&'a str, O, LabeledParseError<'a>>,
{
    let mut parser = all_consuming(complete(parser));
    move |input| {
        parser
            .parse(input)
            .finish()
            .map(|(_, o)| o)
            .map_err(|e| e.into_final_error(input))
    }
}

/// Replaces recoverable errors from `parser` with `kind`, leaving failures from `cut` untouched
pub fn expect<'a, O, P>(mut parser: P, kind: FormulaErrorKind) -> impl FnMut(&'a str) -> ParseResult<'a, O>
where
    P: Parser<&'a str, O, LabeledParseError<'a>>,
{
    move |i| match parser.parse(i) {
        Err(nom::Err::Error(_)) => Err(nom::Err::Error(LabeledParseError::new(i, kind.clone()))),
        result => result,
    }
}
