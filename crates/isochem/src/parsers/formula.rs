// External Crate Imports
use nom::{
    Parser,
    branch::alt,
    character::complete::char,
    combinator::{consumed, cut, eof, map, not, opt, recognize},
    multi::{many0_count, many1},
    sequence::{delimited, pair, terminated},
};

// Local Crate Imports
use super::{
    errors::{FormulaError, FormulaErrorKind, ParseResult, expect, final_parser},
    primitives::{count, lowercase, sign, uppercase},
};
use crate::{Charge, Count, MassNumber};

// Syntax Tree =========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct Formula<'s> {
    pub(crate) terms: Vec<Term<'s>>,
    pub(crate) charge: Option<Charge>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct Term<'s> {
    unit: Unit<'s>,
    count: Count,
    span: &'s str,
}

#[derive(Clone, Eq, PartialEq, Debug)]
enum Unit<'s> {
    Atom(Atom<'s>),
    Group(Vec<Term<'s>>),
}

/// A single element, isotope, or abbreviation symbol, along with the slice of the formula it was parsed from
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Atom<'s> {
    pub(crate) symbol: &'s str,
    pub(crate) mass_number: Option<MassNumber>,
    pub(crate) span: &'s str,
}

// Public API ==========================================================================================================

pub(crate) fn parse(formula: &str) -> Result<Formula<'_>, FormulaError> {
    final_parser(self::formula)(formula)
}

impl<'s> Formula<'s> {
    /// Flattens all bracketed groups, multiplying through their counts
    ///
    /// The same symbol may appear more than once in the output, merging duplicates is left to the caller.
    pub(crate) fn atoms(&self, full_input: &str) -> Result<Vec<(Atom<'s>, Count)>, FormulaError> {
        let mut atoms = Vec::new();
        flatten(&self.terms, Count::default(), full_input, &mut atoms)?;
        Ok(atoms)
    }
}

fn flatten<'s>(
    terms: &[Term<'s>],
    multiplier: Count,
    full_input: &str,
    atoms: &mut Vec<(Atom<'s>, Count)>,
) -> Result<(), FormulaError> {
    for term in terms {
        let count = term
            .count
            .checked_mul(multiplier)
            .ok_or_else(|| FormulaError::at(full_input, term.span, FormulaErrorKind::CountOverflow))?;
        match &term.unit {
            Unit::Atom(atom) => atoms.push((*atom, count)),
            Unit::Group(terms) => flatten(terms, count, full_input, atoms)?,
        }
    }
    Ok(())
}

// Private Sub-Parsers =================================================================================================

/// Formula = Terms , [ Charge ] ;
fn formula(i: &str) -> ParseResult<Formula> {
    map(pair(terms, opt(charge)), |(terms, charge)| Formula { terms, charge })(i)
}

/// Terms = { Term }- ;
fn terms(i: &str) -> ParseResult<Vec<Term>> {
    many1(term)(i)
}

/// Term = ( Group | Isotope | Element ) , [ Count ] ;
fn term(i: &str) -> ParseResult<Term> {
    let group_term = pair(map(group, Unit::Group), opt(group_count));
    let atom_term = pair(map(alt((isotope, element)), Unit::Atom), opt(count));
    let parser = map(
        consumed(alt((group_term, atom_term))),
        |(span, (unit, count))| Term {
            unit,
            count: count.unwrap_or_default(),
            span,
        },
    );
    expect(parser, FormulaErrorKind::ExpectedTerm)(i)
}

// NOTE: These are not meant to be links, it's just EBNF
#[allow(clippy::doc_link_with_quotes)]
/// Group = "(" , Terms , ")" | "[" , Terms , "]" | "{" , Terms , "}" ;
fn group(i: &str) -> ParseResult<Vec<Term>> {
    alt((
        bracketed('(', ')'),
        bracketed('[', ']'),
        bracketed('{', '}'),
    ))(i)
}

fn bracketed<'s>(open: char, close: char) -> impl FnMut(&'s str) -> ParseResult<'s, Vec<Term<'s>>> {
    let closing_bracket = cut(expect(
        char(close),
        FormulaErrorKind::ExpectedClosingBracket(close),
    ));
    delimited(char(open), cut(terms), closing_bracket)
}

/// Group Count = Count - ( Count , Sign , EOF ) ;
///
/// A count after an atom always belongs to that atom (`NO3-`, `C6H6+`), but the digits between a closing bracket
/// and a sign ending the formula are a `digits+sign` charge on the whole bracketed species (`[Fe(CN)6]4-`,
/// `[SO4]2-`). They're left for the charge parser.
fn group_count(i: &str) -> ParseResult<Count> {
    terminated(count, not(pair(sign, eof)))(i)
}

/// Isotope = Mass Number , Symbol ;
fn isotope(i: &str) -> ParseResult<Atom> {
    let mass_number = map(count, |c| MassNumber(c.0));
    map(
        consumed(pair(mass_number, symbol)),
        |(span, (mass_number, symbol))| Atom {
            symbol,
            mass_number: Some(mass_number),
            span,
        },
    )(i)
}

/// Element = Symbol ;
fn element(i: &str) -> ParseResult<Atom> {
    map(symbol, |symbol| Atom {
        symbol,
        mass_number: None,
        span: symbol,
    })(i)
}

/// Symbol = uppercase , { lowercase } ;
fn symbol(i: &str) -> ParseResult<&str> {
    let parser = recognize(pair(uppercase, many0_count(lowercase)));
    expect(parser, FormulaErrorKind::ExpectedSymbol)(i)
}

/// Charge = Sign , [ Count ] | Count , Sign ;
fn charge(i: &str) -> ParseResult<Charge> {
    let sign_first = pair(sign, opt(count).map(Option::unwrap_or_default));
    let count_first = map(pair(count, sign), |(count, sign)| (sign, count));
    map(alt((sign_first, count_first)), |(sign, count)| {
        Charge(sign * i64::from(count.get()))
    })(i)
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // NOTE: Renders the syntax tree as a flat list of `(symbol, count)` pairs, with groups in brackets
    fn render(terms: &[Term]) -> String {
        terms
            .iter()
            .map(|Term { unit, count, .. }| {
                let unit = match unit {
                    Unit::Atom(Atom {
                        symbol,
                        mass_number: Some(a),
                        ..
                    }) => format!("{a}{symbol}"),
                    Unit::Atom(Atom { symbol, .. }) => (*symbol).to_owned(),
                    Unit::Group(terms) => format!("({})", render(terms)),
                };
                format!("{unit}{count}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn flat(formula: &str) -> Vec<(String, u32)> {
        let parsed = parse(formula).unwrap();
        parsed
            .atoms(formula)
            .unwrap()
            .into_iter()
            .map(|(atom, count)| (atom.span.to_owned(), count.get()))
            .collect()
    }

    #[test]
    fn test_symbol() {
        // Valid Symbols
        assert_eq!(symbol("H"), Ok(("", "H")));
        assert_eq!(symbol("He"), Ok(("", "He")));
        assert_eq!(symbol("Acac"), Ok(("", "Acac")));
        // Invalid Symbols
        assert!(symbol("p").is_err());
        assert!(symbol("ep").is_err());
        assert!(symbol("1H").is_err());
        assert!(symbol("+H").is_err());
        assert!(symbol("[H]").is_err());
        // Multiple Symbols
        assert_eq!(symbol("OH"), Ok(("H", "O")));
        assert_eq!(symbol("HeH"), Ok(("H", "He")));
    }

    #[test]
    fn test_isotope() {
        macro_rules! assert_isotope {
            ($input:literal, $output:literal, $mass_number:literal, $symbol:literal) => {
                let (rest, atom) = isotope($input).unwrap();
                assert_eq!(rest, $output);
                assert_eq!(atom.mass_number, MassNumber::new($mass_number));
                assert_eq!(atom.symbol, $symbol);
            };
        }
        // Valid Isotopes
        assert_isotope!("13C", "", 13, "C");
        assert_isotope!("2H", "", 2, "H");
        assert_isotope!("37Cl", "", 37, "Cl");
        // Invalid Isotopes
        assert!(isotope("C").is_err());
        assert!(isotope("13").is_err());
        assert!(isotope("13c").is_err());
        assert!(isotope("[13C]").is_err());
        assert!(isotope("013C").is_err());
        // Multiple Isotopes
        assert_isotope!("13CO2", "O2", 13, "C");
        assert_isotope!("3HeH", "H", 3, "He");
    }

    #[test]
    fn test_charge() {
        assert_eq!(charge("+"), Ok(("", Charge(1))));
        assert_eq!(charge("-"), Ok(("", Charge(-1))));
        assert_eq!(charge("+2"), Ok(("", Charge(2))));
        assert_eq!(charge("-3"), Ok(("", Charge(-3))));
        assert_eq!(charge("2+"), Ok(("", Charge(2))));
        assert_eq!(charge("4-"), Ok(("", Charge(-4))));
        // Invalid Charges
        assert!(charge("2").is_err());
        assert!(charge("H+").is_err());
        assert!(charge("+0").is_err());
    }

    #[test]
    fn test_terms() {
        macro_rules! assert_terms {
            ($input:literal, $output:literal, $rendered:literal) => {
                let (rest, terms) = terms($input).unwrap();
                assert_eq!(rest, $output);
                assert_eq!(render(&terms), $rendered);
            };
        }
        assert_terms!("H2O", "", "H2 O");
        assert_terms!("C6H12O6", "", "C6 H12 O6");
        assert_terms!("(CH2)3", "", "(C H2)3");
        assert_terms!("[13C]H4", "", "(13C) H4");
        assert_terms!("13CH4", "", "13C H4");
        assert_terms!("{[Fe(CN)6]2}3", "", "((Fe (C N)6)2)3");
        assert_terms!("PhMe", "", "Ph Me");
        // Counts are greedy after atoms, but not after groups that end the formula with a charge
        assert_terms!("H2O2-", "-", "H2 O2");
        assert_terms!("NO3-", "-", "N O3");
        assert_terms!("SO42-", "-", "S O42");
        assert_terms!("[SO4]2-", "2-", "(S O4)");
        assert_terms!("[Fe(CN)6]4-", "4-", "(Fe (C N)6)");
        assert_terms!("(CH2)3+", "3+", "(C H2)");
        assert_terms!("[Fe(CN)6]4-H", "-H", "(Fe (C N)6)4");
        assert_terms!("SO4-2", "-2", "S O4");
        // Leftovers
        assert_terms!("H2O+", "+", "H2 O");
        assert_terms!("NaCl H2O", " H2O", "Na Cl");
        assert_terms!("CH4*", "*", "C H4");
    }

    #[test]
    fn test_formula() {
        let parsed = parse("[Fe(CN)6]4-").unwrap();
        assert_eq!(render(&parsed.terms), "(Fe (C N)6)");
        assert_eq!(parsed.charge, Some(Charge(-4)));
        let parsed = parse("C6H6+").unwrap();
        assert_eq!(render(&parsed.terms), "C6 H6");
        assert_eq!(parsed.charge, Some(Charge(1)));
        let parsed = parse("C2H4O2-2").unwrap();
        assert_eq!(render(&parsed.terms), "C2 H4 O2");
        assert_eq!(parsed.charge, Some(Charge(-2)));
        // A `digits+sign` charge needs a bracketed species, otherwise the digits are a count
        let parsed = parse("[SO4]2-").unwrap();
        assert_eq!(render(&parsed.terms), "(S O4)");
        assert_eq!(parsed.charge, Some(Charge(-2)));
        let parsed = parse("SO42-").unwrap();
        assert_eq!(render(&parsed.terms), "S O42");
        assert_eq!(parsed.charge, Some(Charge(-1)));
        let parsed = parse("(CH2)3+").unwrap();
        assert_eq!(render(&parsed.terms), "(C H2)");
        assert_eq!(parsed.charge, Some(Charge(3)));
        let parsed = parse("C60+12").unwrap();
        assert_eq!(render(&parsed.terms), "C60");
        assert_eq!(parsed.charge, Some(Charge(12)));
        let parsed = parse("H2O").unwrap();
        assert_eq!(parsed.charge, None);
    }

    #[test]
    fn test_formula_errors() {
        macro_rules! assert_error {
            ($input:literal, $kind:expr, $offset:literal) => {
                let error = parse($input).unwrap_err();
                assert_eq!(error.kind(), &$kind);
                assert_eq!(error.span().offset(), $offset);
            };
        }
        // Unclosed, mismatched, and empty groups
        assert_error!("C(H2", FormulaErrorKind::ExpectedClosingBracket(')'), 4);
        assert_error!("C(H2]", FormulaErrorKind::ExpectedClosingBracket(')'), 4);
        assert_error!("[Fe(CN}6]", FormulaErrorKind::ExpectedClosingBracket(')'), 6);
        assert_error!("C()", FormulaErrorKind::ExpectedTerm, 2);
        // Unmatched closing brackets and stray characters
        assert_error!("CH2)3", FormulaErrorKind::Incomplete, 3);
        assert_error!("H2O*", FormulaErrorKind::Incomplete, 3);
        assert_error!("H2O+-", FormulaErrorKind::Incomplete, 4);
        // Empty and lowercase formulae
        assert_error!("", FormulaErrorKind::ExpectedTerm, 0);
        assert_error!("h2o", FormulaErrorKind::ExpectedTerm, 0);
        // Zero counts and leading zeroes
        assert_error!("C3H0N4", FormulaErrorKind::ExpectedNoLeadingZero, 3);
        assert_error!("C3H06N4", FormulaErrorKind::ExpectedNoLeadingZero, 3);
        assert_error!("(CH2)0", FormulaErrorKind::ExpectedNoLeadingZero, 5);
        assert_error!("H2O+0", FormulaErrorKind::ExpectedNoLeadingZero, 4);
    }

    #[test]
    fn test_atoms() {
        assert_eq!(flat("H2O"), [("H".to_owned(), 2), ("O".to_owned(), 1)]);
        assert_eq!(flat("(CH2)3"), [("C".to_owned(), 3), ("H".to_owned(), 6)]);
        assert_eq!(
            flat("{[13CH2]2O}3H"),
            [
                ("13C".to_owned(), 6),
                ("H".to_owned(), 12),
                ("O".to_owned(), 3),
                ("H".to_owned(), 1)
            ]
        );
        // Counts that overflow a u32 are reported with the offending group
        let formula = "(C4000000000)2";
        let error = parse(formula).unwrap().atoms(formula).unwrap_err();
        assert_eq!(error.kind(), &FormulaErrorKind::CountOverflow);
        assert_eq!(error.span().offset(), 1);
        assert_eq!(error.span().len(), 11);
    }
}
