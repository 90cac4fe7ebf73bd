use nom::{
    character::complete::{char, one_of, satisfy, u32},
    combinator::{cut, map, not},
    sequence::preceded,
};

use crate::Count;

use super::errors::{FormulaErrorKind, ParseResult, expect};

/// uppercase
///   = "A" | "B" | "C" | "D" | "E" | "F" | "G"
///   | "H" | "I" | "J" | "K" | "L" | "M" | "N"
///   | "O" | "P" | "Q" | "R" | "S" | "T" | "U"
///   | "V" | "W" | "X" | "Y" | "Z"
///   ;
pub fn uppercase(i: &str) -> ParseResult<char> {
    let parser = satisfy(|c| c.is_ascii_uppercase());
    expect(parser, FormulaErrorKind::ExpectedUppercase)(i)
}

/// lowercase
///   = "a" | "b" | "c" | "d" | "e" | "f" | "g"
///   | "h" | "i" | "j" | "k" | "l" | "m" | "n"
///   | "o" | "p" | "q" | "r" | "s" | "t" | "u"
///   | "v" | "w" | "x" | "y" | "z"
///   ;
pub fn lowercase(i: &str) -> ParseResult<char> {
    let parser = satisfy(|c| c.is_ascii_lowercase());
    expect(parser, FormulaErrorKind::ExpectedLowercase)(i)
}

/// Count = digit - "0" , { digit } ;
pub fn count(i: &str) -> ParseResult<Count> {
    let not_zero = cut(expect(not(char('0')), FormulaErrorKind::ExpectedNoLeadingZero));
    let digits = expect(u32, FormulaErrorKind::ExpectedDigit);
    // SAFETY: The leading digit has already been checked to be non-zero, so the parsed count can't be zero
    map(preceded(not_zero, digits), |c| Count::new(c).unwrap())(i)
}

/// Sign = "+" | "-" ;
pub fn sign(i: &str) -> ParseResult<i64> {
    map(one_of("+-"), |c| if c == '-' { -1 } else { 1 })(i)
}
