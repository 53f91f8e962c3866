//! Commonly used preset patterns, ready-built and optimized.
//!
//! Each preset constructs through a private fallible builder and unwraps
//! once: the programs are fixed and conflict-free, so a conflict here is a
//! defect, not a user error.

use crate::machine::Regex;
use crate::TablewalkError;

/// Any single digit `[0-9]`.
pub fn digit() -> Regex {
    build_digit().expect("digit preset is conflict-free")
}

/// A C-like integer literal: `0`, or a nonzero digit followed by any digits.
/// Leading zeroes are not accepted.
pub fn integer() -> Regex {
    build_integer().expect("integer preset is conflict-free")
}

/// A run of one or more digits, leading zeroes allowed.
pub fn zero_prefixable_integer() -> Regex {
    build_zero_prefixable_integer().expect("zero-prefixable integer preset is conflict-free")
}

/// A sane identifier: letters, digits, and underscores, not starting with a
/// digit.
pub fn identifier() -> Regex {
    build_identifier().expect("identifier preset is conflict-free")
}

/// A `//` line comment, terminated by a newline or by end of input (the
/// latter only matches in file mode).
pub fn c_like_comment() -> Regex {
    build_c_like_comment().expect("comment preset is conflict-free")
}

/// A floating point literal: an integer, a dot, then any digits.
pub fn float() -> Regex {
    build_float().expect("float preset is conflict-free")
}

fn build_digit() -> Result<Regex, TablewalkError> {
    let mut rg = Regex::new();
    rg.match_digit().terminal()?;
    rg.optimize();
    Ok(rg)
}

fn build_integer() -> Result<Regex, TablewalkError> {
    let d = digit();
    let mut rg = Regex::new();
    rg.match_any_of(b"123456789");
    rg.match_many_optionally(&d)?.terminal()?;
    rg.goback().match_any_of(b"0");
    rg.terminal()?;
    rg.optimize();
    Ok(rg)
}

fn build_zero_prefixable_integer() -> Result<Regex, TablewalkError> {
    let d = digit();
    let mut rg = Regex::new();
    rg.match_many(&d)?.terminal()?;
    rg.optimize();
    Ok(rg)
}

fn build_identifier() -> Result<Regex, TablewalkError> {
    let mut first = Regex::new();
    first.match_alpha().terminal()?;
    first.goback().match_any_of(b"_");
    first.terminal()?;
    first.optimize();

    let mut rest = Regex::new();
    rest.match_pattern(&first)?.terminal()?;
    rest.goback().match_digit();
    rest.terminal()?;
    rest.optimize();

    let mut rg = Regex::new();
    rg.match_pattern(&first)?;
    rg.match_many_optionally(&rest)?;
    rg.terminal()?;
    rg.optimize();
    Ok(rg)
}

fn build_c_like_comment() -> Result<Regex, TablewalkError> {
    let mut any_char = Regex::new();
    any_char.match_default()?.terminal()?;
    any_char.optimize();

    let mut end = Regex::new();
    end.match_eof().terminal()?;
    end.goback().match_any_of(b"\n");
    end.terminal()?;
    end.optimize();

    let mut rg = Regex::new();
    rg.match_sequence(b"//");
    rg.match_many_optionally(&any_char)?;
    rg.match_pattern(&end)?;
    rg.terminal()?;
    Ok(rg)
}

fn build_float() -> Result<Regex, TablewalkError> {
    let mut rg = Regex::new();
    rg.match_pattern(&integer())?;
    rg.match_sequence(b".");
    rg.match_many_optionally(&digit())?;
    rg.terminal()?;
    rg.optimize();
    Ok(rg)
}
