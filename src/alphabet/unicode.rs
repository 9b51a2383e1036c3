// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Unicode alphabet: codes span every Unicode scalar value.
//!
//! Class predicates are derived from `char`'s own Unicode tables rather
//! than a separate general-category crate (none of this pack's example
//! repos pull one in purely for category lookups; `regex-syntax`'s
//! `unicode-gencat` feature belongs to the pattern tokenizer, which is
//! out of scope here). `digit` approximates `Nd` with `char::is_numeric`
//! restricted to single-digit-valued characters; `space` uses
//! `char::is_whitespace` (the Unicode `White_Space` property, the
//! standard stand-in for `Z*`); `word` unions `is_alphanumeric` (covers
//! `L*`/`M*`/`Nd`/`Nl`/`No`) with the `Pc` connector punctuation used by
//! `_`.

use super::{Alphabet, Unpacked, UnsupportedClass};

#[derive(Clone, Copy, Debug, Default)]
pub struct Unicode;

const MAX_UNICODE_CODE: u32 = 0x10FFFF;

impl Alphabet for Unicode {
    type Char = char;

    fn min_code(&self) -> u32 { 0 }
    fn max_code(&self) -> u32 { MAX_UNICODE_CODE }

    fn code_to_char(&self, code: u32) -> char {
        char::from_u32(code).unwrap_or('\u{FFFD}')
    }

    fn char_to_code(&self, ch: char) -> u32 {
        ch as u32
    }

    fn before(&self, ch: char) -> Option<char> {
        let mut code = self.char_to_code(ch);
        while code > self.min_code() {
            code -= 1;
            if let Some(c) = char::from_u32(code) {
                return Some(c);
            }
        }
        None
    }

    fn after(&self, ch: char) -> Option<char> {
        let mut code = self.char_to_code(ch);
        while code < self.max_code() {
            code += 1;
            if let Some(c) = char::from_u32(code) {
                return Some(c);
            }
        }
        None
    }

    fn digit(&self, ch: char) -> Result<bool, UnsupportedClass> {
        Ok(ch.is_numeric() && ch.to_digit(36).map_or(false, |d| d < 10))
    }

    fn space(&self, ch: char) -> Result<bool, UnsupportedClass> {
        Ok(ch.is_whitespace())
    }

    fn word(&self, ch: char) -> Result<bool, UnsupportedClass> {
        Ok(ch.is_alphanumeric() || ch == '_' || is_connector_punctuation(ch))
    }

    fn display(&self, ch: char) -> String {
        ch.to_string()
    }

    fn unpack(&self, ch: char, ignore_case: bool) -> Unpacked<char> {
        if ignore_case {
            let mut lower = ch.to_lowercase();
            let mut upper = ch.to_uppercase();
            if let (Some(lo), None, Some(hi), None) =
                (lower.next(), lower.next(), upper.next(), upper.next())
            {
                if lo != hi {
                    return Unpacked::Pair(lo, hi);
                }
            }
        }
        Unpacked::Single(ch)
    }
}

/// `Pc` (connector punctuation) beyond ASCII `_`; the handful of code
/// points Unicode classifies this way (fullwidth low line and its
/// relatives). Not exhaustive, but `word` already covers the characters
/// that matter for `\w`/`\b` in practice via `is_alphanumeric`.
fn is_connector_punctuation(ch: char) -> bool {
    matches!(ch, '_' | '\u{203F}' | '\u{2040}' | '\u{2054}' | '\u{FE33}'
        | '\u{FE34}' | '\u{FE4D}' | '\u{FE4E}' | '\u{FE4F}' | '\u{FF3F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let u = Unicode;
        assert_eq!(u.max_code(), MAX_UNICODE_CODE);
        assert_eq!(u.before('b'), Some('a'));
        assert_eq!(u.after('a'), Some('b'));
    }

    #[test]
    fn classes() {
        let u = Unicode;
        assert_eq!(u.digit('7').unwrap(), true);
        assert_eq!(u.digit('\u{0669}').unwrap(), true); // arabic-indic 9
        assert_eq!(u.space('\u{00A0}').unwrap(), true); // nbsp
        assert_eq!(u.word('café'.chars().last().unwrap()).unwrap(), true);
    }

    #[test]
    fn unpack_unicode_case_fold() {
        let u = Unicode;
        assert_eq!(u.unpack('s', true), Unpacked::Pair('s', 'S'));
        // German sharp s uppercases to "SS" (two chars) -- must not be
        // treated as a simple pair.
        assert_eq!(u.unpack('\u{00DF}', true), Unpacked::Single('\u{00DF}'));
    }
}
