// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Recursive-descent parser from pattern text to `ast::Ast` (SPEC_FULL.md
//! `## B`): literals, `.`, anchors, `\d\s\w\b`, classes, groups
//! (capturing/named/non-capturing), alternation, `*+?{m,n}` repetition
//! with laziness, backreferences, lookaround, conditionals. Deliberately
//! small; it is not tuned for exotic syntax the way a production
//! tokenizer would be.

use crate::ast::{Ast, ClassKind, GroupRef};
use crate::error::Error;

const MAX_REPEAT: u32 = 1_000;

pub fn parse(pattern: &str) -> Result<Ast, Error> {
    let mut p = Parser { chars: pattern.chars().collect(), pos: 0, pattern };
    let ast = p.parse_alternate()?;
    if p.pos != p.chars.len() {
        return Err(p.err("unexpected closing parenthesis"));
    }
    Ok(ast)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    pattern: &'a str,
}

impl<'a> Parser<'a> {
    fn err(&self, message: &str) -> Error {
        Error::Pattern { pattern: self.pattern.to_string(), offset: self.pos, message: message.to_string() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), Error> {
        if self.eat(c) { Ok(()) } else { Err(self.err(&format!("expected {:?}", c))) }
    }

    fn parse_alternate(&mut self) -> Result<Ast, Error> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            Ok(Ast::Alternate(branches))
        }
    }

    fn parse_concat(&mut self) -> Result<Ast, Error> {
        let mut parts = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            parts.push(self.parse_repeat()?);
        }
        match parts.len() {
            0 => Ok(Ast::Empty),
            1 => Ok(parts.pop().unwrap()),
            _ => Ok(Ast::Concat(parts)),
        }
    }

    fn parse_repeat(&mut self) -> Result<Ast, Error> {
        let atom = self.parse_atom()?;
        let (min, max) = match self.peek() {
            Some('*') => { self.bump(); (0, None) }
            Some('+') => { self.bump(); (1, None) }
            Some('?') => { self.bump(); (0, Some(1)) }
            Some('{') => match self.try_parse_counted()? {
                Some(bounds) => bounds,
                None => return Ok(atom),
            },
            _ => return Ok(atom),
        };
        let lazy = self.eat('?');
        Ok(Ast::Repeat { sub: Box::new(atom), min, max, lazy })
    }

    /// `{m}`, `{m,}`, `{m,n}`. Returns `None` (and leaves `pos`
    /// unmoved) if `{` does not introduce a valid counted repeat, in
    /// which case it is just a literal `{`.
    fn try_parse_counted(&mut self) -> Result<Option<(u32, Option<u32>)>, Error> {
        let start = self.pos;
        self.bump(); // '{'
        let min = self.read_digits();
        if min.is_none() && self.peek() != Some(',') {
            self.pos = start;
            return Ok(None);
        }
        let min = min.unwrap_or(0);
        let max = if self.eat(',') {
            self.read_digits()
        } else {
            Some(min)
        };
        if !self.eat('}') {
            self.pos = start;
            return Ok(None);
        }
        if min > MAX_REPEAT || max.map_or(false, |m| m > MAX_REPEAT) {
            return Err(self.err("repeat count too large"));
        }
        if let Some(max) = max {
            if max < min {
                return Err(self.err("repeat max is less than min"));
            }
        }
        Ok(Some((min, max)))
    }

    fn read_digits(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            self.chars[start..self.pos].iter().collect::<String>().parse().ok()
        }
    }

    fn parse_atom(&mut self) -> Result<Ast, Error> {
        let c = self.bump().ok_or_else(|| self.err("unexpected end of pattern"))?;
        match c {
            '.' => Ok(Ast::Dot),
            '^' => Ok(Ast::StartOfLine),
            '$' => Ok(Ast::EndOfLine),
            '(' => self.parse_group(),
            '[' => self.parse_class(),
            '\\' => self.parse_escape(),
            '*' | '+' | '?' => Err(self.err("repeat operator with nothing to repeat")),
            c => Ok(Ast::Literal(c)),
        }
    }

    fn parse_group(&mut self) -> Result<Ast, Error> {
        if !self.eat('?') {
            let sub = self.parse_alternate()?;
            self.expect(')')?;
            return Ok(Ast::Group { capturing: true, name: None, index: 0, sub: Box::new(sub) });
        }
        match self.peek() {
            Some(':') => {
                self.bump();
                let sub = self.parse_alternate()?;
                self.expect(')')?;
                Ok(Ast::Group { capturing: false, name: None, index: 0, sub: Box::new(sub) })
            }
            Some('=') => {
                self.bump();
                let sub = self.parse_alternate()?;
                self.expect(')')?;
                Ok(Ast::Lookahead { equal: true, forwards: true, sub: Box::new(sub) })
            }
            Some('!') => {
                self.bump();
                let sub = self.parse_alternate()?;
                self.expect(')')?;
                Ok(Ast::Lookahead { equal: false, forwards: true, sub: Box::new(sub) })
            }
            Some('<') => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        let sub = self.parse_alternate()?;
                        self.expect(')')?;
                        Ok(Ast::Lookahead { equal: true, forwards: false, sub: Box::new(sub) })
                    }
                    Some('!') => {
                        self.bump();
                        let sub = self.parse_alternate()?;
                        self.expect(')')?;
                        Ok(Ast::Lookahead { equal: false, forwards: false, sub: Box::new(sub) })
                    }
                    _ => {
                        let name = self.read_until('>')?;
                        let sub = self.parse_alternate()?;
                        self.expect(')')?;
                        Ok(Ast::Group { capturing: true, name: Some(name), index: 0, sub: Box::new(sub) })
                    }
                }
            }
            Some('P') => {
                self.bump();
                self.expect('<')?;
                let name = self.read_until('>')?;
                let sub = self.parse_alternate()?;
                self.expect(')')?;
                Ok(Ast::Group { capturing: true, name: Some(name), index: 0, sub: Box::new(sub) })
            }
            Some('(') => {
                self.bump();
                let reference = if self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    let n = self.read_digits().unwrap() as usize;
                    self.expect(')')?;
                    GroupRef::Index(n)
                } else {
                    GroupRef::Name(self.read_until(')')?)
                };
                let yes = self.parse_concat()?;
                let no = if self.eat('|') { self.parse_concat()? } else { Ast::Empty };
                self.expect(')')?;
                Ok(Ast::Conditional { group: reference, yes: Box::new(yes), no: Box::new(no) })
            }
            _ => Err(self.err("unsupported group syntax")),
        }
    }

    fn read_until(&mut self, end: char) -> Result<String, Error> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c != end) {
            self.pos += 1;
        }
        if self.peek() != Some(end) {
            return Err(self.err(&format!("expected {:?}", end)));
        }
        let s = self.chars[start..self.pos].iter().collect();
        self.pos += 1;
        Ok(s)
    }

    fn parse_escape(&mut self) -> Result<Ast, Error> {
        let c = self.bump().ok_or_else(|| self.err("trailing backslash"))?;
        Ok(match c {
            'd' => Ast::ClassShorthand { kind: ClassKind::Digit, negated: false },
            'D' => Ast::ClassShorthand { kind: ClassKind::Digit, negated: true },
            's' => Ast::ClassShorthand { kind: ClassKind::Space, negated: false },
            'S' => Ast::ClassShorthand { kind: ClassKind::Space, negated: true },
            'w' => Ast::ClassShorthand { kind: ClassKind::Word, negated: false },
            'W' => Ast::ClassShorthand { kind: ClassKind::Word, negated: true },
            'b' => Ast::WordBoundary { negated: false },
            'B' => Ast::WordBoundary { negated: true },
            'n' => Ast::Literal('\n'),
            't' => Ast::Literal('\t'),
            'r' => Ast::Literal('\r'),
            'k' => {
                self.expect('<')?;
                let name = self.read_until('>')?;
                Ast::Backreference(GroupRef::Name(name))
            }
            '1'..='9' => {
                let mut digits = String::new();
                digits.push(c);
                while self.peek().map_or(false, |d| d.is_ascii_digit()) {
                    digits.push(self.bump().unwrap());
                }
                Ast::Backreference(GroupRef::Index(digits.parse().unwrap()))
            }
            other => Ast::Literal(other),
        })
    }

    fn parse_class(&mut self) -> Result<Ast, Error> {
        let negated = self.eat('^');
        let mut ranges = Vec::new();
        let mut first = true;
        loop {
            match self.peek() {
                None => return Err(self.err("unterminated character class")),
                Some(']') if !first => {
                    self.bump();
                    break;
                }
                _ => {}
            }
            first = false;
            let lo = self.read_class_char(&mut ranges)?;
            let lo = match lo {
                Some(lo) => lo,
                None => continue, // a shorthand was appended directly
            };
            if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                self.bump();
                match self.read_class_char(&mut ranges)? {
                    Some(hi) => ranges.push((lo, hi)),
                    None => return Err(self.err("invalid class range")),
                }
            } else {
                ranges.push((lo, lo));
            }
        }
        Ok(Ast::Class { ranges, negated })
    }

    /// Reads one class member. Bare shorthand classes (`\d` etc.) are
    /// flattened to ASCII-approximate ranges pushed directly into
    /// `ranges` and `None` is returned; anything else returns `Some`.
    fn read_class_char(&mut self, ranges: &mut Vec<(char, char)>) -> Result<Option<char>, Error> {
        match self.bump() {
            None => Err(self.err("unterminated character class")),
            Some('\\') => match self.bump() {
                None => Err(self.err("trailing backslash in class")),
                Some('d') => { ranges.extend(DIGIT_RANGES); Ok(None) }
                Some('s') => { ranges.extend(SPACE_RANGES); Ok(None) }
                Some('w') => { ranges.extend(WORD_RANGES); Ok(None) }
                Some('n') => Ok(Some('\n')),
                Some('t') => Ok(Some('\t')),
                Some('r') => Ok(Some('\r')),
                Some(c) => Ok(Some(c)),
            },
            Some(c) => Ok(Some(c)),
        }
    }
}

const DIGIT_RANGES: [(char, char); 1] = [('0', '9')];
const SPACE_RANGES: [(char, char); 6] =
    [(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r'), ('\x0B', '\x0B'), ('\x0C', '\x0C')];
const WORD_RANGES: [(char, char); 4] = [('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_concat() {
        let ast = parse("ab").unwrap();
        assert_eq!(ast, Ast::Concat(vec![Ast::Literal('a'), Ast::Literal('b')]));
    }

    #[test]
    fn alternation_and_grouping() {
        let ast = parse("a(b|c)").unwrap();
        match ast {
            Ast::Concat(parts) => {
                assert_eq!(parts[0], Ast::Literal('a'));
                match &parts[1] {
                    Ast::Group { capturing: true, name: None, sub, .. } => match sub.as_ref() {
                        Ast::Alternate(alts) => assert_eq!(alts.len(), 2),
                        other => panic!("unexpected {:?}", other),
                    },
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn named_group_and_backreference() {
        let ast = parse(r"(?P<word>\w+)\k<word>").unwrap();
        match ast {
            Ast::Concat(parts) => {
                assert!(matches!(&parts[0], Ast::Group { name: Some(n), .. } if n == "word"));
                assert_eq!(parts[1], Ast::Backreference(GroupRef::Name("word".to_string())));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn counted_repeat_and_laziness() {
        let ast = parse("a{2,4}?").unwrap();
        assert_eq!(
            ast,
            Ast::Repeat { sub: Box::new(Ast::Literal('a')), min: 2, max: Some(4), lazy: true }
        );
    }

    #[test]
    fn brace_without_digits_is_literal() {
        let ast = parse("a{").unwrap();
        assert_eq!(ast, Ast::Concat(vec![Ast::Literal('a'), Ast::Literal('{')]));
    }

    #[test]
    fn lookahead_variants() {
        let ast = parse("a(?=b)(?!c)").unwrap();
        match ast {
            Ast::Concat(parts) => {
                assert!(matches!(parts[1], Ast::Lookahead { equal: true, forwards: true, .. }));
                assert!(matches!(parts[2], Ast::Lookahead { equal: false, forwards: true, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn character_class_with_shorthand() {
        let ast = parse(r"[a-c\d]").unwrap();
        match ast {
            Ast::Class { ranges, negated } => {
                assert!(!negated);
                assert!(ranges.contains(&('a', 'c')));
                assert!(ranges.contains(&('0', '9')));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
