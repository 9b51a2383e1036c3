// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The public surface (spec.md `## 6`): `Regex`, its `Flags`, and the
//! `match`/`search`/`finditer`/`findall`/`split`/`sub`/`Scanner` family
//! built on top of `compile`/`exec`.
//!
//! `Regex` itself is not generic over the alphabet: `Flags::ASCII`
//! picks `alphabet::Ascii`, everything else picks `alphabet::Unicode`,
//! and the two are erased behind one `dyn` trait so callers never see
//! the type parameter. The engines underneath stay alphabet-generic;
//! this is purely a convenience surface over them.

use std::collections::HashMap;
use std::fmt;

use crate::alphabet::{Ascii, Unicode};
use crate::compile::{self, CompileOptions};
use crate::error::Error;
use crate::exec::Executor;
use crate::group::{GroupKey, GroupState, MatchResult};
use crate::input::{byte_offset, chars_of};
use crate::program::{MatchEngine, Program};

/// Option bits accepted by `compile` (spec.md `## 6`). `ASCII` and
/// `UNICODE` together is a compile error; since this surface never
/// exposes a separate `alphabet` argument, `ASCII` with a non-`Ascii`
/// alphabet cannot arise any other way, so that half of the spec's
/// validation rule collapses into the one check below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    pub const IGNORECASE: Flags = Flags(1 << 0);
    pub const MULTILINE: Flags = Flags(1 << 1);
    pub const DOTALL: Flags = Flags(1 << 2);
    pub const UNICODE: Flags = Flags(1 << 3);
    pub const VERBOSE: Flags = Flags(1 << 4);
    pub const ASCII: Flags = Flags(1 << 5);
    pub const LOOP_UNROLL: Flags = Flags(1 << 6);
    pub const CHARS: Flags = Flags(1 << 7);
    pub const EMPTY: Flags = Flags(1 << 8);
    pub const UNSAFE: Flags = Flags(1 << 9);
    pub const GROUPS: Flags = Flags(1 << 10);

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;
    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// A successful match, borrowed from the text it was found in.
pub struct Captures<'t>(MatchResult<'t>);

impl<'t> Captures<'t> {
    pub fn group<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> Option<&'t str> {
        self.0.group(key)
    }

    pub fn start<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> isize {
        self.0.start(key)
    }

    pub fn end<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> isize {
        self.0.end(key)
    }

    pub fn span<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> Option<(usize, usize)> {
        self.0.span(key)
    }

    pub fn groups(&self, default: Option<&'t str>) -> Vec<Option<&'t str>> {
        self.0.groups(default)
    }

    pub fn groupdict(&self, default: Option<&'t str>) -> HashMap<String, Option<&'t str>> {
        self.0.groupdict(default)
    }
}

impl<'t> fmt::Debug for Captures<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Captures({:?})", self.0.group(0usize))
    }
}

/// Erases the alphabet type parameter so `Regex` can hold either an
/// `Executor<Ascii>` or an `Executor<Unicode>` behind one field.
trait ErasedExec {
    fn search_in<'t>(
        &self,
        chars: &[char],
        text: &'t str,
        pos: usize,
    ) -> Result<Option<MatchResult<'t>>, Error>;

    fn match_in<'t>(
        &self,
        chars: &[char],
        text: &'t str,
        pos: usize,
    ) -> Result<Option<MatchResult<'t>>, Error>;

    fn num_captures(&self) -> usize;
    fn group_state(&self) -> &GroupState;
}

impl<A: crate::alphabet::Alphabet<Char = char> + Clone> ErasedExec for Executor<A> {
    fn search_in<'t>(
        &self,
        chars: &[char],
        text: &'t str,
        pos: usize,
    ) -> Result<Option<MatchResult<'t>>, Error> {
        let input: crate::input::Input<A> = crate::input::Input::borrowed(chars);
        match self.search(&input, pos)? {
            Some(groups) => Ok(Some(MatchResult::new(text, self.program().state.clone(), groups))),
            None => Ok(None),
        }
    }

    fn match_in<'t>(
        &self,
        chars: &[char],
        text: &'t str,
        pos: usize,
    ) -> Result<Option<MatchResult<'t>>, Error> {
        let input: crate::input::Input<A> = crate::input::Input::borrowed(chars);
        match self.match_at(&input, pos)? {
            Some(groups) => Ok(Some(MatchResult::new(text, self.program().state.clone(), groups))),
            None => Ok(None),
        }
    }

    fn num_captures(&self) -> usize {
        self.program().num_captures()
    }

    fn group_state(&self) -> &GroupState {
        &self.program().state
    }
}

/// A compiled pattern.
pub struct Regex {
    inner: Box<dyn ErasedExec>,
    source: String,
}

impl Regex {
    /// Compiles `pattern` with no flags set.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Regex::compile(pattern, Flags::NONE)
    }

    pub fn compile(pattern: &str, flags: Flags) -> Result<Regex, Error> {
        Regex::compile_with_engine(pattern, flags, None)
    }

    /// As `compile`, but pinning a specific matching engine instead of
    /// leaving the choice to `exec::Executor`'s heuristic.
    pub fn compile_with_engine(
        pattern: &str,
        flags: Flags,
        engine: Option<MatchEngine>,
    ) -> Result<Regex, Error> {
        if flags.contains(Flags::ASCII) && flags.contains(Flags::UNICODE) {
            return Err(Error::Pattern {
                pattern: pattern.to_string(),
                offset: 0,
                message: "ASCII and UNICODE flags are mutually exclusive".to_string(),
            });
        }
        let text = if flags.contains(Flags::VERBOSE) { strip_verbose(pattern) } else { pattern.to_string() };
        let options = CompileOptions {
            extended_group_names: flags.contains(Flags::GROUPS),
            multiline: flags.contains(Flags::MULTILINE),
            dotall: flags.contains(Flags::DOTALL),
            ignore_case: flags.contains(Flags::IGNORECASE),
            allow_empty: flags.contains(Flags::EMPTY),
            unsafe_repeat: flags.contains(Flags::UNSAFE),
        };
        let inner: Box<dyn ErasedExec> = if flags.contains(Flags::ASCII) {
            let alphabet = Ascii;
            let (graph, state) = compile::compile(&alphabet, &text, options)?;
            Box::new(Executor::new(Program::new(pattern.to_string(), alphabet, graph, state, engine)))
        } else {
            let alphabet = Unicode;
            let (graph, state) = compile::compile(&alphabet, &text, options)?;
            Box::new(Executor::new(Program::new(pattern.to_string(), alphabet, graph, state, engine)))
        };
        Ok(Regex { inner, source: pattern.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn captures_len(&self) -> usize {
        self.inner.num_captures()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// `compiled.search(text, 0, len)`.
    pub fn find<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.search(text, 0, chars_of(text).len())
    }

    /// `compiled.match(text, pos, len)` -- anchored at `pos`.
    pub fn match_at<'t>(&self, text: &'t str, pos: usize) -> Option<Captures<'t>> {
        self.matches(text, pos, chars_of(text).len())
    }

    /// `compiled.match(text, pos, endpos)`.
    pub fn matches<'t>(&self, text: &'t str, pos: usize, endpos: usize) -> Option<Captures<'t>> {
        let chars = chars_of(text);
        let endpos = endpos.min(chars.len());
        let pos = pos.min(endpos);
        match self.inner.match_in(&chars[..endpos], text, pos) {
            Ok(Some(m)) => Some(Captures(m)),
            _ => None,
        }
    }

    /// `compiled.search(text, pos, endpos)`.
    pub fn search<'t>(&self, text: &'t str, pos: usize, endpos: usize) -> Option<Captures<'t>> {
        let chars = chars_of(text);
        let endpos = endpos.min(chars.len());
        let pos = pos.min(endpos);
        match self.inner.search_in(&chars[..endpos], text, pos) {
            Ok(Some(m)) => Some(Captures(m)),
            _ => None,
        }
    }

    /// `compiled.finditer`: every match in left-to-right order, advancing
    /// past a zero-length match by one position so it can't loop in
    /// place. Unlike `subn`'s "not-adjacent" rule, a zero-length match
    /// immediately following a non-zero-length one is still yielded --
    /// `findall("x*", "abxd")` sees all five positions, including the
    /// empty match right after the captured `"x"`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        Matches { regex: self, text, limit: chars_of(text).len(), pos: 0 }
    }

    /// `compiled.findall`: group 1 alone if the pattern has exactly one
    /// group, the full tuple of groups if it has more, or the whole
    /// match text if it has none.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<FindAllItem<'t>> {
        let n = self.inner.num_captures();
        self.find_iter(text)
            .map(|c| match n {
                0 => FindAllItem::Whole(c.group(0usize).unwrap_or("")),
                1 => FindAllItem::Group(c.group(1usize)),
                _ => FindAllItem::Groups(c.groups(None)),
            })
            .collect()
    }

    /// `compiled.split`: `maxsplit = 0` means unlimited, matching the
    /// convention the original implementation uses.
    pub fn split<'t>(&self, text: &'t str, maxsplit: usize) -> Vec<Option<&'t str>> {
        let mut out = Vec::new();
        let mut last_byte = 0usize;
        let mut count = 0usize;
        for m in self.find_iter(text) {
            if maxsplit != 0 && count >= maxsplit {
                break;
            }
            let (s, e) = match m.span(0usize) {
                Some(span) => span,
                None => continue,
            };
            out.push(Some(&text[last_byte..byte_offset(text, s)]));
            for g in 1..=self.inner.num_captures() {
                out.push(m.group(g));
            }
            last_byte = byte_offset(text, e);
            count += 1;
        }
        out.push(Some(&text[last_byte..]));
        out
    }

    /// `compiled.sub`: `count = 0` means replace every match.
    pub fn sub(&self, repl: &str, text: &str, count: usize) -> Result<String, Error> {
        self.subn(repl, text, count).map(|(s, _)| s)
    }

    /// `compiled.subn`, honouring the not-adjacent rule: a zero-length
    /// replacement cannot occur at the position immediately following a
    /// previous replacement.
    pub fn subn(&self, repl: &str, text: &str, count: usize) -> Result<(String, usize), Error> {
        let template = compile_replacement(repl, self.inner.group_state())?;
        let mut out = String::new();
        let mut last_byte = 0usize;
        let mut last_end_char: Option<usize> = None;
        let mut n = 0usize;
        for m in self.find_iter(text) {
            if count != 0 && n >= count {
                break;
            }
            let (s, e) = match m.span(0usize) {
                Some(span) => span,
                None => continue,
            };
            if s == e && Some(s) == last_end_char {
                continue;
            }
            let s_byte = byte_offset(text, s);
            let e_byte = byte_offset(text, e);
            out.push_str(&text[last_byte..s_byte]);
            render_replacement(&template, &m, &mut out);
            last_byte = e_byte;
            last_end_char = Some(e);
            n += 1;
        }
        out.push_str(&text[last_byte..]);
        Ok((out, n))
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Regex({:?})", self.source)
    }
}

/// Lazily-realized iterator returned by `Regex::find_iter`.
pub struct Matches<'r, 't> {
    regex: &'r Regex,
    text: &'t str,
    limit: usize,
    pos: usize,
}

impl<'r, 't> Iterator for Matches<'r, 't> {
    type Item = Captures<'t>;

    fn next(&mut self) -> Option<Captures<'t>> {
        if self.pos > self.limit {
            return None;
        }
        let m = self.regex.search(self.text, self.pos, self.limit)?;
        let (s, e) = m.span(0usize)?;
        self.pos = if e > s { e } else { e + 1 };
        Some(m)
    }
}

/// Item shape produced by `Regex::find_all` (spec.md `## 6`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FindAllItem<'t> {
    Whole(&'t str),
    Group(Option<&'t str>),
    Groups(Vec<Option<&'t str>>),
}

/// Alternation over pattern fragments, each paired with a callback
/// invoked on the text it matched (spec.md `## 6`, `Scanner`).
pub struct Scanner<T> {
    regex: Regex,
    action_count: usize,
    actions: Vec<Box<dyn Fn(&str) -> T>>,
}

impl<T> Scanner<T> {
    pub fn new(pairs: Vec<(&str, Box<dyn Fn(&str) -> T>)>, flags: Flags) -> Result<Scanner<T>, Error> {
        let mut combined = String::new();
        let mut actions = Vec::with_capacity(pairs.len());
        for (i, (pattern, action)) in pairs.into_iter().enumerate() {
            if i > 0 {
                combined.push('|');
            }
            combined.push('(');
            combined.push_str(pattern);
            combined.push(')');
            actions.push(action);
        }
        let action_count = actions.len();
        let regex = Regex::compile(&combined, flags)?;
        Ok(Scanner { regex, action_count, actions })
    }

    /// Repeatedly matches at the current position, invoking the
    /// fragment's action on the matched text, until nothing matches.
    /// Returns the collected results and the unmatched tail of `text`.
    pub fn scan<'t>(&self, text: &'t str) -> (Vec<T>, &'t str) {
        let mut results = Vec::new();
        let total = chars_of(text).len();
        let mut pos = 0usize;
        while pos < total {
            let m = match self.regex.match_at(text, pos) {
                Some(m) => m,
                None => break,
            };
            let fired = (1..=self.action_count).find_map(|g| m.group(g).map(|t| (g, t)));
            let (_, e) = match m.span(0usize) {
                Some(span) => span,
                None => break,
            };
            match fired {
                Some((g, matched_text)) => results.push(self.actions[g - 1](matched_text)),
                None => break,
            }
            pos = if e > pos { e } else { pos + 1 };
        }
        let tail = byte_offset(text, pos);
        (results, &text[tail..])
    }
}

/// One piece of a compiled replacement template (spec.md `## 6`
/// "Replacement mini-language").
enum ReplPart {
    Literal(String),
    Group(usize),
}

/// Parses a replacement string once, so `subn` never re-parses it per
/// match. Grounded in `original_source/pycore/rxpy/parser/replace.py`'s
/// escape table: standard escapes, `\<digit>` and `\g<name-or-number>`
/// backreferences, octal, and unknown backslash sequences preserved
/// verbatim. `\x` hex escapes are supported; `\u`/`\U` (the original's
/// wide Unicode forms) are treated as unknown escapes and preserved,
/// a recorded simplification.
fn compile_replacement(repl: &str, state: &GroupState) -> Result<Vec<ReplPart>, Error> {
    let chars: Vec<char> = repl.chars().collect();
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            lit.push(c);
            i += 1;
            continue;
        }
        i += 1;
        if i >= chars.len() {
            lit.push('\\');
            break;
        }
        let e = chars[i];
        match e {
            'g' => {
                i += 1;
                if i >= chars.len() || chars[i] != '<' {
                    lit.push('\\');
                    lit.push('g');
                    continue;
                }
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '>' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(Error::Pattern {
                        pattern: repl.to_string(),
                        offset: start,
                        message: "unterminated \\g<...> group reference".to_string(),
                    });
                }
                let name: String = chars[start..i].iter().collect();
                i += 1;
                if !lit.is_empty() {
                    parts.push(ReplPart::Literal(std::mem::take(&mut lit)));
                }
                let index = state
                    .index_for_name_or_count(&name)
                    .map_err(|_| Error::MissingBackreference { reference: name.clone() })?;
                parts.push(ReplPart::Group(index));
            }
            '1'..='9' => {
                if !lit.is_empty() {
                    parts.push(ReplPart::Literal(std::mem::take(&mut lit)));
                }
                let index = e.to_digit(10).unwrap() as usize;
                if index > state.count() {
                    return Err(Error::MissingBackreference { reference: index.to_string() });
                }
                parts.push(ReplPart::Group(index));
                i += 1;
            }
            '0' => {
                let mut buf = String::new();
                buf.push('0');
                i += 1;
                while buf.len() < 3 && i < chars.len() && ('0'..='7').contains(&chars[i]) {
                    buf.push(chars[i]);
                    i += 1;
                }
                let code = u32::from_str_radix(&buf, 8).unwrap_or(0);
                lit.push(char::from_u32(code).unwrap_or('\0'));
            }
            'n' => { lit.push('\n'); i += 1; }
            't' => { lit.push('\t'); i += 1; }
            'r' => { lit.push('\r'); i += 1; }
            'a' => { lit.push('\u{7}'); i += 1; }
            'f' => { lit.push('\u{c}'); i += 1; }
            'v' => { lit.push('\u{b}'); i += 1; }
            'x' => {
                if i + 2 < chars.len() && chars[i + 1].is_ascii_hexdigit() && chars[i + 2].is_ascii_hexdigit() {
                    let hex: String = chars[i + 1..i + 3].iter().collect();
                    let code = u32::from_str_radix(&hex, 16).unwrap_or(0);
                    lit.push(char::from_u32(code).unwrap_or('\0'));
                    i += 3;
                } else {
                    lit.push('\\');
                    lit.push('x');
                    i += 1;
                }
            }
            '\\' => { lit.push('\\'); i += 1; }
            other => { lit.push('\\'); lit.push(other); i += 1; }
        }
    }
    if !lit.is_empty() {
        parts.push(ReplPart::Literal(lit));
    }
    Ok(parts)
}

fn render_replacement(parts: &[ReplPart], m: &Captures, out: &mut String) {
    for part in parts {
        match part {
            ReplPart::Literal(s) => out.push_str(s),
            ReplPart::Group(i) => {
                if let Some(s) = m.group(*i) {
                    out.push_str(s);
                }
            }
        }
    }
}

/// Strips whitespace and `#`-to-end-of-line comments outside character
/// classes and escapes, for `Flags::VERBOSE`.
fn strip_verbose(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(c);
            if let Some(n) = chars.next() {
                out.push(n);
            }
            continue;
        }
        if in_class {
            out.push(c);
            if c == ']' {
                in_class = false;
            }
            continue;
        }
        match c {
            '[' => {
                in_class = true;
                out.push(c);
            }
            '#' => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {}
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_match_and_find() {
        let re = Regex::new(r"a(b+)c").unwrap();
        assert!(re.is_match("xxabbbcyy"));
        let m = re.find("xxabbbcyy").unwrap();
        assert_eq!(m.group(0usize), Some("abbbc"));
        assert_eq!(m.group(1usize), Some("bbb"));
    }

    #[test]
    fn anchored_match_requires_start_position() {
        let re = Regex::new(r"a+").unwrap();
        assert!(re.match_at("xaaa", 0).is_none());
        assert!(re.match_at("xaaa", 1).is_some());
    }

    #[test]
    fn ignorecase_flag_folds_literal_case() {
        let re = Regex::compile("abc", Flags::IGNORECASE).unwrap();
        assert!(re.is_match("XYZ ABC"));
    }

    #[test]
    fn find_iter_keeps_empty_match_after_nonempty() {
        // A zero-length match immediately following a non-zero-length
        // one is still yielded -- unlike `subn`'s "not-adjacent" rule.
        let re = Regex::new(r"x*").unwrap();
        let spans: Vec<_> = re.find_iter("abxd").map(|m| m.span(0usize).unwrap()).collect();
        assert_eq!(spans, vec![(0, 0), (1, 1), (2, 3), (3, 3), (4, 4)]);
    }

    #[test]
    fn end_anchor_matches_before_trailing_newline() {
        let re = Regex::new(r"$").unwrap();
        let spans: Vec<_> = re.find_iter("ab\n").map(|m| m.span(0usize).unwrap()).collect();
        assert_eq!(spans, vec![(2, 2), (3, 3)]);
    }

    #[test]
    fn split_includes_captured_groups() {
        let re = Regex::new(r"(,)").unwrap();
        let parts = re.split("a,b,c", 0);
        assert_eq!(parts, vec![Some("a"), Some(","), Some("b"), Some(","), Some("c")]);
    }

    #[test]
    fn sub_replaces_with_backreference() {
        let re = Regex::new(r"(\w+)@(\w+)").unwrap();
        let out = re.sub(r"\2 at \1", "user@host", 0).unwrap();
        assert_eq!(out, "host at user");
    }

    #[test]
    fn sub_preserves_unknown_escape() {
        let re = Regex::new("x").unwrap();
        let out = re.sub(r"\q", "x", 0).unwrap();
        assert_eq!(out, r"\q");
    }

    #[test]
    fn sub_not_adjacent_rule_suppresses_trailing_empty_match() {
        // The zero-length match right after the captured "x" is not
        // given its own replacement; `finditer` still reports it (see
        // `find_iter_keeps_empty_match_after_nonempty`), but `subn`
        // suppresses it so greedy `x*` doesn't double up on a dash.
        let re = Regex::new(r"x*").unwrap();
        let out = re.sub("-", "abxd", 0).unwrap();
        assert_eq!(out, "-a-b-d-");

        let lazy = Regex::new(r"x*?").unwrap();
        let out = lazy.sub("-", "abxd", 0).unwrap();
        assert_eq!(out, "-a-b-x-d-");
    }

    #[test]
    fn find_all_single_group_unwraps() {
        let re = Regex::new(r"(\d+)").unwrap();
        let got: Vec<_> = re.find_all("a1 b22").into_iter().collect();
        assert_eq!(got, vec![FindAllItem::Group(Some("1")), FindAllItem::Group(Some("22"))]);
    }

    #[test]
    fn find_all_matches_every_zero_width_position() {
        let re = Regex::new(r"x*").unwrap();
        let got: Vec<_> = re.find_all("abxd");
        assert_eq!(
            got,
            vec![
                FindAllItem::Whole(""),
                FindAllItem::Whole(""),
                FindAllItem::Whole("x"),
                FindAllItem::Whole(""),
                FindAllItem::Whole(""),
            ]
        );
    }

    #[test]
    fn scanner_dispatches_to_matching_action() {
        let pairs: Vec<(&str, Box<dyn Fn(&str) -> String>)> = vec![
            (r"\d+", Box::new(|s: &str| format!("num:{}", s))),
            (r"[a-z]+", Box::new(|s: &str| format!("word:{}", s))),
        ];
        let scanner = Scanner::new(pairs, Flags::NONE).unwrap();
        let (results, tail) = scanner.scan("12ab!");
        assert_eq!(results, vec!["num:12".to_string(), "word:ab".to_string()]);
        assert_eq!(tail, "!");
    }
}
