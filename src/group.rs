// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Group naming/indexing and per-run capture tracking (spec.md `## 4.6`).
//!
//! `GroupState` is built once, at compile time, while the pattern is
//! parsed, and is then immutable and shared by every engine run.
//! `Groups` is the mutable per-run record of where each group actually
//! matched; every engine clones it freely as it explores alternatives.

use std::collections::HashMap;

use crate::error::Error;

/// Sentinel offset recorded for a group that has never matched.
pub const UNSET: isize = -1;

/// The index/name registry for a compiled pattern's capture groups.
///
/// Index 0 is reserved for the whole match and is never handed out by
/// `new_index`. Indices are otherwise dense starting at 1 in strict
/// mode; extended mode additionally allows a name to alias an already
/// allocated index.
#[derive(Clone, Debug, Default)]
pub struct GroupState {
    count: usize,
    index_to_name: HashMap<usize, String>,
    name_to_index: HashMap<String, usize>,
}

impl GroupState {
    pub fn new() -> Self {
        GroupState::default()
    }

    /// Number of numbered groups, excluding group 0.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.index_to_name.get(&index).map(|s| s.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, usize)> {
        self.name_to_index.iter().map(|(n, &i)| (n.as_str(), i))
    }

    fn next_index(&self) -> usize {
        let mut i = 1;
        while self.index_to_name.contains_key(&i) {
            i += 1;
        }
        i
    }

    /// Resolve a user-supplied group reference (a number or a name) to
    /// an index, for things like `GroupReference` or `\g<name>`.
    pub fn index_for_name_or_count(&self, key: &str) -> Result<usize, Error> {
        if let Ok(n) = key.parse::<usize>() {
            return Ok(n);
        }
        self.name_to_index.get(key).copied().ok_or_else(|| {
            Error::GroupNaming {
                name: key.to_string(),
                message: "no such group".to_string(),
            }
        })
    }

    /// Allocate a fresh group, optionally named.
    ///
    /// Strict mode: an explicit name must not parse as an integer and
    /// must not already be taken; an unnamed group defaults its name to
    /// its own index printed as a string. Extended mode: a name that is
    /// itself a number reuses that index if it is free; a name that
    /// already exists is aliased onto its existing index instead of
    /// allocating a new one.
    pub fn new_index(
        &mut self,
        name: Option<&str>,
        extended: bool,
    ) -> Result<usize, Error> {
        match name {
            None => {
                let index = self.next_index();
                self.count = self.count.max(index);
                let label = index.to_string();
                self.index_to_name.insert(index, label.clone());
                self.name_to_index.insert(label, index);
                Ok(index)
            }
            Some(name) => {
                if extended {
                    if let Some(&existing) = self.name_to_index.get(name) {
                        return Ok(existing);
                    }
                    if let Ok(n) = name.parse::<usize>() {
                        if n > 0 && !self.index_to_name.contains_key(&n) {
                            self.count = self.count.max(n);
                            self.index_to_name.insert(n, name.to_string());
                            self.name_to_index.insert(name.to_string(), n);
                            return Ok(n);
                        }
                    }
                    let index = self.next_index();
                    self.count = self.count.max(index);
                    self.index_to_name.insert(index, name.to_string());
                    self.name_to_index.insert(name.to_string(), index);
                    Ok(index)
                } else {
                    if name.parse::<usize>().is_ok() {
                        return Err(Error::GroupNaming {
                            name: name.to_string(),
                            message: "numeric group names require extended \
                                      naming mode".to_string(),
                        });
                    }
                    if self.name_to_index.contains_key(name) {
                        return Err(Error::GroupNaming {
                            name: name.to_string(),
                            message: "duplicate group name".to_string(),
                        });
                    }
                    let index = self.next_index();
                    self.count = self.count.max(index);
                    self.index_to_name.insert(index, name.to_string());
                    self.name_to_index.insert(name.to_string(), index);
                    Ok(index)
                }
            }
        }
    }
}

/// Span of one captured group, in input offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span {
    start: isize,
    end: isize,
}

impl Span {
    const UNSET: Span = Span { start: UNSET, end: UNSET };
}

/// Per-run capture state: one span per numbered group (index 0 is the
/// whole match), plus pending start offsets for groups currently open,
/// and the index of the most recently closed numbered group.
///
/// `start_group`/`end_group` may be re-issued for the same index; the
/// most recent pairing wins, which is what lets an inner iteration of a
/// `Repeat` overwrite the capture of an earlier iteration.
#[derive(Clone, Debug)]
pub struct Groups {
    spans: Vec<Span>,
    pending: Vec<isize>,
    last_index: Option<usize>,
}

impl Groups {
    pub fn new(count: usize) -> Self {
        Groups {
            spans: vec![Span::UNSET; count + 1],
            pending: vec![UNSET; count + 1],
            last_index: None,
        }
    }

    pub fn start_group(&mut self, index: usize, offset: usize) {
        self.ensure(index);
        self.pending[index] = offset as isize;
    }

    pub fn end_group(&mut self, index: usize, offset: usize) {
        self.ensure(index);
        let start = self.pending[index];
        self.spans[index] = Span { start, end: offset as isize };
        if index != 0 {
            self.last_index = Some(index);
        }
    }

    fn ensure(&mut self, index: usize) {
        if index >= self.spans.len() {
            self.spans.resize(index + 1, Span::UNSET);
            self.pending.resize(index + 1, UNSET);
        }
    }

    pub fn start(&self, index: usize) -> isize {
        self.spans.get(index).map_or(UNSET, |s| s.start)
    }

    pub fn end(&self, index: usize) -> isize {
        self.spans.get(index).map_or(UNSET, |s| s.end)
    }

    pub fn span(&self, index: usize) -> Option<(usize, usize)> {
        let s = *self.spans.get(index)?;
        if s.start == UNSET || s.end == UNSET {
            None
        } else {
            Some((s.start as usize, s.end as usize))
        }
    }

    pub fn last_index(&self) -> Option<usize> {
        self.last_index
    }

    /// Loop-counter and group-identity equality used by thread/state
    /// deduplication in the parallel and complex engines: two capture
    /// records are equivalent when every span agrees.
    pub fn same_captures(&self, other: &Groups) -> bool {
        self.spans == other.spans
    }

    /// A hashable, orderable snapshot of every span, used as (part of)
    /// the dedup key for the hashing parallel engine and the
    /// on-the-fly DFA engine (spec.md `## 4.4`, `## 4.5`: both key
    /// thread/state identity by `(node, groups, loop-counters)`).
    pub fn canonical(&self) -> Vec<(isize, isize)> {
        self.spans.iter().map(|s| (s.start, s.end)).collect()
    }
}

/// The result of a successful match: the text it was taken from, the
/// group registry it was compiled with, and the captures recorded
/// during the run.
pub struct MatchResult<'t> {
    text: &'t str,
    state: GroupState,
    groups: Groups,
}

impl<'t> MatchResult<'t> {
    pub fn new(text: &'t str, state: GroupState, groups: Groups) -> Self {
        MatchResult { text, state, groups }
    }

    fn index(&self, key: GroupKey) -> Option<usize> {
        match key {
            GroupKey::Index(i) => Some(i),
            GroupKey::Name(n) => self.state.index_of(n),
        }
    }

    pub fn group<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> Option<&'t str> {
        let index = self.index(key.into())?;
        let (start, end) = self.groups.span(index)?;
        // `start`/`end` are codepoint offsets (input.rs); `&str`
        // indexing is by byte, so anything past the first multi-byte
        // char needs translating before it can slice `text`.
        let start = crate::input::byte_offset(self.text, start);
        let end = crate::input::byte_offset(self.text, end);
        Some(&self.text[start..end])
    }

    pub fn start<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> isize {
        self.index(key.into()).map_or(UNSET, |i| self.groups.start(i))
    }

    pub fn end<'a, K: Into<GroupKey<'a>>>(&self, key: K) -> isize {
        self.index(key.into()).map_or(UNSET, |i| self.groups.end(i))
    }

    pub fn span<'a, K: Into<GroupKey<'a>>>(
        &self,
        key: K,
    ) -> Option<(usize, usize)> {
        self.index(key.into()).and_then(|i| self.groups.span(i))
    }

    /// The ordered tuple of group 1..=count, substituting `default` for
    /// any group that did not participate in the match.
    pub fn groups(&self, default: Option<&'t str>) -> Vec<Option<&'t str>> {
        (1..=self.state.count())
            .map(|i| self.group(GroupKey::Index(i)).or(default))
            .collect()
    }

    /// Every declared name mapped to its captured text (or `default`).
    pub fn groupdict(
        &self,
        default: Option<&'t str>,
    ) -> HashMap<String, Option<&'t str>> {
        self.state
            .names()
            .map(|(name, index)| {
                (name.to_string(), self.group(GroupKey::Index(index)).or(default))
            })
            .collect()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.groups.last_index()
    }

    pub fn last_group(&self) -> Option<&str> {
        self.last_index().and_then(|i| self.state.name(i))
    }
}

/// A group lookup key: either a numbered index or a name.
#[derive(Clone, Copy, Debug)]
pub enum GroupKey<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for GroupKey<'static> {
    fn from(i: usize) -> Self {
        GroupKey::Index(i)
    }
}

impl<'a> From<&'a str> for GroupKey<'a> {
    fn from(n: &'a str) -> Self {
        GroupKey::Name(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_rejects_duplicate_and_numeric_names() {
        let mut gs = GroupState::new();
        assert_eq!(gs.new_index(Some("foo"), false).unwrap(), 1);
        assert!(gs.new_index(Some("foo"), false).is_err());
        assert!(gs.new_index(Some("3"), false).is_err());
    }

    #[test]
    fn extended_mode_aliases_existing_name() {
        let mut gs = GroupState::new();
        let i1 = gs.new_index(Some("foo"), true).unwrap();
        let i2 = gs.new_index(Some("foo"), true).unwrap();
        assert_eq!(i1, i2);
    }

    #[test]
    fn extended_mode_numeric_name_takes_that_index_if_free() {
        let mut gs = GroupState::new();
        assert_eq!(gs.new_index(None, true).unwrap(), 1);
        assert_eq!(gs.new_index(Some("5"), true).unwrap(), 5);
        // index 2 is still free via the ordinary allocator
        assert_eq!(gs.new_index(None, true).unwrap(), 2);
    }

    #[test]
    fn unnamed_group_defaults_name_to_its_index() {
        let mut gs = GroupState::new();
        let i = gs.new_index(None, false).unwrap();
        assert_eq!(gs.name(i), Some("1"));
    }

    #[test]
    fn captures_overwrite_on_reissue() {
        let mut groups = Groups::new(1);
        groups.start_group(1, 0);
        groups.end_group(1, 3);
        assert_eq!(groups.span(1), Some((0, 3)));
        groups.start_group(1, 5);
        groups.end_group(1, 9);
        assert_eq!(groups.span(1), Some((5, 9)));
        assert_eq!(groups.last_index(), Some(1));
    }

    #[test]
    fn unset_group_reports_sentinel() {
        let groups = Groups::new(2);
        assert_eq!(groups.start(2), UNSET);
        assert_eq!(groups.end(2), UNSET);
        assert_eq!(groups.span(2), None);
    }

    #[test]
    fn match_result_accessors() {
        let mut gs = GroupState::new();
        let idx = gs.new_index(Some("word"), false).unwrap();
        let mut groups = Groups::new(gs.count());
        groups.start_group(0, 0);
        groups.end_group(0, 3);
        groups.start_group(idx, 0);
        groups.end_group(idx, 3);
        let m = MatchResult::new("cat", gs, groups);
        assert_eq!(m.group(0usize), Some("cat"));
        assert_eq!(m.group("word"), Some("cat"));
        assert_eq!(m.group(2usize), None);
        assert_eq!(m.groupdict(None).get("word").copied().flatten(), Some("cat"));
    }
}
