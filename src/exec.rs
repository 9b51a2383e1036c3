// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Executor` picks and drives a matching engine for a compiled
//! `Program` (spec.md `## 7`).
//!
//! When an engine hits `Error::UnsupportedOperation` -- a hashing
//! parallel run meeting a backreference, or a character class an
//! alphabet can't test -- the executor retries the same search from the
//! same start position with the complex engine, which can run anything
//! the backtracking engine can.

use crate::alphabet::Alphabet;
use crate::backtrack;
use crate::complex;
use crate::error::Error;
use crate::group::MatchResult;
use crate::input::Input;
use crate::nfa;
use crate::program::{MatchEngine, Program};

const BACKTRACK_NODE_LIMIT: usize = 4_000;
const BACKTRACK_TEXT_LIMIT: usize = 8_000;

/// Manages the execution of a compiled pattern: which engine runs, and
/// the fallback path when the chosen one can't finish the job.
#[derive(Clone, Debug)]
pub struct Executor<A: Alphabet> {
    program: Program<A>,
}

impl<A: Alphabet + Clone> Executor<A> {
    pub fn new(program: Program<A>) -> Self {
        Executor { program }
    }

    pub fn program(&self) -> &Program<A> {
        &self.program
    }

    /// Searches `input` starting no earlier than `start`, returning the
    /// first match's captures, or `None`.
    pub fn search<'t>(
        &self,
        input: &Input<'_, A>,
        start: usize,
    ) -> Result<Option<crate::group::Groups>, Error> {
        let graph = &self.program.graph;
        let alphabet = &self.program.alphabet;
        let group_count = self.program.num_captures();

        match self.choose_engine(input.len()) {
            MatchEngine::Backtrack => {
                match backtrack::run_search(graph, alphabet, input, start, group_count) {
                    Ok(outcome) => Ok(outcome.groups),
                    Err(Error::UnsupportedOperation(_)) => self.search_complex(input, start),
                    Err(e) => Err(e),
                }
            }
            MatchEngine::Nfa { schedule, dedupe } => {
                let dedupe = dedupe && !self.program.has_backreference();
                match nfa::run(graph, alphabet, input, start, group_count, schedule.into(), dedupe) {
                    Ok(outcome) => Ok(outcome.groups),
                    Err(Error::UnsupportedOperation(_)) => self.search_complex(input, start),
                    Err(e) => Err(e),
                }
            }
            MatchEngine::Complex => self.search_complex(input, start),
        }
    }

    /// Matches `input` anchored exactly at `start` (spec.md
    /// `compiled.match`, as opposed to `compiled.search`'s free start).
    /// The backtracking engine has a dedicated anchored entry point;
    /// the parallel and on-the-fly engines only expose search, but a
    /// search tries `start` before any later offset, so a match whose
    /// span begins at `start` is exactly the anchored result.
    pub fn match_at<'t>(
        &self,
        input: &Input<'_, A>,
        start: usize,
    ) -> Result<Option<crate::group::Groups>, Error> {
        match self.choose_engine(input.len()) {
            MatchEngine::Backtrack => {
                let graph = &self.program.graph;
                let alphabet = &self.program.alphabet;
                let group_count = self.program.num_captures();
                match backtrack::run_anchored(graph, alphabet, input, start, group_count) {
                    Ok(outcome) => Ok(outcome.groups),
                    Err(Error::UnsupportedOperation(_)) => self.anchored_from_search(input, start),
                    Err(e) => Err(e),
                }
            }
            _ => self.anchored_from_search(input, start),
        }
    }

    fn anchored_from_search(
        &self,
        input: &Input<'_, A>,
        start: usize,
    ) -> Result<Option<crate::group::Groups>, Error> {
        match self.search(input, start)? {
            Some(groups) if groups.span(0).map_or(false, |(s, _)| s == start) => Ok(Some(groups)),
            _ => Ok(None),
        }
    }

    /// Anchored counterpart to `search_text`.
    pub fn match_text<'t>(
        &self,
        text: &'t str,
        start: usize,
    ) -> Result<Option<MatchResult<'t>>, Error>
    where
        A: Alphabet<Char = char>,
    {
        let chars = crate::input::chars_of(text);
        let input: Input<A> = Input::borrowed(&chars);
        match self.match_at(&input, start)? {
            Some(groups) => Ok(Some(MatchResult::new(text, self.program.state.clone(), groups))),
            None => Ok(None),
        }
    }

    fn search_complex(
        &self,
        input: &Input<'_, A>,
        start: usize,
    ) -> Result<Option<crate::group::Groups>, Error> {
        let outcome = complex::run(
            &self.program.graph,
            &self.program.alphabet,
            input,
            start,
            self.program.num_captures(),
        )?;
        Ok(outcome.groups)
    }

    /// Runs a search and folds the result into a `MatchResult`, ready
    /// for the public API's accessor methods.
    pub fn search_text<'t>(
        &self,
        text: &'t str,
        start: usize,
    ) -> Result<Option<MatchResult<'t>>, Error>
    where
        A: Alphabet<Char = char>,
    {
        let chars = crate::input::chars_of(text);
        let input: Input<A> = Input::borrowed(&chars);
        match self.search(&input, start)? {
            Some(groups) => Ok(Some(MatchResult::new(text, self.program.state.clone(), groups))),
            None => Ok(None),
        }
    }

    fn choose_engine(&self, text_len: usize) -> MatchEngine {
        if let Some(ref e) = self.program.engine {
            return e.clone();
        }
        if self.program.graph.len() <= BACKTRACK_NODE_LIMIT && text_len <= BACKTRACK_TEXT_LIMIT {
            MatchEngine::Backtrack
        } else {
            MatchEngine::Nfa {
                schedule: crate::program::NfaSchedule::Wide,
                dedupe: !self.program.has_backreference(),
            }
        }
    }
}
