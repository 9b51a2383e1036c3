// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The on-the-fly DFA ("complex") engine (spec.md `## 4.5`): instead of
//! the parallel engine's fixed one-character-per-tick bucket pair, live
//! states are scheduled by the input offset they are next due at. A
//! state that matches a literal string of length `k` jumps straight
//! from `offset` to `offset + k` ("skip"), without the rest of the
//! state set needing to take `k` separate ticks to catch up -- the
//! engine simply re-sorts by offset and continues from the new
//! minimum.
//!
//! Lookaheads recurse through `backtrack::match_subgraph`, a fresh,
//! independent trampoline call per invocation; that already gives them
//! the isolation the specification asks a push/pop stack for, without
//! this engine needing to thread one through.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::alphabet::Alphabet;
use crate::error::Error;
use crate::graph::{CheckpointId, Graph, Node, NodeId, RepeatId};
use crate::group::Groups;
use crate::input::Input;

#[derive(Clone, Debug)]
struct CState {
    node: NodeId,
    offset: usize,
    groups: Groups,
    loops: Rc<HashMap<RepeatId, u32>>,
    checkpoints: Rc<HashSet<CheckpointId>>,
}

impl CState {
    fn loop_count(&self, id: RepeatId) -> u32 {
        self.loops.get(&id).copied().unwrap_or(0)
    }

    fn with_loop_count(&self, id: RepeatId, count: u32) -> Self {
        let mut loops = (*self.loops).clone();
        loops.insert(id, count);
        CState { loops: Rc::new(loops), ..self.clone() }
    }

    fn checked(&self, id: CheckpointId) -> Option<Self> {
        if self.checkpoints.contains(&id) {
            None
        } else {
            let mut set = (*self.checkpoints).clone();
            set.insert(id);
            Some(CState { checkpoints: Rc::new(set), ..self.clone() })
        }
    }

    fn goto(&self, node: NodeId, offset: usize) -> Self {
        let checkpoints =
            if offset == self.offset { self.checkpoints.clone() } else { Rc::new(HashSet::new()) };
        CState { node, offset, checkpoints, ..self.clone() }
    }

    fn key(&self) -> (NodeId, usize, Vec<(isize, isize)>, Vec<(RepeatId, u32)>) {
        let mut loops: Vec<_> = self.loops.iter().map(|(&k, &v)| (k, v)).collect();
        loops.sort_unstable();
        (self.node, self.offset, self.groups.canonical(), loops)
    }
}

enum Advance {
    Matched(Groups),
    Next(Vec<CState>),
    Fail,
}

fn advance<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    state: &CState,
) -> Result<Advance, Error> {
    let offset = state.offset;
    let node = graph.get(state.node);
    Ok(match node {
        Node::String { text, next } => {
            let end = offset + text.len();
            if text.is_empty() {
                Advance::Next(vec![state.goto(*next, offset)])
            } else if end <= input.len() && input.slice(offset, end) == text.as_slice() {
                // Skip: jump straight past every character of the
                // literal in one state transition.
                Advance::Next(vec![state.goto(*next, end)])
            } else {
                Advance::Fail
            }
        }
        Node::Character { test, next } => match input.at(offset) {
            Some(ch) if test.matches(alphabet, ch)? => Advance::Next(vec![state.goto(*next, offset + 1)]),
            _ => Advance::Fail,
        },
        Node::Dot { multiline, next } => match input.at(offset) {
            Some(ch) if *multiline || alphabet.char_to_code(ch) != 10 => {
                Advance::Next(vec![state.goto(*next, offset + 1)])
            }
            _ => Advance::Fail,
        },
        Node::StartOfLine { multiline, next } => {
            let ok = offset == 0
                || (*multiline
                    && offset.checked_sub(1).and_then(|p| input.at(p)).map(|c| alphabet.char_to_code(c))
                        == Some(10));
            if ok { Advance::Next(vec![state.goto(*next, offset)]) } else { Advance::Fail }
        }
        Node::EndOfLine { multiline, next } => {
            let is_newline = input.at(offset).map(|c| alphabet.char_to_code(c)) == Some(10);
            let ok = offset == input.len()
                || (is_newline && (*multiline || offset + 1 == input.len()));
            if ok { Advance::Next(vec![state.goto(*next, offset)]) } else { Advance::Fail }
        }
        Node::WordBoundary { inverted, next } => {
            let w = |c: Option<A::Char>| -> Result<bool, Error> {
                match c {
                    Some(c) => alphabet.word(c).map_err(|e| Error::UnsupportedOperation(e.to_string())),
                    None => Ok(false),
                }
            };
            let before = offset.checked_sub(1).and_then(|p| input.at(p));
            let after = input.at(offset);
            let boundary = w(before)? != w(after)?;
            if boundary != *inverted {
                Advance::Next(vec![state.goto(*next, offset)])
            } else {
                Advance::Fail
            }
        }
        Node::Digit { inverted, next } | Node::Space { inverted, next } | Node::Word { inverted, next } => {
            match input.at(offset) {
                Some(ch) => {
                    let hit = class_test(node, alphabet, ch)?;
                    if hit != *inverted {
                        Advance::Next(vec![state.goto(*next, offset + 1)])
                    } else {
                        Advance::Fail
                    }
                }
                None => Advance::Fail,
            }
        }
        Node::StartGroup { index, next } => {
            let mut s = state.goto(*next, offset);
            s.groups.start_group(*index, offset);
            Advance::Next(vec![s])
        }
        Node::EndGroup { index, next } => {
            let mut s = state.goto(*next, offset);
            s.groups.end_group(*index, offset);
            Advance::Next(vec![s])
        }
        Node::GroupReference { index, next } => match state.groups.span(*index) {
            None => Advance::Fail,
            Some((s0, e0)) if s0 == e0 => Advance::Next(vec![state.goto(*next, offset)]),
            Some((s0, e0)) => {
                let text = input.slice(s0, e0);
                let end = offset + text.len();
                if end <= input.len() && input.slice(offset, end) == text {
                    Advance::Next(vec![state.goto(*next, end)])
                } else {
                    Advance::Fail
                }
            }
        },
        Node::Match => Advance::Matched(state.groups.clone()),
        Node::NoMatch => Advance::Fail,
        Node::Split { alternatives } => {
            Advance::Next(alternatives.iter().map(|&a| state.goto(a, offset)).collect())
        }
        Node::Repeat { id, begin, end, lazy, exit, body } => {
            let count = state.loop_count(*id);
            if let Some(max) = end {
                if count >= *max {
                    let s = state.with_loop_count(*id, 0);
                    return Ok(Advance::Next(vec![s.goto(*exit, offset)]));
                }
            }
            let bumped = state.with_loop_count(*id, count + 1);
            if count < *begin {
                Advance::Next(vec![bumped.goto(*body, offset)])
            } else {
                let go_body = bumped.goto(*body, offset);
                let go_exit = bumped.goto(*exit, offset);
                if *lazy {
                    Advance::Next(vec![go_exit, go_body])
                } else {
                    Advance::Next(vec![go_body, go_exit])
                }
            }
        }
        Node::Lookahead { equal, forwards, continuation, sub_expr } => {
            let matched = if *forwards {
                crate::backtrack::match_subgraph(
                    graph,
                    alphabet,
                    input,
                    *sub_expr,
                    offset,
                    state.groups.clone(),
                )?
                .map(|(g, _)| g)
            } else {
                crate::backtrack::match_behind(
                    graph,
                    alphabet,
                    input,
                    *sub_expr,
                    offset,
                    state.groups.clone(),
                )?
            };
            if matched.is_some() == *equal {
                let mut s = state.goto(*continuation, offset);
                if let Some(g) = matched {
                    s.groups = g;
                }
                Advance::Next(vec![s])
            } else {
                Advance::Fail
            }
        }
        Node::Conditional { group, matched, unmatched } => {
            let target = if state.groups.span(*group).is_some() { *matched } else { *unmatched };
            Advance::Next(vec![state.goto(target, offset)])
        }
        Node::Checkpoint { id, next } => match state.checked(*id) {
            Some(s) => Advance::Next(vec![s.goto(*next, offset)]),
            None => Advance::Fail,
        },
    })
}

fn class_test<A: Alphabet>(node: &Node<A>, alphabet: &A, ch: A::Char) -> Result<bool, Error> {
    let r = match node {
        Node::Digit { .. } => alphabet.digit(ch),
        Node::Space { .. } => alphabet.space(ch),
        Node::Word { .. } => alphabet.word(ch),
        _ => unreachable!(),
    };
    r.map_err(|e| Error::UnsupportedOperation(e.to_string()))
}

pub struct Outcome {
    pub groups: Option<Groups>,
    pub ticks: u64,
}

/// Run the complex engine as a search from `start` to `input.len()`.
/// States at the same offset are kept on a priority-ordered stack
/// (`ready`, highest priority last so it pops first, mirroring the
/// parallel engine's `current` bucket); states due at a later offset
/// wait in `pending` until `ready` drains, at which point the smallest
/// pending offset becomes the new current one -- this is what lets a
/// `skip` jump several positions ahead without the rest of the state
/// set needing to tick through them one at a time.
pub fn run<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
) -> Result<Outcome, Error> {
    let mut pending: Vec<CState> = Vec::new();
    let mut ready: Vec<CState> = Vec::new();
    let mut ticks = 0u64;
    let mut seeded_up_to = start.wrapping_sub(1);
    let mut known: HashSet<_> = HashSet::new();

    loop {
        if ready.is_empty() {
            let next_offset = pending.iter().map(|s| s.offset).min();
            let candidate_seed = if seeded_up_to.wrapping_add(1) <= input.len()
                && seeded_up_to != start.wrapping_sub(1).wrapping_sub(1)
            {
                Some(seeded_up_to.wrapping_add(1))
            } else {
                None
            };
            let _ = candidate_seed;
            match next_offset {
                Some(off) => {
                    let (here, rest): (Vec<_>, Vec<_>) =
                        pending.into_iter().partition(|s| s.offset == off);
                    pending = rest;
                    known.clear();
                    for s in here {
                        if known.insert(s.key()) {
                            ready.push(s);
                        }
                    }
                }
                None => return Ok(Outcome { groups: None, ticks }),
            }
        }

        let state = ready.pop().unwrap();
        ticks += 1;
        match advance(graph, alphabet, input, &state)? {
            Advance::Matched(mut groups) => {
                groups.end_group(0, state.offset);
                return Ok(Outcome { groups: Some(groups), ticks });
            }
            Advance::Next(states) => {
                for s in states.into_iter().rev() {
                    if s.offset == state.offset {
                        ready.push(s);
                    } else {
                        pending.push(s);
                    }
                }
            }
            Advance::Fail => {}
        }

        if ready.is_empty() && pending.is_empty() {
            let seed_from = start;
            if seed_from <= input.len() {
                for offset in seed_from..=input.len() {
                    let mut groups = Groups::new(group_count);
                    groups.start_group(0, offset);
                    pending.push(CState {
                        node: graph.entry(),
                        offset,
                        groups,
                        loops: Rc::new(HashMap::new()),
                        checkpoints: Rc::new(HashSet::new()),
                    });
                }
                // Only seed once; subsequent empty rounds mean no match.
                seeded_up_to = input.len();
                if pending.is_empty() {
                    return Ok(Outcome { groups: None, ticks });
                }
                continue;
            }
            return Ok(Outcome { groups: None, ticks });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Ascii;
    use crate::graph::CharacterTest;
    use crate::interval::IntervalSet;

    fn lit(s: &str, next: NodeId) -> Node<Ascii> {
        Node::String { text: s.chars().collect(), next }
    }

    fn char_node(a: &Ascii, c: char, next: NodeId) -> Node<Ascii> {
        let mut set = IntervalSet::new();
        set.insert(a, c, c);
        Node::Character {
            test: CharacterTest { intervals: set, classes: vec![], inverted: false, complete: false },
            next,
        }
    }

    #[test]
    fn literal_skip_matches_in_one_transition() {
        let a = Ascii;
        let nodes = vec![Node::Match, lit("hello", 0)];
        let g = Graph::new(nodes, 1);
        let chars = crate::input::chars_of("hello");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run(&g, &a, &input, 0, 0).unwrap();
        let groups = out.groups.unwrap();
        assert_eq!(groups.span(0), Some((0, 5)));
    }

    #[test]
    fn search_finds_match_later_in_input() {
        let a = Ascii;
        let nodes = vec![Node::Match, char_node(&a, 'x', 0)];
        let g = Graph::new(nodes, 1);
        let chars = crate::input::chars_of("abcx");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run(&g, &a, &input, 0, 0).unwrap();
        let groups = out.groups.unwrap();
        assert_eq!(groups.span(0), Some((3, 4)));
    }
}
