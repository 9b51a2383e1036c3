// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The parallel NFA engine family (spec.md `## 4.4`): many threads
//! advanced one input position at a time, in two priority-ordered
//! buckets (`current`/`next`), instead of the backtracking engine's
//! single thread with an explicit retry stack.
//!
//! This keeps the teacher's dense/sparse `Threads` two-bucket shape
//! (`nfa.rs`'s `Nfa`/`Threads`) but generalises the per-thread payload
//! from a bare program counter to a full `(node, captures,
//! loop-counters, checkpoints)` tuple, and adds the three scheduling
//! variants and the hashing dedup mode the specification requires.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::alphabet::Alphabet;
use crate::error::Error;
use crate::graph::{CheckpointId, Graph, Node, NodeId, RepeatId};
use crate::group::Groups;
use crate::input::Input;

/// Mid-consumption state of a `GroupReference` whose captured text is
/// only known at runtime: the parallel engine cannot dispatch on a
/// graph node for the remaining characters (there is no node for them),
/// so the thread carries the literal it is still matching against
/// (spec.md `## 4.4` "Sub-expressions").
#[derive(Clone, Debug)]
struct PendingLiteral<C> {
    text: Vec<C>,
    pos: usize,
    resume: NodeId,
}

#[derive(Clone, Debug)]
struct Thread<A: Alphabet> {
    node: NodeId,
    groups: Groups,
    loops: Rc<HashMap<RepeatId, u32>>,
    checkpoints: Rc<HashSet<CheckpointId>>,
    pending: Option<Rc<PendingLiteral<A::Char>>>,
}

impl<A: Alphabet> Thread<A> {
    fn initial(node: NodeId, offset: usize, group_count: usize) -> Self {
        let mut groups = Groups::new(group_count);
        groups.start_group(0, offset);
        Thread {
            node,
            groups,
            loops: Rc::new(HashMap::new()),
            checkpoints: Rc::new(HashSet::new()),
            pending: None,
        }
    }

    fn loop_count(&self, id: RepeatId) -> u32 {
        self.loops.get(&id).copied().unwrap_or(0)
    }

    fn with_loop_count(&self, id: RepeatId, count: u32) -> Self {
        let mut loops = (*self.loops).clone();
        loops.insert(id, count);
        Thread { loops: Rc::new(loops), ..self.clone() }
    }

    fn checked(&self, id: CheckpointId) -> Option<Self> {
        if self.checkpoints.contains(&id) {
            None
        } else {
            let mut set = (*self.checkpoints).clone();
            set.insert(id);
            Some(Thread { checkpoints: Rc::new(set), ..self.clone() })
        }
    }

    fn consumed_at(&self, node: NodeId) -> Self {
        Thread { node, checkpoints: Rc::new(HashSet::new()), pending: None, ..self.clone() }
    }

    fn key(&self) -> (NodeId, Vec<(isize, isize)>, Vec<(RepeatId, u32)>) {
        let mut loops: Vec<_> = self.loops.iter().map(|(&k, &v)| (k, v)).collect();
        loops.sort_unstable();
        (self.node, self.groups.canonical(), loops)
    }
}

enum Step<A: Alphabet> {
    /// Consumed the current character; queue into `next`.
    Consumed(Thread<A>),
    /// Zero-width expansion(s), highest priority first; re-queued into
    /// `current`.
    Extra(Vec<Thread<A>>),
    Matched(Thread<A>),
    Fail,
}

fn step<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    offset: usize,
    thread: &Thread<A>,
) -> Result<Step<A>, Error> {
    if let Some(pending) = thread.pending.clone() {
        return Ok(match input.at(offset) {
            Some(ch) if ch == pending.text[pending.pos] => {
                if pending.pos + 1 == pending.text.len() {
                    Step::Consumed(thread.consumed_at(pending.resume))
                } else {
                    let mut t = thread.clone();
                    t.pending = Some(Rc::new(PendingLiteral {
                        text: pending.text.clone(),
                        pos: pending.pos + 1,
                        resume: pending.resume,
                    }));
                    Step::Consumed(t)
                }
            }
            _ => Step::Fail,
        });
    }

    let node = graph.get(thread.node);
    Ok(match node {
        Node::String { text, next } => {
            if text.is_empty() {
                Step::Extra(vec![thread.consumed_at(*next)])
            } else {
                match input.at(offset) {
                    Some(ch) if ch == text[0] => {
                        if text.len() == 1 {
                            Step::Consumed(thread.consumed_at(*next))
                        } else {
                            let mut t = thread.clone();
                            t.pending = Some(Rc::new(PendingLiteral {
                                text: text[1..].to_vec(),
                                pos: 0,
                                resume: *next,
                            }));
                            Step::Consumed(t)
                        }
                    }
                    _ => Step::Fail,
                }
            }
        }
        Node::Character { test, next } => match input.at(offset) {
            Some(ch) if test.matches(alphabet, ch)? => Step::Consumed(thread.consumed_at(*next)),
            _ => Step::Fail,
        },
        Node::Dot { multiline, next } => match input.at(offset) {
            Some(ch) if *multiline || alphabet.char_to_code(ch) != 10 => {
                Step::Consumed(thread.consumed_at(*next))
            }
            _ => Step::Fail,
        },
        Node::StartOfLine { multiline, next } => {
            let ok = offset == 0
                || (*multiline
                    && offset.checked_sub(1).and_then(|p| input.at(p)).map(|c| alphabet.char_to_code(c)) == Some(10));
            if ok { Step::Extra(vec![thread.consumed_at(*next)]) } else { Step::Fail }
        }
        Node::EndOfLine { multiline, next } => {
            let is_newline = input.at(offset).map(|c| alphabet.char_to_code(c)) == Some(10);
            let ok = offset == input.len()
                || (is_newline && (*multiline || offset + 1 == input.len()));
            if ok { Step::Extra(vec![thread.consumed_at(*next)]) } else { Step::Fail }
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
                Step::Extra(vec![thread.consumed_at(*next)])
            } else {
                Step::Fail
            }
        }
        Node::Digit { inverted, next } | Node::Space { inverted, next } | Node::Word { inverted, next } => {
            match input.at(offset) {
                Some(ch) => {
                    let hit = class_test(node, alphabet, ch)?;
                    if hit != *inverted {
                        Step::Consumed(thread.consumed_at(*next))
                    } else {
                        Step::Fail
                    }
                }
                None => Step::Fail,
            }
        }
        Node::StartGroup { index, next } => {
            let mut t = thread.clone();
            t.groups.start_group(*index, offset);
            t.node = *next;
            Step::Extra(vec![t])
        }
        Node::EndGroup { index, next } => {
            let mut t = thread.clone();
            t.groups.end_group(*index, offset);
            t.node = *next;
            Step::Extra(vec![t])
        }
        Node::GroupReference { index, next } => match thread.groups.span(*index) {
            None => Step::Fail,
            Some((s, e)) if s == e => Step::Extra(vec![thread.consumed_at(*next)]),
            Some((s, e)) => {
                let text = input.slice(s, e).to_vec();
                let mut t = thread.clone();
                t.pending = Some(Rc::new(PendingLiteral { text, pos: 0, resume: *next }));
                Step::Extra(vec![t])
            }
        },
        Node::Match => Step::Matched(thread.clone()),
        Node::NoMatch => Step::Fail,
        Node::Split { alternatives } => {
            Step::Extra(alternatives.iter().map(|&a| {
                let mut t = thread.clone();
                t.node = a;
                t
            }).collect())
        }
        Node::Repeat { id, begin, end, lazy, exit, body } => {
            let count = thread.loop_count(*id);
            if let Some(max) = end {
                if count >= *max {
                    let t = thread.with_loop_count(*id, 0);
                    return Ok(Step::Extra(vec![Thread { node: *exit, ..t }]));
                }
            }
            let bumped = thread.with_loop_count(*id, count + 1);
            if count < *begin {
                Step::Extra(vec![Thread { node: *body, ..bumped }])
            } else {
                let go_body = Thread { node: *body, ..bumped.clone() };
                let go_exit = Thread { node: *exit, ..bumped };
                if *lazy {
                    Step::Extra(vec![go_exit, go_body])
                } else {
                    Step::Extra(vec![go_body, go_exit])
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
                    thread.groups.clone(),
                )?
                .map(|(g, _)| g)
            } else {
                crate::backtrack::match_behind(
                    graph,
                    alphabet,
                    input,
                    *sub_expr,
                    offset,
                    thread.groups.clone(),
                )?
            };
            if matched.is_some() == *equal {
                let mut t = thread.clone();
                if let Some(g) = matched {
                    t.groups = g;
                }
                t.node = *continuation;
                Step::Extra(vec![t])
            } else {
                Step::Fail
            }
        }
        Node::Conditional { group, matched, unmatched } => {
            let mut t = thread.clone();
            t.node = if thread.groups.span(*group).is_some() { *matched } else { *unmatched };
            Step::Extra(vec![t])
        }
        Node::Checkpoint { id, next } => match thread.checked(*id) {
            Some(mut t) => {
                t.node = *next;
                Step::Extra(vec![t])
            }
            None => Step::Fail,
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

/// Which of the three scheduling variants (spec.md `## 4.4`) to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    Wide,
    Serial,
    Beam { initial_bound: usize },
}

/// Drain `current` for a single input position, honouring priority:
/// the first `Match` found (by popping highest-priority-first) wins,
/// and everything remaining in `current` at that point is discarded.
/// Returns the winning thread (if any) and the threads queued into
/// `next`.
fn run_position<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    offset: usize,
    mut current: Vec<Thread<A>>,
    dedupe: bool,
    bound: Option<usize>,
) -> Result<(Option<Thread<A>>, Vec<Thread<A>>, bool), Error> {
    let mut next: Vec<Thread<A>> = Vec::new();
    let mut seen_current: HashSet<_> = HashSet::new();
    let mut seen_next: HashSet<_> = HashSet::new();
    let mut overflowed = false;

    while let Some(thread) = current.pop() {
        match step(graph, alphabet, input, offset, &thread)? {
            Step::Matched(_) => return Ok((Some(thread), next, overflowed)),
            Step::Consumed(t) => {
                if !dedupe || seen_next.insert(t.key()) {
                    next.push(t);
                }
            }
            Step::Extra(extras) => {
                for t in extras.into_iter().rev() {
                    if dedupe && !seen_current.insert(t.key()) {
                        continue;
                    }
                    current.push(t);
                }
            }
            Step::Fail => {}
        }
        if let Some(bound) = bound {
            if current.len() + next.len() > bound {
                overflowed = true;
                current.clear();
                break;
            }
        }
    }
    Ok((None, next, overflowed))
}

/// Outcome of a parallel-engine run.
pub struct Outcome {
    pub groups: Option<Groups>,
    pub ticks: u64,
}

/// Run the parallel engine in search mode from `start` to `input.len()`
/// inclusive, per `schedule`. `dedupe` selects the hashing variant
/// (spec.md `## 4.4` "State deduplication").
pub fn run<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
    schedule: Schedule,
    dedupe: bool,
) -> Result<Outcome, Error> {
    let mut bound = match schedule {
        Schedule::Beam { initial_bound } => Some(initial_bound),
        _ => None,
    };
    loop {
        let result = run_with_bound(graph, alphabet, input, start, group_count, schedule, dedupe, bound)?;
        match schedule {
            Schedule::Beam { .. } if result.groups.is_none() && result.overflowed => {
                bound = Some(bound.unwrap() * 2);
                continue;
            }
            _ => return Ok(Outcome { groups: result.groups, ticks: result.ticks }),
        }
    }
}

struct RunResult {
    groups: Option<Groups>,
    ticks: u64,
    overflowed: bool,
}

fn run_with_bound<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
    schedule: Schedule,
    dedupe: bool,
    bound: Option<usize>,
) -> Result<RunResult, Error> {
    let mut current: Vec<Thread<A>> = Vec::new();
    let mut ticks = 0u64;
    let mut any_overflow = false;
    let mut offset = start;
    loop {
        ticks += 1;
        let seed_here = match schedule {
            Schedule::Serial => current.is_empty(),
            Schedule::Wide | Schedule::Beam { .. } => true,
        };
        if seed_here && offset <= input.len() {
            current.insert(0, Thread::initial(graph.entry(), offset, group_count));
        }
        let (matched, next, overflowed) =
            run_position(graph, alphabet, input, offset, current, dedupe, bound)?;
        any_overflow |= overflowed;
        if let Some(t) = matched {
            let mut groups = t.groups;
            groups.end_group(0, offset);
            return Ok(RunResult { groups: Some(groups), ticks, overflowed: any_overflow });
        }
        current = next;
        if offset >= input.len() && current.is_empty() {
            break;
        }
        offset += 1;
    }
    Ok(RunResult { groups: None, ticks, overflowed: any_overflow })
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
    fn wide_schedule_finds_leftmost_match() {
        let a = Ascii;
        let nodes = vec![Node::Match, lit("b", 0)];
        let g = Graph::new(nodes, 1);
        let chars = crate::input::chars_of("ab");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run(&g, &a, &input, 0, 0, Schedule::Wide, false).unwrap();
        let groups = out.groups.unwrap();
        assert_eq!(groups.span(0), Some((1, 2)));
    }

    #[test]
    fn star_dedupes_to_constant_thread_count_with_hashing() {
        let a = Ascii;
        // b*: 0 Match, 1 Repeat(body=2,exit=0), 2 'b'->1
        let nodes = vec![
            Node::Match,
            Node::Repeat { id: 1, begin: 0, end: None, lazy: false, exit: 0, body: 2 },
            char_node(&a, 'b', 1),
        ];
        let g = Graph::new(nodes, 1);
        let text: String = std::iter::repeat('b').take(200).collect();
        let chars = crate::input::chars_of(&text);
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run(&g, &a, &input, 0, 0, Schedule::Wide, true).unwrap();
        let groups = out.groups.unwrap();
        assert_eq!(groups.span(0), Some((0, 200)));
    }

    #[test]
    fn beam_eventually_finds_match_by_doubling() {
        let a = Ascii;
        let nodes = vec![
            Node::Match,
            Node::Repeat { id: 1, begin: 0, end: None, lazy: false, exit: 0, body: 2 },
            char_node(&a, 'b', 1),
        ];
        let g = Graph::new(nodes, 1);
        let text: String = std::iter::repeat('b').take(50).collect();
        let chars = crate::input::chars_of(&text);
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run(&g, &a, &input, 0, 0, Schedule::Beam { initial_bound: 1 }, false).unwrap();
        assert!(out.groups.is_some());
    }
}
