// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The backtracking engine (spec.md `## 4.3`): a single-thread
//! interpreter over the operation graph with an explicit stack of
//! saved continuations, standing in for the call stack recursion would
//! otherwise use.
//!
//! This keeps the teacher's overall shape -- a trampoline loop driven
//! by an explicit job stack instead of real recursion -- but replaces
//! its bitset-based `has_visited` pruning (sound only because the
//! teacher's `Inst` set has no captures to distinguish) with the
//! run-length stack compression the specification calls for, which is
//! required once state includes group captures and repeat counters.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::alphabet::Alphabet;
use crate::error::Error;
use crate::graph::{CheckpointId, Graph, Node, NodeId, RepeatId};
use crate::group::Groups;
use crate::input::Input;

/// Per-run mutable state threaded through `visit` (spec.md `## 4.3`
/// "State snapshot contents").
#[derive(Clone, Debug)]
struct State {
    offset: usize,
    groups: Groups,
    loops: Rc<HashMap<RepeatId, u32>>,
    checkpoints: Rc<HashSet<CheckpointId>>,
}

impl State {
    fn new(offset: usize, group_count: usize) -> Self {
        State {
            offset,
            groups: Groups::new(group_count),
            loops: Rc::new(HashMap::new()),
            checkpoints: Rc::new(HashSet::new()),
        }
    }

    /// Two states are "similar" for the purposes of stack compression
    /// when they agree on everything except offset: same captures, same
    /// loop counters. Checkpoints are excluded on purpose -- they are
    /// cleared on every consuming move, so a run of states produced by
    /// repeatedly consuming one character each never carries any.
    fn similar(&self, other: &State) -> bool {
        self.groups.same_captures(&other.groups) && *self.loops == *other.loops
    }

    fn with_offset(&self, offset: usize) -> State {
        State {
            offset,
            groups: self.groups.clone(),
            loops: self.loops.clone(),
            checkpoints: self.checkpoints.clone(),
        }
    }

    fn loop_count(&self, id: RepeatId) -> u32 {
        self.loops.get(&id).copied().unwrap_or(0)
    }

    fn set_loop_count(&mut self, id: RepeatId, count: u32) {
        Rc::make_mut(&mut self.loops).insert(id, count);
    }

    fn clear_checkpoints(&mut self) {
        if !self.checkpoints.is_empty() {
            self.checkpoints = Rc::new(HashSet::new());
        }
    }

    /// Drops `id`'s loop counter from a clone of this state. The pushed
    /// alternative for a `Repeat` no longer needs its own counter once
    /// it's taken -- keeping it around means every push for the same
    /// node carries a distinct `loops` map (`{id: 1}`, `{id: 2}`, ...)
    /// and `similar` (below) never finds two of them alike, defeating
    /// stack compression.
    fn without_loop(&self, id: RepeatId) -> State {
        let mut s = self.clone();
        if s.loops.contains_key(&id) {
            Rc::make_mut(&mut s.loops).remove(&id);
        }
        s
    }

    fn check_checkpoint(&mut self, id: CheckpointId) -> bool {
        Rc::make_mut(&mut self.checkpoints).insert(id)
    }
}

/// One entry in the backtracking stack. A run of pushes for the same
/// node with similar (offset-independent) states collapses into a
/// single entry spanning `[start, end]` with a fixed `step`, per
/// spec.md `## 4.3` "Stack compression".
struct StackEntry {
    node: NodeId,
    template: State,
    start: usize,
    end: usize,
    step: isize,
}

struct Stack {
    entries: Vec<StackEntry>,
    max_depth: usize,
}

impl Stack {
    fn new() -> Self {
        Stack { entries: Vec::new(), max_depth: 0 }
    }

    fn push(&mut self, node: NodeId, state: State) {
        if let Some(top) = self.entries.last_mut() {
            if top.node == node && top.template.similar(&state) {
                let step = if top.start == top.end {
                    state.offset as isize - top.end as isize
                } else {
                    top.step
                };
                if step != 0 && state.offset as isize == top.end as isize + step {
                    top.end = state.offset;
                    top.step = step;
                    return;
                }
            }
        }
        let template = state.with_offset(state.offset);
        self.entries.push(StackEntry {
            node,
            template,
            start: state.offset,
            end: state.offset,
            step: 0,
        });
        self.max_depth = self.max_depth.max(self.entries.len());
    }

    fn pop(&mut self) -> Option<(NodeId, State)> {
        let entry = self.entries.pop()?;
        let state = entry.template.with_offset(entry.end);
        if entry.end != entry.start && entry.step != 0 {
            let new_end = (entry.end as isize - entry.step) as usize;
            self.entries.push(StackEntry {
                node: entry.node,
                template: entry.template,
                start: entry.start,
                end: new_end,
                step: entry.step,
            });
        }
        Some((entry.node, state))
    }
}

enum Visit {
    Continue(NodeId),
    Match,
    Fail,
}

/// Outcome of one backtracking run, including the instrumentation
/// spec.md `## 4.3` asks tests to observe.
pub struct Outcome {
    pub groups: Option<Groups>,
    pub ticks: u64,
    pub max_stack_depth: usize,
}

/// Run the backtracking engine anchored at `start` (spec.md
/// `compiled.match`). `Outcome::groups` is `None` on an ordinary
/// mismatch -- only genuine unsupported-operation conditions escape as
/// `Err`.
pub fn run_anchored<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
) -> Result<Outcome, Error> {
    run_from(graph, alphabet, input, start, group_count)
}

/// Run the backtracking engine as a search (spec.md `compiled.search`):
/// try `start`, then every later offset up to and including
/// `input.len()`, returning the first match.
pub fn run_search<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
) -> Result<Outcome, Error> {
    let mut ticks = 0u64;
    let mut max_stack_depth = 0usize;
    for offset in start..=input.len() {
        let outcome = run_from(graph, alphabet, input, offset, group_count)?;
        ticks += outcome.ticks;
        max_stack_depth = max_stack_depth.max(outcome.max_stack_depth);
        if outcome.groups.is_some() {
            return Ok(Outcome { groups: outcome.groups, ticks, max_stack_depth });
        }
    }
    Ok(Outcome { groups: None, ticks, max_stack_depth })
}

fn run_from<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    start: usize,
    group_count: usize,
) -> Result<Outcome, Error> {
    let mut state = State::new(start, group_count);
    state.groups.start_group(0, start);
    let mut stack = Stack::new();
    let mut node = graph.entry();
    let mut ticks = 0u64;

    loop {
        ticks += 1;
        match visit(graph, alphabet, input, node, &mut state, &mut stack)? {
            Visit::Continue(next) => node = next,
            Visit::Match => {
                state.groups.end_group(0, state.offset);
                return Ok(Outcome {
                    groups: Some(state.groups),
                    ticks,
                    max_stack_depth: stack.max_depth,
                });
            }
            Visit::Fail => match stack.pop() {
                Some((n, s)) => {
                    node = n;
                    state = s;
                }
                None => {
                    return Ok(Outcome { groups: None, ticks, max_stack_depth: stack.max_depth });
                }
            },
        }
    }
}

fn visit<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    node_id: NodeId,
    state: &mut State,
    stack: &mut Stack,
) -> Result<Visit, Error> {
    let node = graph.get(node_id);
    Ok(match node {
        Node::String { text, next } => {
            let end = state.offset + text.len();
            if end > input.len() || input.slice(state.offset, end) != text.as_slice() {
                Visit::Fail
            } else {
                state.offset = end;
                state.clear_checkpoints();
                Visit::Continue(*next)
            }
        }
        Node::Character { test, next } => match input.at(state.offset) {
            Some(ch) => {
                if test.matches(alphabet, ch)? {
                    state.offset += 1;
                    state.clear_checkpoints();
                    Visit::Continue(*next)
                } else {
                    Visit::Fail
                }
            }
            None => Visit::Fail,
        },
        Node::Dot { multiline, next } => match input.at(state.offset) {
            Some(ch) if *multiline || !is_newline_char(alphabet, ch) => {
                state.offset += 1;
                state.clear_checkpoints();
                Visit::Continue(*next)
            }
            _ => Visit::Fail,
        },
        Node::StartOfLine { multiline, next } => {
            let at_start = state.offset == 0
                || (*multiline && is_newline(alphabet, input, state.offset - 1));
            if at_start { Visit::Continue(*next) } else { Visit::Fail }
        }
        Node::EndOfLine { multiline, next } => {
            // Even without `multiline`, `$` also matches just before a
            // trailing newline at the very end of input -- not only at
            // the absolute end. `multiline` extends that to every
            // embedded newline, not just the final one.
            let at_end = state.offset == input.len()
                || (is_newline(alphabet, input, state.offset)
                    && (*multiline || state.offset + 1 == input.len()));
            if at_end { Visit::Continue(*next) } else { Visit::Fail }
        }
        Node::WordBoundary { inverted, next } => {
            let before = state.offset.checked_sub(1).and_then(|p| input.at(p));
            let after = input.at(state.offset);
            let boundary = is_word(alphabet, before)? != is_word(alphabet, after)?;
            if boundary != *inverted { Visit::Continue(*next) } else { Visit::Fail }
        }
        Node::Digit { inverted, next }
        | Node::Space { inverted, next }
        | Node::Word { inverted, next } => match input.at(state.offset) {
            Some(ch) => {
                let hit = class_test(node, alphabet, ch)?;
                if hit != *inverted {
                    state.offset += 1;
                    state.clear_checkpoints();
                    Visit::Continue(*next)
                } else {
                    Visit::Fail
                }
            }
            None => Visit::Fail,
        },
        Node::StartGroup { index, next } => {
            state.groups.start_group(*index, state.offset);
            Visit::Continue(*next)
        }
        Node::EndGroup { index, next } => {
            state.groups.end_group(*index, state.offset);
            Visit::Continue(*next)
        }
        Node::GroupReference { index, next } => match state.groups.span(*index) {
            None => Visit::Fail,
            Some((s, e)) if s == e => Visit::Continue(*next),
            Some((s, e)) => {
                let referenced: Vec<_> = input.slice(s, e).to_vec();
                let end = state.offset + referenced.len();
                if end > input.len() || input.slice(state.offset, end) != referenced.as_slice() {
                    Visit::Fail
                } else {
                    state.offset = end;
                    state.clear_checkpoints();
                    Visit::Continue(*next)
                }
            }
        },
        Node::Match => Visit::Match,
        Node::NoMatch => Visit::Fail,
        Node::Split { alternatives } => {
            if alternatives.is_empty() {
                Visit::Fail
            } else {
                for &alt in alternatives[1..].iter().rev() {
                    stack.push(alt, state.clone());
                }
                Visit::Continue(alternatives[0])
            }
        }
        Node::Repeat { id, begin, end, lazy, exit, body } => {
            let count = state.loop_count(*id);
            if let Some(max) = end {
                if count >= *max {
                    state.set_loop_count(*id, 0);
                    return Ok(Visit::Continue(*exit));
                }
            }
            state.set_loop_count(*id, count + 1);
            if count < *begin {
                Visit::Continue(*body)
            } else if *lazy {
                stack.push(*body, state.without_loop(*id));
                Visit::Continue(*exit)
            } else {
                stack.push(*exit, state.without_loop(*id));
                Visit::Continue(*body)
            }
        }
        Node::Lookahead { equal, forwards, continuation, sub_expr } => {
            let matched = if *forwards {
                match_subgraph(graph, alphabet, input, *sub_expr, state.offset, state.groups.clone())?
                    .map(|(g, _)| g)
            } else {
                match_behind(graph, alphabet, input, *sub_expr, state.offset, state.groups.clone())?
            };
            if matched.is_some() == *equal {
                if let (Some(sub_groups), true) = (&matched, sub_mutates(graph, *sub_expr)) {
                    state.groups = sub_groups.clone();
                }
                Visit::Continue(*continuation)
            } else {
                Visit::Fail
            }
        }
        Node::Conditional { group, matched, unmatched } => {
            if state.groups.span(*group).is_some() {
                Visit::Continue(*matched)
            } else {
                Visit::Continue(*unmatched)
            }
        }
        Node::Checkpoint { id, next } => {
            if state.check_checkpoint(*id) {
                Visit::Continue(*next)
            } else {
                Visit::Fail
            }
        }
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

fn is_word<A: Alphabet>(alphabet: &A, ch: Option<A::Char>) -> Result<bool, Error> {
    match ch {
        Some(c) => alphabet.word(c).map_err(|e| Error::UnsupportedOperation(e.to_string())),
        None => Ok(false),
    }
}

fn is_newline_char<A: Alphabet>(alphabet: &A, ch: A::Char) -> bool {
    alphabet.char_to_code(ch) == 10
}

fn is_newline<A: Alphabet>(alphabet: &A, input: &Input<'_, A>, pos: usize) -> bool {
    input.at(pos).is_some_and(|c| is_newline_char(alphabet, c))
}

/// Does any reachable node from `root` mutate group state? Used to
/// decide whether a successful lookahead's captures should propagate
/// to the parent (spec.md `## 4.3` "Lookahead", `## 9`).
fn sub_mutates<A: Alphabet>(graph: &Graph<A>, root: NodeId) -> bool {
    fn walk<A: Alphabet>(graph: &Graph<A>, id: NodeId, seen: &mut HashSet<NodeId>) -> bool {
        if !seen.insert(id) {
            return false;
        }
        let node = graph.get(id);
        if node.mutates_group() {
            return true;
        }
        match node {
            Node::Split { alternatives } => alternatives.iter().any(|&a| walk(graph, a, seen)),
            Node::Repeat { exit, body, .. } => walk(graph, *exit, seen) || walk(graph, *body, seen),
            Node::Lookahead { continuation, sub_expr, .. } => {
                walk(graph, *continuation, seen) || walk(graph, *sub_expr, seen)
            }
            Node::Conditional { matched, unmatched, .. } => {
                walk(graph, *matched, seen) || walk(graph, *unmatched, seen)
            }
            _ => match node.next() {
                Some(next) => walk(graph, next, seen),
                None => false,
            },
        }
    }
    walk(graph, root, &mut HashSet::new())
}

/// Run a nested match rooted at `root` (not the graph's overall entry)
/// starting from `offset`, reusing `groups` so reads of already-closed
/// groups see the enclosing run's captures. This is what a
/// `Lookahead`'s `sub_expr` runs through, and it is also the engine a
/// `GroupReference`'s runtime-synthesised literal check would recurse
/// into in the parallel/complex engines (spec.md `## 4.3`, `## 4.4`).
///
/// Always walks forward from `offset`, returning the groups reached on
/// a successful `Match` along with the offset it landed on. A forward
/// lookahead only cares about the former; `match_behind` below uses the
/// latter to frame a backward lookahead in terms of this same forward
/// walk.
pub(crate) fn match_subgraph<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    root: NodeId,
    offset: usize,
    groups: Groups,
) -> Result<Option<(Groups, usize)>, Error> {
    let mut state = State {
        offset,
        groups,
        loops: Rc::new(HashMap::new()),
        checkpoints: Rc::new(HashSet::new()),
    };
    let mut stack = Stack::new();
    let mut node = root;
    loop {
        match visit(graph, alphabet, input, node, &mut state, &mut stack)? {
            Visit::Continue(next) => node = next,
            Visit::Match => return Ok(Some((state.groups, state.offset))),
            Visit::Fail => match stack.pop() {
                Some((n, s)) => {
                    node = n;
                    state = s;
                }
                None => return Ok(None),
            },
        }
    }
}

/// A backward lookahead (`(?<=...)`, `(?<!...)`) asks whether `root`
/// can match a prefix ending exactly at `offset`. There is no way to
/// run the graph in reverse, so every candidate start position at or
/// before `offset` is tried forward via `match_subgraph` and kept only
/// if it lands exactly on `offset`; candidates are tried closest-first
/// so a variable-width lookbehind picks its narrowest match.
pub(crate) fn match_behind<A: Alphabet>(
    graph: &Graph<A>,
    alphabet: &A,
    input: &Input<'_, A>,
    root: NodeId,
    offset: usize,
    groups: Groups,
) -> Result<Option<Groups>, Error> {
    for start in (0..=offset).rev() {
        if let Some((g, end)) = match_subgraph(graph, alphabet, input, root, start, groups.clone())? {
            if end == offset {
                return Ok(Some(g));
            }
        }
    }
    Ok(None)
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
    fn simple_literal_match() {
        let a = Ascii;
        let nodes = vec![Node::Match, lit("abc", 0)];
        let g = Graph::new(nodes, 1);
        let chars = crate::input::chars_of("abc");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run_anchored(&g, &a, &input, 0, 0).unwrap();
        assert!(out.groups.is_some());
    }

    #[test]
    fn split_prefers_first_alternative() {
        let a = Ascii;
        let nodes = vec![
            Node::Match,
            char_node(&a, 'a', 0),
            char_node(&a, 'b', 0),
            Node::Split { alternatives: vec![1, 2] },
        ];
        let g = Graph::new(nodes, 3);
        let chars = crate::input::chars_of("a");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run_anchored(&g, &a, &input, 0, 0).unwrap();
        assert!(out.groups.is_some());
    }

    #[test]
    fn unbounded_star_has_constant_stack_depth() {
        let a = Ascii;
        // (.)*x : 0 Match, 1 'x'->0, 2 Repeat(body=3,exit=1), 3 Dot->2
        let nodes = vec![
            Node::Match,
            lit("x", 0),
            Node::Repeat { id: 2, begin: 0, end: None, lazy: false, exit: 1, body: 3 },
            Node::Dot { multiline: true, next: 2 },
        ];
        let g = Graph::new(nodes, 2);
        let text: String =
            std::iter::repeat('a').take(5000).chain(std::iter::once('x')).collect();
        let chars = crate::input::chars_of(&text);
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run_anchored(&g, &a, &input, 0, 0).unwrap();
        assert!(out.groups.is_some());
        assert!(out.max_stack_depth <= 2, "stack depth {} not bounded", out.max_stack_depth);
    }

    #[test]
    fn group_capture_is_recorded() {
        let a = Ascii;
        // a(.)c : 0 Match, 1 EndGroup(1)->0, 2 'c'->1, 3 Dot->2,
        // 4 StartGroup(1)->3, 5 'a'->4
        let nodes = vec![
            Node::Match,
            Node::EndGroup { index: 1, next: 0 },
            lit("c", 1),
            Node::Dot { multiline: true, next: 2 },
            Node::StartGroup { index: 1, next: 3 },
            lit("a", 4),
        ];
        let g = Graph::new(nodes, 5);
        let chars = crate::input::chars_of("abc");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let out = run_anchored(&g, &a, &input, 0, 1).unwrap();
        let groups = out.groups.unwrap();
        assert_eq!(groups.span(1), Some((1, 2)));
    }
}
