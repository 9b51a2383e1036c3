// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Program` is the compiled, immutable form of a pattern: an operation
//! graph plus the group registry needed to interpret its captures. It
//! replaces the old flat instruction vector (`inst.rs`) -- the engines
//! now walk a graph of `Node`s directly instead of a linear bytecode.

use crate::alphabet::Alphabet;
use crate::graph::{Graph, Node};
use crate::group::GroupState;

/// The matching engines offered by this regex implementation (spec.md
/// `## 4`).
///
/// N.B. This is exported for use in testing.
#[doc(hidden)]
#[derive(Clone, Debug)]
pub enum MatchEngine {
    /// Explicit stack, run-length compressed for benign repeats.
    /// Exponential worst case; used when the program and the search
    /// text are both small enough that the worst case is unreachable.
    Backtrack,
    /// Parallel NFA simulation. Always linear in `pattern * text`, at
    /// the cost of not supporting backreferences without falling back.
    Nfa { schedule: NfaSchedule, dedupe: bool },
    /// On-the-fly DFA: states built and deduplicated as input is
    /// consumed, with a skip fast-forward for literal runs.
    Complex,
}

/// Mirrors `nfa::Schedule` without requiring callers outside the crate
/// to depend on the engine module directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NfaSchedule {
    Wide,
    Serial,
    Beam { initial_bound: usize },
}

impl From<NfaSchedule> for crate::nfa::Schedule {
    fn from(s: NfaSchedule) -> crate::nfa::Schedule {
        match s {
            NfaSchedule::Wide => crate::nfa::Schedule::Wide,
            NfaSchedule::Serial => crate::nfa::Schedule::Serial,
            NfaSchedule::Beam { initial_bound } => crate::nfa::Schedule::Beam { initial_bound },
        }
    }
}

/// A compiled pattern: an operation graph, its group registry, and the
/// alphabet it was compiled against. Once built, a `Program` never
/// changes; the engines that walk it carry all of their mutable state
/// on the side (stacks, thread sets, DFA state tables).
#[derive(Clone, Debug)]
pub struct Program<A: Alphabet> {
    /// The original pattern text, kept for error messages and replay.
    pub original: String,
    /// The alphabet this graph was compiled against.
    pub alphabet: A,
    /// The operation graph.
    pub graph: Graph<A>,
    /// The group name/index registry.
    pub state: GroupState,
    /// A preference for matching engine selection. `None` means pick
    /// automatically based on graph size and the presence of features
    /// (backreferences, lookbehind) only some engines support.
    pub engine: Option<MatchEngine>,
    /// True iff the graph is anchored at the start of the text, i.e.
    /// its entry reaches a `StartOfLine { multiline: false, .. }` before
    /// any consuming node. Used to skip the search engines' per-offset
    /// retry loop.
    pub anchored_start: bool,
}

impl<A: Alphabet + Clone> Program<A> {
    pub fn new(
        original: String,
        alphabet: A,
        graph: Graph<A>,
        state: GroupState,
        engine: Option<MatchEngine>,
    ) -> Self {
        let anchored_start = starts_anchored(&graph, graph.entry());
        Program { original, alphabet, graph, state, engine, anchored_start }
    }

    /// Number of numbered groups, excluding the implicit group 0 --
    /// exactly what `Groups::new` expects as its `count` argument.
    pub fn num_captures(&self) -> usize {
        self.state.count()
    }

    /// True iff the graph contains a `GroupReference` node, i.e. the
    /// pattern contains a backreference. The parallel engine's hashing
    /// dedup mode cannot soundly run on these (spec.md `## 4.4`): a
    /// `PendingLiteral` in flight makes two threads with equal
    /// `(node, groups, loops)` behave differently depending on how much
    /// of the pending literal each has already consumed.
    pub fn has_backreference(&self) -> bool {
        self.graph.nodes().iter().any(|n| matches!(n, Node::GroupReference { .. }))
    }
}

/// Walks fan-out-1 nodes from `id` until a consuming node, a branch, or
/// a non-multiline `StartOfLine` is found. Used only as a heuristic for
/// `anchored_start`; a `false` negative just means an engine does one
/// extra (ultimately failing) retry per offset, not a correctness bug.
fn starts_anchored<A: Alphabet>(graph: &Graph<A>, id: crate::graph::NodeId) -> bool {
    let mut seen = Vec::new();
    let mut cur = id;
    loop {
        if seen.contains(&cur) {
            return false;
        }
        seen.push(cur);
        match graph.get(cur) {
            Node::StartOfLine { multiline: false, .. } => return true,
            Node::Checkpoint { next, .. }
            | Node::StartGroup { next, .. }
            | Node::EndGroup { next, .. } => cur = *next,
            _ => return false,
        }
    }
}
