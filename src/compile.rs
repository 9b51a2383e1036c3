// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lowers an `ast::Ast` into a `Graph` (SPEC_FULL.md `## B`).
//!
//! Two passes: `number_groups` walks the tree left to right assigning
//! capture indices (the order a reader sees opening parens in), then
//! `Compiler::compile` walks it again, continuation-passing style, to
//! build the graph bottom-up -- each node is constructed already
//! knowing its `next`, since `Node` stores that as a plain field rather
//! than a patched-in-later jump target. A `Concat`'s parts are visited
//! back to front for exactly this reason, which is what forces the
//! indices to be assigned in a separate, order-correct pass first.

use crate::alphabet::{Alphabet, CharClass};
use crate::ast::{Ast, ClassKind, GroupRef};
use crate::error::Error;
use crate::graph::{CharacterTest, Graph, Node, NodeId};
use crate::group::GroupState;
use crate::interval::IntervalSet;

/// Flags folded in at compile time rather than carried by every engine
/// at match time (spec.md `## 9`): case folding, dot-matches-newline and
/// multiline anchors are all baked into the graph's nodes once, here.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompileOptions {
    pub extended_group_names: bool,
    pub multiline: bool,
    pub dotall: bool,
    pub ignore_case: bool,
    /// `Flags::EMPTY`: an unbounded repeat whose body may match the
    /// empty string is allowed, guarded by a `Checkpoint` so it still
    /// terminates.
    pub allow_empty: bool,
    /// `Flags::UNSAFE`: same, but without the `Checkpoint` -- matching
    /// such a pattern against an input that hits the empty body may
    /// loop forever, which is then the caller's doing.
    pub unsafe_repeat: bool,
}

pub fn compile<A: Alphabet<Char = char> + Clone>(
    alphabet: &A,
    pattern: &str,
    options: CompileOptions,
) -> Result<(Graph<A>, GroupState), Error> {
    let mut ast = crate::parse::parse(pattern)?;
    let mut state = GroupState::new();
    number_groups(&mut ast, &mut state, options.extended_group_names)?;
    let mut c = Compiler { alphabet, nodes: Vec::new(), state: &state, options };
    let done = c.push(Node::Match);
    let entry = c.compile(&ast, done)?;
    Ok((Graph::new(c.nodes, entry), state))
}

fn number_groups(ast: &mut Ast, state: &mut GroupState, extended: bool) -> Result<(), Error> {
    match ast {
        Ast::Group { capturing, name, index, sub } => {
            if *capturing {
                *index = state.new_index(name.as_deref(), extended)?;
            }
            number_groups(sub, state, extended)
        }
        Ast::Concat(parts) | Ast::Alternate(parts) => {
            for p in parts {
                number_groups(p, state, extended)?;
            }
            Ok(())
        }
        Ast::Repeat { sub, .. } => number_groups(sub, state, extended),
        Ast::Lookahead { sub, .. } => number_groups(sub, state, extended),
        Ast::Conditional { yes, no, .. } => {
            number_groups(yes, state, extended)?;
            number_groups(no, state, extended)
        }
        Ast::Empty
        | Ast::Literal(_)
        | Ast::Dot
        | Ast::Class { .. }
        | Ast::ClassShorthand { .. }
        | Ast::StartOfLine
        | Ast::EndOfLine
        | Ast::WordBoundary { .. }
        | Ast::Backreference(_) => Ok(()),
    }
}

struct Compiler<'a, A: Alphabet> {
    alphabet: &'a A,
    nodes: Vec<Node<A>>,
    state: &'a GroupState,
    options: CompileOptions,
}

impl<'a, A: Alphabet<Char = char> + Clone> Compiler<'a, A> {
    fn push(&mut self, node: Node<A>) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// A single literal character, expanded to both cases under
    /// `ignore_case`. Kept separate from `String` coalescing in
    /// `compile_concat`, which only applies case folding one character
    /// at a time -- a folded range like `[a-z]` is not attempted.
    fn literal_test(&self, c: char) -> CharacterTest<A> {
        let mut set = IntervalSet::new();
        match self.alphabet.unpack(c, self.options.ignore_case) {
            crate::alphabet::Unpacked::Single(ch) => set.insert(self.alphabet, ch, ch),
            crate::alphabet::Unpacked::Pair(lo, hi) => {
                set.insert(self.alphabet, lo, lo);
                set.insert(self.alphabet, hi, hi);
            }
        }
        CharacterTest { intervals: set, classes: vec![], inverted: false, complete: false }
    }

    fn resolve(&self, r: &GroupRef) -> Result<usize, Error> {
        match r {
            GroupRef::Index(n) => Ok(*n),
            GroupRef::Name(n) => self
                .state
                .index_of(n)
                .ok_or_else(|| Error::MissingBackreference { reference: n.clone() }),
        }
    }

    fn compile(&mut self, ast: &Ast, next: NodeId) -> Result<NodeId, Error> {
        match ast {
            Ast::Empty => Ok(next),
            Ast::Literal(c) => {
                if self.options.ignore_case {
                    let test = self.literal_test(*c);
                    Ok(self.push(Node::Character { test, next }))
                } else {
                    Ok(self.push(Node::String { text: vec![*c], next }))
                }
            }
            Ast::Dot => Ok(self.push(Node::Dot { multiline: self.options.dotall, next })),
            Ast::StartOfLine => {
                Ok(self.push(Node::StartOfLine { multiline: self.options.multiline, next }))
            }
            Ast::EndOfLine => {
                Ok(self.push(Node::EndOfLine { multiline: self.options.multiline, next }))
            }
            Ast::WordBoundary { negated } => {
                Ok(self.push(Node::WordBoundary { inverted: *negated, next }))
            }
            Ast::ClassShorthand { kind, negated } => {
                let class = match kind {
                    ClassKind::Digit => CharClass::Digit,
                    ClassKind::Space => CharClass::Space,
                    ClassKind::Word => CharClass::Word,
                };
                let test = CharacterTest {
                    intervals: IntervalSet::new(),
                    classes: vec![class],
                    inverted: *negated,
                    complete: false,
                };
                Ok(self.push(Node::Character { test, next }))
            }
            Ast::Class { ranges, negated } => {
                let mut set = IntervalSet::new();
                for &(a, b) in ranges {
                    set.insert(self.alphabet, a, b);
                }
                let test =
                    CharacterTest { intervals: set, classes: vec![], inverted: *negated, complete: false };
                Ok(self.push(Node::Character { test, next }))
            }
            Ast::Backreference(r) => {
                let index = self.resolve(r)?;
                Ok(self.push(Node::GroupReference { index, next }))
            }
            Ast::Concat(parts) => self.compile_concat(parts, next),
            Ast::Alternate(branches) => {
                let mut alternatives = Vec::with_capacity(branches.len());
                for b in branches {
                    alternatives.push(self.compile(b, next)?);
                }
                Ok(self.push(Node::Split { alternatives }))
            }
            Ast::Group { capturing, index, sub, .. } => {
                if !*capturing {
                    return self.compile(sub, next);
                }
                let end = self.push(Node::EndGroup { index: *index, next });
                let inner = self.compile(sub, end)?;
                Ok(self.push(Node::StartGroup { index: *index, next: inner }))
            }
            Ast::Repeat { sub, min, max, lazy } => self.compile_repeat(sub, *min, *max, *lazy, next),
            Ast::Lookahead { equal, forwards, sub } => {
                let sub_match = self.push(Node::Match);
                let sub_expr = self.compile(sub, sub_match)?;
                Ok(self.push(Node::Lookahead {
                    equal: *equal,
                    forwards: *forwards,
                    continuation: next,
                    sub_expr,
                }))
            }
            Ast::Conditional { group, yes, no } => {
                let index = self.resolve(group)?;
                let matched = self.compile(yes, next)?;
                let unmatched = self.compile(no, next)?;
                Ok(self.push(Node::Conditional { group: index, matched, unmatched }))
            }
        }
    }

    /// Compiled right to left so each atom's `next` is already known;
    /// adjacent literals are coalesced into a single `String` node,
    /// which is what lets the complex engine's skip optimisation fire
    /// on ordinary literal runs instead of one character at a time.
    fn compile_concat(&mut self, parts: &[Ast], next: NodeId) -> Result<NodeId, Error> {
        let mut cont = next;
        let mut i = parts.len();
        while i > 0 {
            if !self.options.ignore_case && matches!(parts[i - 1], Ast::Literal(_)) {
                let mut j = i;
                while j > 0 && matches!(parts[j - 1], Ast::Literal(_)) {
                    j -= 1;
                }
                let text: Vec<char> = parts[j..i]
                    .iter()
                    .map(|a| match a {
                        Ast::Literal(c) => *c,
                        _ => unreachable!(),
                    })
                    .collect();
                cont = self.push(Node::String { text, next: cont });
                i = j;
            } else {
                cont = self.compile(&parts[i - 1], cont)?;
                i -= 1;
            }
        }
        Ok(cont)
    }

    /// An unbounded repeat (`max = None`) whose body can match the empty
    /// string would otherwise spin forever re-entering at the same
    /// offset (e.g. `(a?)*`). `body_is_safe_in` checks for that once the
    /// repeat node is wired up; a body that fails the check is a compile
    /// error unless the pattern opted into `EMPTY` (wrap in a
    /// `Checkpoint` so it still terminates) or `UNSAFE` (run it
    /// unguarded, the caller's problem if it loops). Bounded repeats
    /// terminate on the iteration counter regardless, so neither check
    /// nor wrapping applies to them.
    fn compile_repeat(
        &mut self,
        sub: &Ast,
        min: u32,
        max: Option<u32>,
        lazy: bool,
        next: NodeId,
    ) -> Result<NodeId, Error> {
        let repeat_id = self.push(Node::NoMatch);
        let inner = self.compile(sub, repeat_id)?;

        let body = if max.is_none() && !self.options.unsafe_repeat {
            self.nodes[repeat_id] =
                Node::Repeat { id: repeat_id, begin: min, end: max, lazy, exit: next, body: inner };
            if crate::graph::body_is_safe_in(&self.nodes, inner) {
                inner
            } else if self.options.allow_empty {
                let checkpoint_id = self.push(Node::NoMatch);
                self.nodes[checkpoint_id] = Node::Checkpoint { id: checkpoint_id, next: inner };
                checkpoint_id
            } else {
                return Err(Error::EmptyRepeat { offset: 0 });
            }
        } else {
            inner
        };

        self.nodes[repeat_id] =
            Node::Repeat { id: repeat_id, begin: min, end: max, lazy, exit: next, body };
        Ok(repeat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Ascii;
    use crate::input::Input;

    fn run(pattern: &str, text: &str) -> Option<(usize, usize)> {
        let (graph, state) = compile(&Ascii, pattern, CompileOptions::default()).unwrap();
        let chars = crate::input::chars_of(text);
        let input: Input<Ascii> = Input::borrowed(&chars);
        let outcome =
            crate::backtrack::run_search(&graph, &Ascii, &input, 0, state.count()).unwrap();
        outcome.groups.and_then(|g| g.span(0))
    }

    #[test]
    fn literal_concat_compiles_to_one_string_node() {
        let (graph, _) = compile(&Ascii, "abc", CompileOptions::default()).unwrap();
        let strings = graph.nodes().iter().filter(|n| matches!(n, Node::String { .. })).count();
        assert_eq!(strings, 1);
    }

    #[test]
    fn group_numbering_follows_source_order() {
        let (_, state) = compile(&Ascii, "(a)(b(c))", CompileOptions::default()).unwrap();
        assert_eq!(state.index_of("1"), Some(1));
        assert_eq!(state.index_of("2"), Some(2));
        assert_eq!(state.index_of("3"), Some(3));
    }

    #[test]
    fn alternation_prefers_first_branch() {
        assert_eq!(run("a|ab", "ab"), Some((0, 1)));
    }

    #[test]
    fn counted_repeat_matches() {
        assert_eq!(run("a{2,3}", "aaaa"), Some((0, 3)));
    }

    #[test]
    fn unbounded_empty_body_repeat_rejected_by_default() {
        let err = compile(&Ascii, "(a?)*b", CompileOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyRepeat { .. }));
    }

    #[test]
    fn unbounded_empty_body_repeat_terminates_under_empty_flag() {
        let options = CompileOptions { allow_empty: true, ..CompileOptions::default() };
        let (graph, state) = compile(&Ascii, "(a?)*b", options).unwrap();
        let chars = crate::input::chars_of("b");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let outcome =
            crate::backtrack::run_search(&graph, &Ascii, &input, 0, state.count()).unwrap();
        assert_eq!(outcome.groups.and_then(|g| g.span(0)), Some((0, 1)));
    }

    #[test]
    fn backreference_matches_captured_text() {
        assert_eq!(run(r"(a+)\1", "aaaa"), Some((0, 4)));
    }

    #[test]
    fn lookahead_does_not_consume() {
        assert_eq!(run("a(?=b)", "ab"), Some((0, 1)));
        assert_eq!(run("a(?=b)", "ac"), None);
    }

    #[test]
    fn end_of_line_matches_before_trailing_newline_without_multiline() {
        let (graph, state) = compile(&Ascii, "$", CompileOptions::default()).unwrap();
        let chars = crate::input::chars_of("ab\n");
        let input: Input<Ascii> = Input::borrowed(&chars);
        let spans: Vec<_> = (0..=input.len())
            .filter_map(|start| {
                crate::backtrack::run_anchored(&graph, &Ascii, &input, start, state.count())
                    .unwrap()
                    .groups
                    .and_then(|g| g.span(0))
            })
            .collect();
        assert_eq!(spans, vec![(2, 2), (3, 3)]);
    }

    #[test]
    fn lookbehind_checks_text_before_offset() {
        assert_eq!(run("(?<=a)b", "ab"), Some((1, 2)));
        assert_eq!(run("(?<=a)b", "cb"), None);
        assert_eq!(run("(?<!a)b", "cb"), Some((1, 2)));
        assert_eq!(run("(?<!a)b", "ab"), None);
    }
}
