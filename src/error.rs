// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The error taxonomy surfaced at the crate boundary (spec.md `## 7`).
//!
//! Internal backtracking/thread failures never reach here: those are the
//! private "fail" signal caught inside each engine. Everything in this
//! enum is either a compile time problem with the pattern, or a request
//! for an engine/alphabet combination that cannot execute the pattern.

use std::fmt;

/// A pattern failed to compile, or a compiled pattern could not be run
/// with the requested engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The pattern text is malformed: unclosed group, trailing backslash,
    /// a bad repeat range, a forward backreference used without the
    /// strict-mode opt-in, and so on.
    Pattern {
        /// The original pattern text.
        pattern: String,
        /// Byte offset into `pattern` where the problem was found.
        offset: usize,
        /// Human-readable explanation.
        message: String,
    },
    /// The chosen engine or alphabet cannot execute some feature the
    /// pattern requires (e.g. a backreference under the hashing parallel
    /// engine, or `\d` over an alphabet with no digit predicate). The
    /// hybrid executor treats this as a signal to retry with the
    /// complex (on-the-fly DFA) engine from the same start position.
    UnsupportedOperation(String),
    /// A `Repeat` body can match the empty string and the pattern did not
    /// opt in to `Flags::EMPTY`/`Flags::UNSAFE`.
    EmptyRepeat {
        /// Byte offset of the offending repeat.
        offset: usize,
    },
    /// A duplicate or invalid group name under strict group naming.
    GroupNaming {
        /// The offending name.
        name: String,
        /// Human-readable explanation.
        message: String,
    },
    /// The replacement mini-language (spec.md `## 6`) referenced a group
    /// that the pattern never declared.
    MissingBackreference {
        /// The group index or name referenced.
        reference: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Pattern { ref pattern, offset, ref message } => {
                write!(f, "error parsing regex at offset {}: {} ({:?})",
                       offset, message, pattern)
            }
            Error::UnsupportedOperation(ref what) => {
                write!(f, "unsupported operation: {}", what)
            }
            Error::EmptyRepeat { offset } => {
                write!(f, "repeat body at offset {} may match the empty \
                            string; use the EMPTY or UNSAFE flag", offset)
            }
            Error::GroupNaming { ref name, ref message } => {
                write!(f, "invalid group name {:?}: {}", name, message)
            }
            Error::MissingBackreference { ref reference } => {
                write!(f, "replacement references unknown group {:?}", reference)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
