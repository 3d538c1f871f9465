//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested expressions and deep (but bounded) call chains recurse on
//! the host stack. Wrapping the recursive entry points keeps them from
//! overflowing small thread stacks, so that the evaluator's call depth
//! limit is the bound users actually hit.

/// If less than this remains, the stack is grown before recursing.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
