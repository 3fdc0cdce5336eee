//! Native stack growth for the recursive parser and evaluator.
//!
//! Language-level recursion maps directly onto host recursion, so deeply
//! recursive programs would overflow a fixed thread stack long before they run
//! out of memory. Recursive entry points go through [`ensure_sufficient_stack`],
//! which moves execution onto a freshly allocated segment when the remaining
//! stack falls below the red zone. There is no depth limit: a divergent program
//! keeps growing until the host gives up, which is a fatal process failure and
//! never an `Error` value.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
