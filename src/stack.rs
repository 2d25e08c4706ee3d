// File: src/stack.rs
//
// Stack growth for the recursive parser and evaluator.
// Deeply nested input and deep Toy recursion both recurse on the host
// stack; segments are added on demand instead of overflowing it.

/// Minimum stack space to keep available before recursing further
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first moving to a fresh stack segment if less than the red
/// zone remains on the current one.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u64) -> u64 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
    }

    #[test]
    fn test_deep_recursion_does_not_overflow() {
        assert_eq!(depth(200_000), 200_000);
    }
}
