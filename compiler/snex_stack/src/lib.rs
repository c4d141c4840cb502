//! Stack growth guard for the recursive compiler passes.
//!
//! The parser, the analyzer and the IR optimizer all recurse over the
//! syntax tree. Scripts are user-authored and can nest expressions far
//! deeper than the background compile thread's stack allows, so every
//! recursive entry point is wrapped in [`ensure_sufficient_stack`].
//!
//! Compiled code never runs through this guard: the execution path has
//! its own call-depth limit and reports overflow as a runtime fault.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if less than [`RED_ZONE`] remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack; call through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nesting_depth(n: u32) -> u32 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { nesting_depth(n - 1) + 1 })
    }

    #[test]
    fn test_shallow_nesting() {
        assert_eq!(nesting_depth(16), 16);
    }

    #[test]
    fn test_deep_nesting_grows_stack() {
        assert_eq!(nesting_depth(200_000), 200_000);
    }

    #[test]
    fn test_propagates_results() {
        let result: Result<u8, &str> = ensure_sufficient_stack(|| Err("bad"));
        assert_eq!(result, Err("bad"));
    }
}
