//! Stack growth for the recursive walks over expressions.
//!
//! Binding and evaluation recurse once per nesting level, and evaluation may
//! run on rayon workers with small stacks.

/// Red zone: grow when less than this much stack remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, first switching to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WebAssembly has no stack switching; `f` runs directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u64) -> u64 {
        if n == 0 {
            0
        } else {
            // Pads each frame so the recursion would outrun a 2 MiB thread stack.
            let pad = std::hint::black_box([0u8; 512]);
            ensure_sufficient_stack(|| 1 + depth(n - 1)) + u64::from(pad[0])
        }
    }

    #[test]
    fn test_deep_recursion_grows_the_stack() {
        assert_eq!(depth(50_000), 50_000);
    }
}
