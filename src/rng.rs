//! A process-wide random stream, kept only for call sites that want the
//! original C source's default-stream behaviour (spec §9, "process-wide
//! randomness"). Prefer injecting a `rand::Rng` directly; use
//! [`with_global_rng`] only at the edges, e.g. a CLI or FFI entry point
//! that has no natural place to carry a generator.

use std::cell::RefCell;

use rand_pcg::Pcg64Mcg;

thread_local! {
    static GLOBAL_RNG: RefCell<Pcg64Mcg> = RefCell::new(Pcg64Mcg::new(0xcafe_f00d_dead_beef));
}

/// Re-seeds the thread-local generator deterministically, for tests that
/// need reproducible trimming/sampling without threading an `&mut Rng`.
pub fn seed_global_rng(seed: u64) {
    GLOBAL_RNG.with(|rng| *rng.borrow_mut() = Pcg64Mcg::new(seed as u128));
}

/// Runs `f` with mutable access to the thread-local generator.
pub fn with_global_rng<R>(f: impl FnOnce(&mut Pcg64Mcg) -> R) -> R {
    GLOBAL_RNG.with(|rng| f(&mut rng.borrow_mut()))
}
