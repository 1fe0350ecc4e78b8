//! Continuation chain over an ordered tier list.
//!
//! [`TierChain::run`] turns a tier slice `[S1..Sn]`, a per-tier handler and a
//! terminal value into one traversal:
//!
//! ```text
//! H(S1, next1) ─ next1.run() ─→ H(S2, next2) ─ … ─→ H(Sn, nextn) ─→ bottom()
//! ```
//!
//! The handler decides whether to descend. Reads return early on a hit and
//! never call `next`; writes call it after their own tier succeeded and act on
//! the result as the chain unwinds. Both write strategies in
//! [`crate::cascade`] and the read path in [`crate::layered`] are built on it.
//!
//! Recursion depth equals the tier count, which is small in practice.

use crate::store::{BackingStore, Tier};

/// The tier a handler is currently visiting.
#[derive(Clone, Copy)]
pub struct TierRef<'c> {
    /// Position in the configured tier order (0 = fastest)
    pub index: usize,
    pub store: &'c dyn BackingStore,
}

/// Continuation into the tiers deeper than the one being visited.
///
/// Consumed by [`Next::run`], so a handler can descend at most once.
pub struct Next<'c, R> {
    frame: &'c Frame<'c, R>,
    depth: usize,
}

impl<'c, R> Next<'c, R> {
    /// Evaluate the rest of the chain.
    pub fn run(self) -> R {
        self.frame.enter(self.depth)
    }

    /// Number of tiers left below the current one.
    pub fn remaining(&self) -> usize {
        self.frame.tiers.len().saturating_sub(self.depth)
    }
}

struct Frame<'c, R> {
    tiers: &'c [Tier],
    handler: &'c dyn Fn(TierRef<'c>, Next<'c, R>) -> R,
    bottom: &'c dyn Fn() -> R,
}

impl<'c, R> Frame<'c, R> {
    fn enter(&'c self, depth: usize) -> R {
        match self.tiers.get(depth) {
            Some(store) => {
                let tier = TierRef {
                    index: depth,
                    store: store.as_ref(),
                };
                let next = Next {
                    frame: self,
                    depth: depth + 1,
                };
                (self.handler)(tier, next)
            }
            None => (self.bottom)(),
        }
    }
}

/// Ordered view over the configured tiers.
#[derive(Clone, Copy)]
pub struct TierChain<'t> {
    tiers: &'t [Tier],
}

impl<'t> TierChain<'t> {
    pub fn new(tiers: &'t [Tier]) -> Self {
        Self { tiers }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Run `handler` over the tiers front to back, ending at `bottom`.
    ///
    /// `handler` receives the tier being visited and the continuation into the
    /// deeper tiers. `bottom` is evaluated only when the last tier descends,
    /// or immediately for an empty chain.
    pub fn run<R, H, B>(&self, handler: H, bottom: B) -> R
    where
        H: Fn(TierRef<'_>, Next<'_, R>) -> R,
        B: Fn() -> R,
    {
        let frame = Frame {
            tiers: self.tiers,
            handler: &handler,
            bottom: &bottom,
        };
        frame.enter(0)
    }
}
