//! Write traversals over a [`TierChain`].
//!
//! Two named strategies share the same chain:
//!
//! - [`atomic_cascade`]: front-to-back, aborts at the first tier that refuses
//!   and undoes every shallower tier that had already accepted. Deeper tiers
//!   are never attempted. Used by `put`, `forever`, `increment`, `decrement`.
//! - [`best_effort_cascade`]: every tier is attempted regardless of earlier
//!   refusals and nothing is undone. Used by `forget` and `flush`.
//!
//! Neither strategy catches faults: an `Err` from a tier ends the traversal
//! and propagates to the caller.

use strata_core::CacheResult;
use tracing::{debug, warn};

use crate::chain::TierChain;
use crate::store::BackingStore;

/// Result of an [`atomic_cascade`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// Every tier accepted the write.
    Committed,
    /// `failed_tier` refused the write. `rolled_back` lists the shallower
    /// tiers that were undone, in the order the undo ran (deepest first).
    Aborted {
        failed_tier: usize,
        rolled_back: Vec<usize>,
    },
}

impl CascadeOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CascadeOutcome::Committed)
    }
}

/// Result of a [`best_effort_cascade`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Tiers whose action reported failure, in tier order.
    pub failed_tiers: Vec<usize>,
}

impl SweepOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed_tiers.is_empty()
    }
}

/// All-or-nothing write across the chain.
///
/// For each tier: run `action`; on refusal stop here. Otherwise descend, and
/// if a deeper tier refused, run `rollback` on this tier before unwinding.
/// An empty chain commits vacuously.
pub fn atomic_cascade<A, U>(
    chain: TierChain<'_>,
    action: A,
    rollback: U,
) -> CacheResult<CascadeOutcome>
where
    A: Fn(&dyn BackingStore) -> CacheResult<bool>,
    U: Fn(&dyn BackingStore) -> CacheResult<bool>,
{
    chain.run(
        |tier, next| -> CacheResult<CascadeOutcome> {
            if !action(tier.store)? {
                debug!(tier = tier.index, "tier refused write, aborting cascade");
                return Ok(CascadeOutcome::Aborted {
                    failed_tier: tier.index,
                    rolled_back: Vec::new(),
                });
            }

            match next.run()? {
                CascadeOutcome::Committed => Ok(CascadeOutcome::Committed),
                CascadeOutcome::Aborted {
                    failed_tier,
                    mut rolled_back,
                } => {
                    if !rollback(tier.store)? {
                        warn!(tier = tier.index, failed_tier, "rollback reported failure");
                    }
                    debug!(tier = tier.index, failed_tier, "rolled back tier");
                    rolled_back.push(tier.index);
                    Ok(CascadeOutcome::Aborted {
                        failed_tier,
                        rolled_back,
                    })
                }
            }
        },
        || Ok(CascadeOutcome::Committed),
    )
}

/// Visit every tier with `action`, ignoring refusals.
pub fn best_effort_cascade<A>(chain: TierChain<'_>, action: A) -> CacheResult<SweepOutcome>
where
    A: Fn(&dyn BackingStore) -> CacheResult<bool>,
{
    chain.run(
        |tier, next| -> CacheResult<SweepOutcome> {
            let accepted = action(tier.store)?;
            if !accepted {
                warn!(tier = tier.index, "tier action failed, continuing sweep");
            }

            let mut outcome = next.run()?;
            if !accepted {
                outcome.failed_tiers.insert(0, tier.index);
            }
            Ok(outcome)
        },
        || Ok(SweepOutcome::default()),
    )
}
