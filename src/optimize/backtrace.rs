//! Recover bins from a finished search.

use super::binning::{Bin, Binning};
use super::cost::SegmentCosts;
use super::search::SearchLattice;

/// Follow backpointers from the best final hypothesis with `num_bins` bins.
///
/// Returns `None` when no complete hypothesis with that bin count survived.
/// The walk is iterative; series of thousands of samples are common.
pub(crate) fn backtrace(
    lattice: &SearchLattice,
    costs: &SegmentCosts,
    num_bins: usize,
) -> Option<Binning> {
    let best = *lattice.final_beam(num_bins).first()?;

    let mut bins = Vec::with_capacity(num_bins);
    let mut end = lattice.len() - 1;
    let mut current = best;
    loop {
        bins.push(Bin {
            start: current.start,
            end,
            weight: costs.mean(current.start, end),
        });
        match current.backpointer {
            Some(bp) => {
                debug_assert!(current.start > 0, "backpointer from a bin starting at 0");
                end = current.start - 1;
                current = *lattice.hypothesis(end, bp);
            }
            None => {
                debug_assert_eq!(current.start, 0, "bin chain ended before sample 0");
                break;
            }
        }
    }
    bins.reverse();

    debug_assert_eq!(bins.len(), num_bins);
    Some(Binning::new(best.path_cost, bins))
}
