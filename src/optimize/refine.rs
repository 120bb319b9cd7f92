//! Keep candidate costs non-increasing in bin count.
//!
//! A narrow beam can prune every good `b + 1` partition while keeping a good
//! `b` one, so the raw candidates may cost more with more bins. Splitting one
//! bin of candidate `b` never raises its cost, which gives an upper bound for
//! candidate `b + 1`.

use tracing::debug;

use super::binning::{Bin, Binning};
use super::cost::SegmentCosts;

/// Replace each candidate that costs more than its predecessor by the
/// predecessor's best single split.
///
/// Candidates must be ascending by bin count. Only consecutive counts are
/// compared.
pub(crate) fn enforce_monotone(candidates: &mut [Binning], weights: &[f64], costs: &SegmentCosts) {
    for i in 1..candidates.len() {
        let (done, rest) = candidates.split_at_mut(i);
        let prev = &done[i - 1];
        let next = &mut rest[0];
        if next.num_bins() != prev.num_bins() + 1 || next.cost() <= prev.cost() {
            continue;
        }
        let Some(split) = best_split(prev, weights, costs) else {
            continue;
        };
        if split.cost() < next.cost() {
            debug!(
                bins = next.num_bins(),
                beam_cost = next.cost(),
                split_cost = split.cost(),
                "pruned candidate replaced by a split of the smaller one"
            );
            *next = split;
        }
    }
}

/// `binning` with one bin cut in two where the cost drops most.
///
/// Cuts between equal weights are never considered. Returns `None` when every
/// bin is a single run.
pub(crate) fn best_split(binning: &Binning, weights: &[f64], costs: &SegmentCosts) -> Option<Binning> {
    // (cost change, bin index, first sample of the right half)
    let mut best: Option<(f64, usize, usize)> = None;
    for (idx, bin) in binning.bins().iter().enumerate() {
        let whole = costs.cost(bin.start, bin.end);
        for cut in bin.start + 1..=bin.end {
            if weights[cut] == weights[cut - 1] {
                continue;
            }
            let delta = costs.cost(bin.start, cut - 1) + costs.cost(cut, bin.end) - whole;
            if best.map_or(true, |(d, _, _)| delta < d) {
                best = Some((delta, idx, cut));
            }
        }
    }

    let (delta, idx, cut) = best?;
    let bin = binning.bins()[idx];
    let mut bins = Vec::with_capacity(binning.num_bins() + 1);
    bins.extend_from_slice(&binning.bins()[..idx]);
    bins.push(Bin {
        start: bin.start,
        end: cut - 1,
        weight: costs.mean(bin.start, cut - 1),
    });
    bins.push(Bin {
        start: cut,
        end: bin.end,
        weight: costs.mean(cut, bin.end),
    });
    bins.extend_from_slice(&binning.bins()[idx + 1..]);

    // a split never adds cost; clamp rounding noise
    Some(Binning::new(binning.cost() + delta.min(0.0), bins))
}
