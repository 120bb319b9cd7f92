//! Beam-limited dynamic program over `(index, bin count)`.
//!
//! # State
//!
//! A [`Hypothesis`] at `(i, b)` describes one way of covering samples `[0, i]`
//! with `b` bins, the last of which is still open:
//!
//! - `path_cost`: exact cost of the closed bins
//! - `pending_cost`: running estimate for the open bin `[start, i]`
//! - `start`: first sample of the open bin
//! - `backpointer`: the hypothesis at `start - 1` that the open bin follows
//!
//! # Transitions
//!
//! From every hypothesis at `(i-1, b)`:
//!
//! - If `w[i] == w[i-1]` the hypothesis is carried forward unchanged. Equal
//!   neighbours never start a new bin and never raise a hypothesis' score.
//! - Otherwise two successors are generated: close the open bin and start a
//!   new one at `i` (into `b+1`, bounded by `max_bins`), or extend the open bin
//!   through `i` (stays at `b`).
//!
//! After the last index every surviving open bin is closed, so final path
//! costs are exact partition costs.
//!
//! # Pruning
//!
//! Hypotheses with the same `(b, start)` share all futures, so only the best
//! of them is kept (recombination). The survivors are stably sorted by
//! `path_cost + pending_cost` and truncated to the beam width.

use tracing::debug;

use super::cost::SegmentCosts;
use crate::utils::Parallelism;

// =============================================================================
// Hypothesis
// =============================================================================

/// Position of a hypothesis inside the lattice layer it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backpointer {
    /// Bin-count slot (`num_bins - 1`).
    pub slot: usize,
    /// Rank inside the pruned, sorted beam.
    pub rank: usize,
}

/// One partial partition of the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    pub path_cost: f64,
    pub pending_cost: f64,
    pub start: usize,
    pub backpointer: Option<Backpointer>,
}

impl Hypothesis {
    fn initial() -> Self {
        Self {
            path_cost: 0.0,
            pending_cost: 0.0,
            start: 0,
            backpointer: None,
        }
    }

    /// Ranking key used by the beam.
    #[inline]
    pub fn score(&self) -> f64 {
        self.path_cost + self.pending_cost
    }
}

// =============================================================================
// SearchLattice
// =============================================================================

/// All pruned beams produced by one search, indexed `[index][slot][rank]`.
///
/// Slot `s` holds hypotheses with `s + 1` bins. The last layer is finalized:
/// every hypothesis there has `pending_cost == 0` and an exact `path_cost`.
#[derive(Debug, Clone, Default)]
pub struct SearchLattice {
    layers: Vec<Vec<Vec<Hypothesis>>>,
}

impl SearchLattice {
    /// Number of sample positions searched.
    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Beam at sample `index` for `num_bins` bins (empty if unreachable).
    pub fn beam(&self, index: usize, num_bins: usize) -> &[Hypothesis] {
        num_bins
            .checked_sub(1)
            .and_then(|slot| self.layers.get(index)?.get(slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Finalized beam for `num_bins` bins.
    pub fn final_beam(&self, num_bins: usize) -> &[Hypothesis] {
        match self.len() {
            0 => &[],
            n => self.beam(n - 1, num_bins),
        }
    }

    /// Bin counts with at least one complete hypothesis, ascending.
    pub fn achievable_bin_counts(&self) -> Vec<usize> {
        self.layers
            .last()
            .map(|layer| {
                layer
                    .iter()
                    .enumerate()
                    .filter(|(_, beam)| !beam.is_empty())
                    .map(|(slot, _)| slot + 1)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(super) fn hypothesis(&self, index: usize, bp: Backpointer) -> &Hypothesis {
        &self.layers[index][bp.slot][bp.rank]
    }
}

// =============================================================================
// Search
// =============================================================================

/// Run the beam search over `weights`.
pub(crate) fn search(
    weights: &[f64],
    costs: &SegmentCosts,
    max_bins: usize,
    beam_width: usize,
    parallelism: Parallelism,
) -> SearchLattice {
    debug_assert!(max_bins >= 1 && beam_width >= 1);
    let n = weights.len();
    if n == 0 {
        return SearchLattice::default();
    }

    let mut layers: Vec<Vec<Vec<Hypothesis>>> = Vec::with_capacity(n);
    layers.push(vec![vec![Hypothesis::initial()]]);

    for i in 1..n {
        let prev = &layers[i - 1];
        let mut next: Vec<Vec<Hypothesis>> = vec![Vec::new(); (prev.len() + 1).min(max_bins)];
        let equal = weights[i] == weights[i - 1];

        for (slot, beam) in prev.iter().enumerate() {
            for (rank, h) in beam.iter().enumerate() {
                if equal {
                    next[slot].push(*h);
                    continue;
                }

                if slot + 1 < max_bins {
                    next[slot + 1].push(Hypothesis {
                        path_cost: h.path_cost + costs.cost(h.start, i - 1),
                        pending_cost: 0.0,
                        start: i,
                        backpointer: Some(Backpointer { slot, rank }),
                    });
                }

                next[slot].push(Hypothesis {
                    path_cost: h.path_cost,
                    pending_cost: costs.cost(h.start, i),
                    start: h.start,
                    backpointer: h.backpointer,
                });
            }
        }

        while next.last().is_some_and(Vec::is_empty) {
            next.pop();
        }

        parallelism.maybe_par_for_each(&mut next, |beam| prune(beam, beam_width));

        if tracing::enabled!(tracing::Level::DEBUG) {
            for (slot, beam) in next.iter().enumerate() {
                debug!(
                    index = i,
                    bins = slot + 1,
                    kept = beam.len(),
                    beam_width,
                    "hypotheses after pruning"
                );
            }
        }

        layers.push(next);
    }

    if let Some(last) = layers.last_mut() {
        for beam in last.iter_mut() {
            for h in beam.iter_mut() {
                h.path_cost += costs.cost(h.start, n - 1);
                h.pending_cost = 0.0;
            }
            beam.sort_by(|a, b| a.path_cost.total_cmp(&b.path_cost));
        }
    }

    SearchLattice { layers }
}

/// Recombine hypotheses sharing an open-bin start, then keep the best `k`.
///
/// Sorting is stable, so equal scores keep generation order and the result is
/// independent of the thread schedule.
fn prune(beam: &mut Vec<Hypothesis>, k: usize) {
    beam.sort_by(|a, b| a.score().total_cmp(&b.score()));

    let mut kept: Vec<Hypothesis> = Vec::with_capacity(k.min(beam.len()));
    for h in beam.iter() {
        if kept.len() == k {
            break;
        }
        if kept.iter().all(|other| other.start != h.start) {
            kept.push(*h);
        }
    }
    *beam = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(weights: &[f64], max_bins: usize, k: usize) -> SearchLattice {
        let costs = SegmentCosts::new(weights);
        search(weights, &costs, max_bins, k, Parallelism::Sequential)
    }

    #[test]
    fn empty_input_yields_empty_lattice() {
        let lattice = run(&[], 3, 2);
        assert!(lattice.is_empty());
        assert!(lattice.achievable_bin_counts().is_empty());
        assert!(lattice.final_beam(1).is_empty());
    }

    #[test]
    fn single_sample_is_one_bin() {
        let lattice = run(&[0.7], 3, 2);
        assert_eq!(lattice.achievable_bin_counts(), vec![1]);
        assert_eq!(lattice.final_beam(1)[0].path_cost, 0.0);
    }

    #[test]
    fn equal_neighbours_carry_hypotheses_forward() {
        let weights = [0.1, 0.1, 0.5, 0.5, 0.5, 0.9];
        let lattice = run(&weights, 3, 4);
        for i in 1..weights.len() - 1 {
            if weights[i] == weights[i - 1] {
                for b in 1..=3 {
                    assert_eq!(lattice.beam(i, b), lattice.beam(i - 1, b), "index {i}, {b} bins");
                }
            }
        }
    }

    #[test]
    fn beam_width_bounds_every_state() {
        let weights: Vec<f64> = (0..40).map(|i| ((i * 7919) % 23) as f64).collect();
        let lattice = run(&weights, 5, 3);
        for i in 0..lattice.len() {
            for b in 1..=5 {
                assert!(lattice.beam(i, b).len() <= 3);
            }
        }
    }

    #[test]
    fn recombination_keeps_one_hypothesis_per_start() {
        let weights = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let lattice = run(&weights, 4, 100);
        for i in 0..lattice.len() {
            for b in 1..=4 {
                let beam = lattice.beam(i, b);
                for (j, h) in beam.iter().enumerate() {
                    assert!(beam[..j].iter().all(|o| o.start != h.start));
                }
            }
        }
    }

    #[test]
    fn final_layer_is_sorted_and_closed() {
        let weights = [0.3, 0.1, 0.4, 0.1, 0.5, 0.9, 0.2, 0.6];
        let lattice = run(&weights, 4, 5);
        for b in lattice.achievable_bin_counts() {
            let beam = lattice.final_beam(b);
            assert!(beam.iter().all(|h| h.pending_cost == 0.0));
            assert!(beam.windows(2).all(|w| w[0].path_cost <= w[1].path_cost));
        }
    }

    #[test]
    fn parallel_pruning_matches_sequential() {
        let weights: Vec<f64> = (0..120).map(|i| ((i * 31) % 17) as f64 * 0.1).collect();
        let costs = SegmentCosts::new(&weights);
        let seq = search(&weights, &costs, 8, 4, Parallelism::Sequential);
        let par = search(&weights, &costs, 8, 4, Parallelism::Parallel);
        for b in 1..=8 {
            assert_eq!(seq.final_beam(b), par.final_beam(b));
        }
    }
}
