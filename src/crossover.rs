//! Structural alignment of two connection-gene sequences.
//!
//! Both inputs are assumed sorted ascending by innovation id, so every walk
//! here is a two-pointer merge: matching ids are the same historical mutation,
//! everything else is disjoint (inside the other parent's id range) or excess
//! (beyond it).

use crate::{
    gene::{ConnectionGene, Gene, GeneList},
    random::{EvolutionEvent, Happens},
};
use core::cmp::{max, Ordering};
use rand::RngCore;

pub const EXCESS_COEFFICIENT: f64 = 1.0;
pub const DISJOINT_COEFFICIENT: f64 = 1.0;
pub const PARAM_COEFFICIENT: f64 = 0.4;

/// Genome size below which delta is not normalized by length.
const NORMALIZATION_THRESHOLD: usize = 20;

/// Count of (disjoint, excess) genes across both parents.
pub fn disjoint_excess_count(l: &[ConnectionGene], r: &[ConnectionGene]) -> (usize, usize) {
    if l.is_empty() || r.is_empty() {
        return (0, max(l.len(), r.len()));
    }

    let mut disjoint = 0;
    let (mut i, mut j) = (0, 0);
    while i < l.len() && j < r.len() {
        match l[i].inno().cmp(&r[j].inno()) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                disjoint += 1;
                i += 1;
            }
            Ordering::Greater => {
                disjoint += 1;
                j += 1;
            }
        }
    }

    (disjoint, (l.len() - i) + (r.len() - j))
}

/// Mean absolute weight difference across genes both parents carry.
/// Zero when nothing overlaps.
pub fn avg_param_diff(l: &[ConnectionGene], r: &[ConnectionGene]) -> f64 {
    let mut count = 0.;
    let mut diff = 0.;
    let (mut i, mut j) = (0, 0);
    while i < l.len() && j < r.len() {
        match l[i].inno().cmp(&r[j].inno()) {
            Ordering::Equal => {
                count += 1.;
                diff += (l[i].weight - r[j].weight).abs();
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }

    if count == 0. {
        0.
    } else {
        diff / count
    }
}

/// NEAT compatibility distance between two genomes' connection lists.
pub fn delta(l: &[ConnectionGene], r: &[ConnectionGene]) -> f64 {
    let (disjoint, excess) = disjoint_excess_count(l, r);
    let longest = max(l.len(), r.len());
    let n = if longest < NORMALIZATION_THRESHOLD {
        1.
    } else {
        longest as f64
    };

    (EXCESS_COEFFICIENT * excess as f64 + DISJOINT_COEFFICIENT * disjoint as f64) / n
        + PARAM_COEFFICIENT * avg_param_diff(l, r)
}

/// Recombine two parents' connection genes, `l_fit` describing how the left
/// parent's fitness compares to the right's.
///
/// Matching genes come from either parent ([`EvolutionEvent::PickLesser`]
/// picks the weaker one), and a gene disabled in either parent stays disabled
/// with [`EvolutionEvent::KeepDisabled`] probability. Disjoint and excess
/// genes come from the fitter parent alone; when fitness ties, each side's
/// unmatched genes are taken on a coin flip. The merge walk emits ids in
/// ascending order, so the child list is sorted by construction.
pub fn crossover(
    l: &[ConnectionGene],
    r: &[ConnectionGene],
    l_fit: Ordering,
    rng: &mut (impl RngCore + Happens),
) -> GeneList<ConnectionGene> {
    let mut child = GeneList::with_capacity(max(l.len(), r.len()));
    let (mut i, mut j) = (0, 0);
    while i < l.len() && j < r.len() {
        match l[i].inno().cmp(&r[j].inno()) {
            Ordering::Equal => {
                let pick_l = match l_fit {
                    Ordering::Greater => !rng.happens(EvolutionEvent::PickLesser),
                    Ordering::Less => rng.happens(EvolutionEvent::PickLesser),
                    Ordering::Equal => rng.next_u64() & 1 == 0,
                };
                let mut gene = if pick_l { l[i].clone() } else { r[j].clone() };
                gene.enabled = (l[i].enabled && r[j].enabled)
                    || !rng.happens(EvolutionEvent::KeepDisabled);
                child.push(gene);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                if take_unmatched(l_fit, true, rng) {
                    child.push(l[i].clone());
                }
                i += 1;
            }
            Ordering::Greater => {
                if take_unmatched(l_fit, false, rng) {
                    child.push(r[j].clone());
                }
                j += 1;
            }
        }
    }

    for gene in &l[i..] {
        if take_unmatched(l_fit, true, rng) {
            child.push(gene.clone());
        }
    }
    for gene in &r[j..] {
        if take_unmatched(l_fit, false, rng) {
            child.push(gene.clone());
        }
    }

    child
}

fn take_unmatched(l_fit: Ordering, from_l: bool, rng: &mut impl RngCore) -> bool {
    match l_fit {
        Ordering::Greater => from_l,
        Ordering::Less => !from_l,
        Ordering::Equal => rng.next_u64() & 1 == 0,
    }
}
