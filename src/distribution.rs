//! Two-level selection distributions: which specie reproduces, and which
//! genomes within a specie serve as parents.
//!
//! Construction is pure: the same species statistics always produce the same
//! distributions. Sampling consumes the caller's random source sequentially,
//! so a run stays reproducible as long as draws happen in one well-defined
//! order per generation.

use crate::{specie::Specie, Error};
use log::warn;
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    Rng, RngCore,
};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A discrete distribution over candidate indices, weighted proportionally.
///
/// An all-zero weight vector falls back to uniform over the candidates
/// rather than inheriting the sampling primitive's refusal: a specie whose
/// every eligible parent scored zero still owes offspring, and starving it
/// silently is worse than picking parents blindly.
#[derive(Debug, Clone)]
pub enum SelectionDistribution {
    Weighted(WeightedIndex<f64>),
    Uniform(usize),
}

impl SelectionDistribution {
    pub fn new(weights: &[f64]) -> Result<Self, Error> {
        if weights.is_empty() {
            return Err(Error::EmptyDistribution);
        }

        if weights.iter().any(|w| *w > 0.) {
            Ok(Self::Weighted(WeightedIndex::new(
                weights.iter().copied(),
            )?))
        } else {
            warn!(
                "all-zero selection weights; sampling uniformly over {} candidates",
                weights.len()
            );
            Ok(Self::Uniform(weights.len()))
        }
    }

    /// Draw one candidate index, probability proportional to its weight.
    pub fn sample(&self, rng: &mut impl RngCore) -> usize {
        match self {
            Self::Weighted(dist) => dist.sample(rng),
            Self::Uniform(len) => rng.random_range(0..*len),
        }
    }
}

/// Everything `invoke` needs to sample parents for one generation.
#[derive(Debug, Clone)]
pub struct SelectionDistributions {
    /// Specie selection, weighted by each specie's selection size. A specie
    /// with selection size zero can never be drawn from this.
    pub species: SelectionDistribution,
    /// Per-specie parent selection over the top `selection_size` members,
    /// weighted by fitness. `None` where nothing is selectable.
    pub genomes: Vec<Option<SelectionDistribution>>,
    /// How many species have a nonzero selection size. Zero here with a
    /// nonzero quota outstanding is a degenerate generation.
    pub non_empty_count: usize,
}

/// Build the specie- and genome-level distributions for one generation.
/// Members of every specie must already be ranked by descending fitness.
pub fn selection_distributions(species: &[Specie]) -> Result<SelectionDistributions, Error> {
    let weights = species
        .iter()
        .map(|s| s.stats.selection_size as f64)
        .collect::<Vec<_>>();
    let non_empty_count = weights.iter().filter(|w| **w > 0.).count();

    // independent per specie; nothing shared but the borrow
    #[cfg(feature = "parallel")]
    let genomes = species
        .par_iter()
        .map(genome_distribution)
        .collect::<Result<Vec<_>, _>>()?;
    #[cfg(not(feature = "parallel"))]
    let genomes = species
        .iter()
        .map(genome_distribution)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SelectionDistributions {
        species: SelectionDistribution::new(&weights)?,
        genomes,
        non_empty_count,
    })
}

fn genome_distribution(specie: &Specie) -> Result<Option<SelectionDistribution>, Error> {
    let eligible = specie.stats.selection_size;
    if eligible == 0 {
        return Ok(None);
    }
    debug_assert!(eligible <= specie.len());

    let weights = specie.members[..eligible]
        .iter()
        .map(|g| g.fitness)
        .collect::<Vec<_>>();
    SelectionDistribution::new(&weights).map(Some)
}
