//! Species: clusters of structurally similar genomes sharing a reproduction
//! quota. The clustering strategy and the per-specie statistics provider are
//! both collaborator traits, with a default implementation of each.

use crate::{crossover::delta, gene::ConnectionGene, genome::Genome, Error};
use core::cmp::Ordering;

/// The representative connection set a specie is clustered around.
#[derive(Debug, Clone)]
pub struct SpecieRepr(Vec<ConnectionGene>);

impl SpecieRepr {
    pub fn new(v: Vec<ConnectionGene>) -> Self {
        Self(v)
    }

    fn delta(&self, other: &[ConnectionGene]) -> f64 {
        delta(&self.0, other)
    }
}

impl AsRef<[ConnectionGene]> for SpecieRepr {
    fn as_ref(&self) -> &[ConnectionGene] {
        &self.0
    }
}

/// Per-generation selection statistics, filled in by a [`StatsProvider`]
/// before each reproduction step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecieStats {
    /// How many of the specie's top-ranked members are eligible parents.
    /// Never exceeds the member count.
    pub selection_size: usize,
    /// How many offspring this specie owes the next generation.
    pub offspring_count: usize,
}

/// A collection of fitted [`Genome`]s judged close to the same [`SpecieRepr`].
/// Members are kept ordered by descending fitness; selection distributions
/// rely on that ordering.
#[derive(Debug, Clone)]
pub struct Specie {
    pub id: u64,
    pub repr: SpecieRepr,
    pub members: Vec<Genome>,
    pub stats: SpecieStats,
}

impl Specie {
    /// A fresh specie seeded from, and represented by, a single genome.
    pub fn seeded(id: u64, genome: Genome) -> Self {
        Self {
            id,
            repr: SpecieRepr::new(genome.connections.to_vec()),
            members: vec![genome],
            stats: SpecieStats::default(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member-count adjusted fitness: the mean over members, so large species
    /// don't dominate quota allocation on headcount alone.
    pub fn fit_adjusted(&self) -> f64 {
        let l = self.len() as f64;
        self.members.iter().fold(0., |acc, g| acc + g.fitness / l)
    }

    /// Restore the descending-fitness member order after evaluation.
    pub fn rank_members(&mut self) {
        self.members
            .sort_by(|l, r| r.fitness.partial_cmp(&l.fitness).unwrap_or(Ordering::Equal));
    }
}

/// Clustering collaborator: partitions a genome list into exactly `count`
/// species. Every input genome lands in exactly one specie.
pub trait Speciation {
    fn speciate_all(&mut self, genomes: Vec<Genome>, count: usize) -> Result<Vec<Specie>, Error>;
}

/// Distance-threshold clustering against specie representatives.
///
/// Genomes join the first representative within `threshold` of their
/// connection genes; a genome matching none seeds a new specie until `count`
/// is reached, after which it is forced into the closest representative.
/// If fewer than `count` clusters emerge the largest are split until the
/// contract is met.
#[derive(Debug, Clone)]
pub struct DeltaSpeciation {
    pub threshold: f64,
}

impl DeltaSpeciation {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for DeltaSpeciation {
    fn default() -> Self {
        // genetic distance at which genomes stop being reproductively alike
        Self::new(4.)
    }
}

impl Speciation for DeltaSpeciation {
    fn speciate_all(&mut self, genomes: Vec<Genome>, count: usize) -> Result<Vec<Specie>, Error> {
        if count == 0 || genomes.len() < count {
            return Err(Error::Speciation(format!(
                "cannot form {count} species from {} genomes",
                genomes.len()
            )));
        }

        let mut species: Vec<Specie> = Vec::with_capacity(count);
        for genome in genomes {
            let len = species.len();
            match species
                .iter_mut()
                .find(|s| s.repr.delta(&genome.connections) < self.threshold)
            {
                Some(s) => s.members.push(genome),
                None if len < count => {
                    species.push(Specie::seeded(species.len() as u64, genome));
                }
                None => {
                    // cap reached; force into the closest representative
                    let mut best = 0;
                    let mut best_d = f64::INFINITY;
                    for (idx, s) in species.iter().enumerate() {
                        let d = s.repr.delta(&genome.connections);
                        if d < best_d {
                            best = idx;
                            best_d = d;
                        }
                    }
                    species[best].members.push(genome);
                }
            }
        }

        // too few clusters: split the largest until the contract is met
        while species.len() < count {
            let Some(donor) = (0..species.len())
                .filter(|&idx| species[idx].members.len() > 1)
                .max_by_key(|&idx| species[idx].members.len())
            else {
                return Err(Error::Speciation(format!(
                    "only {} distinguishable species for a requested {count}",
                    species.len()
                )));
            };

            let mid = species[donor].members.len() / 2;
            let split = species[donor].members.split_off(mid);
            let id = species.len() as u64;
            let repr = SpecieRepr::new(split[0].connections.to_vec());
            species.push(Specie {
                id,
                repr,
                members: split,
                stats: SpecieStats::default(),
            });
        }

        for specie in species.iter_mut() {
            specie.rank_members();
        }

        Ok(species)
    }
}

/// Statistics collaborator: fills every specie's [`SpecieStats`] such that
/// offspring quotas sum exactly to `target`.
pub trait StatsProvider {
    fn allocate(&self, species: &mut [Specie], target: usize) -> Result<(), Error>;
}

/// Fitness-proportionate quotas with top-percentile parent selection.
///
/// Selection size is the top `top_p` share of each specie (at least one
/// member for any non-empty specie). Quotas follow each specie's adjusted
/// fitness share of the total, largest-remainder rounded so they sum exactly
/// to the target; an all-zero fitness generation degrades to an even split
/// across selectable species.
#[derive(Debug, Clone)]
pub struct FitnessProportionStats {
    pub top_p: f64,
}

impl FitnessProportionStats {
    pub fn new(top_p: f64) -> Self {
        Self { top_p }
    }
}

impl Default for FitnessProportionStats {
    fn default() -> Self {
        Self::new(0.4)
    }
}

impl StatsProvider for FitnessProportionStats {
    fn allocate(&self, species: &mut [Specie], target: usize) -> Result<(), Error> {
        for s in species.iter_mut() {
            let len = s.len();
            s.stats.selection_size = if len == 0 {
                0
            } else {
                ((len as f64 * self.top_p).ceil() as usize).clamp(1, len)
            };
            s.stats.offspring_count = 0;
        }

        if target == 0 {
            return Ok(());
        }

        let mut weights = species
            .iter()
            .map(|s| {
                if s.stats.selection_size == 0 {
                    0.
                } else {
                    s.fit_adjusted().max(0.)
                }
            })
            .collect::<Vec<_>>();

        let mut total: f64 = weights.iter().sum();
        if total <= 0. {
            // nothing evaluated above zero; fall back to an even split over
            // whatever is selectable
            for (idx, s) in species.iter().enumerate() {
                weights[idx] = if s.stats.selection_size == 0 { 0. } else { 1. };
            }
            total = weights.iter().sum();
            if total <= 0. {
                return Err(Error::NoSelectableSpecies { quota: target });
            }
        }

        // largest-remainder rounding keeps the quota sum exact
        let mut assigned = 0;
        let mut remainders = Vec::with_capacity(species.len());
        for (idx, w) in weights.iter().enumerate() {
            let share = target as f64 * w / total;
            let floor = share.floor() as usize;
            species[idx].stats.offspring_count = floor;
            assigned += floor;
            remainders.push((share - floor as f64, idx));
        }

        remainders.sort_by(|l, r| {
            r.0.partial_cmp(&l.0)
                .unwrap_or(Ordering::Equal)
                .then(l.1.cmp(&r.1))
        });
        for &(_, idx) in remainders.iter().take(target - assigned) {
            species[idx].stats.offspring_count += 1;
        }

        Ok(())
    }
}
