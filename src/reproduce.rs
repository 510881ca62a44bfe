//! The per-generation reproduction state machine: speciate once at setup,
//! then each generation consume specie statistics, sample parents through the
//! two-level selection distributions, and hand them to the genome operators
//! to assemble a conserved-size next generation.

use crate::{
    distribution::{selection_distributions, SelectionDistributions},
    gene::InnoGen,
    genome::Genome,
    population::Population,
    random::{EvolutionEvent, Happens},
    specie::{Speciation, StatsProvider},
    Error,
};
use core::cmp::Ordering;
use log::debug;

/// Share of each specie's quota produced by asexual copy rather than
/// crossover: one in four.
const COPY_RATIO: usize = 4;

/// Selection/reproduction strategy over a speciated population.
///
/// Construction leaves the strategy uninitialized; [`Self::init`] must
/// succeed once before any [`Self::invoke`]. Each invoke consumes one
/// generation's statistics and replaces the population's species wholesale;
/// nothing is committed when any step fails.
pub struct SelectionReproduction<S: Speciation, P: StatsProvider> {
    speciation: S,
    stats: P,
    specie_count: usize,
    initialized: bool,
}

impl<S: Speciation, P: StatsProvider> SelectionReproduction<S, P> {
    pub fn new(speciation: S, stats: P, specie_count: usize) -> Self {
        Self {
            speciation,
            stats,
            specie_count,
            initialized: false,
        }
    }

    /// Partition the population into exactly the configured specie count.
    /// A strategy returning any other count is a fatal setup error, never
    /// retried.
    pub fn init(&mut self, population: &mut Population) -> Result<(), Error> {
        let species = self
            .speciation
            .speciate_all(population.take_genomes(), self.specie_count)?;
        if species.len() != self.specie_count {
            return Err(Error::SpecieCountMismatch {
                expected: self.specie_count,
                actual: species.len(),
            });
        }

        population.species = species;
        self.initialized = true;
        Ok(())
    }

    /// Produce the next generation in place.
    ///
    /// Fitness must already be evaluated and specie members ranked (see
    /// [`Population::evaluate`]). Species are processed in index order and
    /// every random draw goes through the single `rng`, so a fixed seed
    /// reproduces the generation exactly.
    pub fn invoke(
        &mut self,
        population: &mut Population,
        inno: &mut InnoGen,
        rng: &mut impl Happens,
    ) -> Result<(), Error> {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }

        let target = population.target;
        self.stats.allocate(&mut population.species, target)?;

        let selectable = population
            .species
            .iter()
            .filter(|s| s.stats.selection_size > 0)
            .count();
        if selectable == 0 && target > 0 {
            return Err(Error::NoSelectableSpecies { quota: target });
        }

        let quota_sum = population
            .species
            .iter()
            .map(|s| s.stats.offspring_count)
            .sum::<usize>();
        if quota_sum != target {
            return Err(Error::QuotaMismatch {
                expected: target,
                actual: quota_sum,
            });
        }

        let dists = selection_distributions(&population.species)?;
        debug_assert_eq!(dists.non_empty_count, selectable);

        let mut next = Vec::with_capacity(target);
        let mut id_head = population.genome_id_head;
        for idx in 0..population.species.len() {
            self.reproduce_specie(population, idx, &dists, &mut id_head, &mut next, inno, rng)?;
        }
        debug_assert_eq!(next.len(), target);

        let species = self.speciation.speciate_all(next, self.specie_count)?;
        if species.len() != self.specie_count {
            return Err(Error::SpecieCountMismatch {
                expected: self.specie_count,
                actual: species.len(),
            });
        }

        debug!(
            "generation reproduced: {target} offspring sourced from {selectable} of {} species",
            self.specie_count
        );
        population.species = species;
        population.genome_id_head = id_head;
        Ok(())
    }

    /// Fill one specie's offspring quota. The first `1/COPY_RATIO` of the
    /// quota (or all of it, when only one parent is selectable) comes from
    /// asexual copies; the rest from crossover.
    #[allow(clippy::too_many_arguments)]
    fn reproduce_specie(
        &self,
        population: &Population,
        idx: usize,
        dists: &SelectionDistributions,
        id_head: &mut u64,
        next: &mut Vec<Genome>,
        inno: &mut InnoGen,
        rng: &mut impl Happens,
    ) -> Result<(), Error> {
        let specie = &population.species[idx];
        let quota = specie.stats.offspring_count;
        if quota == 0 {
            return Ok(());
        }

        let dist = dists.genomes[idx]
            .as_ref()
            .ok_or(Error::EmptySpecie(specie.id))?;

        let mut copy = quota / COPY_RATIO;
        if copy == 0 || specie.stats.selection_size < 2 {
            copy = quota;
        }

        for _ in 0..copy {
            let parent = &specie.members[dist.sample(rng)];
            let mut child = parent.spawn(*id_head);
            *id_head += 1;
            child.mutate(rng, inno);
            next.push(child);
        }

        for _ in copy..quota {
            let l = &specie.members[dist.sample(rng)];
            let r = self.second_parent(population, idx, l, dists, rng)?;

            let l_fit = l.fitness.partial_cmp(&r.fitness).unwrap_or(Ordering::Equal);
            let mut child = l.reproduce_with(r, *id_head, l_fit, rng);
            *id_head += 1;
            child.mutate(rng, inno);
            next.push(child);
        }

        Ok(())
    }

    /// The second parent of a sexual pairing: usually a distinct member of
    /// the same specie, occasionally ([`EvolutionEvent::CrossSpecie`]) drawn
    /// from the specie-level distribution instead.
    fn second_parent<'p>(
        &self,
        population: &'p Population,
        idx: usize,
        first: &Genome,
        dists: &SelectionDistributions,
        rng: &mut impl Happens,
    ) -> Result<&'p Genome, Error> {
        if dists.non_empty_count > 1 && rng.happens(EvolutionEvent::CrossSpecie) {
            let other = dists.species.sample(rng);
            let specie = &population.species[other];
            let dist = dists.genomes[other]
                .as_ref()
                .ok_or(Error::EmptySpecie(specie.id))?;
            return Ok(&specie.members[dist.sample(rng)]);
        }

        let specie = &population.species[idx];
        let dist = dists.genomes[idx]
            .as_ref()
            .ok_or(Error::EmptySpecie(specie.id))?;
        let mut pick = dist.sample(rng);
        if specie.members[pick].id == first.id {
            // nudge to the neighboring eligible member rather than redrawing
            pick = (pick + 1) % specie.stats.selection_size;
        }
        Ok(&specie.members[pick])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        population::{population_init, Population},
        random::{percent, ProbBinding, ProbStatic, WyRng},
        specie::{
            DeltaSpeciation, FitnessProportionStats, Specie, SpecieRepr, SpecieStats, Speciation,
        },
    };

    fn happens_rng(seed: u64) -> ProbBinding<ProbStatic, WyRng> {
        ProbBinding::new(ProbStatic::default(), WyRng::seeded(seed))
    }

    /// Deals genomes round-robin into a fixed number of species; enough
    /// control to pin quotas in tests.
    struct RoundRobin;

    impl Speciation for RoundRobin {
        fn speciate_all(
            &mut self,
            genomes: Vec<Genome>,
            count: usize,
        ) -> Result<Vec<Specie>, Error> {
            let mut species = (0..count)
                .map(|id| Specie {
                    id: id as u64,
                    repr: SpecieRepr::new(vec![]),
                    members: vec![],
                    stats: SpecieStats::default(),
                })
                .collect::<Vec<_>>();
            for (idx, genome) in genomes.into_iter().enumerate() {
                species[idx % count].members.push(genome);
            }
            for specie in species.iter_mut() {
                specie.rank_members();
            }
            Ok(species)
        }
    }

    /// A strategy that ignores the requested count entirely.
    struct Lumper;

    impl Speciation for Lumper {
        fn speciate_all(
            &mut self,
            genomes: Vec<Genome>,
            _count: usize,
        ) -> Result<Vec<Specie>, Error> {
            let mut specie = Specie {
                id: 0,
                repr: SpecieRepr::new(vec![]),
                members: genomes,
                stats: SpecieStats::default(),
            };
            specie.rank_members();
            Ok(vec![specie])
        }
    }

    /// Hands out a fixed set of stats regardless of the species' shape.
    struct FixedStats {
        selection_sizes: Vec<usize>,
        quotas: Vec<usize>,
    }

    impl StatsProvider for FixedStats {
        fn allocate(&self, species: &mut [Specie], _target: usize) -> Result<(), Error> {
            for (idx, s) in species.iter_mut().enumerate() {
                s.stats.selection_size = self.selection_sizes[idx];
                s.stats.offspring_count = self.quotas[idx];
            }
            Ok(())
        }
    }

    fn evaluated_population(count: usize) -> Population {
        let (mut population, _) = population_init(2, 1, count);
        population.evaluate(|g| g.id as f64 + 1.);
        population
    }

    #[test]
    fn test_invoke_before_init() {
        let mut strategy =
            SelectionReproduction::new(RoundRobin, FitnessProportionStats::default(), 2);
        let mut population = evaluated_population(10);
        assert!(matches!(
            strategy.invoke(
                &mut population,
                &mut InnoGen::new(0),
                &mut happens_rng(0x11)
            ),
            Err(Error::Uninitialized)
        ));
    }

    #[test]
    fn test_init_specie_count_mismatch() {
        let mut strategy =
            SelectionReproduction::new(Lumper, FitnessProportionStats::default(), 4);
        let mut population = evaluated_population(10);
        assert!(matches!(
            strategy.init(&mut population),
            Err(Error::SpecieCountMismatch {
                expected: 4,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_invoke_conserves_population_under_fixed_quotas() {
        let quotas = vec![2, 3, 1, 4];
        let mut strategy = SelectionReproduction::new(
            RoundRobin,
            FixedStats {
                selection_sizes: vec![2, 2, 2, 2],
                quotas: quotas.clone(),
            },
            4,
        );

        let mut population = evaluated_population(10);
        strategy.init(&mut population).unwrap();
        assert_eq!(population.species.len(), 4);

        let mut inno = InnoGen::new(4);
        strategy
            .invoke(&mut population, &mut inno, &mut happens_rng(0x2314))
            .unwrap();

        assert_eq!(quotas.iter().sum::<usize>(), 10);
        assert_eq!(population.len(), 10);
        assert_eq!(population.species.len(), 4);
    }

    #[test]
    fn test_invoke_quota_mismatch() {
        let mut strategy = SelectionReproduction::new(
            RoundRobin,
            FixedStats {
                selection_sizes: vec![2, 2],
                quotas: vec![4, 4], // sums to 8, target is 10
            },
            2,
        );

        let mut population = evaluated_population(10);
        strategy.init(&mut population).unwrap();
        assert!(matches!(
            strategy.invoke(
                &mut population,
                &mut InnoGen::new(4),
                &mut happens_rng(0x77)
            ),
            Err(Error::QuotaMismatch {
                expected: 10,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_invoke_no_selectable_species() {
        let mut strategy = SelectionReproduction::new(
            RoundRobin,
            FixedStats {
                selection_sizes: vec![0, 0],
                quotas: vec![5, 5],
            },
            2,
        );

        let mut population = evaluated_population(10);
        strategy.init(&mut population).unwrap();
        assert!(matches!(
            strategy.invoke(
                &mut population,
                &mut InnoGen::new(4),
                &mut happens_rng(0x78)
            ),
            Err(Error::NoSelectableSpecies { quota: 10 })
        ));
    }

    #[test]
    fn test_invoke_assigns_fresh_monotonic_ids() {
        let mut strategy = SelectionReproduction::new(
            RoundRobin,
            FixedStats {
                selection_sizes: vec![3, 3],
                quotas: vec![5, 5],
            },
            2,
        );

        let mut population = evaluated_population(10);
        strategy.init(&mut population).unwrap();
        strategy
            .invoke(
                &mut population,
                &mut InnoGen::new(4),
                &mut happens_rng(0xf00),
            )
            .unwrap();

        let mut ids = population.genomes().map(|g| g.id).collect::<Vec<_>>();
        ids.sort();
        // parents held ids 0..10; every child is new
        assert_eq!(ids, (10..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_generation_loop_end_to_end() {
        let mut strategy = SelectionReproduction::new(
            DeltaSpeciation::default(),
            FitnessProportionStats::default(),
            3,
        );

        let (mut population, mut inno) = population_init(2, 1, 30);
        let mut rng = happens_rng(0x5eed);
        population.evaluate(|g| (g.id % 7) as f64);
        strategy.init(&mut population).unwrap();

        for gen in 0..10 {
            population.evaluate(|g| (g.connections.len() + g.id as usize % 3) as f64);
            strategy
                .invoke(&mut population, &mut inno, &mut rng)
                .unwrap();
            assert_eq!(population.len(), 30, "size drifted at generation {gen}");
            assert_eq!(population.species.len(), 3);
            for specie in &population.species {
                assert!(specie
                    .members
                    .iter()
                    .all(|g| g.connections.is_sorted() && g.nodes.is_sorted()));
            }
        }
    }

    #[test]
    fn test_reproducible_under_fixed_seed() {
        let run = |seed: u64| {
            let mut strategy = SelectionReproduction::new(
                DeltaSpeciation::default(),
                FitnessProportionStats::default(),
                2,
            );
            let (mut population, mut inno) = population_init(2, 1, 20);
            let mut rng = happens_rng(seed);
            population.evaluate(|g| g.id as f64);
            strategy.init(&mut population).unwrap();
            for _ in 0..5 {
                population.evaluate(|g| g.connections.len() as f64);
                strategy
                    .invoke(&mut population, &mut inno, &mut rng)
                    .unwrap();
            }
            let mut genomes = population
                .genomes()
                .map(|g| g.to_json().unwrap())
                .collect::<Vec<_>>();
            genomes.sort();
            genomes
        };

        assert_eq!(run(0xabcd), run(0xabcd));
        assert_ne!(run(0xabcd), run(0xdcba));
    }
}
