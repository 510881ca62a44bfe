//! The population: every living genome, held partitioned into species so a
//! genome belongs to exactly one specie at a time by construction.

use crate::{
    gene::InnoGen,
    genome::Genome,
    specie::{Specie, SpecieRepr, SpecieStats},
};

/// All genomes of the current generation, plus the size the next generation
/// must conserve. Genome ids are minted monotonically from `genome_id_head`.
#[derive(Debug, Clone)]
pub struct Population {
    pub species: Vec<Specie>,
    pub target: usize,
    pub(crate) genome_id_head: u64,
}

impl Population {
    pub fn new(species: Vec<Specie>, target: usize, genome_id_head: u64) -> Self {
        Self {
            species,
            target,
            genome_id_head,
        }
    }

    /// Total genome count across all species.
    pub fn len(&self) -> usize {
        self.species.iter().map(Specie::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.species.iter().all(Specie::is_empty)
    }

    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.species.iter().flat_map(|s| s.members.iter())
    }

    /// Drain every specie into one flat list, for handing to a speciation
    /// pass. Leaves the species empty behind.
    pub fn take_genomes(&mut self) -> Vec<Genome> {
        self.species
            .drain(..)
            .flat_map(|s| s.members.into_iter())
            .collect()
    }

    /// Score every genome and restore each specie's descending-fitness
    /// order, which parent selection depends on.
    pub fn evaluate(&mut self, mut fitness: impl FnMut(&Genome) -> f64) {
        for specie in self.species.iter_mut() {
            for genome in specie.members.iter_mut() {
                genome.fitness = fitness(genome);
            }
            specie.rank_members();
        }
    }

    /// The fittest genome alive, if any have been evaluated.
    pub fn champion(&self) -> Option<&Genome> {
        self.genomes()
            .max_by(|l, r| l.fitness.total_cmp(&r.fitness))
    }
}

/// An initial population: `count` identical connectionless genomes in a
/// single specie, ready for an `init` pass to partition. The returned
/// [`InnoGen`] reserves id space for every possible initial io path, so first
/// connections mint consistent ids across the whole population.
pub fn population_init(sensory: usize, action: usize, count: usize) -> (Population, InnoGen) {
    let members = (0..count)
        .map(|id| Genome::new(id as u64, sensory, action))
        .collect::<Vec<_>>();

    let specie = Specie {
        id: 0,
        repr: SpecieRepr::new(vec![]),
        members,
        stats: SpecieStats::default(),
    };

    (
        Population::new(vec![specie], count, count as u64),
        InnoGen::new(((sensory + 1) * action) as u64),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_population_init() {
        let count = 40;
        let (population, inno) = population_init(2, 2, count);
        assert_eq!(population.len(), count);
        assert_eq!(population.target, count);
        assert_eq!(population.species.len(), 1);
        assert_eq!(inno.head, 6);
        for genome in population.genomes() {
            assert!(genome.connections.is_empty());
            assert_eq!(genome.fitness, 0.);
        }
        let mut ids = population.genomes().map(|g| g.id).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, (0..count as u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_evaluate_ranks_members() {
        let (mut population, _) = population_init(1, 1, 5);
        population.evaluate(|g| (g.id % 3) as f64);
        for specie in &population.species {
            assert!(specie
                .members
                .windows(2)
                .all(|w| w[0].fitness >= w[1].fitness));
        }
        assert_eq!(population.champion().unwrap().fitness, 2.);
    }

    #[test]
    fn test_take_genomes_empties_species() {
        let (mut population, _) = population_init(1, 1, 8);
        let genomes = population.take_genomes();
        assert_eq!(genomes.len(), 8);
        assert!(population.is_empty());
        assert_eq!(population.len(), 0);
    }
}
