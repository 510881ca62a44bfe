//! Speciated reproduction for NEAT-style neuroevolution.
//!
//! A [`Population`] is a set of [`Genome`]s partitioned into [`Specie`]s by
//! topological similarity. Each generation, [`SelectionReproduction`] ranks
//! every specie's members, allocates offspring quotas across species in
//! proportion to adjusted fitness, and fills each quota by asexual copying
//! and fitness-weighted crossover, keeping the population size exact.

pub mod crossover;
pub mod distribution;
pub mod error;
pub mod gene;
pub mod genome;
pub mod macros;
pub mod population;
pub mod random;
pub mod reproduce;
pub mod specie;

pub use distribution::{selection_distributions, SelectionDistribution, SelectionDistributions};
pub use error::Error;
pub use gene::{ConnectionGene, Gene, GeneList, InnoGen, NodeGene, NodeKind};
pub use genome::Genome;
pub use population::{population_init, Population};
pub use random::{default_rng, EvolutionEvent, Happens, ProbBinding, ProbStatic, Probabilities, WyRng};
pub use reproduce::SelectionReproduction;
pub use specie::{
    DeltaSpeciation, FitnessProportionStats, Specie, SpecieRepr, SpecieStats, Speciation,
    StatsProvider,
};
