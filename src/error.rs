//! Failure taxonomy of the reproduction core.
//!
//! Every variant is fatal to the operation that raised it: configuration and
//! lookup failures signal bugs upstream of this crate, and nothing here is
//! retried internally since each step is a deterministic function of inputs
//! that were already validated.

use thiserror::Error;

pub use rand::distr::weighted::Error as WeightedError;

#[derive(Debug, Error)]
pub enum Error {
    /// The speciation collaborator returned a different number of species
    /// than was requested at setup.
    #[error("expected {expected} species, speciation produced {actual}")]
    SpecieCountMismatch { expected: usize, actual: usize },

    /// Per-specie offspring quotas do not sum to the target population size.
    #[error("offspring quotas sum to {actual}, target population is {expected}")]
    QuotaMismatch { expected: usize, actual: usize },

    /// Attempt to remove a gene whose innovation id is not present.
    #[error("unknown innovation id {0}")]
    UnknownInnovation(u64),

    /// A selection distribution was requested over zero candidates.
    #[error("cannot build a selection distribution over zero candidates")]
    EmptyDistribution,

    /// Every specie has a zero selection size while offspring are still owed.
    #[error("no selectable species while {quota} offspring are owed")]
    NoSelectableSpecies { quota: usize },

    /// A specie owes offspring but holds no members to source parents from.
    #[error("specie {0} owes offspring but has no selectable members")]
    EmptySpecie(u64),

    /// The generation step was invoked before initialization.
    #[error("reproduction invoked before init")]
    Uninitialized,

    /// The clustering pass could not partition the population as requested.
    #[error("speciation failed: {0}")]
    Speciation(String),

    /// The underlying weighted-sampling primitive rejected its weights.
    #[error("weighted distribution rejected its weights: {0}")]
    Distribution(#[from] WeightedError),
}
