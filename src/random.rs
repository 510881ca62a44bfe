//! Random-source plumbing: a small fast seedable rng, and probability tables
//! for the evolution events that reproduction and mutation consult.
//!
//! A fixed seed makes a whole run reproducible: every component draws from a
//! single caller-supplied source, sequentially, in a well-defined order per
//! generation. No two components may share one source concurrently without
//! outside synchronization.

use core::cmp::min;
use rand::RngCore;
use std::{
    fs::File,
    io::{self, Read},
};

/// Events whose incidence is decided by a [`Probabilities`] table.
#[derive(Debug, Clone, Copy)]
pub enum EvolutionEvent {
    /// A genome grows a brand new connection gene.
    NewConnection,
    /// A genome bisects an existing connection with a fresh node.
    BisectConnection,
    /// A genome perturbs or replaces its connection parameters.
    MutateWeight,
    /// An individual weight is nudged rather than left alone.
    PerturbWeight,
    /// An individual weight is replaced outright instead of nudged.
    NewWeight,
    /// A gene disabled in either parent stays disabled in the child.
    KeepDisabled,
    /// A matching gene is inherited from the less fit parent.
    PickLesser,
    /// The second parent of a sexual pairing is drawn across species.
    CrossSpecie,
}

/// Probability expressed as a cutoff on a uniform `u64` draw.
pub const fn percent(x: u64) -> u64 {
    x * (u64::MAX / 100)
}

pub trait Probabilities {
    type Update;
    fn probability(&self, evt: EvolutionEvent) -> u64;
    fn update(&mut self, stats: Self::Update);
}

pub trait Happens: RngCore + Probabilities {
    fn happens(&mut self, evt: EvolutionEvent) -> bool;
}

impl<T: RngCore + Probabilities> Happens for T {
    fn happens(&mut self, evt: EvolutionEvent) -> bool {
        self.probability(evt) > self.next_u64()
    }
}

/// A fixed table of event probabilities.
pub struct ProbStatic {
    new_connection: u64,
    bisect_connection: u64,
    mutate_weight: u64,
    perturb_weight: u64,
    new_weight: u64,
    keep_disabled: u64,
    pick_lesser: u64,
    cross_specie: u64,
}

impl ProbStatic {
    pub fn with_overrides(mut self, updates: &[(EvolutionEvent, u64)]) -> Self {
        for update in updates {
            self.update(*update);
        }
        self
    }
}

impl Default for ProbStatic {
    fn default() -> Self {
        Self {
            new_connection: percent(5),
            bisect_connection: percent(15),
            mutate_weight: percent(80),
            perturb_weight: percent(90),
            new_weight: percent(10),
            keep_disabled: percent(75),
            pick_lesser: percent(50),
            cross_specie: percent(1),
        }
    }
}

impl Probabilities for ProbStatic {
    type Update = (EvolutionEvent, u64);

    fn probability(&self, evt: EvolutionEvent) -> u64 {
        match evt {
            EvolutionEvent::NewConnection => self.new_connection,
            EvolutionEvent::BisectConnection => self.bisect_connection,
            EvolutionEvent::MutateWeight => self.mutate_weight,
            EvolutionEvent::PerturbWeight => self.perturb_weight,
            EvolutionEvent::NewWeight => self.new_weight,
            EvolutionEvent::KeepDisabled => self.keep_disabled,
            EvolutionEvent::PickLesser => self.pick_lesser,
            EvolutionEvent::CrossSpecie => self.cross_specie,
        }
    }

    fn update(&mut self, (evt, v): Self::Update) {
        match evt {
            EvolutionEvent::NewConnection => self.new_connection = v,
            EvolutionEvent::BisectConnection => self.bisect_connection = v,
            EvolutionEvent::MutateWeight => self.mutate_weight = v,
            EvolutionEvent::PerturbWeight => self.perturb_weight = v,
            EvolutionEvent::NewWeight => self.new_weight = v,
            EvolutionEvent::KeepDisabled => self.keep_disabled = v,
            EvolutionEvent::PickLesser => self.pick_lesser = v,
            EvolutionEvent::CrossSpecie => self.cross_specie = v,
        }
    }
}

/// wyrand. Small state, good avalanche, and cheap enough that selection
/// draws never show up in a profile.
pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut idx = 0;
        while idx < dst.len() {
            let lim = min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

/// Binds a probability table to a random source, so a single value serves as
/// both the event oracle and the draw stream for sampling.
pub struct ProbBinding<P: Probabilities, R: RngCore> {
    p: P,
    r: R,
}

impl<P: Probabilities, R: RngCore> ProbBinding<P, R> {
    pub fn new(p: P, r: R) -> Self {
        Self { p, r }
    }

    #[allow(clippy::should_implement_trait)] // type signature is incompatible with trait Default
    pub fn default() -> ProbBinding<impl Probabilities, impl RngCore> {
        ProbBinding {
            p: ProbStatic::default(),
            r: default_rng(),
        }
    }
}

impl<P: Probabilities, R: RngCore> Probabilities for ProbBinding<P, R> {
    type Update = P::Update;

    fn probability(&self, evt: EvolutionEvent) -> u64 {
        self.p.probability(evt)
    }

    fn update(&mut self, stats: Self::Update) {
        self.p.update(stats);
    }
}

impl<P: Probabilities, R: RngCore> RngCore for ProbBinding<P, R> {
    fn next_u32(&mut self) -> u32 {
        self.r.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.r.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.r.fill_bytes(dest)
    }
}

pub fn seed_urandom() -> io::Result<u64> {
    let mut file = File::open("/dev/urandom")?;
    let mut buffer = [0u8; 8];
    file.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

pub fn default_rng() -> impl RngCore {
    WyRng::seeded(seed_urandom().unwrap())
}
