//! The evolvable individual: an innovation-keyed gene encoding of a directed
//! graph, plus the mutation and recombination operators that construct new
//! genomes from it. Parents are read-only during reproduction; every operator
//! returns a fresh child and mints novel innovation ids only through the
//! shared [`InnoGen`].

use crate::{
    crossover::crossover,
    gene::{ConnectionGene, GeneList, InnoGen, NodeGene, NodeKind},
    random::{EvolutionEvent, Happens},
};
use core::cmp::{max, Ordering};
use rand::{seq::IteratorRandom, Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const PARAM_PERTURB_FACTOR: f64 = 0.05;
const PARAM_MIN: f64 = -3.0;
const PARAM_MAX: f64 = 3.0;

/// A genome allowing arbitrary (including recurrent) connectivity.
///
/// `fitness` is meaningful only after the enclosing loop has evaluated the
/// genome; it is zeroed on every child at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    sensory: usize,
    action: usize,
    pub nodes: GeneList<NodeGene>,
    pub connections: GeneList<ConnectionGene>,
    pub fitness: f64,
}

impl Genome {
    /// A connectionless genome with its io nodes and one static (bias) node.
    pub fn new(id: u64, sensory: usize, action: usize) -> Self {
        let mut nodes = GeneList::with_capacity(sensory + action + 1);
        for n in 0..sensory {
            nodes.push(NodeGene::new(n as u64, NodeKind::Sensory));
        }
        for n in sensory..sensory + action {
            nodes.push(NodeGene::new(n as u64, NodeKind::Action));
        }
        nodes.push(NodeGene::new((sensory + action) as u64, NodeKind::Static));

        Self {
            id,
            sensory,
            action,
            nodes,
            connections: GeneList::new(),
            fitness: 0.,
        }
    }

    #[inline]
    pub fn sensory(&self) -> std::ops::Range<u64> {
        0..self.sensory as u64
    }

    #[inline]
    pub fn action(&self) -> std::ops::Range<u64> {
        self.sensory as u64..(self.sensory + self.action) as u64
    }

    /// An identical genome under a new identity, fitness reset. The asexual
    /// half of reproduction starts from this.
    pub fn spawn(&self, id: u64) -> Self {
        let mut child = self.clone();
        child.id = id;
        child.fitness = 0.;
        child
    }

    fn next_node_id(&self) -> u64 {
        // nodes are sorted, so the tail carries the highest id
        self.nodes.last().map(|n| n.id + 1).unwrap_or(0)
    }

    /// Find a (from, to) pair not yet connected. Actions never source a
    /// connection; sensory and static nodes never sink one.
    pub fn open_path(&self, rng: &mut impl RngCore) -> Option<(u64, u64)> {
        let mut saturated = HashSet::with_capacity(self.nodes.len());
        loop {
            let from = self
                .nodes
                .iter()
                .filter(|n| !matches!(n.kind, NodeKind::Action) && !saturated.contains(&n.id))
                .map(|n| n.id)
                .choose(rng)?;

            let mut exclude = HashSet::with_capacity(self.connections.len());
            for c in &self.connections {
                if c.from == from {
                    exclude.insert(c.to);
                }
            }

            if let Some(to) = self
                .nodes
                .iter()
                .filter(|n| {
                    !matches!(n.kind, NodeKind::Sensory | NodeKind::Static)
                        && !exclude.contains(&n.id)
                })
                .map(|n| n.id)
                .choose(rng)
            {
                break Some((from, to));
            }

            saturated.insert(from);
        }
    }

    /// Grow one new connection along an open path, if any remains.
    pub fn new_connection(&mut self, rng: &mut impl RngCore, inno: &mut InnoGen) {
        if let Some((from, to)) = self.open_path(rng) {
            self.connections.insert(ConnectionGene::new(from, to, inno));
        }
    }

    /// Bisect a random enabled connection with a fresh internal node.
    /// Panics if there are no connections to bisect; [`Genome::mutate`]
    /// guards the call.
    pub fn bisect_connection(&mut self, rng: &mut impl RngCore, inno: &mut InnoGen) {
        let idx = (0..self.connections.len())
            .filter(|&idx| self.connections[idx].enabled)
            .choose(rng)
            .expect("no connections available to bisect");

        let center = self.next_node_id();
        self.nodes.insert(NodeGene::internal(center));
        let (head, tail) = self.connections[idx].bisect(center, inno);
        self.connections.insert(head);
        self.connections.insert(tail);
    }

    /// Perturb or replace connection weights, gene by gene.
    pub fn mutate_params(&mut self, rng: &mut (impl RngCore + Happens)) {
        for c in self.connections.iter_mut() {
            if rng.happens(EvolutionEvent::NewWeight) {
                c.weight = rng.random_range(PARAM_MIN..PARAM_MAX);
            } else if rng.happens(EvolutionEvent::PerturbWeight) {
                let step: f64 = StandardNormal.sample(rng);
                c.weight = (c.weight + PARAM_PERTURB_FACTOR * step).clamp(PARAM_MIN, PARAM_MAX);
            }
        }
    }

    /// Perform 0 or more mutations, event-driven.
    pub fn mutate(&mut self, rng: &mut (impl RngCore + Happens), inno: &mut InnoGen) {
        if rng.happens(EvolutionEvent::MutateWeight) {
            self.mutate_params(rng);
        }
        if rng.happens(EvolutionEvent::NewConnection) {
            self.new_connection(rng, inno);
        }
        if rng.happens(EvolutionEvent::BisectConnection)
            && self.connections.iter().any(|c| c.enabled)
        {
            self.bisect_connection(rng, inno);
        }
    }

    /// Sexual reproduction: crossover of connection genes, node list rebuilt
    /// to cover every endpoint the child's connections reference. `self_fit`
    /// describes how this parent's fitness compares to `other`'s.
    pub fn reproduce_with(
        &self,
        other: &Self,
        id: u64,
        self_fit: Ordering,
        rng: &mut (impl RngCore + Happens),
    ) -> Self {
        let connections = crossover(&self.connections, &other.connections, self_fit, rng);

        let mut node_head = 0;
        for c in &connections {
            node_head = max(node_head, max(c.from, c.to));
        }
        let total = max(
            node_head as usize + 1,
            self.sensory + self.action + 1,
        );

        let nodes = (0..total as u64)
            .map(|n| {
                NodeGene::new(
                    n,
                    match n {
                        n if n < self.sensory as u64 => NodeKind::Sensory,
                        n if n < (self.sensory + self.action) as u64 => NodeKind::Action,
                        n if n == (self.sensory + self.action) as u64 => NodeKind::Static,
                        _ => NodeKind::Internal,
                    },
                )
            })
            .collect::<GeneList<_>>();

        debug_assert!(connections.is_sorted());

        Self {
            id,
            sensory: self.sensory,
            action: self.action,
            nodes,
            connections,
            fitness: 0.,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
