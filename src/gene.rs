//! Heritable genes and the innovation-ordered sequence that holds them.
//!
//! Genes are keyed by a globally unique innovation id, assigned by [`InnoGen`]
//! the first time a particular structural novelty appears anywhere in the
//! population. Two genes in different genomes that share an innovation id
//! describe the same historical mutation event, which is what lets crossover
//! align genomes of different shapes.

use crate::Error;
use core::{
    cmp::Ordering,
    fmt::Debug,
    ops::{Deref, DerefMut},
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Anything held by a [`GeneList`]: exposes the innovation id it sorts on.
pub trait Gene: Clone + Debug {
    fn inno(&self) -> u64;
}

/// A sequence of genes sorted ascending by innovation id.
///
/// Sortedness is maintained by convention rather than enforced on every
/// mutation: [`GeneList::push`] appends blindly, and [`GeneList::search`] is
/// only meaningful while the convention holds. Freshly minted innovations
/// carry the highest id seen so far, so [`GeneList::insert`] is an O(1)
/// append in the common case and still correct for out-of-order ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneList<G: Gene>(Vec<G>);

impl<G: Gene> GeneList<G> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Append without regard for order. For genes already known to carry the
    /// highest id, or for bulk loads that will be followed by [`Self::sort`].
    #[inline]
    pub fn push(&mut self, gene: G) {
        self.0.push(gene);
    }

    /// Insert at the sorted position, scanning backward from the tail since
    /// new genes almost always belong at or near the end.
    pub fn insert(&mut self, gene: G) {
        let mut idx = self.0.len();
        while idx > 0 && self.0[idx - 1].inno() >= gene.inno() {
            idx -= 1;
        }
        self.0.insert(idx, gene);
    }

    /// Binary search by innovation id over a sequence assumed sorted.
    /// `Ok` holds the index of the exact match; `Err` holds the index where
    /// the id would be inserted, so callers never need a second scan.
    ///
    /// Ids are unsigned, so comparison is three-way rather than subtractive.
    pub fn search(&self, inno: u64) -> Result<usize, usize> {
        let mut lo = 0;
        let mut hi = self.0.len();
        while lo < hi {
            let mid = (lo + hi) >> 1;
            match self.0[mid].inno().cmp(&inno) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(lo)
    }

    pub fn contains(&self, inno: u64) -> bool {
        self.search(inno).is_ok()
    }

    /// Remove and return the gene with the given innovation id. An unknown id
    /// is a correctness bug somewhere upstream, so it fails loudly instead of
    /// being ignored.
    pub fn remove(&mut self, inno: u64) -> Result<G, Error> {
        match self.search(inno) {
            Ok(idx) => Ok(self.0.remove(idx)),
            Err(_) => Err(Error::UnknownInnovation(inno)),
        }
    }

    /// Restore the sort convention. Stable, and comparison-only: duplicate
    /// ids should never exist, but the sort must not misbehave if they do.
    pub fn sort(&mut self) {
        self.0.sort_by(|l, r| l.inno().cmp(&r.inno()));
    }

    /// O(n) strictly-ascending check. Diagnostics only.
    pub fn is_sorted(&self) -> bool {
        self.0.windows(2).all(|w| w[0].inno() < w[1].inno())
    }
}

impl<G: Gene> Default for GeneList<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Gene> Deref for GeneList<G> {
    type Target = [G];

    fn deref(&self) -> &[G] {
        &self.0
    }
}

// Mutable access to gene payloads (weights, enabled flags). Callers must not
// alter innovation ids through this without a follow-up [`GeneList::sort`].
impl<G: Gene> DerefMut for GeneList<G> {
    fn deref_mut(&mut self) -> &mut [G] {
        &mut self.0
    }
}

impl<G: Gene> FromIterator<G> for GeneList<G> {
    fn from_iter<I: IntoIterator<Item = G>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<G: Gene> IntoIterator for GeneList<G> {
    type Item = G;
    type IntoIter = std::vec::IntoIter<G>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, G: Gene> IntoIterator for &'a GeneList<G> {
    type Item = &'a G;
    type IntoIter = std::slice::Iter<'a, G>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Sensory,
    Action,
    Internal,
    Static,
}

/// A node gene. Node ids are genome-local and contiguous, but the list is
/// kept in the same sorted-sequence shape as connections so lookups and
/// removals share one code path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: u64,
    pub kind: NodeKind,
}

impl NodeGene {
    pub fn new(id: u64, kind: NodeKind) -> Self {
        Self { id, kind }
    }

    pub fn internal(id: u64) -> Self {
        Self {
            id,
            kind: NodeKind::Internal,
        }
    }
}

impl Gene for NodeGene {
    fn inno(&self) -> u64 {
        self.id
    }
}

/// A weighted directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub inno: u64,
    pub from: u64,
    pub to: u64,
    pub weight: f64,
    pub enabled: bool,
}

impl ConnectionGene {
    pub fn new(from: u64, to: u64, inno: &mut InnoGen) -> Self {
        Self {
            inno: inno.path((from, to)),
            from,
            to,
            weight: 1.,
            enabled: true,
        }
    }

    /// Split this connection in two around `center`, disabling the original.
    /// The inbound half carries weight 1, the outbound half the old weight,
    /// so the bisected path initially computes the same value.
    pub fn bisect(&mut self, center: u64, inno: &mut InnoGen) -> (Self, Self) {
        self.enabled = false;
        (
            Self {
                inno: inno.path((self.from, center)),
                from: self.from,
                to: center,
                weight: 1.,
                enabled: true,
            },
            Self {
                inno: inno.path((center, self.to)),
                from: center,
                to: self.to,
                weight: self.weight,
                enabled: true,
            },
        )
    }
}

impl Default for ConnectionGene {
    fn default() -> Self {
        Self {
            inno: 0,
            from: 0,
            to: 0,
            weight: 0.,
            enabled: true,
        }
    }
}

impl Gene for ConnectionGene {
    fn inno(&self) -> u64 {
        self.inno
    }
}

/// Innovation id generator: a monotonic head plus a map of already-seen paths,
/// so the same structural novelty minted twice in one generation receives the
/// same id. One instance is shared by every reproduction call of a run; genes
/// never self-assign ids.
pub struct InnoGen {
    pub head: u64,
    seen: FxHashMap<(u64, u64), u64>,
}

impl InnoGen {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            seen: FxHashMap::default(),
        }
    }

    pub fn path(&mut self, v: (u64, u64)) -> u64 {
        match self.seen.get(&v) {
            Some(n) => *n,
            None => {
                let n = self.head;
                self.head += 1;
                self.seen.insert(v, n);
                n
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn conn(inno: u64) -> ConnectionGene {
        ConnectionGene {
            inno,
            ..ConnectionGene::default()
        }
    }

    #[test]
    fn test_inno_gen() {
        let mut inno = InnoGen::new(0);
        assert_eq!(inno.head, 0);
        assert_eq!(inno.path((0, 1)), 0);
        assert_eq!(inno.path((1, 2)), 1);
        assert_eq!(inno.path((0, 1)), 0);
        assert_eq!(inno.head, 2);

        let mut inno2 = InnoGen::new(inno.head);
        assert_eq!(inno2.path((1, 0)), 2);
        assert_eq!(inno2.path((0, 1)), 3);
    }

    #[test]
    fn test_insert_stays_sorted() {
        let mut genes = GeneList::new();
        for inno in [3, 9, 1, 7, 0, 8, 2] {
            genes.insert(conn(inno));
            assert!(genes.is_sorted(), "disorder after inserting {inno}");
        }
        assert_eq!(genes.len(), 7);
        for (idx, gene) in genes.iter().enumerate() {
            assert_eq!(genes.search(gene.inno()), Ok(idx));
        }
    }

    #[test]
    fn test_insert_tail_fast_path() {
        let mut genes = GeneList::new();
        for inno in 0..100 {
            genes.insert(conn(inno));
        }
        assert!(genes.is_sorted());
        assert_eq!(genes.last().unwrap().inno(), 99);
    }

    #[test]
    fn test_search_absent_is_insertion_point() {
        let genes = [2, 4, 6, 8]
            .into_iter()
            .map(conn)
            .collect::<GeneList<_>>();
        assert_eq!(genes.search(0), Err(0));
        assert_eq!(genes.search(3), Err(1));
        assert_eq!(genes.search(5), Err(2));
        assert_eq!(genes.search(9), Err(4));
        assert_eq!(genes.search(4), Ok(1));
    }

    #[test]
    fn test_search_empty() {
        let genes = GeneList::<ConnectionGene>::new();
        assert_eq!(genes.search(0), Err(0));
        assert!(!genes.contains(0));
    }

    #[test]
    fn test_search_large_ids_no_wrap() {
        let genes = [u64::MAX - 2, u64::MAX]
            .into_iter()
            .map(conn)
            .collect::<GeneList<_>>();
        assert_eq!(genes.search(u64::MAX), Ok(1));
        assert_eq!(genes.search(u64::MAX - 1), Err(1));
        assert_eq!(genes.search(0), Err(0));
    }

    #[test]
    fn test_remove_present() {
        let mut genes = [1, 2, 3].into_iter().map(conn).collect::<GeneList<_>>();
        let removed = genes.remove(2).unwrap();
        assert_eq!(removed.inno(), 2);
        assert_eq!(genes.len(), 2);
        assert!(!genes.contains(2));
        assert!(genes.contains(1));
        assert!(genes.contains(3));
    }

    #[test]
    fn test_remove_absent_fails_and_leaves_list() {
        let mut genes = [1, 2, 3].into_iter().map(conn).collect::<GeneList<_>>();
        match genes.remove(5) {
            Err(Error::UnknownInnovation(5)) => {}
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(genes.len(), 3);
        assert!(genes.is_sorted());
    }

    #[test]
    fn test_sort_restores_any_order() {
        let mut reversed = (0..50).rev().map(conn).collect::<GeneList<_>>();
        assert!(!reversed.is_sorted());
        reversed.sort();
        assert!(reversed.is_sorted());

        let mut shuffled = [5, 3, 9, 1, 1, 0, 9]
            .into_iter()
            .map(conn)
            .collect::<GeneList<_>>();
        shuffled.sort();
        // duplicates present, so strict ascent fails, but order is restored
        assert!(!shuffled.is_sorted());
        assert!(shuffled.windows(2).all(|w| w[0].inno() <= w[1].inno()));
    }

    #[test]
    fn test_is_sorted_rejects_duplicates_and_descent() {
        let dup = [1, 1].into_iter().map(conn).collect::<GeneList<_>>();
        assert!(!dup.is_sorted());
        let desc = [2, 1].into_iter().map(conn).collect::<GeneList<_>>();
        assert!(!desc.is_sorted());
        let empty = GeneList::<ConnectionGene>::new();
        assert!(empty.is_sorted());
    }

    #[test]
    fn test_bisect() {
        let mut inno = InnoGen::new(1);
        let mut gene = ConnectionGene {
            inno: 0,
            from: 0,
            to: 1,
            weight: 0.5,
            enabled: true,
        };
        let (head, tail) = gene.bisect(2, &mut inno);
        assert!(!gene.enabled);
        assert_eq!((head.from, head.to, head.weight), (0, 2, 1.));
        assert_eq!((tail.from, tail.to, tail.weight), (2, 1, 0.5));
        assert!(head.enabled && tail.enabled);
        assert_ne!(head.inno, tail.inno);
    }

    #[test]
    fn test_node_list_shares_sequence_semantics() {
        let mut nodes = GeneList::new();
        nodes.insert(NodeGene::new(0, NodeKind::Sensory));
        nodes.insert(NodeGene::new(1, NodeKind::Action));
        nodes.insert(NodeGene::internal(2));
        assert!(nodes.is_sorted());
        assert_eq!(nodes.search(1), Ok(1));
        assert_eq!(nodes.search(3), Err(3));
    }
}
