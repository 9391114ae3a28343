//! Random 3-uniform hypergraph over the key set, plus the peeling pass
//! that proves it acyclic.

use crate::hash::HashFamily;

/// Attempt-local failure; the driver reseeds and tries again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Retry {
    /// A key mapped to a triple with repeated vertices.
    DegenerateEdge,
    /// Peeling terminated with edges left over (the graph has a 2-core).
    Unpeelable,
}

/// One key as an edge: three pairwise distinct vertices in `[0, v)`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge3 {
    pub left: u32,
    pub middle: u32,
    pub right: u32,
}

#[derive(Debug)]
pub(crate) struct Graph3 {
    pub v: u32,
    pub e: u32,
    pub edges: Vec<Edge3>,
}

impl Graph3 {
    /// Hash every key under `seed` and reduce the three words mod `v`.
    /// A triple with a repeated vertex fails the whole attempt.
    pub fn build<H: HashFamily + ?Sized>(
        keys: &[Vec<u8>],
        family: &H,
        seed: u64,
        v: u32,
    ) -> Result<Self, Retry> {
        let words = derive_words(keys, family, seed);
        let mut edges = Vec::with_capacity(keys.len());
        for [h0, h1, h2] in words {
            let e = Edge3 {
                left: h0 % v,
                middle: h1 % v,
                right: h2 % v,
            };
            if e.left == e.middle || e.left == e.right || e.middle == e.right {
                return Err(Retry::DegenerateEdge);
            }
            edges.push(e);
        }
        Ok(Self {
            v,
            e: edges.len() as u32,
            edges,
        })
    }

    /// Compute an elimination order: edge ids in the order they peel off.
    ///
    /// The adjacency summary is a degree counter and the XOR of incident
    /// edge ids per vertex, so a degree-1 vertex reveals its sole edge in
    /// O(1) and removing an edge is three XOR updates.
    pub fn peel(&self) -> Result<Vec<u32>, Retry> {
        let v = self.v as usize;
        let mut degree = vec![0u32; v];
        let mut incident = vec![0u32; v];

        for (j, e) in self.edges.iter().enumerate() {
            for u in [e.left, e.middle, e.right] {
                degree[u as usize] += 1;
                incident[u as usize] ^= j as u32;
            }
        }

        let mut queue: Vec<u32> = (0..self.v).filter(|&u| degree[u as usize] == 1).collect();
        let mut head = 0usize;
        let mut order = Vec::with_capacity(self.edges.len());

        while head < queue.len() {
            let u = queue[head] as usize;
            head += 1;
            if degree[u] != 1 {
                continue;
            }
            let j = incident[u];
            order.push(j);
            let e = &self.edges[j as usize];
            for w in [e.left, e.middle, e.right] {
                let w = w as usize;
                degree[w] -= 1;
                incident[w] ^= j;
                if degree[w] == 1 {
                    queue.push(w as u32);
                }
            }
        }

        if order.len() == self.edges.len() {
            Ok(order)
        } else {
            Err(Retry::Unpeelable)
        }
    }
}

/// Hash all keys into their three 32-bit words (in parallel when the
/// "parallel" feature is enabled; the writes are disjoint per key).
fn derive_words<H: HashFamily + ?Sized>(
    keys: &[Vec<u8>],
    family: &H,
    seed: u64,
) -> Vec<[u32; 3]> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        keys.par_iter().map(|k| family.hash(seed, k)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        keys.iter().map(|k| family.hash(seed, k)).collect()
    }
}
