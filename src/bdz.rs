//! BDZ construction driver: rejection sampling over seeds, vertex
//! labeling in reverse elimination order, and the finished [`Mphf`].
//!
//! A full description of the algorithm can be found in:
//! "Simple and Space-Efficient Minimal Perfect Hash Functions"
//! by Botelho, Pagh and Ziviani, proceedings of WADS 2007.

use std::borrow::Borrow;

use hashbrown::HashSet;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::{Graph3, Retry};
use crate::hash::{HashFamily, SplitMix3};
use crate::rank::{HOLE, RankIndex, pack_labels};

/// Builder configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Vertex expansion constant v/n. The BDZ acyclicity threshold is
    /// ~1.23; anything below 1.24 is rejected.
    pub c: f64,
    /// How many seeds to try before giving up. The expected number of
    /// attempts is a small constant (degenerate-edge redraws dominate),
    /// so this is a robustness cap, not a tuning knob.
    pub max_attempts: u32,
    /// Base seed. Per-attempt seeds are derived deterministically.
    pub seed: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            c: 1.24,
            max_attempts: 1000,
            seed: 0xC0FF_EE00_D15E_A5E,
        }
    }
}

#[derive(Debug, Error)]
pub enum MphError {
    #[error("the expansion constant must be at least 1.24 (got {0})")]
    ExpansionTooSmall(f64),
    #[error("the hash family must produce at least 3 words (got {0})")]
    HashTooNarrow(usize),
    #[error("empty key set is not supported")]
    EmptyKeySet,
    #[error("duplicate key detected during build")]
    DuplicateKey,
    #[error("no peelable graph found after {0} attempts")]
    Unresolvable(u32),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("serialization error: {0}")]
    Serde(#[from] Box<bincode::ErrorKind>),
}

/// Finished minimal perfect hash: everything the emitter bakes into the
/// generated function, plus the key-order permutation map.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Mphf {
    /// Number of keys; the output range is `[0, n)`.
    pub n: u32,
    /// Number of graph vertices, the modulus of the emitted function.
    pub v: u32,
    /// The seed that produced a peelable graph.
    pub seed: u64,
    /// Packed 2-bit labels, 16 per word, one trailing zero word.
    pub g: Vec<u32>,
    /// Hole-count summaries over `g`.
    pub rank: RankIndex,
    /// Output rank assigned to each key, in input order.
    pub result_map: Vec<u32>,
}

impl Mphf {
    /// Look a key up with the default [`SplitMix3`] family.
    #[inline]
    pub fn index(&self, key: &[u8]) -> u32 {
        self.index_with(&SplitMix3, key)
    }

    #[inline]
    pub fn index_str(&self, s: &str) -> u32 {
        self.index(s.as_bytes())
    }

    /// Look a key up under the family the function was built with.
    ///
    /// Performs exactly the computation the emitted C performs: reduce the
    /// three hash words mod `v`, pick the authoritative word by label sum,
    /// then rank it into `[0, n)`.
    pub fn index_with<H: HashFamily + ?Sized>(&self, family: &H, key: &[u8]) -> u32 {
        let words = family.hash(self.seed, key);
        let h = [
            words[0] % self.v,
            words[1] % self.v,
            words[2] % self.v,
        ];
        let sum = self.label(h[0]) + self.label(h[1]) + self.label(h[2]);
        let idx = h[(sum % 3) as usize];
        self.rank.rank(&self.g, idx)
    }

    #[inline]
    fn label(&self, vertex: u32) -> u32 {
        (self.g[(vertex >> 4) as usize] >> (2 * (vertex & 15))) & 3
    }

    #[cfg(feature = "serde")]
    pub fn to_bytes(&self) -> Result<Vec<u8>, MphError> {
        Ok(bincode::serialize(self)?)
    }

    #[cfg(feature = "serde")]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MphError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

pub struct Builder {
    cfg: BuildConfig,
    family: Box<dyn HashFamily>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            cfg: BuildConfig::default(),
            family: Box::new(SplitMix3),
        }
    }

    pub fn with_config(mut self, cfg: BuildConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn with_family(mut self, family: Box<dyn HashFamily>) -> Self {
        self.family = family;
        self
    }

    /// Build the MPHF from **unique** keys.
    ///
    /// Parameters are validated before any work happens; degenerate edges
    /// and non-peelable graphs are retried with the next derived seed and
    /// never surface to the caller.
    pub fn build<K, I>(self, keys: I) -> Result<Mphf, MphError>
    where
        K: Borrow<[u8]>,
        I: IntoIterator<Item = K>,
    {
        if self.cfg.c < 1.24 {
            return Err(MphError::ExpansionTooSmall(self.cfg.c));
        }
        let words = self.family.hash_words();
        if words < 3 {
            return Err(MphError::HashTooNarrow(words));
        }

        // Exact uniqueness check; two equal keys form the same edge under
        // every seed and no attempt could ever succeed.
        let mut uniq = Vec::<Vec<u8>>::new();
        let mut seen = HashSet::<Vec<u8>>::new();
        for k in keys {
            let k = k.borrow().to_vec();
            if !seen.insert(k.clone()) {
                return Err(MphError::DuplicateKey);
            }
            uniq.push(k);
        }
        if uniq.is_empty() {
            return Err(MphError::EmptyKeySet);
        }
        let n = uniq.len() as u32;

        let mut v = (self.cfg.c * f64::from(n)) as u32;
        if 1.24 * f64::from(n) > f64::from(v) {
            v += 1;
        }
        if v < 10 {
            v = 10;
        }

        for attempt in 0..self.cfg.max_attempts {
            let seed = mix_seed(self.cfg.seed, attempt);
            match try_build(&uniq, self.family.as_ref(), seed, v) {
                Ok((g, rank, result_map)) => {
                    info!(attempts = attempt + 1, seed, "peelable graph found");
                    return Ok(Mphf {
                        n,
                        v,
                        seed,
                        g,
                        rank,
                        result_map,
                    });
                }
                Err(Retry::DegenerateEdge) => {
                    debug!(attempt, seed, "degenerate edge, reseeding");
                }
                Err(Retry::Unpeelable) => {
                    debug!(attempt, seed, "graph not peelable, reseeding");
                }
            }
        }
        Err(MphError::Unresolvable(self.cfg.max_attempts))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// One construction attempt under a fixed seed.
fn try_build<H: HashFamily + ?Sized>(
    keys: &[Vec<u8>],
    family: &H,
    seed: u64,
    v: u32,
) -> Result<(Vec<u32>, RankIndex, Vec<u32>), Retry> {
    let graph = Graph3::build(keys, family, seed, v)?;
    let order = graph.peel()?;
    let (labels, visited) = assign(&graph, &order);
    let result_map = map_ranks(&labels, &visited, graph.e as usize);
    let rank = RankIndex::build(&labels);
    Ok((pack_labels(&labels), rank, result_map))
}

/// Assign 2-bit labels in reverse elimination order.
///
/// For each edge the first still-unvisited endpoint becomes authoritative:
/// its label is chosen so the labels of the three endpoints sum to the
/// endpoint's position mod 3. Unvisited endpoints hold the hole value 3,
/// which is 0 mod 3, so the rule stays consistent as later (earlier-peeled)
/// edges fill them in. `visited[t] = 2 + j` records which edge owns vertex
/// `t`.
fn assign(graph: &Graph3, order: &[u32]) -> (Vec<u8>, Vec<u32>) {
    let v = graph.v as usize;
    let mut labels = vec![HOLE; v];
    let mut visited = vec![0u32; v];

    for &j in order.iter().rev() {
        let e = &graph.edges[j as usize];
        let (l, m, r) = (e.left as usize, e.middle as usize, e.right as usize);
        let (pos, t) = if visited[l] == 0 {
            (0u32, l)
        } else if visited[m] == 0 {
            (1, m)
        } else {
            // Reverse elimination order guarantees one fresh endpoint per
            // edge; anything else is a peeler bug.
            assert_eq!(visited[r], 0, "edge {} has no unvisited endpoint", j);
            (2, r)
        };

        visited[t] = 2 + j;
        if visited[l] == 0 {
            visited[l] = 1;
        }
        if visited[m] == 0 {
            visited[m] = 1;
        }
        if visited[r] == 0 {
            visited[r] = 1;
        }

        let sum =
            u32::from(labels[l]) + u32::from(labels[m]) + u32::from(labels[r]);
        labels[t] = ((9 + pos - sum) % 3) as u8;
    }

    (labels, visited)
}

/// Ranks of the winning vertices, indexed by edge (= key position).
fn map_ranks(labels: &[u8], visited: &[u32], e: usize) -> Vec<u32> {
    let mut map = vec![0u32; e];
    let mut holes = 0u32;
    for (i, &label) in labels.iter().enumerate() {
        if visited[i] > 1 {
            map[(visited[i] - 2) as usize] = i as u32 - holes;
        }
        if label == HOLE {
            holes += 1;
        }
    }
    map
}

/// Deterministically derive the seed for a retry round (FNV-style mix).
#[inline]
fn mix_seed(base: u64, round: u32) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut h = FNV_OFFSET ^ base;
    h ^= u64::from(round);
    h = h.wrapping_mul(FNV_PRIME);
    h ^ (h >> 33)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_small_expansion() {
        let cfg = BuildConfig {
            c: 1.0,
            ..Default::default()
        };
        let err = Builder::new()
            .with_config(cfg)
            .build([b"a".as_slice()])
            .unwrap_err();
        assert!(matches!(err, MphError::ExpansionTooSmall(_)));
    }

    #[test]
    fn rejects_duplicates_and_empty_sets() {
        let err = Builder::new()
            .build([b"a".as_slice(), b"a".as_slice()])
            .unwrap_err();
        assert!(matches!(err, MphError::DuplicateKey));

        let err = Builder::new().build(Vec::<&[u8]>::new()).unwrap_err();
        assert!(matches!(err, MphError::EmptyKeySet));
    }

    #[test]
    fn single_key_maps_to_zero() {
        let mph = Builder::new().build([b"a".as_slice()]).unwrap();
        assert_eq!(mph.n, 1);
        assert_eq!(mph.v, 10);
        assert_eq!(mph.index(b"a"), 0);
        assert_eq!(mph.result_map, vec![0]);
    }

    #[test]
    fn narrow_family_is_rejected() {
        struct TwoWords;
        impl HashFamily for TwoWords {
            fn hash_words(&self) -> usize {
                2
            }
            fn hash(&self, _seed: u64, _key: &[u8]) -> [u32; 3] {
                unreachable!("rejected before hashing")
            }
            fn emit_c(
                &self,
                _out: &mut dyn std::io::Write,
                _seed: u64,
                _key: &str,
                _keylen: &str,
                _hashes: &str,
            ) -> std::io::Result<()> {
                unreachable!("rejected before emission")
            }
        }
        let err = Builder::new()
            .with_family(Box::new(TwoWords))
            .build([b"a".as_slice()])
            .unwrap_err();
        assert!(matches!(err, MphError::HashTooNarrow(2)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialization_round_trips() {
        let keys = [b"foo".as_slice(), b"bar".as_slice(), b"baz".as_slice()];
        let mph = Builder::new().build(keys).unwrap();
        let restored = Mphf::from_bytes(&mph.to_bytes().unwrap()).unwrap();
        for k in keys {
            assert_eq!(mph.index(k), restored.index(k));
        }
    }
}
