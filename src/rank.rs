//! Hole-rank support: the packed label table and the multi-level summary
//! that folds a labeled vertex index down to `[0, n)` in O(1).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Label value marking an unassigned vertex.
pub const HOLE: u8 = 3;

/// Pack labels 16 per `u32` word, 2 bits each, little-endian within the
/// word, with one trailing all-zero word.
///
/// The trailing word keeps the forward popcount correction of the rank
/// query in bounds when the last label word is full; zero bits decode as
/// label 0, never as a hole, so it cannot perturb any count.
pub fn pack_labels(labels: &[u8]) -> Vec<u32> {
    let mut packed = vec![0u32; labels.len().div_ceil(16) + 1];
    for (i, &label) in labels.iter().enumerate() {
        packed[i / 16] |= u32::from(label) << (2 * (i % 16));
    }
    packed
}

/// Multi-level cumulative hole counts over the label array.
///
/// `holes64k` is absolute at 64K boundaries; `holes256` is relative to the
/// enclosing 64K block; the three sub-arrays hold the hole counts at
/// offsets 64/128/192 within each 256-block, relative to the block base.
/// Each array has one entry past the last boundary inside the vertex range
/// so the lookup's round-up arms always find their anchor.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankIndex {
    pub holes64k: Vec<u32>,
    pub holes256: Vec<u16>,
    pub holes256_64: Vec<u8>,
    pub holes256_128: Vec<u8>,
    pub holes256_192: Vec<u8>,
}

impl RankIndex {
    pub fn build(labels: &[u8]) -> Self {
        let v = labels.len();

        // Hole prefix counts at every 64-vertex boundary; every summary
        // boundary below is a multiple of 64.
        let mut prefix64 = Vec::with_capacity(v / 64 + 1);
        prefix64.push(0u32);
        let mut holes = 0u32;
        for (i, &label) in labels.iter().enumerate() {
            if label == HOLE {
                holes += 1;
            }
            if (i + 1) % 64 == 0 {
                prefix64.push(holes);
            }
        }
        let total = holes;
        let before = |boundary: usize| -> u32 {
            if boundary >= v {
                total
            } else {
                prefix64[boundary / 64]
            }
        };

        let len64k = (v + 65535) / 65536 + 1;
        let len256 = (v + 255) / 256 + 1;

        let holes64k: Vec<u32> = (0..len64k).map(|k| before(k * 65536)).collect();
        let holes256: Vec<u16> = (0..len256)
            .map(|b| (before(b * 256) - holes64k[b >> 8]) as u16)
            .collect();
        let sub = |offset: usize| -> Vec<u8> {
            (0..len256)
                .map(|b| (before(b * 256 + offset) - before(b * 256)) as u8)
                .collect()
        };

        Self {
            holes64k,
            holes256,
            holes256_64: sub(64),
            holes256_128: sub(128),
            holes256_192: sub(192),
        }
    }

    /// Rank of a non-hole vertex: `idx` minus the holes before it.
    ///
    /// Mirrors the computation the emitter writes into the generated
    /// function: anchor on the nearest summarized boundary, then correct
    /// with a popcount over at most two packed label words. Intermediate
    /// values may wrap exactly as C unsigned arithmetic does; the final
    /// value is exact.
    pub fn rank(&self, packed: &[u32], idx: u32) -> u32 {
        let i = idx as usize;
        let base = match (idx >> 5) & 7 {
            0 => self.anchor(i, 0),
            1 | 2 => self.anchor(i, 0).wrapping_add(u32::from(self.holes256_64[i >> 8])),
            3 | 4 => self.anchor(i, 0).wrapping_add(u32::from(self.holes256_128[i >> 8])),
            5 | 6 => self.anchor(i, 0).wrapping_add(u32::from(self.holes256_192[i >> 8])),
            _ => self.anchor(i, 32),
        };
        let mut rank = idx.wrapping_sub(base);

        let w = i >> 4;
        let upto = (2u32 << (2 * (idx & 15))) - 1;
        match (idx >> 4) & 3 {
            0 => {
                rank = rank.wrapping_sub((hole_bits(packed[w]) & upto).count_ones());
            }
            1 => {
                rank = rank.wrapping_sub(hole_bits(packed[w - 1]).count_ones());
                rank = rank.wrapping_sub((hole_bits(packed[w]) & upto).count_ones());
            }
            2 => {
                rank = rank.wrapping_add(hole_bits(packed[w + 1]).count_ones());
                rank = rank.wrapping_add((hole_bits(packed[w]) & !upto).count_ones());
            }
            _ => {
                rank = rank.wrapping_add((hole_bits(packed[w]) & !upto).count_ones());
            }
        }
        rank
    }

    /// Cumulative holes at the summarized boundary for `idx + ahead`.
    fn anchor(&self, i: usize, ahead: usize) -> u32 {
        let j = i + ahead;
        self.holes64k[j >> 16].wrapping_add(u32::from(self.holes256[j >> 8]))
    }
}

/// Mask with bit `2k` set iff packed entry `k` is a hole (both label bits
/// set).
#[inline]
fn hole_bits(word: u32) -> u32 {
    word & (word >> 1) & 0x5555_5555
}
