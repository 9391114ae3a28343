//! mphgen — generator of standalone C minimal perfect hash functions.
//!
//! - BDZ (3-hypergraph peeling): hash every key to a three-vertex edge,
//!   redraw the seed until the graph peels, label vertices in reverse
//!   elimination order.
//! - Emits one self-contained C function mapping each input key to a
//!   unique index in `[0..n)`, plus an optional key→index map file.
//! - Deterministic: same keys, same config, byte-identical output.

mod bdz;
pub mod emit;
mod graph;
mod hash;
mod rank;

pub use bdz::{BuildConfig, Builder, MphError, Mphf};
pub use emit::{EmitOptions, emit_c, emit_map};
pub use hash::{HashFamily, SplitMix3};
pub use rank::RankIndex;
